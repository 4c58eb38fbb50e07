//! I/O utilities for reading and writing delimited extracts.
//!
//! Every file the reconciler touches goes through this module:
//!
//! - **Delimiter resolution**: `.tsv` → tab, anything else → comma, unless overridden.
//! - **Encoding**: inputs are decoded with `encoding_rs` (a byte-order mark wins over the
//!   requested label, so Excel's UTF-8 exports work unchanged); outputs are encoded with
//!   the requested label. Census extracts exported as `windows-1258` are the usual reason
//!   to pass a label at all.
//! - **stdin/stdout**: the `-` path convention routes through standard streams.

use std::{
    fs::{self, File},
    io::{self, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(UTF_8),
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn resolve_output_delimiter(path: Option<&Path>, provided: Option<u8>, fallback: u8) -> u8 {
    if let Some(delimiter) = provided {
        return delimiter;
    }
    match path.and_then(|p| p.extension()).and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        Some(ext) if ext.eq_ignore_ascii_case("csv") => DEFAULT_CSV_DELIMITER,
        _ => fallback,
    }
}

pub fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}

/// Reads `path` (or stdin for `-`) and decodes it to UTF-8 text.
pub fn read_text(path: &Path, encoding: &'static Encoding) -> Result<String> {
    let bytes = if is_dash(path) {
        let mut buffer = Vec::new();
        io::stdin()
            .lock()
            .read_to_end(&mut buffer)
            .context("Reading stdin")?;
        buffer
    } else {
        fs::read(path).with_context(|| format!("Opening input file {path:?}"))?
    };
    decode_bytes(&bytes, encoding).with_context(|| format!("Decoding {path:?}"))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!("Failed to decode text with encoding {}", used.name()))
    } else {
        Ok(text.into_owned())
    }
}

pub fn csv_reader(text: &str, delimiter: u8) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(text.as_bytes())
}

pub fn csv_writer(delimiter: u8) -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true)
        .from_writer(Vec::new())
}

/// Encodes UTF-8 `text` with `encoding` and writes it to `path` (stdout when absent or `-`).
pub fn write_text(path: Option<&Path>, text: &str, encoding: &'static Encoding) -> Result<()> {
    let bytes: Vec<u8> = if encoding == UTF_8 {
        text.as_bytes().to_vec()
    } else {
        let (encoded, _, had_errors) = encoding.encode(text);
        if had_errors {
            return Err(anyhow!("Failed to encode output using {}", encoding.name()));
        }
        encoded.into_owned()
    };
    let mut sink: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(io::stdout().lock()),
    };
    sink.write_all(&bytes).context("Writing output")?;
    sink.flush().context("Flushing output")
}
