use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{corrections::Source, merge::JoinKind, model::AdminLevel};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Reconcile Vietnamese administrative names onto boundary ids",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the match keys computed for one or more names
    Normalize(NormalizeArgs),
    /// Append city/district/ward match keys to a table
    Keys(KeysArgs),
    /// List names that collide after normalization in a boundary table
    Collisions(CollisionsArgs),
    /// Attach boundary ids to a table through the cascading join
    Resolve(ResolveArgs),
    /// Replace one city's boundary rows with a refined overlay
    Overlay(OverlayArgs),
    /// Flatten a nested administrative list (JSON) into a table
    Flatten(FlattenArgs),
    /// Join two resolved tables on id columns
    Merge(MergeArgs),
    /// Count stores per unit and derive people per store and density
    Coverage(CoverageArgs),
}

/// Delimiter and encoding flags shared by every table-reading command.
#[derive(Debug, Clone, Args)]
pub struct CsvOptions {
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Character encoding for the output file/stdout (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Names to normalize
    #[arg(required = true)]
    pub names: Vec<String>,
    /// Administrative level the names belong to
    #[arg(long, value_enum, default_value = "ward")]
    pub level: AdminLevel,
}

#[derive(Debug, Args)]
pub struct KeysArgs {
    /// Input table
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output table (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Deepest level to build keys for
    #[arg(long, value_enum, default_value = "ward")]
    pub level: AdminLevel,
    /// Which correction table applies to the input
    #[arg(long, value_enum, default_value = "census")]
    pub source: Source,
    /// Pipeline configuration (column roles, correction tables)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub csv: CsvOptions,
}

#[derive(Debug, Args)]
pub struct CollisionsArgs {
    /// Boundary reference table
    #[arg(short = 'b', long = "boundary")]
    pub boundary: PathBuf,
    /// Reference level
    #[arg(long, value_enum, default_value = "ward")]
    pub level: AdminLevel,
    /// Write the collision report as CSV instead of printing it
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Also write every reference unit (id, display name, keys, parent) to this file
    #[arg(long = "units")]
    pub units: Option<PathBuf>,
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub csv: CsvOptions,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Boundary reference table
    #[arg(short = 'b', long = "boundary")]
    pub boundary: PathBuf,
    /// Table to resolve (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Resolved output table (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Write rows that failed every tier to this file
    #[arg(long = "unresolved")]
    pub unresolved: Option<PathBuf>,
    /// Write the run summary as JSON to this file
    #[arg(long = "summary")]
    pub summary: Option<PathBuf>,
    /// Level to resolve at
    #[arg(long, value_enum, default_value = "ward")]
    pub level: AdminLevel,
    /// Which correction table applies to the input
    #[arg(long, value_enum, default_value = "census")]
    pub source: Source,
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub csv: CsvOptions,
}

#[derive(Debug, Args)]
pub struct OverlayArgs {
    /// Boundary reference table
    #[arg(short = 'b', long = "boundary")]
    pub boundary: PathBuf,
    /// Refined boundary table for one city
    #[arg(long = "overlay")]
    pub overlay: PathBuf,
    /// City the overlay covers
    #[arg(long, default_value = "Hồ Chí Minh")]
    pub city: String,
    /// Overlay column holding English district names
    #[arg(long = "overlay-district", default_value = "dist_en")]
    pub overlay_district: String,
    /// Overlay column holding English ward names
    #[arg(long = "overlay-ward", default_value = "ward_en")]
    pub overlay_ward: String,
    /// Overlay columns to leave out of the result
    #[arg(long = "exclude", value_delimiter = ',')]
    pub exclude: Vec<String>,
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub csv: CsvOptions,
}

#[derive(Debug, Args)]
pub struct FlattenArgs {
    /// Nested administrative list (JSON)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Character encoding for the output file/stdout (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Left table
    #[arg(long = "left")]
    pub left: PathBuf,
    /// Right table
    #[arg(long = "right")]
    pub right: PathBuf,
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Comma-separated key columns from the left table
    #[arg(long = "left-key", value_delimiter = ',', required = true)]
    pub left_key: Vec<String>,
    /// Comma-separated key columns from the right table
    #[arg(long = "right-key", value_delimiter = ',', required = true)]
    pub right_key: Vec<String>,
    /// Join type (inner, left, right, full)
    #[arg(long = "type", value_enum, default_value = "inner")]
    pub kind: JoinKind,
    #[command(flatten)]
    pub csv: CsvOptions,
}

#[derive(Debug, Args)]
pub struct CoverageArgs {
    /// Resolved population table
    #[arg(long = "population")]
    pub population: PathBuf,
    /// Resolved store table
    #[arg(long = "stores")]
    pub stores: PathBuf,
    /// Id column in the population table
    #[arg(long = "key", default_value = "ward_id")]
    pub key: String,
    /// Id column in the store table (defaults to --key)
    #[arg(long = "store-key")]
    pub store_key: Option<String>,
    /// Population count column
    #[arg(long = "population-column", default_value = "population")]
    pub population_column: String,
    /// Area column in square metres; adds density per km²
    #[arg(long = "area-column")]
    pub area_column: Option<String>,
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub csv: CsvOptions,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
