#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use admin_reconcile::{
    config::PipelineConfig, corrections::CorrectionTables, dataset::Table, io_utils,
    model::AdminLevel, pipeline, reference::BoundaryReference,
};
use encoding_rs::UTF_8;
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Loads a UTF-8 fixture table.
pub fn fixture_table(name: &str) -> Table {
    let path = fixture_path(name);
    Table::read(&path, None, UTF_8).expect("fixture table")
}

/// Builds a reference from `boundary_wards.csv` with the built-in correction tables.
pub fn ward_reference() -> (PipelineConfig, CorrectionTables, BoundaryReference) {
    let config = PipelineConfig::default();
    let tables = CorrectionTables::builtin().expect("builtin tables");
    let boundary = fixture_table("boundary_wards.csv");
    let reference = pipeline::build_reference(&boundary, AdminLevel::Ward, &config, &tables)
        .expect("ward reference");
    (config, tables, reference)
}

pub fn parse_csv(text: &str) -> Table {
    Table::parse(text, io_utils::DEFAULT_CSV_DELIMITER).expect("parse csv")
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }
}
