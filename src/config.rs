use std::{fs::File, io::BufReader, path::{Path, PathBuf}};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{corrections::CorrectionTables, model::AdminLevel};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnRoles {
    pub city: String,
    pub district: String,
    pub ward: String,
    pub store_id: Option<String>,
    pub city_id: Option<String>,
    pub district_id: String,
    pub ward_id: String,
}

impl Default for ColumnRoles {
    fn default() -> Self {
        Self {
            city: "city".to_string(),
            district: "district".to_string(),
            ward: "ward".to_string(),
            store_id: Some("store_id".to_string()),
            city_id: None,
            district_id: "dist_id".to_string(),
            ward_id: "ward_id".to_string(),
        }
    }
}

impl ColumnRoles {
    pub fn name_column(&self, level: AdminLevel) -> &str {
        match level {
            AdminLevel::City => &self.city,
            AdminLevel::District => &self.district,
            AdminLevel::Ward => &self.ward,
        }
    }

    pub fn id_column(&self, level: AdminLevel) -> Option<&str> {
        match level {
            AdminLevel::City => self.city_id.as_deref(),
            AdminLevel::District => Some(&self.district_id),
            AdminLevel::Ward => Some(&self.ward_id),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Columns of the tables being resolved.
    pub records: ColumnRoles,
    /// Columns of the boundary reference table.
    pub boundary: ColumnRoles,
    /// Correction table file; the built-in tables are used when absent.
    pub corrections: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let mut config: PipelineConfig = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config YAML {path:?}"))?;
        // Relative table paths are relative to the config file.
        if let Some(tables) = config.corrections.as_mut()
            && tables.is_relative()
            && let Some(parent) = path.parent()
        {
            *tables = parent.join(&*tables);
        }
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn correction_tables(&self) -> Result<CorrectionTables> {
        let tables = match &self.corrections {
            Some(path) => CorrectionTables::load(path)?,
            None => CorrectionTables::builtin().context("Loading built-in correction tables")?,
        };
        debug!(
            "Correction tables: {} boundary level(s), {} census level(s), {} store override(s)",
            tables.boundary.levels.len(),
            tables.census.levels.len(),
            tables.stores.len()
        );
        Ok(tables)
    }
}
