use std::{borrow::Cow, collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use unicode_normalization::{UnicodeNormalization, is_nfc};

use crate::{error::ReconcileError, model::AdminLevel};

const BUILTIN_TABLES: &str = include_str!("../data/corrections.yaml");

/// Which upstream dataset a table of names came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "kebab-case")]
pub enum Source {
    /// Boundary reference (GADM-style geodata)
    Boundary,
    /// Government census spreadsheets
    Census,
    /// Retail store-location feeds
    Store,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Substitution {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LevelCorrections {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub by_id: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub rename: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replace: Vec<Substitution>,
}

impl LevelCorrections {
    /// Applies `by_id`, then `rename`, then every `replace` substitution in order.
    pub fn apply<'a>(&self, raw: &'a str, unit_id_hint: Option<&str>) -> Cow<'a, str> {
        if let Some(id) = unit_id_hint
            && let Some(name) = self.by_id.get(id.trim())
        {
            return Cow::Owned(name.clone());
        }
        let composed: Cow<'a, str> = if is_nfc(raw) {
            Cow::Borrowed(raw)
        } else {
            Cow::Owned(raw.nfc().collect())
        };
        if let Some(name) = self.rename.get(composed.trim()) {
            return Cow::Owned(name.clone());
        }
        let mut current = composed;
        for substitution in &self.replace {
            if current.contains(substitution.from.as_str()) {
                current = Cow::Owned(current.replace(&substitution.from, &substitution.to));
            }
        }
        current
    }
}

/// Correction table for one source, keyed by level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameCorrections {
    pub levels: BTreeMap<AdminLevel, LevelCorrections>,
}

impl NameCorrections {
    pub fn correct<'a>(
        &self,
        level: AdminLevel,
        raw: &'a str,
        unit_id_hint: Option<&str>,
    ) -> Cow<'a, str> {
        match self.levels.get(&level) {
            Some(table) => table.apply(raw, unit_id_hint),
            None => Cow::Borrowed(raw),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Store-specific override, for stores mapped before or after an administrative change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ward: Option<String>,
    /// Spelling being replaced at the most specific overridden level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub was: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl StoreOverride {
    pub fn name(&self, level: AdminLevel) -> Option<&str> {
        match level {
            AdminLevel::City => self.city.as_deref(),
            AdminLevel::District => self.district.as_deref(),
            AdminLevel::Ward => self.ward.as_deref(),
        }
    }

    /// The level `was` refers to: the lowest level carrying an override.
    pub fn guarded_level(&self) -> Option<AdminLevel> {
        AdminLevel::all()
            .iter()
            .rev()
            .copied()
            .find(|level| self.name(*level).is_some())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorrectionTables {
    pub boundary: NameCorrections,
    pub census: NameCorrections,
    pub stores: BTreeMap<String, StoreOverride>,
}

impl CorrectionTables {
    /// Tables compiled into the binary.
    pub fn builtin() -> Result<Self, ReconcileError> {
        Self::from_yaml_str(BUILTIN_TABLES)
    }

    pub fn from_yaml_str(input: &str) -> Result<Self, ReconcileError> {
        let tables: CorrectionTables = serde_yaml::from_str(input)
            .map_err(|err| ReconcileError::InvalidCorrections(err.to_string()))?;
        tables.validate()?;
        Ok(tables)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening correction tables {path:?}"))?;
        Self::from_yaml_str(&raw).with_context(|| format!("Parsing correction tables {path:?}"))
    }

    /// Name table for `source`; store feeds have no name table of their own.
    pub fn names_for(&self, source: Source) -> Option<&NameCorrections> {
        match source {
            Source::Boundary => Some(&self.boundary),
            Source::Census => Some(&self.census),
            Source::Store => None,
        }
    }

    pub fn store_override(&self, store_id: &str) -> Option<&StoreOverride> {
        self.stores.get(store_id.trim())
    }

    /// SHA-256 over every entry in a fixed order; identifies the table version in reports.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for (label, names) in [("boundary", &self.boundary), ("census", &self.census)] {
            for (level, table) in &names.levels {
                let level = level.field_name();
                for (id, name) in &table.by_id {
                    feed(&mut hasher, &[label, level, "by_id", id.as_str(), name.as_str()]);
                }
                for (from, to) in &table.rename {
                    feed(&mut hasher, &[label, level, "rename", from.as_str(), to.as_str()]);
                }
                for substitution in &table.replace {
                    feed(
                        &mut hasher,
                        &[
                            label,
                            level,
                            "replace",
                            substitution.from.as_str(),
                            substitution.to.as_str(),
                        ],
                    );
                }
            }
        }
        for (store_id, entry) in &self.stores {
            feed(
                &mut hasher,
                &[
                    "stores",
                    store_id.as_str(),
                    entry.city.as_deref().unwrap_or_default(),
                    entry.district.as_deref().unwrap_or_default(),
                    entry.ward.as_deref().unwrap_or_default(),
                    entry.was.as_deref().unwrap_or_default(),
                ],
            );
        }
        format!("{:x}", hasher.finalize())
    }

    fn validate(&self) -> Result<(), ReconcileError> {
        for (label, names) in [("boundary", &self.boundary), ("census", &self.census)] {
            for (level, table) in &names.levels {
                if let Some(bad) = table.replace.iter().find(|s| s.from.is_empty()) {
                    return Err(ReconcileError::InvalidCorrections(format!(
                        "{label}.{level}: replacement to '{}' has an empty 'from'",
                        bad.to
                    )));
                }
            }
        }
        if let Some((store_id, _)) = self
            .stores
            .iter()
            .find(|(_, entry)| entry.guarded_level().is_none())
        {
            return Err(ReconcileError::InvalidCorrections(format!(
                "stores.{store_id}: override names no city, district or ward"
            )));
        }
        Ok(())
    }
}

fn feed(hasher: &mut Sha256, parts: &[&str]) {
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    hasher.update([0x1e]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_parse() {
        let tables = CorrectionTables::builtin().expect("builtin tables");
        assert!(tables.store_override("3355").is_some());
        assert!(!tables.boundary.is_empty());
        assert_eq!(tables.digest().len(), 64);
    }

    #[test]
    fn substitutions_apply_in_order() {
        let table = LevelCorrections {
            replace: vec![
                Substitution {
                    from: " Ii".into(),
                    to: " II".into(),
                },
                Substitution {
                    from: "Hòa Tú II".into(),
                    to: "Hòa Tú 2".into(),
                },
            ],
            ..LevelCorrections::default()
        };
        assert_eq!(table.apply("Xã Hòa Tú Ii", None), "Xã Hòa Tú 2");
        assert!(matches!(table.apply("Xã Hòa Tú 1", None), Cow::Borrowed(_)));
    }
}
