use std::{collections::BTreeMap, fmt};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "kebab-case")]
pub enum AdminLevel {
    /// Province or centrally governed city (Tỉnh / Thành Phố)
    City,
    /// Urban or rural district (Quận / Huyện / Thị Xã / Thành Phố)
    District,
    /// Ward, commune or township (Phường / Xã / Thị Trấn)
    Ward,
}

impl AdminLevel {
    pub fn all() -> &'static [AdminLevel] {
        &[AdminLevel::City, AdminLevel::District, AdminLevel::Ward]
    }

    /// Levels from the top of the hierarchy down to and including `self`.
    pub fn through(self) -> impl Iterator<Item = AdminLevel> {
        Self::all().iter().copied().filter(move |level| *level <= self)
    }

    pub fn ancestors(self) -> impl Iterator<Item = AdminLevel> {
        Self::all().iter().copied().filter(move |level| *level < self)
    }

    pub fn parent(self) -> Option<AdminLevel> {
        match self {
            AdminLevel::City => None,
            AdminLevel::District => Some(AdminLevel::City),
            AdminLevel::Ward => Some(AdminLevel::District),
        }
    }

    pub fn field_name(&self) -> &'static str {
        match self {
            AdminLevel::City => "city",
            AdminLevel::District => "district",
            AdminLevel::Ward => "ward",
        }
    }
}

impl fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminNames {
    pub city: String,
    pub district: String,
    pub ward: String,
}

impl AdminNames {
    pub fn new(city: impl Into<String>, district: impl Into<String>, ward: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            district: district.into(),
            ward: ward.into(),
        }
    }

    pub fn get(&self, level: AdminLevel) -> &str {
        match level {
            AdminLevel::City => &self.city,
            AdminLevel::District => &self.district,
            AdminLevel::Ward => &self.ward,
        }
    }

    pub fn set(&mut self, level: AdminLevel, value: impl Into<String>) {
        let value = value.into();
        match level {
            AdminLevel::City => self.city = value,
            AdminLevel::District => self.district = value,
            AdminLevel::Ward => self.ward = value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchKeySet {
    /// Title stripped, diacritics kept, spaces removed, numeric titles reinserted.
    pub normalized_key: String,
    pub ascii_key: String,
    /// Canonical title plus name, spaced at case and digit boundaries.
    pub display_key: String,
}

impl MatchKeySet {
    pub fn is_empty(&self) -> bool {
        self.normalized_key.is_empty()
    }

    /// Display key with every space removed, the form compared by the looser tiers.
    pub fn compact_display(&self) -> String {
        self.display_key.chars().filter(|ch| !ch.is_whitespace()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    /// 1-based data row number within its source table.
    pub row: usize,
    pub names: AdminNames,
    pub store_id: Option<String>,
    /// Ids already carried by the row (boundary tables, or hints on other sources).
    pub unit_ids: BTreeMap<AdminLevel, String>,
    /// Every cell of the source row, passed through untouched.
    pub fields: Vec<String>,
}

impl RawRecord {
    pub fn unit_id(&self, level: AdminLevel) -> Option<&str> {
        self.unit_ids.get(&level).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdministrativeUnit {
    pub level: AdminLevel,
    pub authoritative_id: String,
    pub display_name: String,
    pub normalized_key: String,
    pub ascii_key: String,
    pub parent_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn through_walks_down_the_hierarchy() {
        let levels: Vec<_> = AdminLevel::District.through().collect();
        assert_eq!(levels, vec![AdminLevel::City, AdminLevel::District]);
        let ancestors: Vec<_> = AdminLevel::Ward.ancestors().collect();
        assert_eq!(ancestors, vec![AdminLevel::City, AdminLevel::District]);
        assert!(AdminLevel::City.ancestors().next().is_none());
    }

    #[test]
    fn compact_display_drops_spaces() {
        let keys = MatchKeySet {
            normalized_key: "BuônHồ".into(),
            ascii_key: "buonho".into(),
            display_key: "Thị Xã Buôn Hồ".into(),
        };
        assert_eq!(keys.compact_display(), "ThịXãBuônHồ");
    }
}
