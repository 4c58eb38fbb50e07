use std::{fmt, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;

use crate::dataset::Table;

pub const FLAT_HEADERS: [&str; 6] = ["provinceId", "city", "districtId", "district", "wardId", "ward"];

/// Ids appear as JSON numbers in some exports and as strings in others.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(untagged)]
pub enum AdminId {
    Number(i64),
    Text(String),
}

impl fmt::Display for AdminId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminId::Number(value) => write!(f, "{value}"),
            AdminId::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDirectory {
    pub full_data_location: Vec<LocationGroup>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationGroup {
    #[serde(default)]
    pub province_list: Vec<Province>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Province {
    pub id: AdminId,
    pub name: String,
    #[serde(default, rename = "districtBOList")]
    pub district_bo_list: Vec<District>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct District {
    pub id: AdminId,
    pub name: String,
    #[serde(default)]
    pub wards: Vec<Ward>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ward {
    pub id: AdminId,
    pub name: String,
}

impl AdminDirectory {
    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Opening administrative list {path:?}"))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing administrative list {path:?}"))
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        serde_json::from_str(input).context("Parsing administrative list JSON")
    }

    /// One row per ward, ordered by ward id; a ward id seen twice keeps its first row.
    pub fn flatten(&self) -> Table {
        let mut wards = Vec::new();
        for group in &self.full_data_location {
            for province in &group.province_list {
                for district in &province.district_bo_list {
                    for ward in &district.wards {
                        wards.push((ward.id.clone(), province, district, ward));
                    }
                }
            }
        }
        wards.sort_by(|a, b| a.0.cmp(&b.0));
        wards.dedup_by(|later, earlier| later.0 == earlier.0);
        debug!("Flattened {} ward(s)", wards.len());

        let rows = wards
            .into_iter()
            .map(|(ward_id, province, district, ward)| {
                vec![
                    province.id.to_string(),
                    province.name.trim().to_string(),
                    district.id.to_string(),
                    drop_parenthetical(&district.name).to_string(),
                    ward_id.to_string(),
                    drop_parenthetical(&ward.name).to_string(),
                ]
            })
            .collect();
        Table::new(FLAT_HEADERS.iter().map(|h| h.to_string()).collect(), rows)
    }
}

fn drop_parenthetical(name: &str) -> &str {
    name.split('(').next().unwrap_or(name).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_accept_numbers_and_strings() {
        let doc = AdminDirectory::from_json_str(
            r#"{"fullDataLocation":[{"provinceList":[{"id":"79","name":"Hồ Chí Minh",
                "districtBOList":[{"id":760,"name":"Quận 1 (cũ)","wards":[{"id":26734,"name":"Bến Nghé"}]}]}]}]}"#,
        )
        .expect("json");
        let table = doc.flatten();
        assert_eq!(table.rows[0], vec!["79", "Hồ Chí Minh", "760", "Quận 1", "26734", "Bến Nghé"]);
    }
}
