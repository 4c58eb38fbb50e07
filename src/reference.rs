//! Boundary reference: the deduplicated, disambiguated units of one level and the two
//! lookup indexes the resolver joins against.
//!
//! Built once per run and only read afterwards; the resolver takes it by shared
//! reference.

use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
};

use itertools::Itertools;
use log::{debug, info, warn};

use crate::{
    corrections::{CorrectionTables, Source},
    disambiguate::{self, CollisionReport},
    error::ReconcileError,
    keys::{KeyedRecord, build_keys},
    model::{AdminLevel, AdministrativeUnit, MatchKeySet, RawRecord},
    normalize::{insert_spaces, normalize},
};

/// Separator between the per-level parts of a composite join key.
pub const KEY_SEPARATOR: &str = "\u{1f}";

/// Which form of a [`MatchKeySet`] a join key part is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Normalized,
    CompactDisplay,
    Ascii,
}

impl KeyKind {
    pub fn extract(self, keys: &MatchKeySet) -> Cow<'_, str> {
        match self {
            KeyKind::Normalized => Cow::Borrowed(&keys.normalized_key),
            KeyKind::CompactDisplay => Cow::Owned(keys.compact_display()),
            KeyKind::Ascii => Cow::Borrowed(&keys.ascii_key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceIndex {
    /// Normalized keys at every level.
    Exact,
    /// Ascii keys below the city; the city part stays normalized unless the city is the
    /// target level.
    Ascii,
}

/// Key kind used for `field` by the ascii index of a `target`-level reference.
pub fn ascii_field_kind(target: AdminLevel, field: AdminLevel) -> KeyKind {
    if field == AdminLevel::City && target != AdminLevel::City {
        KeyKind::Normalized
    } else {
        KeyKind::Ascii
    }
}

/// Joins the parts for every level through `target`; `None` when any part is empty.
pub fn composite_key(
    keys: &BTreeMap<AdminLevel, MatchKeySet>,
    target: AdminLevel,
    kind_for: impl Fn(AdminLevel) -> KeyKind,
) -> Option<String> {
    let mut parts = Vec::new();
    for level in target.through() {
        let part = kind_for(level).extract(keys.get(&level)?);
        if part.is_empty() {
            return None;
        }
        parts.push(part);
    }
    Some(parts.join(KEY_SEPARATOR))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceUnit {
    pub level: AdminLevel,
    pub authoritative_id: String,
    pub keyed: KeyedRecord,
}

impl ReferenceUnit {
    pub fn key(&self, level: AdminLevel) -> &MatchKeySet {
        self.keyed.key(level)
    }

    /// Id of the unit containing this one at `level` (this unit's own id at its level).
    /// Falls back to the normalized key when the boundary carries no id for `level`.
    pub fn id_at(&self, level: AdminLevel) -> String {
        if level == self.level {
            return self.authoritative_id.clone();
        }
        self.keyed
            .record
            .unit_id(level)
            .map(str::to_string)
            .unwrap_or_else(|| self.key(level).normalized_key.clone())
    }

    /// The display name is the title-free corrected name, so it reads the same for a
    /// unit whose key was reverted to its titled form.
    pub fn to_unit(&self) -> AdministrativeUnit {
        let keys = self.key(self.level);
        let name = normalize(self.keyed.corrected.get(self.level), self.level);
        AdministrativeUnit {
            level: self.level,
            authoritative_id: self.authoritative_id.clone(),
            display_name: insert_spaces(&name.normalized_key),
            normalized_key: keys.normalized_key.clone(),
            ascii_key: keys.ascii_key.clone(),
            parent_id: self.level.parent().map(|parent| self.id_at(parent)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoundaryReference {
    level: AdminLevel,
    units: Vec<ReferenceUnit>,
    by_id: HashMap<String, usize>,
    collisions: CollisionReport,
    exact: HashMap<String, BTreeSet<String>>,
    ascii: HashMap<String, BTreeSet<String>>,
}

impl BoundaryReference {
    /// Corrects, normalizes, deduplicates and disambiguates boundary rows at `level`.
    pub fn build(
        records: &[RawRecord],
        level: AdminLevel,
        tables: &CorrectionTables,
    ) -> Result<Self, ReconcileError> {
        let keyed = build_keys(records, level, tables, Source::Boundary);
        Self::from_keyed(keyed, level)
    }

    pub fn from_keyed(keyed: Vec<KeyedRecord>, level: AdminLevel) -> Result<Self, ReconcileError> {
        let mut seen = HashSet::new();
        let mut units = Vec::new();
        for record in keyed {
            if !record.malformed.is_empty() {
                warn!(
                    "Boundary row {}: empty {} name, skipped",
                    record.row(),
                    record.malformed.iter().join("/")
                );
                continue;
            }
            let id = match (record.record.unit_id(level).filter(|id| !id.trim().is_empty()), level) {
                (Some(id), _) => id.to_string(),
                (None, AdminLevel::City) => record.key(level).normalized_key.clone(),
                (None, _) => {
                    warn!("Boundary row {}: no {level} id, skipped", record.row());
                    continue;
                }
            };
            if !seen.insert(id.clone()) {
                continue;
            }
            units.push(ReferenceUnit {
                level,
                authoritative_id: id,
                keyed: record,
            });
        }
        if units.is_empty() {
            return Err(ReconcileError::EmptyReference { level });
        }

        let (units, collisions) = disambiguate::disambiguate(units, level);
        let exact = build_index(&units, level, |_| KeyKind::Normalized);
        let ascii = build_index(&units, level, |field| ascii_field_kind(level, field));
        let by_id = units
            .iter()
            .enumerate()
            .map(|(idx, unit)| (unit.authoritative_id.clone(), idx))
            .collect();
        info!(
            "Boundary reference: {} {level} unit(s), {} collision group(s) corrected, {} unresolvable",
            units.len(),
            collisions.reverted.len(),
            collisions.unresolvable.len()
        );
        debug!(
            "Index sizes: exact={} ascii={}",
            exact.len(),
            ascii.len()
        );
        Ok(Self {
            level,
            units,
            by_id,
            collisions,
            exact,
            ascii,
        })
    }

    pub fn level(&self) -> AdminLevel {
        self.level
    }

    pub fn units(&self) -> &[ReferenceUnit] {
        &self.units
    }

    pub fn unit(&self, authoritative_id: &str) -> Option<&ReferenceUnit> {
        self.by_id.get(authoritative_id).map(|idx| &self.units[*idx])
    }

    pub fn collisions(&self) -> &CollisionReport {
        &self.collisions
    }

    pub fn lookup(&self, index: ReferenceIndex, key: &str) -> Option<&BTreeSet<String>> {
        match index {
            ReferenceIndex::Exact => self.exact.get(key),
            ReferenceIndex::Ascii => self.ascii.get(key),
        }
    }

    pub fn administrative_units(&self) -> Vec<AdministrativeUnit> {
        self.units.iter().map(ReferenceUnit::to_unit).collect()
    }
}

fn build_index(
    units: &[ReferenceUnit],
    level: AdminLevel,
    kind_for: impl Fn(AdminLevel) -> KeyKind,
) -> HashMap<String, BTreeSet<String>> {
    let mut index: HashMap<String, BTreeSet<String>> = HashMap::new();
    for unit in units {
        if let Some(key) = composite_key(&unit.keyed.keys, level, &kind_for) {
            index
                .entry(key)
                .or_default()
                .insert(unit.authoritative_id.clone());
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AdminNames;

    fn row(row: usize, city: &str, district: &str, dist_id: &str) -> RawRecord {
        RawRecord {
            row,
            names: AdminNames::new(city, district, ""),
            unit_ids: BTreeMap::from([(AdminLevel::District, dist_id.to_string())]),
            ..RawRecord::default()
        }
    }

    #[test]
    fn duplicate_ids_keep_first_row() {
        let records = vec![
            row(1, "Hà Nội", "Quận Ba Đình", "VNM.27.1_1"),
            row(2, "Hà Nội", "Ba Đình", "VNM.27.1_1"),
            row(3, "Hà Nội", "Quận 1", ""),
        ];
        let reference =
            BoundaryReference::build(&records, AdminLevel::District, &CorrectionTables::default())
                .expect("reference");
        assert_eq!(reference.units().len(), 1);
        assert_eq!(reference.units()[0].keyed.row(), 1);
        let unit = reference.unit("VNM.27.1_1").expect("unit").to_unit();
        assert_eq!(unit.display_name, "Ba Đình");
        assert_eq!(unit.parent_id.as_deref(), Some("HàNội"));
    }

    #[test]
    fn empty_reference_is_structural() {
        let records = vec![row(1, "Hà Nội", "", "VNM.27.1_1")];
        let err =
            BoundaryReference::build(&records, AdminLevel::District, &CorrectionTables::default())
                .expect_err("no units");
        assert!(matches!(err, ReconcileError::EmptyReference { level: AdminLevel::District }));
    }

    #[test]
    fn composite_key_rejects_empty_parts() {
        let mut keys = BTreeMap::new();
        keys.insert(AdminLevel::City, crate::normalize::normalize("Hà Nội", AdminLevel::City));
        keys.insert(AdminLevel::District, MatchKeySet::default());
        assert!(composite_key(&keys, AdminLevel::District, |_| KeyKind::Normalized).is_none());
        assert_eq!(
            composite_key(&keys, AdminLevel::City, |_| KeyKind::Ascii).as_deref(),
            Some("hanoi")
        );
    }
}
