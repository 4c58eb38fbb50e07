use std::collections::BTreeMap;

use log::{debug, warn};

use crate::{
    corrections::{CorrectionTables, Source, StoreOverride},
    model::{AdminLevel, AdminNames, MatchKeySet, RawRecord},
    normalize::normalize,
};

static EMPTY_KEYS: MatchKeySet = MatchKeySet {
    normalized_key: String::new(),
    ascii_key: String::new(),
    display_key: String::new(),
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedRecord {
    pub record: RawRecord,
    /// Names after correction, before normalization.
    pub corrected: AdminNames,
    pub keys: BTreeMap<AdminLevel, MatchKeySet>,
    /// Levels whose name was empty (or normalized to nothing).
    pub malformed: Vec<AdminLevel>,
    /// Set when a store override was applied to this row.
    pub store_override: bool,
}

impl KeyedRecord {
    pub fn key(&self, level: AdminLevel) -> &MatchKeySet {
        self.keys.get(&level).unwrap_or(&EMPTY_KEYS)
    }

    pub fn original(&self, level: AdminLevel) -> &str {
        self.record.names.get(level)
    }

    pub fn row(&self) -> usize {
        self.record.row
    }
}

pub fn build_keys(
    records: &[RawRecord],
    level: AdminLevel,
    tables: &CorrectionTables,
    source: Source,
) -> Vec<KeyedRecord> {
    records
        .iter()
        .map(|record| build_record_keys(record.clone(), level, tables, source))
        .collect()
}

pub fn build_record_keys(
    record: RawRecord,
    level: AdminLevel,
    tables: &CorrectionTables,
    source: Source,
) -> KeyedRecord {
    let names = tables.names_for(source);
    let mut corrected = AdminNames::default();
    for current in level.through() {
        let raw = record.names.get(current);
        let fixed = match names {
            Some(table) => table.correct(current, raw, record.unit_id(current)),
            None => raw.into(),
        };
        corrected.set(current, fixed.into_owned());
    }

    let store_override = source == Source::Store
        && record
            .store_id
            .as_deref()
            .and_then(|id| tables.store_override(id).map(|entry| (id, entry)))
            .is_some_and(|(id, entry)| apply_store_override(id, entry, level, &mut corrected));

    let mut keys = BTreeMap::new();
    let mut malformed = Vec::new();
    for current in level.through() {
        let set = normalize(corrected.get(current), current);
        if set.is_empty() {
            malformed.push(current);
        }
        keys.insert(current, set);
    }

    KeyedRecord {
        record,
        corrected,
        keys,
        malformed,
        store_override,
    }
}

// Applies `entry` unless its `was` spelling no longer describes the store.
fn apply_store_override(
    store_id: &str,
    entry: &StoreOverride,
    level: AdminLevel,
    names: &mut AdminNames,
) -> bool {
    if let Some(guarded) = entry.guarded_level()
        && guarded > level
    {
        debug!("Store {store_id}: {guarded} override does not apply at {level} level");
        return false;
    }
    if let (Some(was), Some(guarded)) = (entry.was.as_deref(), entry.guarded_level()) {
        let current = normalize(names.get(guarded), guarded);
        let expected = normalize(was, guarded);
        if current.normalized_key != expected.normalized_key {
            warn!(
                "Store {store_id}: {guarded} override skipped; current name '{}' is not '{was}'",
                names.get(guarded)
            );
            return false;
        }
    }
    let mut applied = false;
    for current in level.through() {
        if let Some(name) = entry.name(current) {
            names.set(current, name);
            applied = true;
        }
    }
    applied
}
