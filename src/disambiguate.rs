//! Duplicate disambiguator.
//!
//! Two different units can normalize to the same key within one parent scope, most
//! often a city-level town and the rural district around it (`Thành phố Cao Lãnh`,
//! `Huyện Cao Lãnh`). Units in such a group get their compact display key (title
//! included) as normalized key. Records are reverted against the same groups so both
//! sides of the join agree.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use log::{debug, warn};
use serde::Serialize;

use crate::{
    keys::KeyedRecord,
    model::{AdminLevel, MatchKeySet},
    reference::ReferenceUnit,
};

type GroupKey = (Vec<String>, String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collision {
    pub level: AdminLevel,
    /// Normalized keys of the enclosing levels, top down.
    pub scope: Vec<String>,
    pub key: String,
    pub unit_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionStatus {
    Corrected,
    Unresolvable,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollisionReport {
    /// Groups found before reverting; their units were reverted.
    pub reverted: Vec<Collision>,
    /// Groups still sharing a key after reverting.
    pub unresolvable: Vec<Collision>,
}

impl CollisionReport {
    pub fn is_empty(&self) -> bool {
        self.reverted.is_empty() && self.unresolvable.is_empty()
    }

    /// Every group with its final status. A reverted group is unresolvable when two of
    /// its ids still share a key.
    pub fn entries(&self) -> Vec<(&Collision, CollisionStatus)> {
        let mut entries = Vec::new();
        for collision in &self.reverted {
            let status = if self.overlaps_unresolvable(collision) {
                CollisionStatus::Unresolvable
            } else {
                CollisionStatus::Corrected
            };
            entries.push((collision, status));
        }
        for residual in &self.unresolvable {
            if !self.reverted.iter().any(|c| shares_ids(c, residual)) {
                entries.push((residual, CollisionStatus::Unresolvable));
            }
        }
        entries
    }

    fn overlaps_unresolvable(&self, collision: &Collision) -> bool {
        self.unresolvable.iter().any(|c| shares_ids(c, collision))
    }
}

fn shares_ids(a: &Collision, b: &Collision) -> bool {
    a.level == b.level && a.unit_ids.iter().filter(|id| b.unit_ids.contains(id)).count() > 1
}

/// Groups by (parent scope, normalized key) and returns every group holding more than
/// one distinct id at `level`.
pub fn find_collisions(units: &[ReferenceUnit], level: AdminLevel) -> Vec<Collision> {
    let mut groups: BTreeMap<GroupKey, BTreeSet<String>> = BTreeMap::new();
    for unit in units {
        let key = &unit.key(level).normalized_key;
        if key.is_empty() {
            continue;
        }
        groups
            .entry((scope_of(&unit.keyed.keys, level), key.clone()))
            .or_default()
            .insert(unit.id_at(level));
    }
    groups
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|((scope, key), ids)| Collision {
            level,
            scope,
            key,
            unit_ids: ids.into_iter().collect(),
        })
        .collect()
}

/// Runs collision detection and reverting for every level through `target`, top down,
/// so lower levels are grouped under already-corrected parent keys.
pub fn disambiguate(
    mut units: Vec<ReferenceUnit>,
    target: AdminLevel,
) -> (Vec<ReferenceUnit>, CollisionReport) {
    let mut report = CollisionReport::default();
    for level in target.through() {
        let found = find_collisions(&units, level);
        if found.is_empty() {
            continue;
        }
        let groups = group_keys(&found);
        for unit in &mut units {
            revert_level(&mut unit.keyed.keys, level, &groups);
        }
        let remaining = find_collisions(&units, level);
        for collision in &found {
            debug!(
                "{level} collision on '{}' in [{}]: {}",
                collision.key,
                collision.scope.join(" / "),
                collision.unit_ids.join(", ")
            );
        }
        for collision in &remaining {
            warn!(
                "Unresolvable {level} collision on '{}': {}",
                collision.key,
                collision.unit_ids.join(", ")
            );
        }
        report.reverted.extend(found);
        report.unresolvable.extend(remaining);
    }
    (units, report)
}

/// Reverts record keys that fall into a reverted collision group.
pub fn revert(records: Vec<KeyedRecord>, report: &CollisionReport) -> Vec<KeyedRecord> {
    if report.reverted.is_empty() {
        return records;
    }
    let mut by_level: HashMap<AdminLevel, Vec<Collision>> = HashMap::new();
    for collision in &report.reverted {
        by_level
            .entry(collision.level)
            .or_default()
            .push(collision.clone());
    }
    let groups: Vec<(AdminLevel, HashSet<GroupKey>)> = AdminLevel::all()
        .iter()
        .filter_map(|level| by_level.get(level).map(|found| (*level, group_keys(found))))
        .collect();

    records
        .into_iter()
        .map(|mut record| {
            for (level, keys) in &groups {
                revert_level(&mut record.keys, *level, keys);
            }
            record
        })
        .collect()
}

fn group_keys(collisions: &[Collision]) -> HashSet<GroupKey> {
    collisions
        .iter()
        .map(|c| (c.scope.clone(), c.key.clone()))
        .collect()
}

fn revert_level(
    keys: &mut BTreeMap<AdminLevel, MatchKeySet>,
    level: AdminLevel,
    groups: &HashSet<GroupKey>,
) {
    let Some(current) = keys.get(&level) else {
        return;
    };
    let group = (scope_of(keys, level), current.normalized_key.clone());
    if groups.contains(&group)
        && let Some(set) = keys.get_mut(&level)
    {
        set.normalized_key = set.compact_display();
    }
}

fn scope_of(keys: &BTreeMap<AdminLevel, MatchKeySet>, level: AdminLevel) -> Vec<String> {
    level
        .ancestors()
        .map(|ancestor| {
            keys.get(&ancestor)
                .map(|set| set.normalized_key.clone())
                .unwrap_or_default()
        })
        .collect()
}
