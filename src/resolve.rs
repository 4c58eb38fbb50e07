use std::{collections::BTreeMap, fmt};

use itertools::Itertools;
use serde::Serialize;

use crate::{
    error::RowIssue,
    keys::KeyedRecord,
    model::{AdminLevel, MatchKeySet},
    reference::{BoundaryReference, KeyKind, ReferenceIndex, ascii_field_kind, composite_key},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// Normalized keys at every level.
    Exact,
    /// Compact display key for the target level only.
    LeafDisplay,
    /// Compact display keys below the city.
    FullDisplay,
    /// Ascii keys below the city.
    Ascii,
}

impl MatchTier {
    pub fn for_level(level: AdminLevel) -> &'static [MatchTier] {
        match level {
            AdminLevel::Ward => &[
                MatchTier::Exact,
                MatchTier::LeafDisplay,
                MatchTier::FullDisplay,
                MatchTier::Ascii,
            ],
            AdminLevel::City | AdminLevel::District => {
                &[MatchTier::Exact, MatchTier::FullDisplay, MatchTier::Ascii]
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MatchTier::Exact => "exact",
            MatchTier::LeafDisplay => "leaf_display",
            MatchTier::FullDisplay => "full_display",
            MatchTier::Ascii => "ascii",
        }
    }

    /// Record-side key form used for `field` when resolving at `target`.
    pub fn key_kind(self, target: AdminLevel, field: AdminLevel) -> KeyKind {
        let display_scope = field != AdminLevel::City || target == AdminLevel::City;
        match self {
            MatchTier::Exact => KeyKind::Normalized,
            MatchTier::LeafDisplay if field == target => KeyKind::CompactDisplay,
            MatchTier::LeafDisplay => KeyKind::Normalized,
            MatchTier::FullDisplay if display_scope => KeyKind::CompactDisplay,
            MatchTier::FullDisplay => KeyKind::Normalized,
            MatchTier::Ascii => ascii_field_kind(target, field),
        }
    }

    pub fn reference_index(self) -> ReferenceIndex {
        match self {
            MatchTier::Ascii => ReferenceIndex::Ascii,
            _ => ReferenceIndex::Exact,
        }
    }

    pub fn record_key(
        self,
        keys: &BTreeMap<AdminLevel, MatchKeySet>,
        target: AdminLevel,
    ) -> Option<String> {
        composite_key(keys, target, |field| self.key_kind(target, field))
    }
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOutcome {
    Hit(String),
    Miss,
    /// A key this tier needs is empty.
    Skipped,
    Ambiguous(Vec<String>),
}

impl fmt::Display for TierOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TierOutcome::Hit(id) => write!(f, "hit({id})"),
            TierOutcome::Miss => f.write_str("miss"),
            TierOutcome::Skipped => f.write_str("skipped"),
            TierOutcome::Ambiguous(ids) => write!(f, "ambiguous({})", ids.join("|")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierAttempt {
    pub tier: MatchTier,
    pub outcome: TierOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub record: KeyedRecord,
    pub authoritative_id: Option<String>,
    pub tier: Option<MatchTier>,
    pub attempts: Vec<TierAttempt>,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        self.authoritative_id.is_some()
    }

    pub fn ambiguities(&self) -> impl Iterator<Item = (MatchTier, &[String])> {
        self.attempts.iter().filter_map(|attempt| match &attempt.outcome {
            TierOutcome::Ambiguous(ids) => Some((attempt.tier, ids.as_slice())),
            _ => None,
        })
    }

    /// Why the record has no id; `None` when it resolved.
    pub fn unresolved_reason(&self) -> Option<String> {
        if self.is_resolved() {
            return None;
        }
        if !self.record.malformed.is_empty() {
            return Some(format!("empty {} name", self.record.malformed.iter().join("/")));
        }
        if self.ambiguities().next().is_some() {
            return Some("ambiguous match".to_string());
        }
        Some("no match at any tier".to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolveSummary {
    pub level: Option<AdminLevel>,
    pub total: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub malformed: usize,
    pub ambiguous_attempts: usize,
    pub hits_per_tier: BTreeMap<MatchTier, usize>,
}

#[derive(Debug, Clone)]
pub struct ResolveOutput {
    pub level: AdminLevel,
    pub rows: Vec<Resolution>,
    pub summary: ResolveSummary,
}

impl ResolveOutput {
    pub fn unresolved(&self) -> impl Iterator<Item = &Resolution> {
        self.rows.iter().filter(|row| !row.is_resolved())
    }

    /// Every per-row problem, in row order.
    pub fn issues(&self) -> Vec<RowIssue> {
        let mut issues = Vec::new();
        for resolution in &self.rows {
            let row = resolution.record.row();
            for level in &resolution.record.malformed {
                issues.push(RowIssue::MalformedInput { row, level: *level });
            }
            for (tier, ids) in resolution.ambiguities() {
                issues.push(RowIssue::Ambiguous {
                    row,
                    tier,
                    candidates: ids.to_vec(),
                });
            }
            if !resolution.is_resolved() {
                issues.push(RowIssue::Unresolved { row });
            }
        }
        issues
    }
}

/// Resolves every record against `reference` at the reference's level.
pub fn resolve(records: Vec<KeyedRecord>, reference: &BoundaryReference) -> ResolveOutput {
    let level = reference.level();
    let rows: Vec<Resolution> = records
        .into_iter()
        .map(|record| resolve_record(record, reference))
        .collect();

    let mut summary = ResolveSummary {
        level: Some(level),
        total: rows.len(),
        ..ResolveSummary::default()
    };
    for resolution in &rows {
        match resolution.tier {
            Some(tier) => {
                summary.resolved += 1;
                *summary.hits_per_tier.entry(tier).or_default() += 1;
            }
            None => summary.unresolved += 1,
        }
        if !resolution.record.malformed.is_empty() {
            summary.malformed += 1;
        }
        summary.ambiguous_attempts += resolution.ambiguities().count();
    }
    ResolveOutput {
        level,
        rows,
        summary,
    }
}

pub fn resolve_record(record: KeyedRecord, reference: &BoundaryReference) -> Resolution {
    let level = reference.level();
    let mut attempts = Vec::new();
    for tier in MatchTier::for_level(level) {
        let outcome = match tier.record_key(&record.keys, level) {
            None => TierOutcome::Skipped,
            Some(key) => match reference.lookup(tier.reference_index(), &key) {
                None => TierOutcome::Miss,
                Some(ids) if ids.len() == 1 => match ids.first() {
                    Some(id) => TierOutcome::Hit(id.clone()),
                    None => TierOutcome::Miss,
                },
                Some(ids) => TierOutcome::Ambiguous(ids.iter().cloned().collect()),
            },
        };
        let hit = match &outcome {
            TierOutcome::Hit(id) => Some(id.clone()),
            _ => None,
        };
        attempts.push(TierAttempt {
            tier: *tier,
            outcome,
        });
        if let Some(id) = hit {
            return Resolution {
                record,
                authoritative_id: Some(id),
                tier: Some(*tier),
                attempts,
            };
        }
    }
    Resolution {
        record,
        authoritative_id: None,
        tier: None,
        attempts,
    }
}
