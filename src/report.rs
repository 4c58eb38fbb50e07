use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use log::{info, warn};
use serde::Serialize;

use crate::{
    corrections::Source,
    dataset::Table,
    disambiguate::{CollisionReport, CollisionStatus},
    keys::KeyedRecord,
    model::{AdminLevel, AdministrativeUnit},
    resolve::{MatchTier, ResolveOutput, ResolveSummary},
};

pub const MATCH_TIER_COLUMN: &str = "match_tier";

fn key_headers(level: AdminLevel) -> Vec<String> {
    level
        .through()
        .flat_map(|field| {
            let name = field.field_name();
            [format!("{name}_key"), format!("{name}_en"), format!("{name}_org")]
        })
        .collect()
}

fn key_cells(record: &KeyedRecord, level: AdminLevel) -> Vec<String> {
    level
        .through()
        .flat_map(|field| {
            let keys = record.key(field);
            [
                keys.normalized_key.clone(),
                keys.ascii_key.clone(),
                keys.display_key.clone(),
            ]
        })
        .collect()
}

/// Input columns followed by the three keys of every level through `level`.
pub fn keyed_table(input: &Table, records: &[KeyedRecord], level: AdminLevel) -> Table {
    let mut headers = input.headers.clone();
    headers.extend(key_headers(level));
    let rows = records
        .iter()
        .map(|record| {
            let mut row = record.record.fields.clone();
            row.resize(input.headers.len(), String::new());
            row.extend(key_cells(record, level));
            row
        })
        .collect();
    Table::new(headers, rows)
}

/// Every input row, resolved or not: id column first, then the input columns, the
/// keys and the winning tier.
pub fn resolved_table(input: &Table, output: &ResolveOutput, id_column: &str) -> Table {
    let id_header = if input.column_index(id_column).is_some() {
        format!("resolved_{id_column}")
    } else {
        id_column.to_string()
    };
    let mut headers = vec![id_header];
    headers.extend(input.headers.iter().cloned());
    headers.extend(key_headers(output.level));
    headers.push(MATCH_TIER_COLUMN.to_string());

    let rows = output
        .rows
        .iter()
        .map(|resolution| {
            let mut row = vec![resolution.authoritative_id.clone().unwrap_or_default()];
            let mut fields = resolution.record.record.fields.clone();
            fields.resize(input.headers.len(), String::new());
            row.extend(fields);
            row.extend(key_cells(&resolution.record, output.level));
            row.push(
                resolution
                    .tier
                    .map(|tier| tier.name().to_string())
                    .unwrap_or_default(),
            );
            row
        })
        .collect();
    Table::new(headers, rows)
}

/// Rows that failed every tier, with raw and corrected names and each tier's outcome.
pub fn unresolved_table(output: &ResolveOutput) -> Table {
    let level = output.level;
    let tiers = MatchTier::for_level(level);
    let mut headers = vec!["row".to_string()];
    headers.extend(level.through().map(|field| field.field_name().to_string()));
    headers.extend(level.through().map(|field| format!("corrected_{field}")));
    headers.extend(tiers.iter().map(|tier| format!("tier_{tier}")));
    headers.push("reason".to_string());

    let rows = output
        .unresolved()
        .map(|resolution| {
            let record = &resolution.record;
            let mut row = vec![record.row().to_string()];
            row.extend(level.through().map(|field| record.original(field).to_string()));
            row.extend(level.through().map(|field| record.corrected.get(field).to_string()));
            for tier in tiers {
                let outcome = resolution
                    .attempts
                    .iter()
                    .find(|attempt| attempt.tier == *tier)
                    .map(|attempt| attempt.outcome.to_string())
                    .unwrap_or_default();
                row.push(outcome);
            }
            row.push(resolution.unresolved_reason().unwrap_or_default());
            row
        })
        .collect();
    Table::new(headers, rows)
}

pub fn collision_table(report: &CollisionReport) -> Table {
    let headers = ["level", "scope", "key", "unit_ids", "status"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows = report
        .entries()
        .into_iter()
        .map(|(collision, status)| {
            vec![
                collision.level.to_string(),
                collision.scope.join(" / "),
                collision.key.clone(),
                collision.unit_ids.join("|"),
                match status {
                    CollisionStatus::Corrected => "corrected",
                    CollisionStatus::Unresolvable => "unresolvable",
                }
                .to_string(),
            ]
        })
        .collect();
    Table::new(headers, rows)
}

pub fn units_table(units: &[AdministrativeUnit]) -> Table {
    let headers = [
        "level",
        "authoritative_id",
        "display_name",
        "normalized_key",
        "ascii_key",
        "parent_id",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect();
    let rows = units
        .iter()
        .map(|unit| {
            vec![
                unit.level.to_string(),
                unit.authoritative_id.clone(),
                unit.display_name.clone(),
                unit.normalized_key.clone(),
                unit.ascii_key.clone(),
                unit.parent_id.clone().unwrap_or_default(),
            ]
        })
        .collect();
    Table::new(headers, rows)
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub source: Source,
    pub boundary_units: usize,
    pub corrections_digest: String,
    pub collisions_corrected: usize,
    pub collisions_unresolvable: usize,
    pub issues: usize,
    #[serde(flatten)]
    pub resolve: ResolveSummary,
}

impl RunSummary {
    pub fn new(
        source: Source,
        boundary_units: usize,
        collisions: &CollisionReport,
        corrections_digest: String,
        output: &ResolveOutput,
    ) -> Self {
        let statuses = collisions.entries();
        Self {
            generated_at: Utc::now(),
            source,
            boundary_units,
            corrections_digest,
            collisions_corrected: statuses
                .iter()
                .filter(|(_, status)| *status == CollisionStatus::Corrected)
                .count(),
            collisions_unresolvable: statuses
                .iter()
                .filter(|(_, status)| *status == CollisionStatus::Unresolvable)
                .count(),
            issues: output.issues().len(),
            resolve: output.summary.clone(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("Creating summary file {path:?}"))?;
        serde_json::to_writer_pretty(file, self).context("Writing summary JSON")
    }
}

pub fn log_summary(summary: &ResolveSummary) {
    let tiers = summary
        .hits_per_tier
        .iter()
        .map(|(tier, hits)| format!("{tier}={hits}"))
        .join(", ");
    info!(
        "Resolved {} of {} record(s) [{}]",
        summary.resolved,
        summary.total,
        if tiers.is_empty() { "none" } else { tiers.as_str() }
    );
    if summary.unresolved > 0 {
        warn!(
            "{} record(s) unresolved ({} with empty names, {} ambiguous tier outcome(s))",
            summary.unresolved, summary.malformed, summary.ambiguous_attempts
        );
    }
}
