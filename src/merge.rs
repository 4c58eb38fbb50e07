use std::collections::{HashMap, HashSet};

use clap::ValueEnum;
use log::{debug, info};

use crate::{dataset::Table, error::ReconcileError, reference::KEY_SEPARATOR};

pub const STORE_COUNT_COLUMN: &str = "store_count";
pub const PEOPLE_PER_STORE_COLUMN: &str = "people_per_store";
pub const DENSITY_COLUMN: &str = "density_per_km2";

const SQUARE_METRES_PER_KM2: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

/// Joins `right` onto `left` where every key column pair is equal.
///
/// Rows with an empty key cell never match. Right-hand key columns are dropped; other
/// right-hand columns whose name is taken get `right_<name>_<n>`.
pub fn join_tables(
    left: &Table,
    right: &Table,
    left_keys: &[String],
    right_keys: &[String],
    kind: JoinKind,
) -> Result<Table, ReconcileError> {
    let left_indices = key_indices(left, left_keys, "left")?;
    let right_indices = key_indices(right, right_keys, "right")?;

    let mut lookup: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, row) in right.rows.iter().enumerate() {
        if let Some(key) = row_key(right, row, &right_indices) {
            lookup.entry(key).or_default().push(idx);
        }
    }
    let (headers, right_columns) = output_headers(&left.headers, &right.headers, &right_indices);

    let mut rows = Vec::new();
    let mut matched_right = vec![false; right.rows.len()];
    let mut matched_rows = 0usize;
    let keep_left = matches!(kind, JoinKind::Left | JoinKind::Full);
    let keep_right = matches!(kind, JoinKind::Right | JoinKind::Full);

    for row in &left.rows {
        let mut left_part = row.clone();
        left_part.resize(left.headers.len(), String::new());
        let bucket = row_key(left, row, &left_indices).and_then(|key| lookup.get(&key));
        match bucket {
            Some(bucket) => {
                for right_idx in bucket {
                    matched_right[*right_idx] = true;
                    matched_rows += 1;
                    let right_row = &right.rows[*right_idx];
                    let mut combined = left_part.clone();
                    combined.extend(right_columns.iter().map(|idx| right.value(right_row, *idx).to_string()));
                    rows.push(combined);
                }
            }
            None if keep_left => {
                let mut combined = left_part;
                combined.extend(right_columns.iter().map(|_| String::new()));
                rows.push(combined);
            }
            None => {}
        }
    }

    if keep_right {
        for (idx, right_row) in right.rows.iter().enumerate() {
            if matched_right[idx] {
                continue;
            }
            let mut left_part = vec![String::new(); left.headers.len()];
            for (left_idx, right_idx) in left_indices.iter().zip(&right_indices) {
                left_part[*left_idx] = right.value(right_row, *right_idx).to_string();
            }
            left_part.extend(right_columns.iter().map(|col| right.value(right_row, *col).to_string()));
            rows.push(left_part);
        }
    }

    info!(
        "Merge complete: {} output row(s), {} matched row(s)",
        rows.len(),
        matched_rows
    );
    Ok(Table::new(headers, rows))
}

/// Appends store counts per id to `population`, with people per store and, when an
/// area column (square metres) is named, people per square kilometre.
pub fn store_coverage(
    population: &Table,
    stores: &Table,
    population_key: &str,
    store_key: &str,
    population_column: &str,
    area_column: Option<&str>,
) -> Result<Table, ReconcileError> {
    let key_idx = population.require_column("population", population_key)?;
    let people_idx = population.require_column("population", population_column)?;
    let area_idx = area_column
        .map(|column| population.require_column("population", column))
        .transpose()?;
    let store_idx = stores.require_column("stores", store_key)?;

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for row in &stores.rows {
        let key = stores.value(row, store_idx).trim();
        if !key.is_empty() {
            *counts.entry(key).or_default() += 1;
        }
    }
    debug!("{} store(s) across {} unit(s)", stores.len(), counts.len());

    let mut headers = population.headers.clone();
    headers.push(STORE_COUNT_COLUMN.to_string());
    headers.push(PEOPLE_PER_STORE_COLUMN.to_string());
    if area_idx.is_some() {
        headers.push(DENSITY_COLUMN.to_string());
    }

    let rows = population
        .rows
        .iter()
        .map(|row| {
            let mut out = row.clone();
            out.resize(population.headers.len(), String::new());
            let count = counts
                .get(population.value(row, key_idx).trim())
                .copied()
                .unwrap_or(0);
            let people = parse_number(population.value(row, people_idx));
            out.push(count.to_string());
            out.push(match people {
                Some(people) if count > 0 => format_ratio(people / count as f64),
                _ => String::new(),
            });
            if let Some(area_idx) = area_idx {
                let area = parse_number(population.value(row, area_idx));
                out.push(match (people, area) {
                    (Some(people), Some(area)) if area > 0.0 => {
                        format_ratio(people / (area / SQUARE_METRES_PER_KM2))
                    }
                    _ => String::new(),
                });
            }
            out
        })
        .collect();
    Ok(Table::new(headers, rows))
}

fn key_indices(table: &Table, keys: &[String], side: &str) -> Result<Vec<usize>, ReconcileError> {
    keys.iter()
        .map(|name| table.require_column(side, name))
        .collect()
}

fn row_key(table: &Table, row: &[String], indices: &[usize]) -> Option<String> {
    let mut parts = Vec::with_capacity(indices.len());
    for idx in indices {
        let value = table.value(row, *idx).trim();
        if value.is_empty() {
            return None;
        }
        parts.push(value);
    }
    Some(parts.join(KEY_SEPARATOR))
}

fn output_headers(
    left_headers: &[String],
    right_headers: &[String],
    right_key_indices: &[usize],
) -> (Vec<String>, Vec<usize>) {
    let mut headers = left_headers.to_vec();
    let mut seen: HashSet<String> = headers.iter().cloned().collect();
    let mut right_columns = Vec::new();
    for (idx, name) in right_headers.iter().enumerate() {
        if right_key_indices.contains(&idx) {
            continue;
        }
        let mut candidate = name.clone();
        let mut counter = 1usize;
        while seen.contains(&candidate) {
            candidate = format!("right_{name}_{counter}");
            counter += 1;
        }
        seen.insert(candidate.clone());
        headers.push(candidate);
        right_columns.push(idx);
    }
    (headers, right_columns)
}

// Census sheets write thousands with spaces or commas.
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != ',')
        .collect();
    cleaned.parse().ok()
}

fn format_ratio(value: f64) -> String {
    format!("{value:.2}")
}
