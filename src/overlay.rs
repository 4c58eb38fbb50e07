use std::{collections::HashMap, sync::OnceLock};

use log::{info, warn};
use regex::Regex;

use crate::{
    config::ColumnRoles,
    dataset::Table,
    error::ReconcileError,
    model::AdminLevel,
    normalize::normalize,
};

/// Overlay columns holding the English district and ward names.
#[derive(Debug, Clone)]
pub struct OverlayColumns {
    pub district: String,
    pub ward: String,
    /// Overlay columns left out of the result (source-specific ids).
    pub exclude: Vec<String>,
}

fn english_titles() -> &'static [(Regex, &'static str)] {
    static TITLES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    TITLES.get_or_init(|| {
        [(r"(?i)\bdistrict\b", "Quận"), (r"(?i)\bward\b", "Phường")]
            .into_iter()
            .filter_map(|(pattern, title)| Regex::new(pattern).ok().map(|re| (re, title)))
            .collect()
    })
}

/// Ascii key for an English administrative name, comparable with the ascii key of the
/// Vietnamese spelling (`Ward 05` and `Phường 5` both give `phuong5`).
pub fn english_key(name: &str, level: AdminLevel) -> String {
    let mut translated = name.to_string();
    for (pattern, title) in english_titles() {
        translated = pattern.replace_all(&translated, *title).into_owned();
    }
    normalize(&translated, level).ascii_key
}

pub fn apply_overlay(
    boundary: &Table,
    overlay: &Table,
    roles: &ColumnRoles,
    city: &str,
    columns: &OverlayColumns,
) -> Result<Table, ReconcileError> {
    let city_idx = boundary.require_column("boundary", &roles.city)?;
    let district_idx = boundary.require_column("boundary", &roles.district)?;
    let ward_idx = boundary.require_column("boundary", &roles.ward)?;
    let overlay_district = overlay.require_column("overlay", &columns.district)?;
    let overlay_ward = overlay.require_column("overlay", &columns.ward)?;

    // Payload columns: overwrite a boundary column of the same name, or append.
    let mut headers = boundary.headers.clone();
    let mut payload = Vec::new();
    for (idx, name) in overlay.headers.iter().enumerate() {
        if idx == overlay_district || idx == overlay_ward || columns.exclude.contains(name) {
            continue;
        }
        let target = match boundary.column_index(name) {
            Some(existing) => existing,
            None => {
                headers.push(name.clone());
                headers.len() - 1
            }
        };
        payload.push((idx, target));
    }

    let mut lookup: HashMap<(String, String), Vec<usize>> = HashMap::new();
    for (idx, row) in overlay.rows.iter().enumerate() {
        let key = (
            english_key(overlay.value(row, overlay_district), AdminLevel::District),
            english_key(overlay.value(row, overlay_ward), AdminLevel::Ward),
        );
        lookup.entry(key).or_default().push(idx);
    }

    let city_key = normalize(city, AdminLevel::City).normalized_key;
    let mut rows = Vec::with_capacity(boundary.len());
    let mut replaced = 0usize;
    let mut dropped = 0usize;
    for row in &boundary.rows {
        let mut base = row.clone();
        base.resize(headers.len(), String::new());
        if normalize(boundary.value(row, city_idx), AdminLevel::City).normalized_key != city_key {
            rows.push(base);
            continue;
        }
        let key = (
            normalize(boundary.value(row, district_idx), AdminLevel::District).ascii_key,
            normalize(boundary.value(row, ward_idx), AdminLevel::Ward).ascii_key,
        );
        match lookup.get(&key) {
            Some(matches) => {
                for overlay_idx in matches {
                    let overlay_row = &overlay.rows[*overlay_idx];
                    let mut combined = base.clone();
                    for (source, target) in &payload {
                        combined[*target] = overlay.value(overlay_row, *source).to_string();
                    }
                    rows.push(combined);
                    replaced += 1;
                }
            }
            None => {
                dropped += 1;
                warn!(
                    "No overlay row for {} / {}; boundary row dropped",
                    boundary.value(row, district_idx),
                    boundary.value(row, ward_idx)
                );
            }
        }
    }
    info!("Overlay for {city}: {replaced} row(s) replaced, {dropped} dropped");
    Ok(Table::new(headers, rows))
}
