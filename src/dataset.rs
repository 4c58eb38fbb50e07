use std::path::Path;

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::{debug, warn};

use crate::{
    config::ColumnRoles,
    error::ReconcileError,
    io_utils,
    model::{AdminLevel, AdminNames, RawRecord},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn read(path: &Path, delimiter: Option<u8>, encoding: &'static Encoding) -> Result<Self> {
        let delimiter = io_utils::resolve_input_delimiter(path, delimiter);
        let text = io_utils::read_text(path, encoding)?;
        let table = Self::parse(&text, delimiter).with_context(|| format!("Reading {path:?}"))?;
        debug!(
            "Loaded {} row(s) x {} column(s) from {path:?} (delimiter '{}')",
            table.rows.len(),
            table.headers.len(),
            io_utils::printable_delimiter(delimiter)
        );
        Ok(table)
    }

    pub fn parse(text: &str, delimiter: u8) -> Result<Self> {
        let mut reader = io_utils::csv_reader(text, delimiter);
        let headers: Vec<String> = reader
            .headers()
            .context("Reading header row")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let rows = reader
            .records()
            .enumerate()
            .map(|(idx, record)| {
                record
                    .map(|r| r.iter().map(str::to_string).collect())
                    .with_context(|| format!("Reading row {}", idx + 2))
            })
            .collect::<Result<Vec<Vec<String>>>>()?;
        let ragged = rows.iter().filter(|row| row.len() != headers.len()).count();
        if ragged > 0 {
            warn!(
                "{ragged} row(s) do not have {} cell(s); missing cells read as empty",
                headers.len()
            );
        }
        Ok(Self { headers, rows })
    }

    pub fn to_csv_string(&self, delimiter: u8) -> Result<String> {
        let mut writer = io_utils::csv_writer(delimiter);
        writer
            .write_record(&self.headers)
            .context("Writing header row")?;
        for row in &self.rows {
            writer.write_record(row).context("Writing row")?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| anyhow::anyhow!("Flushing CSV buffer: {}", err.error()))?;
        String::from_utf8(bytes).context("CSV output is not UTF-8")
    }

    pub fn write(
        &self,
        path: Option<&Path>,
        delimiter: u8,
        encoding: &'static Encoding,
    ) -> Result<()> {
        let text = self.to_csv_string(delimiter)?;
        io_utils::write_text(path, &text, encoding)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn require_column(&self, table: &str, name: &str) -> Result<usize, ReconcileError> {
        self.column_index(name)
            .ok_or_else(|| ReconcileError::MissingColumn {
                table: table.to_string(),
                column: name.to_string(),
            })
    }

    /// Cell value, empty for short rows.
    pub fn value<'a>(&'a self, row: &'a [String], column: usize) -> &'a str {
        row.get(column).map(String::as_str).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Turns every row of `table` into a [`RawRecord`] carrying names down to `level`.
///
/// Name columns for every level through `level` are required. With `require_ids`
/// the district and ward id columns down to `level` are required too (boundary
/// tables); otherwise any configured id column that exists is kept as a hint.
pub fn extract_records(
    table: &Table,
    roles: &ColumnRoles,
    level: AdminLevel,
    require_ids: bool,
    table_name: &str,
) -> Result<Vec<RawRecord>, ReconcileError> {
    let mut name_columns = Vec::new();
    for current in level.through() {
        let index = table.require_column(table_name, roles.name_column(current))?;
        name_columns.push((current, index));
    }

    let mut id_columns = Vec::new();
    for current in level.through() {
        let Some(column) = roles.id_column(current) else {
            continue;
        };
        match table.column_index(column) {
            Some(index) => id_columns.push((current, index)),
            None if require_ids && current != AdminLevel::City => {
                return Err(ReconcileError::MissingColumn {
                    table: table_name.to_string(),
                    column: column.to_string(),
                });
            }
            None => {}
        }
    }

    let store_column = roles
        .store_id
        .as_deref()
        .and_then(|column| table.column_index(column));

    Ok(table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let mut names = AdminNames::default();
            for (current, index) in &name_columns {
                names.set(*current, table.value(row, *index));
            }
            let unit_ids = id_columns
                .iter()
                .filter_map(|(current, index)| {
                    let id = table.value(row, *index).trim();
                    (!id.is_empty()).then(|| (*current, id.to_string()))
                })
                .collect();
            let store_id = store_column
                .map(|index| table.value(row, index).trim().to_string())
                .filter(|id| !id.is_empty());
            RawRecord {
                row: idx + 1,
                names,
                store_id,
                unit_ids,
                fields: row.clone(),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn population() -> Table {
        Table::parse(
            "city,district,ward,people\nHà Nội,Q.1,Phường 5,1200\nHà Nội,Quận 3,,800\n",
            b',',
        )
        .expect("parse")
    }

    #[test]
    fn extract_reads_names_by_column_name() {
        let table = population();
        let records =
            extract_records(&table, &ColumnRoles::default(), AdminLevel::Ward, false, "records")
                .expect("records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].names.district, "Q.1");
        assert_eq!(records[1].names.ward, "");
        assert_eq!(records[1].row, 2);
        assert!(records[0].store_id.is_none());
        assert_eq!(records[0].fields[3], "1200");
    }

    #[test]
    fn missing_name_column_is_structural() {
        let table = Table::parse("city,ward\nHà Nội,Phường 5\n", b',').expect("parse");
        let err = extract_records(&table, &ColumnRoles::default(), AdminLevel::Ward, false, "records")
            .expect_err("district column missing");
        assert!(matches!(err, ReconcileError::MissingColumn { ref column, .. } if column == "district"));
    }

    #[test]
    fn short_rows_read_as_empty_cells() {
        let table = Table::parse(
            "city,district,ward,population\nHà Nội,Q.1,Phường 5,10\nHà Nội,Q.1\n",
            b',',
        )
        .expect("ragged rows parse");
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1].len(), 2);
        assert_eq!(table.value(&table.rows[1], 2), "");
        let records =
            extract_records(&table, &ColumnRoles::default(), AdminLevel::Ward, false, "records")
                .expect("records");
        assert_eq!(records[1].names.district, "Q.1");
        assert_eq!(records[1].names.ward, "");
    }

    #[test]
    fn boundary_tables_require_id_columns() {
        let table = population();
        let err = extract_records(&table, &ColumnRoles::default(), AdminLevel::District, true, "boundary")
            .expect_err("dist_id missing");
        assert!(err.to_string().contains("dist_id"));
    }
}
