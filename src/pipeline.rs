use log::info;

use crate::{
    config::PipelineConfig,
    corrections::{CorrectionTables, Source},
    dataset::{Table, extract_records},
    disambiguate::revert,
    error::ReconcileError,
    keys::{KeyedRecord, build_keys},
    model::AdminLevel,
    reference::BoundaryReference,
    resolve::{ResolveOutput, resolve},
};

pub const BOUNDARY_TABLE: &str = "boundary";
pub const RECORDS_TABLE: &str = "records";

pub fn build_reference(
    boundary: &Table,
    level: AdminLevel,
    config: &PipelineConfig,
    tables: &CorrectionTables,
) -> Result<BoundaryReference, ReconcileError> {
    let records = extract_records(boundary, &config.boundary, level, true, BOUNDARY_TABLE)?;
    info!("Building {level} reference from {} boundary row(s)", records.len());
    BoundaryReference::build(&records, level, tables)
}

/// Keys for every row of `table`, without reverting or resolving.
pub fn key_table(
    table: &Table,
    level: AdminLevel,
    source: Source,
    config: &PipelineConfig,
    tables: &CorrectionTables,
) -> Result<Vec<KeyedRecord>, ReconcileError> {
    let roles = match source {
        Source::Boundary => &config.boundary,
        Source::Census | Source::Store => &config.records,
    };
    let table_name = match source {
        Source::Boundary => BOUNDARY_TABLE,
        Source::Census | Source::Store => RECORDS_TABLE,
    };
    let records = extract_records(table, roles, level, false, table_name)?;
    Ok(build_keys(&records, level, tables, source))
}

pub fn resolve_table(
    table: &Table,
    reference: &BoundaryReference,
    source: Source,
    config: &PipelineConfig,
    tables: &CorrectionTables,
) -> Result<ResolveOutput, ReconcileError> {
    let level = reference.level();
    let records = extract_records(table, &config.records, level, false, RECORDS_TABLE)?;
    let keyed = revert(build_keys(&records, level, tables, source), reference.collisions());
    let output = resolve(keyed, reference);
    info!(
        "Resolved {}/{} {source:?} row(s) at {level} level",
        output.summary.resolved, output.summary.total
    );
    Ok(output)
}
