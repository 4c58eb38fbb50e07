pub mod admin_db;
pub mod cli;
pub mod config;
pub mod corrections;
pub mod dataset;
pub mod disambiguate;
pub mod error;
pub mod io_utils;
pub mod keys;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod overlay;
pub mod pipeline;
pub mod reference;
pub mod report;
pub mod resolve;
pub mod table;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    admin_db::AdminDirectory,
    cli::{Cli, Commands, CsvOptions},
    config::PipelineConfig,
    dataset::Table,
    normalize::normalize,
    overlay::OverlayColumns,
    report::RunSummary,
};

static LOGGER: OnceLock<()> = OnceLock::new();

// Id column name for city-level output when the boundary has no city id column.
const CITY_ID_COLUMN: &str = "city_id";

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("admin_reconcile", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Normalize(args) => handle_normalize(&args),
        Commands::Keys(args) => handle_keys(&args),
        Commands::Collisions(args) => handle_collisions(&args),
        Commands::Resolve(args) => handle_resolve(&args),
        Commands::Overlay(args) => handle_overlay(&args),
        Commands::Flatten(args) => handle_flatten(&args),
        Commands::Merge(args) => handle_merge(&args),
        Commands::Coverage(args) => handle_coverage(&args),
    }
}

fn read_table(path: &Path, csv: &CsvOptions) -> Result<Table> {
    let encoding = io_utils::resolve_encoding(csv.input_encoding.as_deref())?;
    let table = Table::read(path, csv.delimiter, encoding)
        .with_context(|| format!("Loading table {path:?}"))?;
    info!("Loaded {} row(s) from '{}'", table.len(), path.display());
    Ok(table)
}

fn write_table(table: &Table, output: Option<&Path>, csv: &CsvOptions, input: &Path) -> Result<()> {
    let encoding = io_utils::resolve_encoding(csv.output_encoding.as_deref())?;
    let input_delimiter = io_utils::resolve_input_delimiter(input, csv.delimiter);
    let delimiter = io_utils::resolve_output_delimiter(output, csv.delimiter, input_delimiter);
    debug!(
        "Writing {} row(s) with delimiter '{}'",
        table.len(),
        io_utils::printable_delimiter(delimiter)
    );
    table.write(output, delimiter, encoding)
}

fn handle_normalize(args: &cli::NormalizeArgs) -> Result<()> {
    let headers = ["name", "normalized_key", "ascii_key", "display_key"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    let rows = args
        .names
        .iter()
        .map(|name| {
            let keys = normalize(name, args.level);
            vec![name.clone(), keys.normalized_key, keys.ascii_key, keys.display_key]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    Ok(())
}

fn handle_keys(args: &cli::KeysArgs) -> Result<()> {
    let config = PipelineConfig::load_or_default(args.config.as_deref())?;
    let tables = config.correction_tables()?;
    let input = read_table(&args.input, &args.csv)?;
    let keyed = pipeline::key_table(&input, args.level, args.source, &config, &tables)
        .with_context(|| format!("Building keys for {:?}", args.input))?;
    let malformed = keyed.iter().filter(|r| !r.malformed.is_empty()).count();
    if malformed > 0 {
        info!("{malformed} row(s) carry an empty administrative name");
    }
    let output = report::keyed_table(&input, &keyed, args.level);
    write_table(&output, args.output.as_deref(), &args.csv, &args.input)
}

fn handle_collisions(args: &cli::CollisionsArgs) -> Result<()> {
    let config = PipelineConfig::load_or_default(args.config.as_deref())?;
    let tables = config.correction_tables()?;
    let boundary = read_table(&args.boundary, &args.csv)?;
    let reference = pipeline::build_reference(&boundary, args.level, &config, &tables)
        .with_context(|| format!("Building reference from {:?}", args.boundary))?;
    if reference.collisions().is_empty() {
        info!("No {} collisions", args.level);
    }
    if let Some(path) = &args.units {
        let units = report::units_table(&reference.administrative_units());
        write_table(&units, Some(path), &args.csv, &args.boundary)?;
        info!("Wrote {} {} unit(s) to {path:?}", units.len(), args.level);
    }
    let report = report::collision_table(reference.collisions());
    match &args.output {
        Some(path) => write_table(&report, Some(path), &args.csv, &args.boundary),
        None => {
            table::print_table(&report.headers, &report.rows);
            Ok(())
        }
    }
}

fn handle_resolve(args: &cli::ResolveArgs) -> Result<()> {
    let config = PipelineConfig::load_or_default(args.config.as_deref())?;
    let tables = config.correction_tables()?;
    info!(
        "Resolving '{}' against '{}' at {} level",
        args.input.display(),
        args.boundary.display(),
        args.level
    );
    let boundary = read_table(&args.boundary, &args.csv)?;
    let reference = pipeline::build_reference(&boundary, args.level, &config, &tables)
        .with_context(|| format!("Building reference from {:?}", args.boundary))?;
    let input = read_table(&args.input, &args.csv)?;
    let output = pipeline::resolve_table(&input, &reference, args.source, &config, &tables)
        .with_context(|| format!("Resolving {:?}", args.input))?;
    report::log_summary(&output.summary);

    let id_column = config
        .boundary
        .id_column(args.level)
        .unwrap_or(CITY_ID_COLUMN);
    let resolved = report::resolved_table(&input, &output, id_column);
    write_table(&resolved, args.output.as_deref(), &args.csv, &args.input)?;

    if let Some(path) = &args.unresolved {
        let unresolved = report::unresolved_table(&output);
        write_table(&unresolved, Some(path), &args.csv, &args.input)?;
        info!(
            "{} unresolved row(s) written to {:?}",
            unresolved.len(),
            path
        );
    }
    if let Some(path) = &args.summary {
        let summary = RunSummary::new(
            args.source,
            reference.units().len(),
            reference.collisions(),
            tables.digest(),
            &output,
        );
        summary.save(path)?;
        info!("Run summary written to {path:?}");
    }
    Ok(())
}

fn handle_overlay(args: &cli::OverlayArgs) -> Result<()> {
    let config = PipelineConfig::load_or_default(args.config.as_deref())?;
    let boundary = read_table(&args.boundary, &args.csv)?;
    let refined = read_table(&args.overlay, &args.csv)?;
    let columns = OverlayColumns {
        district: args.overlay_district.clone(),
        ward: args.overlay_ward.clone(),
        exclude: args.exclude.clone(),
    };
    let output = overlay::apply_overlay(&boundary, &refined, &config.boundary, &args.city, &columns)
        .with_context(|| format!("Applying overlay {:?}", args.overlay))?;
    write_table(&output, args.output.as_deref(), &args.csv, &args.boundary)
}

fn handle_flatten(args: &cli::FlattenArgs) -> Result<()> {
    let directory = AdminDirectory::load(&args.input)?;
    let flat = directory.flatten();
    info!("Flattened {} ward(s) from '{}'", flat.len(), args.input.display());
    let encoding = io_utils::resolve_encoding(args.output_encoding.as_deref())?;
    let delimiter = io_utils::resolve_output_delimiter(
        args.output.as_deref(),
        None,
        io_utils::DEFAULT_CSV_DELIMITER,
    );
    flat.write(args.output.as_deref(), delimiter, encoding)
}

fn handle_merge(args: &cli::MergeArgs) -> Result<()> {
    if args.left_key.len() != args.right_key.len() {
        return Err(anyhow::anyhow!(
            "Left and right join keys must contain the same number of columns"
        ));
    }
    let left = read_table(&args.left, &args.csv)?;
    let right = read_table(&args.right, &args.csv)?;
    let merged = merge::join_tables(&left, &right, &args.left_key, &args.right_key, args.kind)?;
    write_table(&merged, args.output.as_deref(), &args.csv, &args.left)
}

fn handle_coverage(args: &cli::CoverageArgs) -> Result<()> {
    let population = read_table(&args.population, &args.csv)?;
    let stores = read_table(&args.stores, &args.csv)?;
    let store_key = args.store_key.as_deref().unwrap_or(&args.key);
    let coverage = merge::store_coverage(
        &population,
        &stores,
        &args.key,
        store_key,
        &args.population_column,
        args.area_column.as_deref(),
    )?;
    let covered = coverage
        .rows
        .iter()
        .filter(|row| row.get(population.headers.len()).is_some_and(|count| count != "0"))
        .count();
    info!(
        "{covered} of {} unit(s) have at least one store",
        coverage.len()
    );
    write_table(&coverage, args.output.as_deref(), &args.csv, &args.population)
}
