mod common;

use admin_reconcile::{
    admin_db::{AdminDirectory, FLAT_HEADERS},
    config::PipelineConfig,
    corrections::{CorrectionTables, Source},
    model::AdminLevel,
    pipeline,
};
use common::fixture_path;

#[test]
fn flatten_sorts_by_ward_and_drops_duplicates() {
    let directory = AdminDirectory::load(&fixture_path("admin_list.json")).expect("load");
    let table = directory.flatten();
    assert_eq!(table.headers, FLAT_HEADERS);
    let wards: Vec<(&str, &str, &str)> = table
        .rows
        .iter()
        .map(|row| (row[4].as_str(), row[3].as_str(), row[5].as_str()))
        .collect();
    assert_eq!(
        wards,
        vec![
            ("27442", "Quận Bình Tân", "Phường Bình Trị Đông"),
            ("27448", "Quận Bình Tân", "Phường Bình Trị Đông B"),
            ("27457", "Quận Bình Tân", "Phường An Lạc"),
        ]
    );
}

#[test]
fn flattened_list_feeds_the_key_builder() {
    let table = AdminDirectory::load(&fixture_path("admin_list.json"))
        .expect("load")
        .flatten();
    let config = PipelineConfig::default();
    let keyed = pipeline::key_table(
        &table,
        AdminLevel::Ward,
        Source::Store,
        &config,
        &CorrectionTables::default(),
    )
    .expect("keys");
    assert_eq!(keyed.len(), 3);
    assert_eq!(keyed[1].key(AdminLevel::Ward).normalized_key, "BìnhTrịĐôngB");
    assert_eq!(keyed[2].key(AdminLevel::District).ascii_key, "binhtan");
}

#[test]
fn malformed_json_is_reported_with_context() {
    let err = AdminDirectory::from_json_str("{\"fullDataLocation\": 3}").expect_err("bad shape");
    assert!(format!("{err:#}").contains("Parsing administrative list JSON"));
}
