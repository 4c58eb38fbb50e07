mod common;

use std::collections::{BTreeMap, HashMap};

use admin_reconcile::{
    corrections::{CorrectionTables, Source},
    disambiguate::{CollisionStatus, find_collisions, revert},
    keys::build_keys,
    model::{AdminLevel, AdminNames, RawRecord},
    reference::BoundaryReference,
};
use common::ward_reference;

fn boundary_row(row: usize, city: &str, district: &str, dist_id: &str) -> RawRecord {
    RawRecord {
        row,
        names: AdminNames::new(city, district, ""),
        unit_ids: BTreeMap::from([(AdminLevel::District, dist_id.to_string())]),
        ..RawRecord::default()
    }
}

#[test]
fn fixture_reference_reverts_the_cao_lanh_districts() {
    let (_, _, reference) = ward_reference();
    let report = reference.collisions();
    assert_eq!(report.reverted.len(), 1);
    let collision = &report.reverted[0];
    assert_eq!(collision.level, AdminLevel::District);
    assert_eq!(collision.scope, vec!["ĐồngTháp".to_string()]);
    assert_eq!(collision.key, "CaoLãnh");
    assert_eq!(collision.unit_ids, vec!["VNM.19.1_1", "VNM.19.2_1"]);
    assert_eq!(report.entries()[0].1, CollisionStatus::Corrected);

    let town = reference.unit("VNM.19.2.1_1").expect("town ward");
    assert_eq!(town.key(AdminLevel::District).normalized_key, "ThànhPhốCaoLãnh");
    let rural = reference.unit("VNM.19.1.3_1").expect("rural ward");
    assert_eq!(rural.key(AdminLevel::District).normalized_key, "CaoLãnh");
}

#[test]
fn distinct_units_in_one_scope_end_with_distinct_keys() {
    let records = vec![
        boundary_row(1, "Đồng Tháp", "Thành phố Cao Lãnh", "D1"),
        boundary_row(2, "Đồng Tháp", "Huyện Cao Lãnh", "D2"),
        boundary_row(3, "Đồng Tháp", "Thị xã Hồng Ngự", "D3"),
        boundary_row(4, "Đồng Tháp", "Huyện Hồng Ngự", "D4"),
        boundary_row(5, "Đồng Tháp", "Huyện Lai Vung", "D5"),
        boundary_row(6, "Vĩnh Long", "Huyện Lai Vung", "D6"),
    ];
    let reference =
        BoundaryReference::build(&records, AdminLevel::District, &CorrectionTables::default())
            .expect("reference");

    assert!(find_collisions(reference.units(), AdminLevel::District).is_empty());
    let mut seen: HashMap<(String, String), String> = HashMap::new();
    for unit in reference.units() {
        let scope = unit.key(AdminLevel::City).normalized_key.clone();
        let key = unit.key(AdminLevel::District).normalized_key.clone();
        if let Some(other) = seen.insert((scope, key), unit.authoritative_id.clone()) {
            panic!("{other} and {} share a key", unit.authoritative_id);
        }
    }
    // Same name under a different parent is not a collision.
    assert_eq!(
        reference.unit("D6").expect("D6").key(AdminLevel::District).normalized_key,
        "LaiVung"
    );
    assert_eq!(reference.collisions().reverted.len(), 2);
}

#[test]
fn records_are_reverted_against_the_same_groups() {
    let (_, tables, reference) = ward_reference();
    let records = vec![
        RawRecord {
            row: 1,
            names: AdminNames::new("Đồng Tháp", "Thành phố Cao Lãnh", "Phường 1"),
            ..RawRecord::default()
        },
        RawRecord {
            row: 2,
            names: AdminNames::new("Đồng Tháp", "Huyện Lai Vung", "Xã Tân Thành"),
            ..RawRecord::default()
        },
    ];
    let keyed = revert(
        build_keys(&records, AdminLevel::Ward, &tables, Source::Census),
        reference.collisions(),
    );
    assert_eq!(keyed[0].key(AdminLevel::District).normalized_key, "ThànhPhốCaoLãnh");
    assert_eq!(keyed[0].key(AdminLevel::District).ascii_key, "caolanh");
    assert_eq!(keyed[1].key(AdminLevel::District).normalized_key, "LaiVung");
}

#[test]
fn reverted_units_keep_a_title_free_display_name() {
    let records = vec![
        boundary_row(1, "Đồng Tháp", "Thành phố Cao Lãnh", "D1"),
        boundary_row(2, "Đồng Tháp", "Huyện Cao Lãnh", "D2"),
    ];
    let reference =
        BoundaryReference::build(&records, AdminLevel::District, &CorrectionTables::default())
            .expect("reference");
    let units = reference.administrative_units();
    assert_eq!(units.len(), 2);
    for unit in &units {
        assert_eq!(unit.display_name, "Cao Lãnh");
        assert_eq!(unit.ascii_key, "caolanh");
    }
    assert_ne!(units[0].normalized_key, units[1].normalized_key);
    assert!(units.iter().any(|unit| unit.normalized_key == "ThànhPhốCaoLãnh"));
}
