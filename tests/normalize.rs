use admin_reconcile::{
    model::AdminLevel,
    normalize::{AdminTitle, ascii_fold, normalize, strip_title},
};
use proptest::prelude::*;

#[test]
fn town_title_is_stripped_and_kept_for_display() {
    let keys = normalize("Thị Xã Buôn Hồ", AdminLevel::District);
    assert_eq!(keys.normalized_key, "BuônHồ");
    assert_eq!(keys.ascii_key, "buonho");
    assert_eq!(keys.display_key, "Thị Xã Buôn Hồ");
}

#[test]
fn numeric_remainders_get_level_titles() {
    assert_eq!(normalize("Quận 3", AdminLevel::District).normalized_key, "Quận3");
    assert_eq!(normalize("Phường 5", AdminLevel::Ward).normalized_key, "Phường5");
    assert_eq!(normalize("P.05", AdminLevel::Ward).normalized_key, "Phường5");
    assert_eq!(normalize("Xã 7", AdminLevel::Ward).normalized_key, "Phường7");
}

#[test]
fn dotted_district_abbreviation_expands() {
    let keys = normalize("Q.1", AdminLevel::District);
    assert_eq!(keys.normalized_key, "Quận1");
    assert_eq!(keys.ascii_key, "quan1");
    assert_eq!(keys.display_key, "Quận 1");
    assert_eq!(normalize("Quận 1", AdminLevel::District), keys);
}

#[test]
fn dotted_city_abbreviation_maps_to_canonical_title() {
    let keys = normalize("TP. Hồ Chí Minh", AdminLevel::City);
    assert_eq!(keys.normalized_key, "HồChíMinh");
    assert_eq!(keys.display_key, "Thành Phố Hồ Chí Minh");
    assert_eq!(keys.ascii_key, "hochiminh");
}

#[test]
fn roman_numeral_wards_are_reprefixed() {
    let keys = normalize("Phường IV", AdminLevel::Ward);
    assert_eq!(keys.normalized_key, "PhườngIV");
    assert_eq!(keys.ascii_key, "phuongiv");
    // The heuristic is ward-only.
    assert_eq!(normalize("IV", AdminLevel::District).normalized_key, "IV");
}

#[test]
fn empty_input_yields_empty_keys() {
    for raw in ["", "   ", "\t\n"] {
        let keys = normalize(raw, AdminLevel::Ward);
        assert!(keys.is_empty());
        assert!(keys.ascii_key.is_empty());
        assert!(keys.display_key.is_empty());
    }
}

#[test]
fn decomposed_input_matches_precomposed() {
    let decomposed = "Ho\u{300}a Tu\u{301}";
    assert_eq!(
        normalize(decomposed, AdminLevel::Ward),
        normalize("Hòa Tú", AdminLevel::Ward)
    );
}

#[test]
fn gadm_camel_names_strip_unspaced_titles() {
    assert_eq!(
        strip_title("ThịTrấnLaiVung"),
        (Some(AdminTitle::ThiTran), "LaiVung")
    );
    let keys = normalize("CaoLãnh(Thànhphố)", AdminLevel::District);
    assert_eq!(keys.normalized_key, "CaoLãnh");
    assert_eq!(keys.compact_display(), "ThànhPhốCaoLãnh");
}

#[test]
fn ascii_fold_removes_every_mark() {
    assert_eq!(ascii_fold("Đắk Lắk"), "daklak");
    assert_eq!(ascii_fold("Thừa Thiên - Huế"), "thuathienhue");
}

fn place_name() -> impl Strategy<Value = String> {
    let titles = prop::sample::select(vec![
        "", "Phường ", "Xã ", "Thị Trấn ", "Quận ", "Huyện ", "Thị Xã ", "TP. ", "Thành Phố ",
        "q.", "p. ",
    ]);
    let syllables = prop::collection::vec(
        prop::sample::select(vec![
            "Bình", "Trị", "Đông", "Hòa", "Phú", "An", "Tân", "Thạnh", "Mỹ", "Lợi", "Long", "Hưng",
        ]),
        1..4,
    )
    .prop_map(|parts| parts.join(" "));
    let number = (1u32..30).prop_map(|n| n.to_string());
    (titles, prop_oneof![syllables, number]).prop_map(|(title, rest)| format!("{title}{rest}"))
}

proptest! {
    #[test]
    fn normalizing_the_display_key_is_stable(name in place_name()) {
        for level in [AdminLevel::District, AdminLevel::Ward] {
            let once = normalize(&name, level);
            let again = normalize(&once.display_key, level);
            prop_assert_eq!(&again, &once);
            prop_assert_eq!(normalize(&again.display_key, level), again);
        }
    }

    #[test]
    fn ascii_key_is_lowercase_alphanumeric(name in place_name()) {
        let keys = normalize(&name, AdminLevel::Ward);
        prop_assert!(!keys.ascii_key.is_empty());
        prop_assert!(keys
            .ascii_key
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit()));
        prop_assert!(!keys.normalized_key.contains(' '));
    }
}
