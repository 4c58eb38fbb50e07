use admin_reconcile::table::render_table;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn render_table_aligns_vietnamese_names() {
    let headers = strings(&["ward", "people"]);
    let rows = vec![strings(&["Phường 5", "1200"]), strings(&["Xã Hòa Tú 2", "85"])];

    let rendered = render_table(&headers, &rows);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(
        lines,
        vec![
            "ward         people",
            "-----------  ------",
            "Phường 5       1200",
            "Xã Hòa Tú 2      85",
        ]
    );
}

#[test]
fn render_table_flattens_control_characters() {
    let headers = strings(&["note"]);
    let rows = vec![strings(&["renamed\n2019\tmerge"])];

    let rendered = render_table(&headers, &rows);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2], "renamed 2019 merge");
}
