use document_classifier_lib::excel::{export_rows, parse_workbook, resolve_export_path};
use document_classifier_lib::types::DocumentRow;
use rust_xlsxwriter::Workbook;

fn row(i: u32, customer: &str, file: &str) -> DocumentRow {
    DocumentRow {
        id: format!("row-{}", i),
        customer: customer.into(),
        file: file.into(),
        expected_output: "Credit Cards".into(),
        actual_output: "Pos Receipts".into(),
        output_result: "FALSE".into(),
        expected_group: "Credit Card Group 1".into(),
        actual_group: "Purchase Group 2".into(),
        group_result: "FALSE".into(),
        row_index: i,
    }
}

#[test]
fn export_then_parse_reproduces_row_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rows.xlsx");
    let rows = vec![
        row(1, "Acme", "a.jpg"),
        row(2, "Acme & Sons", "b <1>.jpg"),
        row(3, "Beta", "c.jpg"),
    ];

    export_rows(&rows, &path).unwrap();
    let parsed = parse_workbook(&path).unwrap();

    assert_eq!(parsed.len(), rows.len());
    for (original, back) in rows.iter().zip(&parsed) {
        assert_eq!(back.customer, original.customer);
        assert_eq!(back.file, original.file);
        assert_eq!(back.expected_output, original.expected_output);
        assert_eq!(back.actual_output, original.actual_output);
        assert_eq!(back.expected_group, original.expected_group);
        assert_eq!(back.actual_group, original.actual_group);
    }
    assert_eq!(parsed[0].id, "row-1");
    assert_eq!(parsed[2].row_index, 3);
}

#[test]
fn parse_skips_header_and_rows_without_customer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.xlsx");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let header = ["Customer", "File", "Expected Output", "Actual Output"];
    for (col, h) in header.iter().enumerate() {
        sheet.write_string(0, col as u16, *h).unwrap();
    }
    sheet.write_string(1, 0, "Acme").unwrap();
    sheet.write_string(1, 1, "a.jpg").unwrap();
    sheet.write_string(1, 2, "Credit Cards").unwrap();
    // row 2 has no customer
    sheet.write_string(2, 1, "orphan.jpg").unwrap();
    sheet.write_string(3, 0, "Beta").unwrap();
    sheet.write_number(3, 1, 42.0).unwrap();
    workbook.save(&path).unwrap();

    let rows = parse_workbook(&path).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, "row-1");
    assert_eq!(rows[0].expected_output, "Credit Cards");
    assert_eq!(rows[0].actual_group, "");
    assert_eq!(rows[1].id, "row-3");
    assert_eq!(rows[1].row_index, 3);
    assert_eq!(rows[1].file, "42");
}

#[test]
fn missing_workbook_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(parse_workbook(&dir.path().join("missing.xlsx")).is_err());
}

#[test]
fn default_export_path_is_timestamped_xlsx() {
    if let Ok(path) = resolve_export_path(None) {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("processed_documents_"));
        assert!(name.ends_with(".xlsx"));
    }
}
