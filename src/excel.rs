use calamine::{open_workbook_auto, DataType, Reader};
use std::path::{Path, PathBuf};

use crate::error::{ClassifierError, Result};
use crate::types::DocumentRow;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

/// Headers for export, in column order. The second "Result " keeps the two result
/// columns distinct for tools that key rows by header.
pub const EXPORT_HEADERS: &[&str] = &[
    "Customer",
    "File",
    "Expected Output",
    "Actual Output",
    "Result",
    "Expected Group",
    "Actual Group",
    "Result ",
];

const EXPORT_SHEET: &str = "Sheet1";

fn spreadsheet_err(context: &str, e: impl std::fmt::Display) -> ClassifierError {
    ClassifierError::Spreadsheet(format!("{}: {}", context, e))
}

/// Read the first sheet. Row 0 is the header; the eight columns are, in order:
/// customer, file, expected output, actual output, output result, expected group,
/// actual group, group result. Rows without a customer are dropped.
pub fn parse_workbook(path: &Path) -> Result<Vec<DocumentRow>> {
    if !path.exists() {
        return Err(ClassifierError::Spreadsheet(format!(
            "File not found: {}",
            path.display()
        )));
    }
    let mut workbook =
        open_workbook_auto(path).map_err(|e| spreadsheet_err("Could not open Excel file", e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ClassifierError::Spreadsheet("Workbook has no sheets".to_string()))?
        .map_err(|e| spreadsheet_err("Could not read first sheet", e))?;

    let mut rows = Vec::new();
    for (i, cells) in range.rows().enumerate().skip(1) {
        let cell = |col: usize| -> String {
            cells
                .get(col)
                .and_then(|c| c.as_string())
                .unwrap_or_default()
        };
        let customer = cell(0);
        if customer.is_empty() {
            continue;
        }
        rows.push(DocumentRow {
            id: format!("row-{}", i),
            customer,
            file: cell(1),
            expected_output: cell(2),
            actual_output: cell(3),
            output_result: cell(4),
            expected_group: cell(5),
            actual_group: cell(6),
            group_result: cell(7),
            row_index: i as u32,
        });
    }
    tracing::info!("{} rows parsed from {}", rows.len(), path.display());
    Ok(rows)
}

/// Drop control chars (except tab, newline, CR) and XML-invalid code points.
fn sanitize_cell(s: &str) -> String {
    s.chars()
        .filter(|&c| {
            let u = c as u32;
            c == '\t' || c == '\n' || c == '\r' || !(u < 0x20 || u == 0x7F || u == 0xFFFE || u == 0xFFFF)
        })
        .collect()
}

fn write_text_cell_safe(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    text: &str,
    format: &Format,
) -> std::result::Result<(), XlsxError> {
    worksheet
        .write_string_with_format(row, col, sanitize_cell(text), format)
        .map(|_| ())
}

/// Estimate column width from text length (char count × 1.2, clamped 10–50).
fn estimate_text_width(text: &str) -> f64 {
    let w = text.chars().count() as f64 * 1.2;
    w.clamp(10.0, 50.0)
}

fn row_values(row: &DocumentRow) -> [&str; 8] {
    [
        row.customer.as_str(),
        row.file.as_str(),
        row.expected_output.as_str(),
        row.actual_output.as_str(),
        row.output_result.as_str(),
        row.expected_group.as_str(),
        row.actual_group.as_str(),
        row.group_result.as_str(),
    ]
}

fn calculate_export_column_widths(rows: &[DocumentRow]) -> Vec<f64> {
    let mut widths: Vec<f64> = EXPORT_HEADERS.iter().map(|h| estimate_text_width(h)).collect();
    for row in rows {
        for (col, value) in row_values(row).iter().enumerate() {
            widths[col] = widths[col].max(estimate_text_width(value));
        }
    }
    widths
}

/// Write `rows` to a new workbook at `path` with the eight export columns.
pub fn export_rows(rows: &[DocumentRow], path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(EXPORT_SHEET)
        .map_err(|e| spreadsheet_err("Invalid sheet name", e))?;

    let header_format = Format::new()
        .set_bold()
        .set_background_color(rust_xlsxwriter::Color::RGB(0x2563EB))
        .set_font_color(rust_xlsxwriter::Color::RGB(0xFFFFFF));
    let text_format = Format::new();

    for (col, &w) in calculate_export_column_widths(rows).iter().enumerate() {
        worksheet
            .set_column_width(col as u16, w)
            .map_err(|e| spreadsheet_err("Could not size column", e))?;
    }
    for (col, header) in EXPORT_HEADERS.iter().enumerate() {
        write_text_cell_safe(worksheet, 0, col as u16, header, &header_format)
            .map_err(|e| spreadsheet_err("Could not write header", e))?;
    }
    for (row_idx, row) in rows.iter().enumerate() {
        let sheet_row = (row_idx + 1) as u32;
        for (col, value) in row_values(row).iter().enumerate() {
            write_text_cell_safe(worksheet, sheet_row, col as u16, value, &text_format)
                .map_err(|e| spreadsheet_err("Could not write cell", e))?;
        }
    }
    let _ = worksheet.set_freeze_panes(1, 0);

    workbook.save(path).map_err(|e| {
        let msg = e.to_string();
        if msg.contains("Permission denied") || msg.contains("being used") {
            ClassifierError::Spreadsheet("Please close the file in Excel first.".to_string())
        } else {
            spreadsheet_err("Cannot write to file", msg)
        }
    })?;
    tracing::info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Resolve the export path: the given one with `.xlsx` enforced, or a timestamped
/// `processed_documents_*.xlsx` in Downloads (Desktop as fallback) that does not exist yet.
pub fn resolve_export_path(path_override: Option<&str>) -> Result<PathBuf> {
    if let Some(p) = path_override.map(str::trim).filter(|p| !p.is_empty()) {
        let mut pb = PathBuf::from(p);
        if pb.extension().and_then(|e| e.to_str()) != Some("xlsx") {
            pb.set_extension("xlsx");
        }
        return Ok(pb);
    }
    let dir = dirs::download_dir()
        .or_else(dirs::desktop_dir)
        .ok_or_else(|| ClassifierError::Config("Could not find Downloads or Desktop folder.".into()))?;
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let mut p = dir.join(format!("processed_documents_{}.xlsx", stamp));
    let mut counter = 2u32;
    while p.exists() {
        p = dir.join(format!("processed_documents_{}_{}.xlsx", stamp, counter));
        counter += 1;
    }
    Ok(p)
}
