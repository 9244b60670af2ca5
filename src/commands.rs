use crate::config::{ServerKind, Settings};
use crate::excel;
use crate::services::batch::{BatchObserver, BatchOrchestrator};
use crate::services::cancel::CancelToken;
use crate::services::file_matcher::match_customer_files;
use crate::services::remote::RemoteClassifier;
use crate::types::{group_by_customer, DocumentRow, Phase, ProcessingStatus};
use crate::upload;
use std::path::Path;

/// Prints each new status message with a progress counter.
struct ConsoleObserver {
    last_message: Option<String>,
}

impl BatchObserver for ConsoleObserver {
    fn on_status(&mut self, status: &ProcessingStatus) {
        if status.message == self.last_message {
            return;
        }
        self.last_message = status.message.clone();
        if let Some(ref message) = status.message {
            println!(
                "[{}/{}] {}",
                status.processed_customers, status.total_customers, message
            );
        }
    }
}

pub struct ProcessOptions<'a> {
    pub excel_path: &'a Path,
    pub folder: &'a Path,
    pub output: Option<&'a str>,
    pub server: Option<&'a str>,
    pub base_url: Option<&'a str>,
}

/// Parse, classify, export. Rows merged before a failure are still exported.
/// Returns the final batch phase and the export path.
pub fn process(opts: ProcessOptions<'_>) -> Result<(Phase, String), String> {
    let mut settings = Settings::from_env().map_err(|e| e.to_string())?;
    if let Some(server) = opts.server {
        settings.server = server.parse::<ServerKind>().map_err(|e| e.to_string())?;
        settings.base_url = None;
    }
    if let Some(url) = opts.base_url.filter(|u| !u.trim().is_empty()) {
        settings.base_url = Some(url.to_string());
    }

    let mut rows = excel::parse_workbook(opts.excel_path).map_err(|e| e.to_string())?;
    println!("Excel file loaded: {} rows parsed", rows.len());
    let files = upload::load_folder(opts.folder).map_err(|e| e.to_string())?;
    println!("Folder uploaded: {} files loaded", files.len());
    if rows.is_empty() || files.is_empty() {
        return Err("Nothing to process: spreadsheet rows and folder files are both required.".into());
    }
    let output = excel::resolve_export_path(opts.output).map_err(|e| e.to_string())?;

    let cancel = CancelToken::new();
    let client = RemoteClassifier::from_settings(&settings, cancel.clone()).map_err(|e| e.to_string())?;
    println!("Using server {}", client.base_url());
    let mut batch = BatchOrchestrator::new(client, settings.customer_delay, cancel);
    let summary = batch.run(
        &mut rows,
        &files,
        &mut ConsoleObserver { last_message: None },
    );

    excel::export_rows(&rows, &output).map_err(|e| e.to_string())?;
    let output = output.to_string_lossy().into_owned();
    println!("Export complete: {}", output);
    Ok((summary.status.phase, output))
}

/// Per-customer folder matching without any network call.
pub fn dry_run_match(excel_path: &Path, folder: &Path) -> Result<(), String> {
    let rows = excel::parse_workbook(excel_path).map_err(|e| e.to_string())?;
    let files = upload::load_folder(folder).map_err(|e| e.to_string())?;
    for group in group_by_customer(&rows) {
        match match_customer_files(&files, &group) {
            Ok(matched) => println!(
                "{}: {} row(s), {} file(s) matched ({} image, {} pdf/xml)",
                group.customer,
                group.rows.len(),
                matched.len(),
                matched.images.len(),
                matched.skipped.len()
            ),
            Err(e) => println!("{}: {} row(s), {}", group.customer, group.rows.len(), e),
        }
    }
    Ok(())
}

/// Parsed rows as pretty JSON.
pub fn rows_json(rows: &[DocumentRow]) -> Result<String, String> {
    serde_json::to_string_pretty(rows).map_err(|e| e.to_string())
}
