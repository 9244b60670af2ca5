//! Reconcile spreadsheet rows with the uploaded folder tree.

use crate::error::{ClassifierError, Result};
use crate::types::{CustomerGroup, UploadedFile};
use std::collections::HashSet;

const SKIPPED_EXTENSIONS: &[&str] = &["pdf", "xml"];

/// Files of one customer, split into what gets sent and what does not.
#[derive(Debug, Default)]
pub struct MatchedFiles<'a> {
    pub images: Vec<&'a UploadedFile>,
    /// pdf/xml files; matched but never uploaded.
    pub skipped: Vec<&'a UploadedFile>,
}

impl MatchedFiles<'_> {
    pub fn len(&self) -> usize {
        self.images.len() + self.skipped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Folder segment of a file: second-to-last path segment. A bare name has none.
pub fn folder_name(file: &UploadedFile) -> Option<&str> {
    let path = file.relative_path.as_deref().unwrap_or(&file.name);
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() >= 2 {
        Some(parts[parts.len() - 2])
    } else {
        None
    }
}

/// Exact match first, case-insensitive match as fallback. Never partial.
pub fn folder_matches(folder: &str, customer: &str) -> bool {
    folder == customer || folder.to_lowercase() == customer.to_lowercase()
}

/// Files whose name is declared in the customer's rows and whose folder is the customer's.
pub fn match_customer_files<'a>(
    files: &'a [UploadedFile],
    group: &CustomerGroup,
) -> Result<MatchedFiles<'a>> {
    let declared: HashSet<&str> = group.rows.iter().map(|r| r.file.as_str()).collect();
    let mut matched = MatchedFiles::default();

    for file in files {
        if !declared.contains(file.name.as_str()) {
            continue;
        }
        let Some(folder) = folder_name(file) else {
            continue;
        };
        if !folder_matches(folder, &group.customer) {
            continue;
        }
        if SKIPPED_EXTENSIONS.contains(&file.extension().as_str()) {
            matched.skipped.push(file);
        } else {
            matched.images.push(file);
        }
    }

    tracing::debug!(
        "{}: {} declared file(s), {} matched ({} image, {} pdf/xml)",
        group.customer,
        declared.len(),
        matched.len(),
        matched.images.len(),
        matched.skipped.len()
    );

    if matched.is_empty() {
        return Err(ClassifierError::NoFilesForCustomer {
            customer: group.customer.clone(),
        });
    }
    Ok(matched)
}
