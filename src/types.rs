use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One spreadsheet data row. `actual_output` / `actual_group` are written by the pipeline
/// and by manual edits; everything else is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRow {
    pub id: String,
    pub customer: String,
    pub file: String,
    pub expected_output: String,
    pub actual_output: String,
    pub output_result: String,
    pub expected_group: String,
    pub actual_group: String,
    pub group_result: String,
    pub row_index: u32,
}

/// One file from the bulk folder upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Base filename, used as the multipart filename.
    pub name: String,
    /// `<root>/<customer>/<file>` with `/` separators, when known.
    pub relative_path: Option<String>,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, relative_path: Option<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            relative_path,
            content,
        }
    }

    /// Lowercased text after the last `.`; the whole name when there is no dot.
    pub fn extension(&self) -> String {
        self.name
            .to_lowercase()
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_string()
    }
}

/// Rows of one customer in spreadsheet order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerGroup {
    pub customer: String,
    pub rows: Vec<DocumentRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Processing,
    Complete,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStatus {
    pub phase: Phase,
    pub total_customers: usize,
    pub processed_customers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_customer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Default for ProcessingStatus {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            total_customers: 0,
            processed_customers: 0,
            current_customer: None,
            message: None,
        }
    }
}

/// Row fields a reviewer may overwrite by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditableField {
    ActualOutput,
    ActualGroup,
}

/// Group rows by customer, customers in first-seen order.
pub fn group_by_customer(rows: &[DocumentRow]) -> Vec<CustomerGroup> {
    let mut groups: Vec<CustomerGroup> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        match positions.get(row.customer.as_str()) {
            Some(&idx) => groups[idx].rows.push(row.clone()),
            None => {
                positions.insert(row.customer.as_str(), groups.len());
                groups.push(CustomerGroup {
                    customer: row.customer.clone(),
                    rows: vec![row.clone()],
                });
            }
        }
    }
    groups
}

/// Manual edit of one cell. Returns false when no row has `row_id`.
pub fn update_cell(rows: &mut [DocumentRow], row_id: &str, field: EditableField, value: &str) -> bool {
    let Some(row) = rows.iter_mut().find(|r| r.id == row_id) else {
        return false;
    };
    match field {
        EditableField::ActualOutput => row.actual_output = value.to_string(),
        EditableField::ActualGroup => row.actual_group = value.to_string(),
    }
    true
}

/// Replace rows of `master` with the row of the same `id` from `updated`.
/// Rows of `updated` with an unknown id are ignored. Returns the number of rows replaced.
pub fn merge_rows(master: &mut [DocumentRow], updated: &[DocumentRow]) -> usize {
    let by_id: HashMap<&str, &DocumentRow> = updated.iter().map(|r| (r.id.as_str(), r)).collect();
    let mut replaced = 0;
    for row in master.iter_mut() {
        if let Some(&new_row) = by_id.get(row.id.as_str()) {
            *row = new_row.clone();
            replaced += 1;
        }
    }
    replaced
}

#[cfg(test)]
pub(crate) fn row(id: &str, customer: &str, file: &str) -> DocumentRow {
    DocumentRow {
        id: id.to_string(),
        customer: customer.to_string(),
        file: file.to_string(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_by_customer_keeps_first_seen_order_and_every_row() {
        let rows = vec![
            row("row-1", "Beta", "1.jpg"),
            row("row-2", "Acme", "a.jpg"),
            row("row-3", "Beta", "2.jpg"),
            row("row-4", "Zed", "z.jpg"),
            row("row-5", "Acme", "b.jpg"),
        ];
        let groups = group_by_customer(&rows);
        let names: Vec<&str> = groups.iter().map(|g| g.customer.as_str()).collect();
        assert_eq!(names, vec!["Beta", "Acme", "Zed"]);
        let total: usize = groups.iter().map(|g| g.rows.len()).sum();
        assert_eq!(total, rows.len());
        let beta_ids: Vec<&str> = groups[0].rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(beta_ids, vec!["row-1", "row-3"]);
    }

    #[test]
    fn group_by_customer_of_empty_collection_is_empty() {
        assert!(group_by_customer(&[]).is_empty());
    }

    #[test]
    fn update_cell_edits_only_the_named_field() {
        let mut rows = vec![row("row-1", "Acme", "a.jpg"), row("row-2", "Acme", "b.jpg")];
        assert!(update_cell(&mut rows, "row-2", EditableField::ActualGroup, "Purchase Group 3"));
        assert_eq!(rows[1].actual_group, "Purchase Group 3");
        assert_eq!(rows[1].actual_output, "");
        assert!(!update_cell(&mut rows, "row-9", EditableField::ActualOutput, "x"));
    }

    #[test]
    fn merge_rows_replaces_by_id_and_is_idempotent() {
        let mut master = vec![row("row-1", "Acme", "a.jpg"), row("row-2", "Beta", "b.jpg")];
        let mut changed = row("row-2", "Beta", "b.jpg");
        changed.actual_output = "Pos Receipts".into();
        let updated = vec![changed, row("row-7", "Ghost", "g.jpg")];

        assert_eq!(merge_rows(&mut master, &updated), 1);
        let once = master.clone();
        merge_rows(&mut master, &updated);
        assert_eq!(master, once);
        assert_eq!(master[1].actual_output, "Pos Receipts");
        assert_eq!(master.len(), 2);
    }

    #[test]
    fn extension_is_lowercased_and_falls_back_to_whole_name() {
        assert_eq!(UploadedFile::new("SCAN.PDF", None, vec![]).extension(), "pdf");
        assert_eq!(UploadedFile::new("invoice.xml", None, vec![]).extension(), "xml");
        assert_eq!(UploadedFile::new("README", None, vec![]).extension(), "readme");
    }
}
