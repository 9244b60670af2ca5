//! Write stage responses back onto rows.
//!
//! Files are located by bare filename against the row's `file`; the first row with that
//! filename wins. Unknown filenames are skipped. Later writes overwrite earlier ones, both
//! within one response and across stages.

use crate::models::{
    CategorizeResponse, Category, CategoryFiles, CreditCardGroupResponse, DocumentGroupResponse,
};
use crate::types::DocumentRow;
use std::collections::HashMap;

/// `other_documents` -> `Other Documents`.
pub fn category_display_name(kind: &str) -> String {
    kind.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Last `/` segment of a path as sent back by the backend.
pub fn bare_filename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

pub fn credit_card_group_label(index: usize) -> String {
    format!("Credit Card Group {}", index + 1)
}

pub fn purchase_group_label(index: usize) -> String {
    format!("Purchase Group {}", index + 1)
}

/// filename -> position of the first row declaring it.
struct FileIndex(HashMap<String, usize>);

impl FileIndex {
    fn build(rows: &[DocumentRow]) -> Self {
        let mut map = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            map.entry(row.file.clone()).or_insert(i);
        }
        FileIndex(map)
    }

    fn position(&self, path: &str) -> Option<usize> {
        let name = bare_filename(path);
        if name.is_empty() {
            return None;
        }
        self.0.get(name).copied()
    }
}

#[derive(Clone, Copy)]
enum Field {
    Output,
    Group,
}

fn assign(
    rows: &mut [DocumentRow],
    index: &FileIndex,
    path: &str,
    field: Field,
    value: &str,
) -> bool {
    let Some(pos) = index.position(path) else {
        return false;
    };
    let row = &mut rows[pos];
    match field {
        Field::Output => row.actual_output = value.to_string(),
        Field::Group => row.actual_group = value.to_string(),
    }
    tracing::debug!("  -> {}: {}", row.file, value);
    true
}

fn label_category(
    rows: &mut [DocumentRow],
    index: &FileIndex,
    category: &Category,
    field: Field,
    value: &str,
) -> usize {
    let mut updated = 0;
    match &category.files {
        CategoryFiles::CardPairs(pairs) => {
            for pair in pairs {
                for side in [pair.front.as_deref(), pair.back.as_deref()].into_iter().flatten() {
                    updated += assign(rows, index, side, field, value) as usize;
                }
            }
        }
        CategoryFiles::Documents(docs) => {
            for filename in docs.iter().filter_map(|d| d.filename.as_deref()) {
                updated += assign(rows, index, filename, field, value) as usize;
            }
        }
    }
    updated
}

fn apply_category_labels(rows: &mut [DocumentRow], index: &FileIndex, categories: &[Category]) -> usize {
    categories
        .iter()
        .map(|category| {
            let name = category_display_name(&category.kind);
            label_category(rows, index, category, Field::Output, &name)
        })
        .sum()
}

/// Set `actual_output` from a categorize response. Returns the number of writes.
pub fn apply_categorize(rows: &mut [DocumentRow], response: &CategorizeResponse) -> usize {
    let index = FileIndex::build(rows);
    apply_category_labels(rows, &index, &response.categories)
}

/// Label both sides of every pair `Credit Card Group {n}`; `n` counts pairs within an entry.
pub fn apply_credit_card_groups(rows: &mut [DocumentRow], response: &CreditCardGroupResponse) -> usize {
    let index = FileIndex::build(rows);
    let mut updated = 0;
    for entry in &response.credit_cards_group {
        for (pair_idx, pair) in entry.files.iter().enumerate() {
            let label = credit_card_group_label(pair_idx);
            for side in [pair.front.as_deref(), pair.back.as_deref()].into_iter().flatten() {
                updated += assign(rows, &index, side, Field::Group, &label) as usize;
            }
        }
    }
    updated
}

/// Refined categories overwrite `actual_output`; each purchase group labels `actual_group`.
pub fn apply_document_groups(rows: &mut [DocumentRow], response: &DocumentGroupResponse) -> usize {
    let index = FileIndex::build(rows);
    let mut updated = apply_category_labels(rows, &index, &response.categories);
    for (group_idx, purchase) in response.documents_groups.iter().enumerate() {
        let label = purchase_group_label(group_idx);
        for category in &purchase.group {
            updated += label_category(rows, &index, category, Field::Group, &label);
        }
    }
    updated
}
