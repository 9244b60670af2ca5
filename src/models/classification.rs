//! Wire payloads exchanged with the classification backend.
//!
//! Every category is `{ "type": ..., "files": [...] }`. Categorization sends `credit_cards`
//! entries as `{ front, back }` pairs and every other type as `{ filename }`, while document
//! grouping answers with `{ filename }` for every type, `credit_cards` included. [`Category`]
//! picks the variant from the entries themselves and falls back to the type only when they
//! carry neither key, so callers match on [`CategoryFiles`] instead of probing untyped JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CREDIT_CARDS: &str = "credit_cards";
pub const OTHER_DOCUMENTS: &str = "other_documents";

/// Front and back image of one card. Either side may be missing in a response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardPair {
    #[serde(default)]
    pub front: Option<String>,
    #[serde(default)]
    pub back: Option<String>,
}

impl CardPair {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: Some(front.into()),
            back: Some(back.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    #[serde(default)]
    pub filename: Option<String>,
}

impl DocumentRef {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFiles {
    CardPairs(Vec<CardPair>),
    Documents(Vec<DocumentRef>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawCategory", into = "RawCategory")]
pub struct Category {
    pub kind: String,
    pub files: CategoryFiles,
}

impl Category {
    pub fn card_pairs(pairs: Vec<CardPair>) -> Self {
        Self {
            kind: CREDIT_CARDS.to_string(),
            files: CategoryFiles::CardPairs(pairs),
        }
    }

    pub fn documents(kind: impl Into<String>, docs: Vec<DocumentRef>) -> Self {
        Self {
            kind: kind.into(),
            files: CategoryFiles::Documents(docs),
        }
    }

    pub fn len(&self) -> usize {
        match &self.files {
            CategoryFiles::CardPairs(pairs) => pairs.len(),
            CategoryFiles::Documents(docs) => docs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every path this category references, pairs flattened front then back.
    pub fn referenced_paths(&self) -> Vec<&str> {
        match &self.files {
            CategoryFiles::CardPairs(pairs) => pairs
                .iter()
                .flat_map(|p| [p.front.as_deref(), p.back.as_deref()])
                .flatten()
                .filter(|s| !s.is_empty())
                .collect(),
            CategoryFiles::Documents(docs) => docs
                .iter()
                .filter_map(|d| d.filename.as_deref())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

/// First category of `kind` that has at least one file.
pub fn find_non_empty<'a>(categories: &'a [Category], kind: &str) -> Option<&'a Category> {
    categories
        .iter()
        .find(|c| c.kind == kind)
        .filter(|c| !c.is_empty())
}

#[derive(Serialize, Deserialize)]
struct RawCategory {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    files: Vec<Value>,
}

fn has_key(entry: &Value, keys: &[&str]) -> bool {
    keys.iter().any(|k| entry.get(k).is_some())
}

impl From<RawCategory> for Category {
    fn from(raw: RawCategory) -> Self {
        let pairs = raw.files.iter().any(|v| has_key(v, &["front", "back"]))
            || (raw.kind == CREDIT_CARDS && !raw.files.iter().any(|v| has_key(v, &["filename"])));
        let files = if pairs {
            CategoryFiles::CardPairs(
                raw.files
                    .into_iter()
                    .map(|v| serde_json::from_value(v).unwrap_or_default())
                    .collect(),
            )
        } else {
            CategoryFiles::Documents(
                raw.files
                    .into_iter()
                    .map(|v| serde_json::from_value(v).unwrap_or_default())
                    .collect(),
            )
        };
        Category {
            kind: raw.kind,
            files,
        }
    }
}

impl From<Category> for RawCategory {
    fn from(category: Category) -> Self {
        // Missing sides go out as "", which the backend accepts.
        let files = match category.files {
            CategoryFiles::CardPairs(pairs) => pairs
                .into_iter()
                .map(|p| {
                    serde_json::json!({
                        "front": p.front.unwrap_or_default(),
                        "back": p.back.unwrap_or_default(),
                    })
                })
                .collect(),
            CategoryFiles::Documents(docs) => docs
                .into_iter()
                .map(|d| serde_json::json!({ "filename": d.filename.unwrap_or_default() }))
                .collect(),
        };
        RawCategory {
            kind: category.kind,
            files,
        }
    }
}

/// `document_structure` form field sent to both grouping endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationStructure {
    pub categories: Vec<Category>,
}

impl ClassificationStructure {
    pub fn credit_cards(pairs: Vec<CardPair>) -> Self {
        Self {
            categories: vec![Category::card_pairs(pairs)],
        }
    }

    pub fn other_documents(docs: Vec<DocumentRef>) -> Self {
        Self {
            categories: vec![Category::documents(OTHER_DOCUMENTS, docs)],
        }
    }

    pub fn to_form_value(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CategorizeResponse {
    #[serde(default)]
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreditCardGroup {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub files: Vec<CardPair>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreditCardGroupResponse {
    #[serde(default)]
    pub credit_cards_group: Vec<CreditCardGroup>,
}

/// One purchase: the categories whose files belong together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DocumentGroup {
    #[serde(default)]
    pub group: Vec<Category>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DocumentGroupResponse {
    /// Refined categories for the submitted documents.
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub documents_groups: Vec<DocumentGroup>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_card_category_decodes_as_pairs() {
        let json = r#"{"categories":[
            {"type":"credit_cards","files":[{"front":"c/f1.jpg","back":"c/b1.jpg"},{"front":"c/f2.jpg"}]},
            {"type":"pos_receipts","files":[{"filename":"c/r.jpg"}]}
        ]}"#;
        let resp: CategorizeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            resp.categories[0].files,
            CategoryFiles::CardPairs(vec![
                CardPair::new("c/f1.jpg", "c/b1.jpg"),
                CardPair {
                    front: Some("c/f2.jpg".into()),
                    back: None
                },
            ])
        );
        assert_eq!(
            resp.categories[1].files,
            CategoryFiles::Documents(vec![DocumentRef::new("c/r.jpg")])
        );
        assert_eq!(resp.categories[0].referenced_paths(), vec!["c/f1.jpg", "c/b1.jpg", "c/f2.jpg"]);
    }

    #[test]
    fn credit_card_category_with_filename_entries_decodes_as_documents() {
        let json = r#"{"categories":[{"type":"credit_cards","files":[{"filename":"u/s.jpg"}]}],
            "documents_groups":[{"group":[{"type":"credit_cards","files":[{"filename":"u/s.jpg"}]}]}]}"#;
        let resp: DocumentGroupResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            resp.categories[0].files,
            CategoryFiles::Documents(vec![DocumentRef::new("u/s.jpg")])
        );
        assert_eq!(resp.documents_groups[0].group[0].referenced_paths(), vec!["u/s.jpg"]);

        let empty: CategorizeResponse =
            serde_json::from_str(r#"{"categories":[{"type":"credit_cards","files":[]}]}"#).unwrap();
        assert_eq!(empty.categories[0].files, CategoryFiles::CardPairs(vec![]));
    }

    #[test]
    fn missing_keys_decode_as_empty() {
        let resp: DocumentGroupResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.categories.is_empty());
        assert!(resp.documents_groups.is_empty());

        let resp: CategorizeResponse = serde_json::from_str(r#"{"categories":[{"type":"x"}]}"#).unwrap();
        assert!(resp.categories[0].is_empty());
    }

    #[test]
    fn malformed_file_entries_are_tolerated() {
        let json = r#"{"categories":[{"type":"other_documents","files":["oops",{"filename":"a.jpg"}]}]}"#;
        let resp: CategorizeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.categories[0].referenced_paths(), vec!["a.jpg"]);
    }

    #[test]
    fn structure_serializes_to_backend_shape() {
        let cards = ClassificationStructure::credit_cards(vec![CardPair {
            front: Some("f.jpg".into()),
            back: None,
        }]);
        let value: Value = serde_json::from_str(&cards.to_form_value().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"categories":[{"type":"credit_cards","files":[{"front":"f.jpg","back":""}]}]})
        );

        let docs = ClassificationStructure::other_documents(vec![DocumentRef::new("r.jpg")]);
        let value: Value = serde_json::from_str(&docs.to_form_value().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"categories":[{"type":"other_documents","files":[{"filename":"r.jpg"}]}]})
        );
    }

    #[test]
    fn find_non_empty_ignores_empty_categories() {
        let cats = vec![
            Category::card_pairs(vec![]),
            Category::documents(OTHER_DOCUMENTS, vec![DocumentRef::new("a.jpg")]),
        ];
        assert!(find_non_empty(&cats, CREDIT_CARDS).is_none());
        assert!(find_non_empty(&cats, OTHER_DOCUMENTS).is_some());
        assert!(find_non_empty(&cats, "pos_receipts").is_none());
    }
}
