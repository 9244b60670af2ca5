//! One customer: match -> categorize -> group credit cards -> group other documents.
//!
//! Categorization failure is returned to the caller and ends the batch. Grouping failures
//! are contained: they are reported and the pipeline moves on with the rows it has.

use crate::error::{ClassifierError, Result, Stage};
use crate::models::{
    find_non_empty, CardPair, Category, CategoryFiles, ClassificationStructure, DocumentRef,
    CREDIT_CARDS, OTHER_DOCUMENTS,
};
use crate::services::cancel::CancelToken;
use crate::services::file_matcher::match_customer_files;
use crate::services::reconciler::{
    apply_categorize, apply_credit_card_groups, apply_document_groups, bare_filename,
};
use crate::services::remote::ClassifierApi;
use crate::types::{CustomerGroup, DocumentRow, UploadedFile};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Matching,
    Categorizing,
    CreditCardGrouping,
    DocumentGrouping,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Completed { updated: usize },
    Skipped(String),
    /// Contained failure; the message is what was reported.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerOutcome {
    /// No remote call was made.
    Skipped { reason: String },
    Processed {
        categorized: usize,
        credit_cards: StageOutcome,
        documents: StageOutcome,
    },
}

#[derive(Debug, Clone)]
pub struct CustomerReport {
    pub customer: String,
    /// Updated copy of the customer's rows.
    pub rows: Vec<DocumentRow>,
    pub outcome: CustomerOutcome,
}

impl CustomerReport {
    /// Trailing status line for the customer.
    pub fn summary(&self) -> String {
        match &self.outcome {
            CustomerOutcome::Skipped { reason } => format!("{} - skipped: {}", self.customer, reason),
            CustomerOutcome::Processed {
                credit_cards,
                documents,
                ..
            } => {
                let failed = [credit_cards, documents]
                    .iter()
                    .filter(|o| matches!(o, StageOutcome::Failed(_)))
                    .count();
                if failed == 0 {
                    format!("{} - Processing complete!", self.customer)
                } else {
                    format!(
                        "{} - Processing complete with {} grouping failure(s)",
                        self.customer, failed
                    )
                }
            }
        }
    }
}

pub struct CustomerPipeline<'a, C: ClassifierApi + ?Sized> {
    client: &'a C,
    files: &'a [UploadedFile],
    cancel: &'a CancelToken,
}

impl<'a, C: ClassifierApi + ?Sized> CustomerPipeline<'a, C> {
    pub fn new(client: &'a C, files: &'a [UploadedFile], cancel: &'a CancelToken) -> Self {
        Self {
            client,
            files,
            cancel,
        }
    }

    pub fn run(&self, group: &CustomerGroup, progress: &mut dyn FnMut(&str)) -> Result<CustomerReport> {
        let customer = group.customer.as_str();
        let mut rows = group.rows.clone();
        let declared: HashSet<&str> = group.rows.iter().map(|r| r.file.as_str()).collect();

        let mut state = PipelineState::Matching;
        tracing::debug!("{}: {:?}", customer, state);
        let matched = match match_customer_files(self.files, group) {
            Ok(matched) => matched,
            Err(ClassifierError::NoFilesForCustomer { .. }) => {
                tracing::warn!("Customer \"{}\" has no matching files in the uploaded folder", customer);
                progress(&format!("No files found in folder for {} - SKIPPING", customer));
                return Ok(skipped(group, rows, "no files"));
            }
            Err(e) => return Err(e),
        };

        progress(&format!("Processing {} files for {}", matched.len(), customer));
        if matched.images.is_empty() {
            progress("No image files to process (only PDF/XML found)");
            return Ok(skipped(group, rows, "only PDF/XML files"));
        }
        let images = matched.images;

        state = PipelineState::Categorizing;
        tracing::debug!("{}: {:?}", customer, state);
        self.check_cancelled()?;
        progress(&format!("Categorizing {} image files...", images.len()));
        let categorized = match self.client.categorize(&images) {
            Ok(response) => response,
            Err(e) => {
                progress("Categorization failed");
                tracing::error!("{}: categorization error: {}", customer, e);
                return Err(e.in_stage(Stage::Categorize));
            }
        };
        let categorized_rows = apply_categorize(&mut rows, &categorized);
        progress("Categorization complete");

        state = PipelineState::CreditCardGrouping;
        tracing::debug!("{}: {:?}", customer, state);
        self.check_cancelled()?;
        let credit_cards = match find_non_empty(&categorized.categories, CREDIT_CARDS) {
            Some(category) => self.group_credit_cards(category, &declared, &images, &mut rows, progress)?,
            None => {
                progress("No credit cards - skipping grouping");
                StageOutcome::Skipped("no credit cards".into())
            }
        };

        state = PipelineState::DocumentGrouping;
        tracing::debug!("{}: {:?}", customer, state);
        self.check_cancelled()?;
        let documents = match find_non_empty(&categorized.categories, OTHER_DOCUMENTS) {
            Some(category) => self.group_documents(category, &declared, &images, &mut rows, progress)?,
            None => {
                progress("No other_documents - skipping grouping");
                StageOutcome::Skipped("no other documents".into())
            }
        };

        state = PipelineState::Done;
        tracing::debug!("{}: {:?}", customer, state);
        let report = CustomerReport {
            customer: customer.to_string(),
            rows,
            outcome: CustomerOutcome::Processed {
                categorized: categorized_rows,
                credit_cards,
                documents,
            },
        };
        progress(&report.summary());
        tracing::info!("Customer \"{}\" completed", customer);
        Ok(report)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ClassifierError::Cancelled);
        }
        Ok(())
    }

    fn group_credit_cards(
        &self,
        category: &Category,
        declared: &HashSet<&str>,
        images: &[&UploadedFile],
        rows: &mut [DocumentRow],
        progress: &mut dyn FnMut(&str),
    ) -> Result<StageOutcome> {
        let (pairs, names) = declared_card_pairs(category, declared);
        // No request at all here, where the web client posted an empty structure.
        if pairs.is_empty() {
            progress("No declared credit card files - skipping grouping");
            return Ok(StageOutcome::Skipped("no declared credit card files".into()));
        }
        let upload: Vec<&UploadedFile> = images
            .iter()
            .copied()
            .filter(|f| names.contains(f.name.as_str()))
            .collect();
        let structure = ClassificationStructure::credit_cards(pairs);

        progress(&format!("Grouping {} credit card files...", upload.len()));
        match self.client.group_credit_cards(&upload, &structure) {
            Ok(response) => {
                let updated = apply_credit_card_groups(rows, &response);
                progress("Credit card grouping complete");
                Ok(StageOutcome::Completed { updated })
            }
            Err(ClassifierError::Cancelled) => Err(ClassifierError::Cancelled),
            Err(e) => Ok(contain(Stage::CreditCardGrouping, e, &upload, progress)),
        }
    }

    fn group_documents(
        &self,
        category: &Category,
        declared: &HashSet<&str>,
        images: &[&UploadedFile],
        rows: &mut [DocumentRow],
        progress: &mut dyn FnMut(&str),
    ) -> Result<StageOutcome> {
        let (docs, names) = declared_documents(category, declared);
        // Same as for cards: nothing declared means no request.
        if docs.is_empty() {
            progress("No declared other_documents files - skipping grouping");
            return Ok(StageOutcome::Skipped("no declared other documents".into()));
        }
        let upload: Vec<&UploadedFile> = images
            .iter()
            .copied()
            .filter(|f| names.contains(f.name.as_str()))
            .collect();
        let doc_count = docs.len();
        let structure = ClassificationStructure::other_documents(docs);

        progress(&format!("Processing {} other documents...", doc_count));
        match self.client.group_documents(&upload, &structure) {
            Ok(response) => {
                let updated = apply_document_groups(rows, &response);
                progress("Document grouping complete");
                Ok(StageOutcome::Completed { updated })
            }
            Err(ClassifierError::Cancelled) => Err(ClassifierError::Cancelled),
            Err(e) => Ok(contain(Stage::DocumentGrouping, e, &upload, progress)),
        }
    }
}

fn skipped(group: &CustomerGroup, rows: Vec<DocumentRow>, reason: &str) -> CustomerReport {
    CustomerReport {
        customer: group.customer.clone(),
        rows,
        outcome: CustomerOutcome::Skipped {
            reason: reason.to_string(),
        },
    }
}

fn contain(
    stage: Stage,
    error: ClassifierError,
    sent: &[&UploadedFile],
    progress: &mut dyn FnMut(&str),
) -> StageOutcome {
    let error = error.in_stage(stage);
    let sent_names: Vec<&str> = sent.iter().map(|f| f.name.as_str()).collect();
    tracing::warn!("{} (files sent: {:?}); continuing", error, sent_names);
    let message = format!("{} failed - continuing", stage);
    progress(&message);
    StageOutcome::Failed(error.to_string())
}

/// Pairs with at least one declared side, reduced to bare names, plus the declared names.
fn declared_card_pairs<'d>(
    category: &Category,
    declared: &HashSet<&'d str>,
) -> (Vec<CardPair>, HashSet<&'d str>) {
    let mut pairs = Vec::new();
    let mut names = HashSet::new();
    let CategoryFiles::CardPairs(source) = &category.files else {
        return (pairs, names);
    };
    for pair in source {
        let front = pair.front.as_deref().map(bare_filename).unwrap_or_default();
        let back = pair.back.as_deref().map(bare_filename).unwrap_or_default();
        let declared_front = declared.get(front).copied().filter(|s| !s.is_empty());
        let declared_back = declared.get(back).copied().filter(|s| !s.is_empty());
        if declared_front.is_none() && declared_back.is_none() {
            continue;
        }
        names.extend(declared_front);
        names.extend(declared_back);
        pairs.push(CardPair {
            front: Some(front.to_string()),
            back: Some(back.to_string()),
        });
    }
    (pairs, names)
}

/// Declared documents of the category as bare names.
fn declared_documents<'d>(
    category: &Category,
    declared: &HashSet<&'d str>,
) -> (Vec<DocumentRef>, HashSet<&'d str>) {
    let mut docs = Vec::new();
    let mut names = HashSet::new();
    for path in category.referenced_paths() {
        if let Some(&name) = declared.get(bare_filename(path)) {
            if names.insert(name) {
                docs.push(DocumentRef::new(name));
            }
        }
    }
    (docs, names)
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use crate::models::{CategorizeResponse, CreditCardGroupResponse, DocumentGroupResponse};
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Call {
        pub stage: Stage,
        pub files: Vec<String>,
        pub structure: Option<String>,
    }

    /// Scripted backend keyed by stage. Missing script entries answer with an empty body.
    #[derive(Default)]
    pub struct FakeClassifier {
        pub categorize: RefCell<Vec<Result<CategorizeResponse>>>,
        pub credit_cards: RefCell<Vec<Result<CreditCardGroupResponse>>>,
        pub documents: RefCell<Vec<Result<DocumentGroupResponse>>>,
        pub calls: RefCell<Vec<Call>>,
    }

    pub fn server_error(stage: Stage) -> ClassifierError {
        ClassifierError::Remote {
            endpoint: stage.endpoint(),
            status: 500,
            body: "Internal Server Error".into(),
        }
    }

    impl FakeClassifier {
        pub fn calls_for(&self, stage: Stage) -> Vec<Call> {
            self.calls
                .borrow()
                .iter()
                .filter(|c| c.stage == stage)
                .cloned()
                .collect()
        }

        fn record(&self, stage: Stage, files: &[&UploadedFile], structure: Option<&ClassificationStructure>) {
            self.calls.borrow_mut().push(Call {
                stage,
                files: files.iter().map(|f| f.name.clone()).collect(),
                structure: structure.map(|s| s.to_form_value().unwrap()),
            });
        }
    }

    fn next<T: Default>(script: &RefCell<Vec<Result<T>>>) -> Result<T> {
        let mut script = script.borrow_mut();
        if script.is_empty() {
            Ok(T::default())
        } else {
            script.remove(0)
        }
    }

    impl ClassifierApi for FakeClassifier {
        fn categorize(&self, files: &[&UploadedFile]) -> Result<CategorizeResponse> {
            self.record(Stage::Categorize, files, None);
            next(&self.categorize)
        }

        fn group_credit_cards(
            &self,
            files: &[&UploadedFile],
            structure: &ClassificationStructure,
        ) -> Result<CreditCardGroupResponse> {
            self.record(Stage::CreditCardGrouping, files, Some(structure));
            next(&self.credit_cards)
        }

        fn group_documents(
            &self,
            files: &[&UploadedFile],
            structure: &ClassificationStructure,
        ) -> Result<DocumentGroupResponse> {
            self.record(Stage::DocumentGrouping, files, Some(structure));
            next(&self.documents)
        }
    }
}
