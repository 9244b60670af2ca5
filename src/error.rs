use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClassifierError>;

/// One of the three remote classification calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Categorize,
    CreditCardGrouping,
    DocumentGrouping,
}

impl Stage {
    pub fn endpoint(self) -> &'static str {
        match self {
            Stage::Categorize => "/categorize",
            Stage::CreditCardGrouping => "/group_credit_cards",
            Stage::DocumentGrouping => "/group_documents",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Categorize => "Categorization",
            Stage::CreditCardGrouping => "Credit card grouping",
            Stage::DocumentGrouping => "Document grouping",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ClassifierError {
    /// Connection-level failure; the only kind the retry policy repeats.
    #[error("{endpoint} request failed: {message}")]
    Transport {
        endpoint: &'static str,
        message: String,
    },

    /// Backend answered with a non-2xx status.
    #[error("{endpoint} failed: {status} - {body}")]
    Remote {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    /// 2xx response whose body is not the expected JSON.
    #[error("invalid {endpoint} response: {message}")]
    InvalidResponse {
        endpoint: &'static str,
        message: String,
    },

    #[error("no files found in folder for {customer}")]
    NoFilesForCustomer { customer: String },

    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<ClassifierError>,
    },

    #[error("processing cancelled")]
    Cancelled,

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ClassifierError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ClassifierError::Transport { .. })
    }

    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            ClassifierError::Cancelled => ClassifierError::Cancelled,
            other => ClassifierError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }
}
