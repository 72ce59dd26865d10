use thiserror::Error;

use crate::classify::ClassificationIssue;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Input is empty")]
    EmptyInput,

    #[error("No valid rows after parsing ({discarded} discarded)")]
    NoValidRows { discarded: usize },

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Insufficient history: need at least {required} months, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    #[error("Account '{name}' already exists under '{parent}'")]
    DuplicateAccount { parent: String, name: String },

    #[error("Account path not found: {0}")]
    AccountNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(uuid::Uuid),

    #[error("Invalid classification: {0}")]
    Classification(#[from] ClassificationIssue),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "assistant")]
    #[error("Assistant request failed: {0}")]
    AssistantTransport(#[from] reqwest::Error),

    #[cfg(feature = "assistant")]
    #[error("Assistant API error (status {status}): {body}")]
    AssistantApi { status: u16, body: String },
}

pub type Result<T> = std::result::Result<T, LedgerError>;
