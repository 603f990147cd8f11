use crate::config::ConfigError;
use crate::db::AccountError;
use crate::doc_processor::DocumentError;
use crate::embedding::EmbeddingError;
use crate::llm::LlmError;

/// Failure of a user interaction. The `Display` text is what the user sees.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Please log in first")]
    NotLoggedIn,
    #[error("Upload a medical report first")]
    NoReport,
    #[error("Message is empty")]
    EmptyInput,
}

pub type Result<T> = std::result::Result<T, Error>;
