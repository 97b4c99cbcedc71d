use tally_core::{AccountId, StatementError, StatementId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Statement(#[from] StatementError),
    #[error("Invalid settings: {0}")]
    Settings(String),
    #[error("Invalid classification rules: {0}")]
    Rules(String),
    #[error("Account not found: {0}")]
    UnknownAccount(AccountId),
    #[error("Statement not found: {0}")]
    UnknownStatement(StatementId),
    #[error("Import worker failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, ImportError>;
