use rust_decimal::Decimal;
use thiserror::Error;

use crate::account::AccountId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatementError {
    #[error("Invalid amount {requested}: residual is {residual}")]
    InvalidAmount { requested: Decimal, residual: Decimal },
    #[error("Statement already belongs to account {current}, cannot move to {requested}")]
    AlreadyBound {
        current: AccountId,
        requested: AccountId,
    },
    #[error("Malformed record: {0}")]
    MalformedRecord(String),
}

pub type Result<T> = std::result::Result<T, StatementError>;
