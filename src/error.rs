use thiserror::Error;

/// Failures reported by an [`EmployeeStore`](crate::store::EmployeeStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no employee document with id {0}")]
    NotFound(String),
    #[error("malformed employee id {0:?}")]
    InvalidId(String),
    #[error("employee store unavailable: {0}")]
    Unavailable(String),
    #[error("employee could not be encoded: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("secret {0} was not found")]
    Missing(&'static str),
    #[error("secret {key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("malformed page cursor {0:?}")]
pub struct CursorError(pub String);
