use entity_mapping::{MappingError, MaterializeError, ValueTypeError};
use thiserror::Error;

/// Error taxonomy of the data-access core.
///
/// Validation errors (`InvalidArgument`, `Mapping`) are raised before any
/// I/O and are never retried here; I/O and materialization errors propagate
/// unchanged to the caller.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("column mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("materialization error: {0}")]
    Materialize(#[from] MaterializeError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("transaction failure: {0}")]
    TransactionFailure(String),

    #[error("session error: {0}")]
    Session(#[from] sqlx::Error),
}

impl From<ValueTypeError> for RepoError {
    fn from(err: ValueTypeError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}
