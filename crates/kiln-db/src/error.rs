use thiserror::Error;

/// Persistence layer errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    CoreError(#[from] kiln_core::error::CoreError),
}

pub type DbResult<T> = std::result::Result<T, DbError>;
