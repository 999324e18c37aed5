// errors.rs
use thiserror::Error;

/// Errors from the SQLite-backed listing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Open DB failed: {0}")]
    Open(String),
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("Database Error: {0}")]
    DbError(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::DbError(e.to_string())
    }
}
