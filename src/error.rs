use std::path::PathBuf;

use crate::field::ResumeField;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Redb(#[from] redb::Error),

    #[error("database open error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("database storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("database transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("database table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("database commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),

    #[error("model error: {0}")]
    Model(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("invalid result count {0}: must be zero or greater")]
    InvalidTopK(i64),

    #[error("invalid weight for {field}: {value} (must be finite and >= 0)")]
    InvalidWeight { field: ResumeField, value: f64 },

    #[error("similarity query for field '{field}' failed: {message}")]
    OracleQuery { field: ResumeField, message: String },
}
