use standings_core::Collection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("unknown column `{column}` on {collection}")]
    UnknownColumn {
        collection: Collection,
        column: String,
    },

    #[error("column `{column}` on {collection} expects {expected}")]
    TypeMismatch {
        collection: Collection,
        column: String,
        expected: &'static str,
    },

    #[error("refusing unfiltered {op} on {collection}")]
    UnfilteredWrite {
        op: &'static str,
        collection: Collection,
    },

    #[error("remote store error: {0}")]
    Remote(String),
}
