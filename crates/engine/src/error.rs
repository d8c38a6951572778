use standings_core::CoreError;
use standings_storage::StorageError;
use thiserror::Error;

use crate::rename::RenameFailure;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no store configured")]
    NotConfigured,

    #[error("persistence error: {0}")]
    Persistence(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("manager not found: {0}")]
    ManagerNotFound(String),

    #[error("rename of manager {manager_id} incomplete: {} of {total} targets failed", .failures.len())]
    PartialRename {
        manager_id: String,
        total: usize,
        failures: Vec<RenameFailure>,
    },

    #[error("import aborted in {section}: {source}")]
    ImportAborted {
        section: &'static str,
        #[source]
        source: Box<EngineError>,
    },
}
