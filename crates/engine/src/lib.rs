pub mod assemble;
pub mod error;
pub mod import;
pub mod paged;
pub mod persist;
pub mod rename;

pub use assemble::{CollectionRows, DocumentAssembler, assemble};
pub use error::EngineError;
pub use import::{BulkImporter, FailedBlock, ImportReport};
pub use paged::{PAGE_SIZE, PagedReader};
pub use persist::RecordPersister;
pub use rename::{IdentityRenamer, RenameFailure, RenameOutcome, RenameTarget};

use serde_json::Value;
use standings_core::{Game, LeagueDocument, Manager, MatchRecord, MatchdayBlock, MatchdayCoords, SeasonRecord};
use standings_storage::Store;
use tracing::info;

/// Entry point for the operator actions and the document load.
///
/// The store is optional: without one, reads return an empty document and
/// writes fail with [`EngineError::NotConfigured`].
pub struct Engine<S> {
    store: Option<S>,
    page_size: usize,
}

impl<S: Store> Engine<S> {
    pub fn new(store: Option<S>) -> Self {
        Self {
            store,
            page_size: PAGE_SIZE,
        }
    }

    /// Page size for the match read; must not exceed the store's row cap.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    pub fn store(&self) -> Option<&S> {
        self.store.as_ref()
    }

    fn require_store(&self) -> Result<&S, EngineError> {
        self.store.as_ref().ok_or(EngineError::NotConfigured)
    }

    pub fn persister(&self) -> Result<RecordPersister<'_, S>, EngineError> {
        Ok(RecordPersister::new(self.require_store()?))
    }

    pub async fn load_document(&self) -> LeagueDocument {
        match &self.store {
            Some(store) => {
                DocumentAssembler::new(store)
                    .with_page_size(self.page_size)
                    .load()
                    .await
            }
            None => {
                info!("no store configured; serving empty document");
                LeagueDocument::default()
            }
        }
    }

    pub async fn save_manager(&self, manager: &Manager) -> Result<(), EngineError> {
        self.persister()?.save_manager(manager).await
    }

    pub async fn delete_manager(&self, manager_id: &str) -> Result<u64, EngineError> {
        self.persister()?.delete_manager(manager_id).await
    }

    pub async fn replace_matchday(
        &self,
        coords: &MatchdayCoords,
        exempt: Option<&str>,
        games: &[Game],
    ) -> Result<Vec<MatchRecord>, EngineError> {
        self.persister()?.replace_matchday(coords, exempt, games).await
    }

    pub async fn save_season_snapshot(
        &self,
        season: &SeasonRecord,
        blocks: &[MatchdayBlock],
    ) -> Result<(), EngineError> {
        self.persister()?.save_season_snapshot(season, blocks).await
    }

    pub async fn import_document(&self, doc: &LeagueDocument) -> Result<ImportReport, EngineError> {
        BulkImporter::new(self.require_store()?).import_document(doc).await
    }

    pub async fn import_value(&self, root: &Value) -> Result<ImportReport, EngineError> {
        BulkImporter::new(self.require_store()?).import_value(root).await
    }

    pub async fn rename_manager(
        &self,
        manager_id: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<RenameOutcome, EngineError> {
        IdentityRenamer::new(self.require_store()?)
            .rename(manager_id, old_name, new_name)
            .await
    }
}
