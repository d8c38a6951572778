//! Nested document back into the relational store.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use standings_core::{
    ChampionRecord, LeagueDocument, Manager, PalmaresEntry, PantheonEntry, PantheonRecord,
    PenaltyRecord, SeasonEntry, SeasonRecord, legacy,
};
use standings_storage::Store;
use tracing::{info, instrument, warn};

use crate::error::EngineError;
use crate::persist::RecordPersister;

/// Blocks between progress log lines.
pub const PROGRESS_INTERVAL: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// Always `true` in a returned report: an import that cannot finish
    /// returns [`EngineError::ImportAborted`] instead. Failed matchday blocks
    /// do not clear it; they show up in `error_count`.
    pub success: bool,
    pub imported_count: usize,
    pub error_count: usize,
    pub failed_blocks: Vec<FailedBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedBlock {
    pub matchday: String,
    pub reason: String,
}

pub struct BulkImporter<'a, S: ?Sized> {
    persister: RecordPersister<'a, S>,
    on_progress: Option<&'a (dyn Fn(usize, usize) + Send + Sync)>,
}

impl<'a, S: Store + ?Sized> BulkImporter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            persister: RecordPersister::new(store),
            on_progress: None,
        }
    }

    /// Called with `(done, total)` blocks every [`PROGRESS_INTERVAL`] blocks
    /// and after the last one.
    pub fn on_progress(mut self, observer: &'a (dyn Fn(usize, usize) + Send + Sync)) -> Self {
        self.on_progress = Some(observer);
        self
    }

    pub async fn import_document(&self, doc: &LeagueDocument) -> Result<ImportReport, EngineError> {
        let value = serde_json::to_value(doc).map_err(standings_core::CoreError::from)?;
        self.import_value(&value).await
    }

    /// Import a document in either the current or the abbreviated legacy shape.
    ///
    /// Sections are written in dependency order, managers first. Matchday
    /// blocks are imported one at a time and fail individually; any other
    /// section failing aborts the import.
    #[instrument(skip_all)]
    pub async fn import_value(&self, root: &Value) -> Result<ImportReport, EngineError> {
        let managers: IndexMap<String, Manager> = legacy::section(root, "managers").map_err(abort("managers"))?;
        let managers: Vec<Manager> = managers.into_values().collect();
        self.persister.upsert(&managers).await.map_err(abort("managers"))?;
        info!(count = managers.len(), "managers imported");

        let seasons: IndexMap<String, SeasonEntry> = legacy::section(root, "seasons").map_err(abort("seasons"))?;
        let seasons: Vec<SeasonRecord> = seasons
            .into_values()
            .map(|s| SeasonRecord {
                championship: s.championship,
                season_number: s.season,
                standings: s.standings,
            })
            .collect();
        self.persister.upsert(&seasons).await.map_err(abort("seasons"))?;
        info!(count = seasons.len(), "seasons imported");

        let mut report = self.import_blocks(root).await.map_err(abort("matches"))?;

        let palmares: IndexMap<String, Vec<PalmaresEntry>> =
            legacy::section(root, "palmares").map_err(abort("palmares"))?;
        let champions: Vec<ChampionRecord> = palmares
            .into_iter()
            .flat_map(|(championship, entries)| {
                entries.into_iter().map(move |e| ChampionRecord {
                    championship: championship.clone(),
                    season: e.season,
                    champion_name: e.champion,
                    runner_up_name: e.runner_up,
                })
            })
            .collect();
        self.persister.upsert(&champions).await.map_err(abort("palmares"))?;
        info!(count = champions.len(), "champions imported");

        let pantheon: Vec<PantheonEntry> = legacy::section(root, "pantheon").map_err(abort("pantheon"))?;
        let pantheon: Vec<PantheonRecord> = pantheon
            .into_iter()
            .map(|p| PantheonRecord {
                manager_name: p.name,
                total_points: p.total_points,
                titles: p.titles,
                runner_ups: p.runner_ups,
            })
            .collect();
        self.persister.upsert(&pantheon).await.map_err(abort("pantheon"))?;
        info!(count = pantheon.len(), "pantheon imported");

        let penalties: Vec<PenaltyRecord> = legacy::parse_penalties(root)
            .map_err(abort("penalties"))?
            .into_iter()
            .map(|(key, points)| PenaltyRecord {
                championship: key.championship,
                season: key.season,
                team_name: key.team_name,
                points,
            })
            .collect();
        self.persister.upsert(&penalties).await.map_err(abort("penalties"))?;
        info!(count = penalties.len(), "penalties imported");

        report.success = true;
        info!(
            imported = report.imported_count,
            errors = report.error_count,
            "import finished"
        );
        Ok(report)
    }

    async fn import_blocks(&self, root: &Value) -> Result<ImportReport, EngineError> {
        let blocks = legacy::raw_blocks(root)?;
        let total = blocks.len();
        let mut report = ImportReport::default();

        for (i, raw) in blocks.iter().enumerate() {
            let outcome = match legacy::parse_block(raw) {
                Ok(block) => self
                    .persister
                    .replace_matchday(&block.coords(), block.exempt.as_deref(), &block.games)
                    .await
                    .map(|_| ()),
                Err(e) => Err(e.into()),
            };

            match outcome {
                Ok(()) => report.imported_count += 1,
                Err(e) => {
                    let matchday = legacy::describe_block(raw);
                    warn!(%matchday, error = %e, "matchday block failed to import");
                    report.error_count += 1;
                    report.failed_blocks.push(FailedBlock {
                        matchday,
                        reason: e.to_string(),
                    });
                }
            }

            let done = i + 1;
            if done % PROGRESS_INTERVAL == 0 || done == total {
                info!(done, total, errors = report.error_count, "matchday import progress");
                if let Some(observer) = self.on_progress {
                    observer(done, total);
                }
            }
        }

        Ok(report)
    }
}

fn abort<E: Into<EngineError>>(section: &'static str) -> impl Fn(E) -> EngineError {
    move |e| EngineError::ImportAborted {
        section,
        source: Box::new(e.into()),
    }
}
