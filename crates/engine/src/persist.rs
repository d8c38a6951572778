use std::collections::HashSet;

use standings_core::{
    ChampionRecord, Collection, Game, Manager, MatchRecord, MatchdayBlock, MatchdayCoords,
    PantheonRecord, PenaltyKey, PenaltyRecord, Record, Row, SeasonRecord, ids::new_match_id,
};
use standings_storage::{Filter, Store};
use tracing::{debug, info, instrument};

use crate::error::EngineError;

/// Whole-row writes, one per entity type.
///
/// Every write either lands completely or returns the store's error; nothing
/// is retried here.
pub struct RecordPersister<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> RecordPersister<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Upsert records on their collection's conflict key.
    pub async fn upsert<R: Record + Sync>(&self, records: &[R]) -> Result<u64, EngineError> {
        if records.is_empty() {
            return Ok(0);
        }
        let rows = records
            .iter()
            .map(Record::to_row)
            .collect::<Result<Vec<Row>, _>>()?;
        Ok(self.store.upsert(R::COLLECTION, &rows).await?)
    }

    pub async fn save_manager(&self, manager: &Manager) -> Result<(), EngineError> {
        require_text(&manager.id, "manager id")?;
        require_text(&manager.name, "manager name")?;
        self.upsert(std::slice::from_ref(manager)).await?;
        Ok(())
    }

    pub async fn save_season(&self, season: &SeasonRecord) -> Result<(), EngineError> {
        require_text(&season.championship, "championship")?;
        self.upsert(std::slice::from_ref(season)).await?;
        Ok(())
    }

    pub async fn save_champion(&self, champion: &ChampionRecord) -> Result<(), EngineError> {
        self.upsert(std::slice::from_ref(champion)).await?;
        Ok(())
    }

    pub async fn save_pantheon_entry(&self, entry: &PantheonRecord) -> Result<(), EngineError> {
        self.upsert(std::slice::from_ref(entry)).await?;
        Ok(())
    }

    pub async fn save_penalty(&self, penalty: &PenaltyRecord) -> Result<(), EngineError> {
        self.upsert(std::slice::from_ref(penalty)).await?;
        Ok(())
    }

    pub async fn delete_manager(&self, manager_id: &str) -> Result<u64, EngineError> {
        let filter = Filter::new().eq("id", manager_id);
        Ok(self.store.delete(Collection::Managers, &filter).await?)
    }

    pub async fn delete_champion(&self, championship: &str, season: i64) -> Result<u64, EngineError> {
        let filter = Filter::new()
            .eq("championship", championship)
            .eq("season", season);
        Ok(self.store.delete(Collection::Champions, &filter).await?)
    }

    pub async fn delete_penalty(&self, key: &PenaltyKey) -> Result<u64, EngineError> {
        let filter = Filter::new()
            .eq("championship", key.championship.as_str())
            .eq("season", key.season)
            .eq("team_name", key.team_name.as_str());
        Ok(self.store.delete(Collection::Penalties, &filter).await?)
    }

    /// Replace every match of one matchday with `games`.
    ///
    /// Games missing a side are dropped first. The old rows are deleted
    /// before the new ones are inserted, as two separate store calls: if the
    /// insert fails (or the process dies in between) the matchday is left
    /// empty until the next replace.
    #[instrument(skip_all, fields(matchday = %coords))]
    pub async fn replace_matchday(
        &self,
        coords: &MatchdayCoords,
        exempt: Option<&str>,
        games: &[Game],
    ) -> Result<Vec<MatchRecord>, EngineError> {
        validate_coords(coords)?;
        let exempt = exempt.filter(|e| !e.trim().is_empty());

        let records: Vec<MatchRecord> = games
            .iter()
            .filter(|g| g.has_both_teams())
            .map(|g| MatchRecord {
                id: g.id.clone().unwrap_or_else(new_match_id),
                championship: coords.championship.clone(),
                season: coords.season,
                matchday: coords.matchday,
                home_team: g.home_team.clone(),
                away_team: g.away_team.clone(),
                home_score: g.home_score,
                away_score: g.away_score,
                exempt_team: exempt.map(str::to_string),
            })
            .collect();

        {
            let mut seen = HashSet::new();
            if let Some(dup) = records.iter().find(|r| !seen.insert(r.id.as_str())) {
                return Err(EngineError::InvalidInput(format!(
                    "duplicate game id {} in {coords}",
                    dup.id
                )));
            }
        }

        self.check_foreign_ids(coords, games).await?;

        let filter = Filter::new()
            .eq("championship", coords.championship.as_str())
            .eq("season", coords.season)
            .eq("matchday", coords.matchday);
        let deleted = self.store.delete(Collection::Matches, &filter).await?;

        if records.is_empty() {
            debug!(deleted, "matchday cleared");
            return Ok(records);
        }

        let rows = records
            .iter()
            .map(Record::to_row)
            .collect::<Result<Vec<Row>, _>>()?;
        self.store.insert(Collection::Matches, &rows).await?;
        debug!(deleted, inserted = records.len(), "matchday replaced");
        Ok(records)
    }

    /// Match ids are global, so a supplied id already stored under other
    /// coordinates would fail the insert after the delete has run.
    async fn check_foreign_ids(&self, coords: &MatchdayCoords, games: &[Game]) -> Result<(), EngineError> {
        let supplied = games
            .iter()
            .filter(|g| g.has_both_teams())
            .filter_map(|g| g.id.as_deref());
        for id in supplied {
            let rows = self
                .store
                .select(Collection::Matches, &Filter::new().eq("id", id))
                .await?;
            for row in rows {
                let existing = MatchRecord::from_row(row)?;
                if existing.championship != coords.championship
                    || existing.season != coords.season
                    || existing.matchday != coords.matchday
                {
                    return Err(EngineError::InvalidInput(format!(
                        "game id {id} already belongs to {}",
                        MatchdayCoords::new(existing.championship, existing.season, existing.matchday)
                    )));
                }
            }
        }
        Ok(())
    }

    /// Save a whole season: the standings snapshot row, then each matchday.
    ///
    /// Matchdays not present in `blocks` are left as they are.
    #[instrument(skip_all, fields(championship = %season.championship, season = season.season_number))]
    pub async fn save_season_snapshot(
        &self,
        season: &SeasonRecord,
        blocks: &[MatchdayBlock],
    ) -> Result<(), EngineError> {
        if let Some(stray) = blocks.iter().find(|b| {
            b.championship != season.championship || b.season != season.season_number
        }) {
            return Err(EngineError::InvalidInput(format!(
                "matchday {} does not belong to {} season {}",
                stray.coords(),
                season.championship,
                season.season_number
            )));
        }

        self.save_season(season).await?;
        for block in blocks {
            self.replace_matchday(&block.coords(), block.exempt.as_deref(), &block.games)
                .await?;
        }
        info!(matchdays = blocks.len(), "season snapshot saved");
        Ok(())
    }
}

fn require_text(value: &str, what: &str) -> Result<(), EngineError> {
    if value.trim().is_empty() {
        return Err(EngineError::InvalidInput(format!("{what} must not be blank")));
    }
    Ok(())
}

fn validate_coords(coords: &MatchdayCoords) -> Result<(), EngineError> {
    require_text(&coords.championship, "championship")?;
    if coords.season < 1 || coords.matchday < 1 {
        return Err(EngineError::InvalidInput(format!(
            "season and matchday must be positive, got {coords}"
        )));
    }
    Ok(())
}
