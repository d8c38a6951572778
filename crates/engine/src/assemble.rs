//! Flat relational rows to the nested league document.

use indexmap::IndexMap;
use standings_core::{
    ChampionRecord, Collection, Game, LeagueDocument, Manager, MatchRecord, MatchdayBlock,
    PalmaresEntry, PantheonEntry, PantheonRecord, PenaltyKey, PenaltyRecord, Record, Row,
    SeasonEntry, SeasonRecord, season_key,
};
use standings_storage::Store;
use tracing::{debug, warn};

use crate::paged::{PAGE_SIZE, PagedReader};

/// Decoded contents of all six collections.
#[derive(Debug, Clone, Default)]
pub struct CollectionRows {
    pub managers: Vec<Manager>,
    pub seasons: Vec<SeasonRecord>,
    pub matches: Vec<MatchRecord>,
    pub champions: Vec<ChampionRecord>,
    pub pantheon: Vec<PantheonRecord>,
    pub penalties: Vec<PenaltyRecord>,
}

/// Build the nested document from decoded rows.
///
/// Matchday blocks appear in the order their first row appears in
/// `rows.matches`, and a block is only created for a row, so none is empty.
pub fn assemble(rows: &CollectionRows) -> LeagueDocument {
    let managers = rows
        .managers
        .iter()
        .map(|m| (m.id.clone(), m.clone()))
        .collect();

    let seasons = rows
        .seasons
        .iter()
        .map(|s| {
            (
                season_key(&s.championship, s.season_number),
                SeasonEntry {
                    championship: s.championship.clone(),
                    season: s.season_number,
                    standings: s.standings.clone(),
                },
            )
        })
        .collect();

    let mut blocks: IndexMap<_, MatchdayBlock> = IndexMap::new();
    for m in &rows.matches {
        let key = (m.championship.as_str(), m.season, m.matchday);
        let block = blocks.entry(key).or_insert_with(|| MatchdayBlock {
            championship: m.championship.clone(),
            season: m.season,
            matchday: m.matchday,
            exempt: None,
            games: Vec::new(),
        });
        if block.exempt.is_none() {
            block.exempt = m.exempt_team.clone();
        }
        block.games.push(Game {
            id: Some(m.id.clone()),
            home_team: m.home_team.clone(),
            away_team: m.away_team.clone(),
            home_score: m.home_score,
            away_score: m.away_score,
        });
    }

    let mut palmares: IndexMap<String, Vec<PalmaresEntry>> = IndexMap::new();
    for c in &rows.champions {
        palmares
            .entry(c.championship.clone())
            .or_default()
            .push(PalmaresEntry {
                season: c.season,
                champion: c.champion_name.clone(),
                runner_up: c.runner_up_name.clone(),
            });
    }
    for entries in palmares.values_mut() {
        entries.sort_by_key(|e| e.season);
    }

    let mut pantheon: Vec<PantheonEntry> = rows
        .pantheon
        .iter()
        .map(|p| PantheonEntry {
            name: p.manager_name.clone(),
            total_points: p.total_points,
            titles: p.titles,
            runner_ups: p.runner_ups,
        })
        .collect();
    pantheon.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then_with(|| a.name.cmp(&b.name))
    });

    let penalties = rows
        .penalties
        .iter()
        .map(|p| {
            (
                PenaltyKey::new(p.championship.clone(), p.season, p.team_name.clone()),
                p.points,
            )
        })
        .collect();

    LeagueDocument {
        managers,
        seasons,
        matches: blocks.into_values().collect(),
        palmares,
        pantheon,
        penalties,
    }
}

/// Loads every collection concurrently and assembles the document.
pub struct DocumentAssembler<'a, S: ?Sized> {
    store: &'a S,
    page_size: usize,
}

impl<'a, S: Store + ?Sized> DocumentAssembler<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            page_size: PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Never fails: a collection whose read fails is logged and keeps only
    /// the rows read before the failure.
    pub async fn load(&self) -> LeagueDocument {
        let rows = self.fetch_rows().await;
        let doc = assemble(&rows);
        debug!(
            managers = doc.managers.len(),
            seasons = doc.seasons.len(),
            matchdays = doc.matches.len(),
            pantheon = doc.pantheon.len(),
            penalties = doc.penalties.len(),
            "document assembled"
        );
        doc
    }

    /// Every collection is paged, so none is truncated at the store's cap.
    pub async fn fetch_rows(&self) -> CollectionRows {
        let (managers, seasons, matches, champions, pantheon, penalties) = futures::join!(
            self.fetch::<Manager>(),
            self.fetch::<SeasonRecord>(),
            self.fetch::<MatchRecord>(),
            self.fetch::<ChampionRecord>(),
            self.fetch::<PantheonRecord>(),
            self.fetch::<PenaltyRecord>(),
        );
        CollectionRows {
            managers,
            seasons,
            matches,
            champions,
            pantheon,
            penalties,
        }
    }

    async fn fetch<R: Record>(&self) -> Vec<R> {
        let collection = R::COLLECTION;
        let rows = PagedReader::new(self.store)
            .with_page_size(self.page_size)
            .fetch_all(collection, collection.order_key())
            .await;
        decode(collection, rows)
    }
}

fn decode<R: Record>(collection: Collection, rows: Vec<Row>) -> Vec<R> {
    rows.into_iter()
        .filter_map(|row| match R::from_row(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(collection = %collection, error = %e, "skipping undecodable row");
                None
            }
        })
        .collect()
}
