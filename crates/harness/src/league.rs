use serde_json::json;
use standings_core::{
    Game, LeagueDocument, Manager, MatchRecord, MatchdayBlock, MatchdayCoords, PalmaresEntry,
    PantheonEntry, PenaltyKey, Record, SeasonEntry, season_key,
};
use standings_engine::{Engine, EngineError};
use standings_storage::{Filter, SqliteStorage, Store, StorageError};
use tempfile::TempDir;

/// An engine over a fresh SQLite store, plus shortcuts for seeding it.
pub struct TestLeague {
    pub engine: Engine<SqliteStorage>,
    _dir: Option<TempDir>,
}

impl TestLeague {
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self {
            engine: Engine::new(Some(SqliteStorage::open_in_memory()?)),
            _dir: None,
        })
    }

    /// Store and engine paging both use `cap`, so a handful of rows spans pages.
    pub fn with_row_cap(cap: usize) -> Result<Self, StorageError> {
        let store = SqliteStorage::open_in_memory()?.with_row_cap(cap);
        Ok(Self {
            engine: Engine::new(Some(store)).with_page_size(cap),
            _dir: None,
        })
    }

    /// Backed by a database file in a temporary directory.
    pub fn on_disk() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("league.db");
        let store = SqliteStorage::open(&path.to_string_lossy())?;
        Ok(Self {
            engine: Engine::new(Some(store)),
            _dir: Some(dir),
        })
    }

    pub fn store(&self) -> &SqliteStorage {
        match self.engine.store() {
            Some(store) => store,
            None => unreachable!("TestLeague always configures a store"),
        }
    }

    pub async fn add_manager(&self, id: &str, name: &str) -> Result<(), EngineError> {
        self.engine
            .save_manager(&Manager {
                id: id.into(),
                name: name.into(),
            })
            .await
    }

    /// Replace one matchday with scored games given as `(home, away, hs, as)`.
    pub async fn record_matchday(
        &self,
        championship: &str,
        season: i64,
        matchday: i64,
        games: &[(&str, &str, i64, i64)],
    ) -> Result<Vec<MatchRecord>, EngineError> {
        let games: Vec<Game> = games
            .iter()
            .map(|(h, a, hs, as_)| Game::new(*h, *a).with_score(*hs, *as_))
            .collect();
        self.engine
            .replace_matchday(&MatchdayCoords::new(championship, season, matchday), None, &games)
            .await
    }

    pub async fn matches_of(&self, coords: &MatchdayCoords) -> Result<Vec<MatchRecord>, EngineError> {
        let filter = Filter::new()
            .eq("championship", coords.championship.as_str())
            .eq("season", coords.season)
            .eq("matchday", coords.matchday);
        let rows = self.store().select(standings_core::Collection::Matches, &filter).await?;
        Ok(rows
            .into_iter()
            .map(MatchRecord::from_row)
            .collect::<Result<_, _>>()?)
    }
}

/// Every row of `R`'s collection, decoded. Bounded by the store's row cap.
pub async fn all_rows<R: Record, S: Store + ?Sized>(store: &S) -> Result<Vec<R>, EngineError> {
    let rows = store.select(R::COLLECTION, &Filter::new()).await?;
    Ok(rows
        .into_iter()
        .map(R::from_row)
        .collect::<Result<_, _>>()?)
}

/// A small league touching every collection: two managers, one finished
/// season of two matchdays with an exempt team, palmares, pantheon and a
/// penalty on a team name containing underscores.
pub fn sample_document() -> LeagueDocument {
    let mut doc = LeagueDocument::default();

    for (id, name) in [("m1", "Alice"), ("m2", "Bob"), ("m3", "Carol_Team_B")] {
        doc.managers.insert(
            id.to_string(),
            Manager {
                id: id.into(),
                name: name.into(),
            },
        );
    }

    doc.seasons.insert(
        season_key("france", 1),
        SeasonEntry {
            championship: "france".into(),
            season: 1,
            standings: json!([
                {"team": "Alice", "points": 4},
                {"team": "Bob", "points": 1},
            ]),
        },
    );

    doc.matches.push(MatchdayBlock {
        championship: "france".into(),
        season: 1,
        matchday: 1,
        exempt: Some("Carol_Team_B".into()),
        games: vec![Game {
            id: Some("g-1".into()),
            ..Game::new("Alice", "Bob").with_score(2, 1)
        }],
    });
    doc.matches.push(MatchdayBlock {
        championship: "france".into(),
        season: 1,
        matchday: 2,
        exempt: None,
        games: vec![
            Game {
                id: Some("g-2".into()),
                ..Game::new("Bob", "Carol_Team_B").with_score(0, 0)
            },
            Game {
                id: Some("g-3".into()),
                ..Game::new("Carol_Team_B", "Alice").with_score(1, 1)
            },
        ],
    });

    doc.palmares.insert(
        "france".into(),
        vec![PalmaresEntry {
            season: 1,
            champion: "Alice".into(),
            runner_up: Some("Bob".into()),
        }],
    );

    doc.pantheon.push(PantheonEntry {
        name: "Alice".into(),
        total_points: 4,
        titles: 1,
        runner_ups: 0,
    });
    doc.pantheon.push(PantheonEntry {
        name: "Bob".into(),
        total_points: 1,
        titles: 0,
        runner_ups: 1,
    });

    doc.penalties
        .insert(PenaltyKey::new("france", 1, "Carol_Team_B"), -3);

    doc
}
