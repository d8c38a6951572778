use rusqlite::Connection;
use standings_core::Collection;

use crate::error::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    /// Opaque JSON document stored as text.
    Json,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "an integer",
            Self::Json => "json",
        }
    }
}

#[derive(Debug)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [(&'static str, ColumnKind)],
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<ColumnKind> {
        self.columns
            .iter()
            .find(|(c, _)| *c == name)
            .map(|(_, kind)| *kind)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> {
        self.columns.iter().map(|(c, _)| *c)
    }
}

use ColumnKind::{Integer, Json, Text};

const MANAGERS: TableDef = TableDef {
    name: "managers",
    columns: &[("id", Text), ("name", Text)],
};

const SEASONS: TableDef = TableDef {
    name: "seasons",
    columns: &[
        ("championship", Text),
        ("season_number", Integer),
        ("standings", Json),
    ],
};

const MATCHES: TableDef = TableDef {
    name: "matches",
    columns: &[
        ("id", Text),
        ("championship", Text),
        ("season", Integer),
        ("matchday", Integer),
        ("home_team", Text),
        ("away_team", Text),
        ("home_score", Integer),
        ("away_score", Integer),
        ("exempt_team", Text),
    ],
};

const CHAMPIONS: TableDef = TableDef {
    name: "champions",
    columns: &[
        ("championship", Text),
        ("season", Integer),
        ("champion_name", Text),
        ("runner_up_name", Text),
    ],
};

const PANTHEON: TableDef = TableDef {
    name: "pantheon",
    columns: &[
        ("manager_name", Text),
        ("total_points", Integer),
        ("titles", Integer),
        ("runner_ups", Integer),
    ],
};

const PENALTIES: TableDef = TableDef {
    name: "penalties",
    columns: &[
        ("championship", Text),
        ("season", Integer),
        ("team_name", Text),
        ("points", Integer),
    ],
};

pub fn table(collection: Collection) -> &'static TableDef {
    match collection {
        Collection::Managers => &MANAGERS,
        Collection::Seasons => &SEASONS,
        Collection::Matches => &MATCHES,
        Collection::Champions => &CHAMPIONS,
        Collection::Pantheon => &PANTHEON,
        Collection::Penalties => &PENALTIES,
    }
}

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA cache_size = -32000;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

// No foreign keys: team names reference managers by value only.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS managers (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS seasons (
    championship TEXT NOT NULL,
    season_number INTEGER NOT NULL CHECK (season_number >= 1),
    standings TEXT,
    UNIQUE (championship, season_number)
);

CREATE TABLE IF NOT EXISTS matches (
    id TEXT PRIMARY KEY,
    championship TEXT NOT NULL,
    season INTEGER NOT NULL CHECK (season >= 1),
    matchday INTEGER NOT NULL CHECK (matchday >= 1),
    home_team TEXT NOT NULL,
    away_team TEXT NOT NULL,
    home_score INTEGER,
    away_score INTEGER,
    exempt_team TEXT
);
CREATE INDEX IF NOT EXISTS idx_matches_matchday ON matches (championship, season, matchday);
CREATE INDEX IF NOT EXISTS idx_matches_order ON matches (matchday);

CREATE TABLE IF NOT EXISTS champions (
    championship TEXT NOT NULL,
    season INTEGER NOT NULL,
    champion_name TEXT NOT NULL,
    runner_up_name TEXT,
    UNIQUE (championship, season)
);

CREATE TABLE IF NOT EXISTS pantheon (
    manager_name TEXT NOT NULL UNIQUE,
    total_points INTEGER NOT NULL DEFAULT 0,
    titles INTEGER NOT NULL DEFAULT 0,
    runner_ups INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS penalties (
    championship TEXT NOT NULL,
    season INTEGER NOT NULL,
    team_name TEXT NOT NULL,
    points INTEGER NOT NULL,
    UNIQUE (championship, season, team_name)
);
";
