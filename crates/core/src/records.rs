//! Relational rows as stored, one struct per collection.
//!
//! Field names match the store's column names, so a record converts to and
//! from a [`Row`] through serde without any mapping table.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{Collection, Row, error::CoreError};

pub trait Record: Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    fn to_row(&self) -> Result<Row, CoreError> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(CoreError::Serialization(format!(
                "{} record serialized to non-object: {other}",
                Self::COLLECTION
            ))),
        }
    }

    fn from_row(row: Row) -> Result<Self, CoreError> {
        Ok(serde_json::from_value(Value::Object(row))?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Manager {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonRecord {
    pub championship: String,
    pub season_number: i64,
    #[serde(default)]
    pub standings: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: String,
    pub championship: String,
    pub season: i64,
    pub matchday: i64,
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
    pub exempt_team: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChampionRecord {
    pub championship: String,
    pub season: i64,
    pub champion_name: String,
    pub runner_up_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PantheonRecord {
    pub manager_name: String,
    pub total_points: i64,
    pub titles: i64,
    pub runner_ups: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PenaltyRecord {
    pub championship: String,
    pub season: i64,
    pub team_name: String,
    pub points: i64,
}

impl Record for Manager {
    const COLLECTION: Collection = Collection::Managers;
}

impl Record for SeasonRecord {
    const COLLECTION: Collection = Collection::Seasons;
}

impl Record for MatchRecord {
    const COLLECTION: Collection = Collection::Matches;
}

impl Record for ChampionRecord {
    const COLLECTION: Collection = Collection::Champions;
}

impl Record for PantheonRecord {
    const COLLECTION: Collection = Collection::Pantheon;
}

impl Record for PenaltyRecord {
    const COLLECTION: Collection = Collection::Penalties;
}
