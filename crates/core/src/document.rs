//! The nested league document consumed by the standings and UI layers.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::records::Manager;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeagueDocument {
    pub managers: IndexMap<String, Manager>,
    pub seasons: IndexMap<String, SeasonEntry>,
    pub matches: Vec<MatchdayBlock>,
    pub palmares: IndexMap<String, Vec<PalmaresEntry>>,
    pub pantheon: Vec<PantheonEntry>,
    #[serde(with = "penalty_list")]
    pub penalties: IndexMap<PenaltyKey, i64>,
}

impl LeagueDocument {
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
            && self.seasons.is_empty()
            && self.matches.is_empty()
            && self.palmares.is_empty()
            && self.pantheon.is_empty()
            && self.penalties.is_empty()
    }

    pub fn season(&self, championship: &str, season: i64) -> Option<&SeasonEntry> {
        self.seasons.get(&season_key(championship, season))
    }

    pub fn matchday(&self, coords: &MatchdayCoords) -> Option<&MatchdayBlock> {
        self.matches.iter().find(|b| b.coords() == *coords)
    }

    pub fn penalty(&self, championship: &str, season: i64, team_name: &str) -> Option<i64> {
        self.penalties
            .get(&PenaltyKey::new(championship, season, team_name))
            .copied()
    }
}

/// Key of the `seasons` map: `"{championship}_s{season}"`.
pub fn season_key(championship: &str, season: i64) -> String {
    format!("{championship}_s{season}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonEntry {
    pub championship: String,
    #[serde(alias = "seasonNumber")]
    pub season: i64,
    #[serde(default)]
    pub standings: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchdayCoords {
    pub championship: String,
    pub season: i64,
    pub matchday: i64,
}

impl MatchdayCoords {
    pub fn new(championship: impl Into<String>, season: i64, matchday: i64) -> Self {
        Self {
            championship: championship.into(),
            season,
            matchday,
        }
    }
}

impl fmt::Display for MatchdayCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} s{} md{}", self.championship, self.season, self.matchday)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchdayBlock {
    pub championship: String,
    pub season: i64,
    pub matchday: i64,
    #[serde(default)]
    pub exempt: Option<String>,
    pub games: Vec<Game>,
}

impl MatchdayBlock {
    pub fn coords(&self) -> MatchdayCoords {
        MatchdayCoords::new(self.championship.clone(), self.season, self.matchday)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub home_team: String,
    #[serde(default)]
    pub away_team: String,
    #[serde(default)]
    pub home_score: Option<i64>,
    #[serde(default)]
    pub away_score: Option<i64>,
}

impl Game {
    pub fn new(home_team: impl Into<String>, away_team: impl Into<String>) -> Self {
        Self {
            id: None,
            home_team: home_team.into(),
            away_team: away_team.into(),
            home_score: None,
            away_score: None,
        }
    }

    pub fn with_score(mut self, home: i64, away: i64) -> Self {
        self.home_score = Some(home);
        self.away_score = Some(away);
        self
    }

    /// Rows still being typed in the entry form may lack a side.
    pub fn has_both_teams(&self) -> bool {
        !self.home_team.trim().is_empty() && !self.away_team.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PalmaresEntry {
    pub season: i64,
    pub champion: String,
    #[serde(default)]
    pub runner_up: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PantheonEntry {
    pub name: String,
    pub total_points: i64,
    pub titles: i64,
    pub runner_ups: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PenaltyKey {
    pub championship: String,
    pub season: i64,
    pub team_name: String,
}

impl PenaltyKey {
    pub fn new(championship: impl Into<String>, season: i64, team_name: impl Into<String>) -> Self {
        Self {
            championship: championship.into(),
            season,
            team_name: team_name.into(),
        }
    }
}

/// Wire form of one penalty: the composite key spelled out as fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PenaltyEntry {
    pub championship: String,
    pub season: i64,
    pub team_name: String,
    pub points: i64,
}

mod penalty_list {
    use indexmap::IndexMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{PenaltyEntry, PenaltyKey};

    pub fn serialize<S: Serializer>(
        penalties: &IndexMap<PenaltyKey, i64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let entries: Vec<PenaltyEntry> = penalties
            .iter()
            .map(|(key, points)| PenaltyEntry {
                championship: key.championship.clone(),
                season: key.season,
                team_name: key.team_name.clone(),
                points: *points,
            })
            .collect();
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<IndexMap<PenaltyKey, i64>, D::Error> {
        let entries = Vec::<PenaltyEntry>::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|e| (PenaltyKey::new(e.championship, e.season, e.team_name), e.points))
            .collect())
    }
}
