use std::fmt;

use serde::{Deserialize, Serialize};

/// The six relational collections backing a league.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Managers,
    Seasons,
    Matches,
    Champions,
    Pantheon,
    Penalties,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Self::Managers,
        Self::Seasons,
        Self::Matches,
        Self::Champions,
        Self::Pantheon,
        Self::Penalties,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Managers => "managers",
            Self::Seasons => "seasons",
            Self::Matches => "matches",
            Self::Champions => "champions",
            Self::Pantheon => "pantheon",
            Self::Penalties => "penalties",
        }
    }

    /// Columns an upsert resolves conflicts on. A write carrying the same
    /// values for these columns replaces the existing row.
    pub fn conflict_key(&self) -> &'static [&'static str] {
        match self {
            Self::Managers => &["id"],
            Self::Seasons => &["championship", "season_number"],
            Self::Matches => &["id"],
            Self::Champions => &["championship", "season"],
            Self::Pantheon => &["manager_name"],
            Self::Penalties => &["championship", "season", "team_name"],
        }
    }

    /// Column a full read pages on. Ties are broken by insertion order.
    pub fn order_key(&self) -> &'static str {
        match self {
            Self::Managers => "id",
            Self::Seasons => "championship",
            Self::Matches => "matchday",
            Self::Champions => "championship",
            Self::Pantheon => "manager_name",
            Self::Penalties => "championship",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
