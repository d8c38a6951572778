//! Propagating a manager rename to every name-keyed reference.

use std::fmt;

use futures::future::join_all;
use serde_json::Value;
use standings_core::{Collection, Row};
use standings_storage::{Filter, Store};
use tracing::{info, instrument, warn};

use crate::error::EngineError;

/// A column that refers to a manager by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenameTarget {
    MatchHome,
    MatchAway,
    MatchExempt,
    Champion,
    RunnerUp,
    Pantheon,
    Penalty,
}

impl RenameTarget {
    pub const ALL: [RenameTarget; 7] = [
        Self::MatchHome,
        Self::MatchAway,
        Self::MatchExempt,
        Self::Champion,
        Self::RunnerUp,
        Self::Pantheon,
        Self::Penalty,
    ];

    pub fn collection(&self) -> Collection {
        match self {
            Self::MatchHome | Self::MatchAway | Self::MatchExempt => Collection::Matches,
            Self::Champion | Self::RunnerUp => Collection::Champions,
            Self::Pantheon => Collection::Pantheon,
            Self::Penalty => Collection::Penalties,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Self::MatchHome => "home_team",
            Self::MatchAway => "away_team",
            Self::MatchExempt => "exempt_team",
            Self::Champion => "champion_name",
            Self::RunnerUp => "runner_up_name",
            Self::Pantheon => "manager_name",
            Self::Penalty => "team_name",
        }
    }
}

impl fmt::Display for RenameTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.collection(), self.column())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameFailure {
    pub target: RenameTarget,
    pub message: String,
}

/// Rows touched per target by a completed rename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameOutcome {
    pub updated: Vec<(RenameTarget, u64)>,
}

impl RenameOutcome {
    pub fn total(&self) -> u64 {
        self.updated.iter().map(|(_, n)| n).sum()
    }

    pub fn rows_for(&self, target: RenameTarget) -> u64 {
        self.updated
            .iter()
            .find(|(t, _)| *t == target)
            .map_or(0, |(_, n)| *n)
    }
}

pub struct IdentityRenamer<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> IdentityRenamer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Rename a manager and every row that refers to the old name.
    ///
    /// The manager row is updated first; the seven reference updates then
    /// run concurrently and are not rolled back if some fail. Each update
    /// only matches rows still carrying `old_name`, so calling this again
    /// with the same names finishes an interrupted rename.
    #[instrument(skip(self))]
    pub async fn rename(
        &self,
        manager_id: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<RenameOutcome, EngineError> {
        if new_name.trim().is_empty() {
            return Err(EngineError::InvalidInput("new manager name must not be blank".into()));
        }

        let patch = name_patch("name", new_name);
        let found = self
            .store
            .update(Collection::Managers, &Filter::new().eq("id", manager_id), &patch)
            .await?;
        if found == 0 {
            return Err(EngineError::ManagerNotFound(manager_id.to_string()));
        }
        if old_name == new_name {
            return Ok(RenameOutcome::default());
        }

        let results = join_all(RenameTarget::ALL.into_iter().map(|target| async move {
            let filter = Filter::new().eq(target.column(), old_name);
            let patch = name_patch(target.column(), new_name);
            let result = self.store.update(target.collection(), &filter, &patch).await;
            (target, result)
        }))
        .await;

        let mut outcome = RenameOutcome::default();
        let mut failures = Vec::new();
        for (target, result) in results {
            match result {
                Ok(n) => outcome.updated.push((target, n)),
                Err(e) => {
                    warn!(%target, error = %e, "rename propagation failed");
                    failures.push(RenameFailure {
                        target,
                        message: e.to_string(),
                    });
                }
            }
        }

        if !failures.is_empty() {
            return Err(EngineError::PartialRename {
                manager_id: manager_id.to_string(),
                total: RenameTarget::ALL.len(),
                failures,
            });
        }

        info!(rows = outcome.total(), "rename propagated");
        Ok(outcome)
    }
}

fn name_patch(column: &str, name: &str) -> Row {
    let mut patch = Row::new();
    patch.insert(column.to_string(), Value::String(name.to_string()));
    patch
}
