use async_trait::async_trait;
use serde_json::Value;
use standings_core::{Collection, Row};

use crate::error::StorageError;

/// Exact-match conditions, ANDed together. A `null` value matches SQL NULL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push((column.to_string(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn column(&self, column: &str) -> Option<&Value> {
        self.conditions
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }
}

/// The relational store behind the league.
///
/// Every read is silently capped at the backend's row limit; callers that
/// need a whole collection page through it with `select_range`.
#[async_trait]
pub trait Store: Send + Sync {
    async fn select(&self, collection: Collection, filter: &Filter) -> Result<Vec<Row>, StorageError>;

    /// Rows `[offset, offset + limit)` ordered by `order_key`, ties broken by
    /// insertion order.
    async fn select_range(
        &self,
        collection: Collection,
        order_key: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Row>, StorageError>;

    async fn insert(&self, collection: Collection, rows: &[Row]) -> Result<u64, StorageError>;

    /// Insert or replace whole rows, matched on the collection's conflict key.
    async fn upsert(&self, collection: Collection, rows: &[Row]) -> Result<u64, StorageError>;

    async fn update(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: &Row,
    ) -> Result<u64, StorageError>;

    async fn delete(&self, collection: Collection, filter: &Filter) -> Result<u64, StorageError>;
}
