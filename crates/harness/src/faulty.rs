use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use standings_core::{Collection, Row};
use standings_storage::{Filter, Store, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Select,
    SelectRange,
    Insert,
    Upsert,
    Update,
    Delete,
}

/// A rule making matching store calls fail with [`StorageError::Remote`].
#[derive(Debug)]
pub struct Fault {
    op: StoreOp,
    collection: Collection,
    column: Option<(String, Option<Value>)>,
    skip: usize,
    seen: AtomicUsize,
}

impl Fault {
    pub fn on(op: StoreOp, collection: Collection) -> Self {
        Self {
            op,
            collection,
            column: None,
            skip: 0,
            seen: AtomicUsize::new(0),
        }
    }

    /// Only calls whose filter (or written rows) mention `column`.
    pub fn touching(mut self, column: &str) -> Self {
        self.column = Some((column.to_string(), None));
        self
    }

    /// Only calls whose filter (or written rows) set `column` to `value`.
    pub fn with_value(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.column = Some((column.to_string(), Some(value.into())));
        self
    }

    /// Let the first `n` matching calls through.
    pub fn after(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    fn trips(&self, op: StoreOp, collection: Collection, filter: Option<&Filter>, rows: &[Row]) -> bool {
        if op != self.op || collection != self.collection {
            return false;
        }
        if let Some((column, value)) = &self.column {
            let in_filter = filter.and_then(|f| f.column(column));
            let in_rows = rows.iter().find_map(|r| r.get(column));
            let hit = match (in_filter.or(in_rows), value) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
            };
            if !hit {
                return false;
            }
        }
        self.seen.fetch_add(1, Ordering::SeqCst) >= self.skip
    }
}

/// Wraps a store, recording every call and failing those that match a [`Fault`].
pub struct FaultyStore<S> {
    inner: S,
    faults: Mutex<Vec<Fault>>,
    calls: Mutex<Vec<(StoreOp, Collection)>>,
}

impl<S: Store> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail(&self, fault: Fault) {
        self.faults.lock().push(fault);
    }

    pub fn heal(&self) {
        self.faults.lock().clear();
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn calls(&self) -> Vec<(StoreOp, Collection)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, op: StoreOp, collection: Collection) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(o, c)| *o == op && *c == collection)
            .count()
    }

    fn check(
        &self,
        op: StoreOp,
        collection: Collection,
        filter: Option<&Filter>,
        rows: &[Row],
    ) -> Result<(), StorageError> {
        self.calls.lock().push((op, collection));
        let tripped = self
            .faults
            .lock()
            .iter()
            .any(|f| f.trips(op, collection, filter, rows));
        if tripped {
            return Err(StorageError::Remote(format!("injected {op:?} failure on {collection}")));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: Store> Store for FaultyStore<S> {
    async fn select(&self, collection: Collection, filter: &Filter) -> Result<Vec<Row>, StorageError> {
        self.check(StoreOp::Select, collection, Some(filter), &[])?;
        self.inner.select(collection, filter).await
    }

    async fn select_range(
        &self,
        collection: Collection,
        order_key: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Row>, StorageError> {
        self.check(StoreOp::SelectRange, collection, None, &[])?;
        self.inner.select_range(collection, order_key, offset, limit).await
    }

    async fn insert(&self, collection: Collection, rows: &[Row]) -> Result<u64, StorageError> {
        self.check(StoreOp::Insert, collection, None, rows)?;
        self.inner.insert(collection, rows).await
    }

    async fn upsert(&self, collection: Collection, rows: &[Row]) -> Result<u64, StorageError> {
        self.check(StoreOp::Upsert, collection, None, rows)?;
        self.inner.upsert(collection, rows).await
    }

    async fn update(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: &Row,
    ) -> Result<u64, StorageError> {
        self.check(StoreOp::Update, collection, Some(filter), std::slice::from_ref(patch))?;
        self.inner.update(collection, filter, patch).await
    }

    async fn delete(&self, collection: Collection, filter: &Filter) -> Result<u64, StorageError> {
        self.check(StoreOp::Delete, collection, Some(filter), &[])?;
        self.inner.delete(collection, filter).await
    }
}
