use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, params_from_iter, types::Value as SqlValue};
use serde_json::Value;
use standings_core::{Collection, Row};
use tracing::debug;

use crate::error::StorageError;
use crate::schema::{self, ColumnKind, TableDef};
use crate::traits::{Filter, Store};

/// Hard per-request row limit of the hosted store this backend stands in for.
pub const ROW_CAP: usize = 1000;

pub struct SqliteStorage {
    conn: Mutex<Connection>,
    row_cap: usize,
}

impl SqliteStorage {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        schema::init_schema(&conn)?;
        Ok(Self::from_conn(conn))
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        schema::init_schema(&conn)?;
        Ok(Self::from_conn(conn))
    }

    fn from_conn(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            row_cap: ROW_CAP,
        }
    }

    /// Lower the per-request cap so paging can be exercised with few rows.
    pub fn with_row_cap(mut self, row_cap: usize) -> Self {
        self.row_cap = row_cap.max(1);
        self
    }

    pub fn row_cap(&self) -> usize {
        self.row_cap
    }

    /// Uncapped row count, for diagnostics and tests.
    pub fn count(&self, collection: Collection) -> Result<u64, StorageError> {
        let def = schema::table(collection);
        let count: i64 = self.conn.lock().query_row(
            &format!("SELECT COUNT(*) FROM {}", def.name),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn query(
        &self,
        def: &TableDef,
        sql: &str,
        params: Vec<SqlValue>,
    ) -> Result<Vec<Row>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let width = def.columns.len();
        let raw = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                (0..width)
                    .map(|i| row.get::<_, SqlValue>(i))
                    .collect::<Result<Vec<_>, _>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|values| {
                def.columns
                    .iter()
                    .zip(values)
                    .map(|((name, kind), v)| Ok((name.to_string(), from_sql(*kind, v)?)))
                    .collect::<Result<Row, StorageError>>()
            })
            .collect()
    }

    fn write_rows(
        &self,
        collection: Collection,
        rows: &[Row],
        upsert: bool,
    ) -> Result<u64, StorageError> {
        let def = schema::table(collection);
        for row in rows {
            check_columns(collection, def, row.keys())?;
        }

        let columns: Vec<&str> = def.column_names().collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            def.name,
            columns.join(", "),
            placeholders.join(", ")
        );
        if upsert {
            let key = collection.conflict_key();
            let assignments: Vec<String> = columns
                .iter()
                .filter(|c| !key.contains(*c))
                .map(|c| format!("{c} = excluded.{c}"))
                .collect();
            sql.push_str(&format!(" ON CONFLICT({}) DO UPDATE SET {}", key.join(", "), assignments.join(", ")));
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut written = 0u64;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                let params = def
                    .columns
                    .iter()
                    .map(|(name, kind)| to_sql(collection, name, *kind, row.get(*name).unwrap_or(&Value::Null)))
                    .collect::<Result<Vec<_>, _>>()?;
                written += stmt.execute(params_from_iter(params.iter())).map_err(map_constraint)? as u64;
            }
        }
        tx.commit()?;

        debug!(collection = %collection, rows = rows.len(), upsert, "rows written");
        Ok(written)
    }
}

#[async_trait]
impl Store for SqliteStorage {
    async fn select(&self, collection: Collection, filter: &Filter) -> Result<Vec<Row>, StorageError> {
        let def = schema::table(collection);
        let (clause, params) = where_clause(collection, def, filter, 1)?;
        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY rowid LIMIT {}",
            def.column_names().collect::<Vec<_>>().join(", "),
            def.name,
            clause,
            self.row_cap
        );
        self.query(def, &sql, params)
    }

    async fn select_range(
        &self,
        collection: Collection,
        order_key: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Row>, StorageError> {
        let def = schema::table(collection);
        if def.column(order_key).is_none() {
            return Err(StorageError::UnknownColumn {
                collection,
                column: order_key.to_string(),
            });
        }
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}, rowid LIMIT ?1 OFFSET ?2",
            def.column_names().collect::<Vec<_>>().join(", "),
            def.name,
            order_key
        );
        let limit = limit.min(self.row_cap) as i64;
        self.query(def, &sql, vec![SqlValue::Integer(limit), SqlValue::Integer(offset as i64)])
    }

    async fn insert(&self, collection: Collection, rows: &[Row]) -> Result<u64, StorageError> {
        self.write_rows(collection, rows, false)
    }

    async fn upsert(&self, collection: Collection, rows: &[Row]) -> Result<u64, StorageError> {
        self.write_rows(collection, rows, true)
    }

    async fn update(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: &Row,
    ) -> Result<u64, StorageError> {
        if filter.is_empty() {
            return Err(StorageError::UnfilteredWrite { op: "update", collection });
        }
        let def = schema::table(collection);
        check_columns(collection, def, patch.keys())?;
        if patch.is_empty() {
            return Ok(0);
        }

        let mut params = Vec::with_capacity(patch.len() + filter.conditions().len());
        let mut assignments = Vec::with_capacity(patch.len());
        for (column, value) in patch {
            let kind = def.column(column).unwrap_or(ColumnKind::Text);
            params.push(to_sql(collection, column, kind, value)?);
            assignments.push(format!("{column} = ?{}", params.len()));
        }
        let (clause, filter_params) = where_clause(collection, def, filter, params.len() + 1)?;
        params.extend(filter_params);

        let sql = format!("UPDATE {} SET {}{}", def.name, assignments.join(", "), clause);
        let changed = self
            .conn
            .lock()
            .execute(&sql, params_from_iter(params.iter()))
            .map_err(map_constraint)?;
        debug!(collection = %collection, changed, "rows updated");
        Ok(changed as u64)
    }

    async fn delete(&self, collection: Collection, filter: &Filter) -> Result<u64, StorageError> {
        if filter.is_empty() {
            return Err(StorageError::UnfilteredWrite { op: "delete", collection });
        }
        let def = schema::table(collection);
        let (clause, params) = where_clause(collection, def, filter, 1)?;
        let sql = format!("DELETE FROM {}{}", def.name, clause);
        let deleted = self.conn.lock().execute(&sql, params_from_iter(params.iter()))?;
        debug!(collection = %collection, deleted, "rows deleted");
        Ok(deleted as u64)
    }
}

fn check_columns<'a>(
    collection: Collection,
    def: &TableDef,
    columns: impl Iterator<Item = &'a String>,
) -> Result<(), StorageError> {
    for column in columns {
        if def.column(column).is_none() {
            return Err(StorageError::UnknownColumn {
                collection,
                column: column.clone(),
            });
        }
    }
    Ok(())
}

/// Builds ` WHERE a IS ?n AND b IS ?n+1`, numbering placeholders from `first`.
/// `IS` rather than `=` so a null condition matches NULL columns.
fn where_clause(
    collection: Collection,
    def: &TableDef,
    filter: &Filter,
    first: usize,
) -> Result<(String, Vec<SqlValue>), StorageError> {
    if filter.is_empty() {
        return Ok((String::new(), Vec::new()));
    }
    let mut parts = Vec::with_capacity(filter.conditions().len());
    let mut params = Vec::with_capacity(filter.conditions().len());
    for (i, (column, value)) in filter.conditions().iter().enumerate() {
        let kind = def.column(column).ok_or_else(|| StorageError::UnknownColumn {
            collection,
            column: column.clone(),
        })?;
        parts.push(format!("{column} IS ?{}", first + i));
        params.push(to_sql(collection, column, kind, value)?);
    }
    Ok((format!(" WHERE {}", parts.join(" AND ")), params))
}

fn to_sql(
    collection: Collection,
    column: &str,
    kind: ColumnKind,
    value: &Value,
) -> Result<SqlValue, StorageError> {
    let mismatch = || StorageError::TypeMismatch {
        collection,
        column: column.to_string(),
        expected: kind.as_str(),
    };
    match (kind, value) {
        (_, Value::Null) => Ok(SqlValue::Null),
        (ColumnKind::Text, Value::String(s)) => Ok(SqlValue::Text(s.clone())),
        (ColumnKind::Integer, Value::Number(n)) => n.as_i64().map(SqlValue::Integer).ok_or_else(mismatch),
        (ColumnKind::Json, v) => serde_json::to_string(v)
            .map(SqlValue::Text)
            .map_err(|e| StorageError::Serialization(e.to_string())),
        _ => Err(mismatch()),
    }
}

fn from_sql(kind: ColumnKind, value: SqlValue) -> Result<Value, StorageError> {
    match (kind, value) {
        (_, SqlValue::Null) => Ok(Value::Null),
        (ColumnKind::Json, SqlValue::Text(s)) => {
            serde_json::from_str(&s).map_err(|e| StorageError::Serialization(e.to_string()))
        }
        (_, SqlValue::Text(s)) => Ok(Value::String(s)),
        (_, SqlValue::Integer(n)) => Ok(Value::from(n)),
        (_, SqlValue::Real(f)) => Ok(Value::from(f)),
        (_, SqlValue::Blob(_)) => Err(StorageError::Serialization("unexpected blob column".into())),
    }
}

fn map_constraint(e: rusqlite::Error) -> StorageError {
    match e {
        rusqlite::Error::SqliteFailure(err, msg) if err.code == rusqlite::ErrorCode::ConstraintViolation => {
            StorageError::ConstraintViolation(msg.unwrap_or_else(|| err.to_string()))
        }
        other => StorageError::Sqlite(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("row literal must be an object"),
        }
    }

    fn manager(id: &str, name: &str) -> Row {
        row(json!({"id": id, "name": name}))
    }

    #[tokio::test]
    async fn select_is_capped() -> Result<(), StorageError> {
        let store = SqliteStorage::open_in_memory()?.with_row_cap(3);
        let rows: Vec<Row> = (0..5).map(|i| manager(&format!("m{i}"), "x")).collect();
        store.insert(Collection::Managers, &rows).await?;

        assert_eq!(store.select(Collection::Managers, &Filter::new()).await?.len(), 3);
        assert_eq!(store.count(Collection::Managers)?, 5);
        Ok(())
    }

    #[tokio::test]
    async fn select_range_orders_and_caps() -> Result<(), StorageError> {
        let store = SqliteStorage::open_in_memory()?.with_row_cap(2);
        let rows = vec![manager("c", "Carla"), manager("a", "Alice"), manager("b", "Bob")];
        store.insert(Collection::Managers, &rows).await?;

        let page = store.select_range(Collection::Managers, "id", 0, 10).await?;
        let ids: Vec<_> = page.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("a"), json!("b")]);

        let rest = store.select_range(Collection::Managers, "id", 2, 10).await?;
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0]["id"], json!("c"));
        Ok(())
    }

    #[tokio::test]
    async fn select_range_rejects_unknown_order_key() -> Result<(), StorageError> {
        let store = SqliteStorage::open_in_memory()?;
        let err = store
            .select_range(Collection::Managers, "name; DROP TABLE managers", 0, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UnknownColumn { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn upsert_replaces_whole_row() -> Result<(), StorageError> {
        let store = SqliteStorage::open_in_memory()?;
        store
            .upsert(
                Collection::Champions,
                &[row(json!({"championship": "france", "season": 1, "champion_name": "Alice", "runner_up_name": "Bob"}))],
            )
            .await?;
        store
            .upsert(
                Collection::Champions,
                &[row(json!({"championship": "france", "season": 1, "champion_name": "Carla"}))],
            )
            .await?;

        let rows = store.select(Collection::Champions, &Filter::new()).await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["champion_name"], json!("Carla"));
        assert_eq!(rows[0]["runner_up_name"], Value::Null);
        Ok(())
    }

    #[tokio::test]
    async fn json_column_roundtrips() -> Result<(), StorageError> {
        let store = SqliteStorage::open_in_memory()?;
        let standings = json!([{"team": "Alice", "pts": 9}]);
        store
            .upsert(
                Collection::Seasons,
                &[row(json!({"championship": "italy", "season_number": 2, "standings": standings}))],
            )
            .await?;
        let rows = store.select(Collection::Seasons, &Filter::new()).await?;
        assert_eq!(rows[0]["standings"], standings);
        Ok(())
    }

    #[tokio::test]
    async fn filtered_update_and_delete() -> Result<(), StorageError> {
        let store = SqliteStorage::open_in_memory()?;
        store
            .insert(Collection::Managers, &[manager("a", "Alice"), manager("b", "Bob")])
            .await?;

        let patch = row(json!({"name": "Alicia"}));
        let changed = store
            .update(Collection::Managers, &Filter::new().eq("name", "Alice"), &patch)
            .await?;
        assert_eq!(changed, 1);

        let deleted = store.delete(Collection::Managers, &Filter::new().eq("id", "b")).await?;
        assert_eq!(deleted, 1);

        let rows = store.select(Collection::Managers, &Filter::new()).await?;
        assert_eq!(rows, vec![manager("a", "Alicia")]);
        Ok(())
    }

    #[tokio::test]
    async fn null_filter_matches_null_column() -> Result<(), StorageError> {
        let store = SqliteStorage::open_in_memory()?;
        store
            .insert(
                Collection::Champions,
                &[
                    row(json!({"championship": "f", "season": 1, "champion_name": "A"})),
                    row(json!({"championship": "f", "season": 2, "champion_name": "A", "runner_up_name": "B"})),
                ],
            )
            .await?;
        let rows = store
            .select(Collection::Champions, &Filter::new().eq("runner_up_name", Value::Null))
            .await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["season"], json!(1));
        Ok(())
    }

    #[tokio::test]
    async fn unfiltered_writes_are_refused() -> Result<(), StorageError> {
        let store = SqliteStorage::open_in_memory()?;
        assert!(matches!(
            store.delete(Collection::Matches, &Filter::new()).await,
            Err(StorageError::UnfilteredWrite { op: "delete", .. })
        ));
        assert!(matches!(
            store.update(Collection::Matches, &Filter::new(), &Row::new()).await,
            Err(StorageError::UnfilteredWrite { op: "update", .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn constraint_violation_is_reported_and_atomic() -> Result<(), StorageError> {
        let store = SqliteStorage::open_in_memory()?;
        let err = store
            .insert(Collection::Managers, &[manager("a", "Alice"), manager("a", "Again")])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ConstraintViolation(_)));
        assert_eq!(store.count(Collection::Managers)?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn wrong_value_type_is_rejected() -> Result<(), StorageError> {
        let store = SqliteStorage::open_in_memory()?;
        let err = store
            .insert(
                Collection::Penalties,
                &[row(json!({"championship": "f", "season": "one", "team_name": "A", "points": 1}))],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::TypeMismatch { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn file_backed_store_persists() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("league.db");
        let path = path.to_str().ok_or("non-utf8 temp path")?;
        {
            let store = SqliteStorage::open(path)?;
            store.insert(Collection::Managers, &[manager("a", "Alice")]).await?;
        }
        let store = SqliteStorage::open(path)?;
        assert_eq!(store.count(Collection::Managers)?, 1);
        Ok(())
    }
}
