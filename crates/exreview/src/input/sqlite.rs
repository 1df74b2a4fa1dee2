//! SQLite-backed record source.
//!
//! Exclusion, cursor and category filter are pushed into the `WHERE` clause
//! so only unreviewed rows cross the connection. Processed IDs are staged in a
//! connection-local temp table, so the exclusion set is not bounded by
//! SQLite's limit on bound parameters.

use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, QueryBuilder, Row, Sqlite};
use tracing::{debug, info};

use crate::error::{ReviewError, Result};

use super::record::SourceRecord;
use super::source::{FetchQuery, RecordSource};

/// Default table holding exercises.
pub const DEFAULT_TABLE: &str = "exercises";

/// Temp table holding the IDs to exclude from a fetch.
const EXCLUDED_TABLE: &str = "exreview_excluded";

/// IDs per staging insert, under SQLite's default limit of 999 parameters.
const STAGE_CHUNK: usize = 500;

/// Record source reading an exercises table through a connection pool.
pub struct SqliteSource {
    pool: SqlitePool,
    table: String,
}

impl SqliteSource {
    /// Connect to the database at `url` (e.g. `sqlite://exercises.db`).
    pub async fn connect(url: &str, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_table_name(&table)?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(|e| ReviewError::Source(format!("Failed to open '{}': {}", url, e)))?;

        info!(url, table = %table, "Connected to exercise database");
        Ok(Self { pool, table })
    }

    /// Wrap an existing pool.
    pub fn with_pool(pool: SqlitePool, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self { pool, table })
    }

    /// Build the filtered, ordered and limited select for a query.
    fn build_query<'a>(&self, query: &'a FetchQuery) -> QueryBuilder<'a, Sqlite> {
        let mut builder = QueryBuilder::new(format!("SELECT * FROM \"{}\" WHERE 1 = 1", self.table));

        if !query.exclude_ids.is_empty() {
            builder.push(format!(
                " AND CAST(id AS TEXT) NOT IN (SELECT id FROM temp.{})",
                EXCLUDED_TABLE
            ));
        }

        if let Some(ref start) = query.starting_id {
            builder.push(" AND id >= ");
            match start.parse::<i64>() {
                Ok(n) => builder.push_bind(n),
                Err(_) => builder.push_bind(start.as_str()),
            };
        }

        if let Some(ref category) = query.category_id {
            builder.push(" AND CAST(category_id AS TEXT) = ");
            builder.push_bind(category.as_str());
        }

        builder.push(" ORDER BY id LIMIT ");
        builder.push_bind(i64::try_from(query.limit).unwrap_or(i64::MAX));
        builder
    }
}

#[async_trait]
impl RecordSource for SqliteSource {
    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<SourceRecord>> {
        let mut conn = self.pool.acquire().await.map_err(query_failed)?;
        if !query.exclude_ids.is_empty() {
            stage_exclusions(&mut conn, query).await?;
        }

        let mut builder = self.build_query(query);
        debug!(sql = builder.sql(), excluded = query.exclude_ids.len(), "Fetching exercises");

        let rows = builder
            .build()
            .fetch_all(&mut *conn)
            .await
            .map_err(query_failed)?;

        rows.iter().map(row_to_record).collect()
    }

    async fn close(&self) {
        self.pool.close().await;
        debug!("Closed exercise database pool");
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

fn query_failed(e: sqlx::Error) -> ReviewError {
    ReviewError::Source(format!("Exercise query failed: {}", e))
}

/// Replace the contents of the exclusion table with `query.exclude_ids`.
async fn stage_exclusions(conn: &mut SqliteConnection, query: &FetchQuery) -> Result<()> {
    sqlx::query(&format!(
        "CREATE TEMP TABLE IF NOT EXISTS {} (id TEXT PRIMARY KEY)",
        EXCLUDED_TABLE
    ))
    .execute(&mut *conn)
    .await
    .map_err(query_failed)?;
    sqlx::query(&format!("DELETE FROM temp.{}", EXCLUDED_TABLE))
        .execute(&mut *conn)
        .await
        .map_err(query_failed)?;

    let ids: Vec<&str> = query.exclude_ids.iter().map(String::as_str).collect();
    for chunk in ids.chunks(STAGE_CHUNK) {
        let mut insert =
            QueryBuilder::<Sqlite>::new(format!("INSERT OR IGNORE INTO temp.{} (id) ", EXCLUDED_TABLE));
        insert.push_values(chunk, |mut row, id| {
            row.push_bind(*id);
        });
        insert.build().execute(&mut *conn).await.map_err(query_failed)?;
    }
    Ok(())
}

/// Convert a row into a JSON object keyed by column name.
fn row_to_record(row: &SqliteRow) -> Result<SourceRecord> {
    let mut map = Map::new();
    for (index, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), column_value(row, index)?);
    }
    Ok(SourceRecord::from_map(map))
}

/// Decode one cell, trying the SQLite storage classes in turn.
fn column_value(row: &SqliteRow, index: usize) -> Result<Value> {
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return Ok(value.map(Value::from).unwrap_or(Value::Null));
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return Ok(value
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null));
    }
    let value: Option<String> = row.try_get(index)?;
    Ok(value.map(Value::String).unwrap_or(Value::Null))
}

fn validate_table_name(table: &str) -> Result<()> {
    let valid = !table.is_empty()
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ReviewError::Config(format!("Invalid table name: '{}'", table)))
    }
}
