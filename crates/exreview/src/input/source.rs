//! Record source abstraction and the file-backed sources.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{ReviewError, Result};

use super::record::{SourceRecord, id_string};

/// A query against a record source.
///
/// Exclusion, cursor and category filter are applied together and before
/// the limit, so already-reviewed history is never fetched.
#[derive(Debug, Clone, Default)]
pub struct FetchQuery {
    /// Maximum number of records to return.
    pub limit: usize,
    /// Record IDs (string form) to leave out.
    pub exclude_ids: HashSet<String>,
    /// Inclusive lower bound on the record ID.
    pub starting_id: Option<String>,
    /// Only return records of this category.
    pub category_id: Option<String>,
}

impl FetchQuery {
    /// Create a query for up to `limit` records.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    /// Exclude the given IDs.
    pub fn excluding(mut self, ids: HashSet<String>) -> Self {
        self.exclude_ids = ids;
        self
    }

    /// Start from the given ID (inclusive).
    pub fn starting_at(mut self, id: impl Into<String>) -> Self {
        self.starting_id = Some(id.into());
        self
    }

    /// Restrict to one category.
    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category_id = Some(category.into());
        self
    }

    /// Check a record against the exclusion, cursor and category filters.
    ///
    /// Sources that cannot push the filter into a native query use this to
    /// filter while scanning.
    pub fn matches(&self, record: &SourceRecord) -> bool {
        let id = record.id();

        if let Some(ref id) = id {
            if self.exclude_ids.contains(id) {
                return false;
            }
        }

        if let Some(ref start) = self.starting_id {
            match id {
                Some(ref id) if compare_ids(id, start) != Ordering::Less => {}
                _ => return false,
            }
        }

        if let Some(ref category) = self.category_id {
            let record_category = record.field(&["category_id", "categoryId"]).and_then(id_string);
            if record_category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }

        true
    }
}

/// Order two IDs numerically when both are integers, lexically otherwise.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

/// Trait for sources of exercise records.
///
/// An unreachable source is reported as an error, never as a partial result.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch up to `query.limit` records matching the query.
    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<SourceRecord>>;

    /// Release any connection held by the source.
    async fn close(&self) {}

    /// Get the name of this source (for logging/debugging).
    fn name(&self) -> &str;
}

/// In-memory record source.
///
/// Records are returned in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<SourceRecord>,
}

impl MemorySource {
    /// Create a source over the given records.
    pub fn new(records: Vec<SourceRecord>) -> Self {
        Self { records }
    }

    /// Create a source from raw JSON values.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self::new(values.into_iter().map(SourceRecord::new).collect())
    }

    /// Add a record.
    pub fn push(&mut self, record: impl Into<SourceRecord>) {
        self.records.push(record.into());
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the source holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<SourceRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| query.matches(r))
            .take(query.limit)
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Record source backed by a JSON export: an array of exercise objects.
///
/// The file is read on every fetch; records are sorted by ID so that the
/// cursor pages through the export in a stable order.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Create a source for the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the export file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSource for JsonFileSource {
    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<SourceRecord>> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            ReviewError::Source(format!(
                "Failed to read record export '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        let values: Vec<Value> = serde_json::from_slice(&bytes).map_err(|e| {
            ReviewError::Source(format!(
                "Record export '{}' is not a JSON array: {}",
                self.path.display(),
                e
            ))
        })?;

        let mut records: Vec<SourceRecord> = values.into_iter().map(SourceRecord::new).collect();
        records.sort_by(|a, b| match (a.id(), b.id()) {
            (Some(a), Some(b)) => compare_ids(&a, &b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        let total = records.len();
        let selected: Vec<SourceRecord> = records
            .into_iter()
            .filter(|r| query.matches(r))
            .take(query.limit)
            .collect();

        debug!(
            path = %self.path.display(),
            total,
            selected = selected.len(),
            "Scanned record export"
        );

        Ok(selected)
    }

    fn name(&self) -> &str {
        "json"
    }
}
