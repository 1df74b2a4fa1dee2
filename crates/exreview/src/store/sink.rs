//! Durable, deduplicating store of review outcomes.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ReviewError, Result};
use crate::review::ReviewOutcome;

use super::table::SinkTable;

/// Columns of the failure log, in order.
pub const FAILURE_COLUMNS: &[&str] = &[
    "attempted_at",
    "id",
    "error",
    "details",
    "raw_preview",
    "extracted_string",
    "ai_response",
    "raw_response",
];

/// What a merge did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkReport {
    /// Success rows added to the sink.
    pub appended: usize,
    /// Successes whose record was already in the sink or earlier in the batch.
    pub skipped_duplicates: usize,
    /// Successes without any usable ID.
    pub skipped_missing_id: usize,
    /// Failed outcomes written to the failure log.
    pub failures_logged: usize,
}

/// Aggregate view of a sink and its failure log.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SinkSummary {
    /// Records with a success row.
    pub reviewed: usize,
    /// Mean of the parseable `correctness` values.
    pub mean_correctness: Option<f64>,
    /// Total rows in the failure log.
    pub failed_attempts: usize,
    /// Failure log rows by error tag.
    pub failures_by_error: BTreeMap<String, usize>,
}

/// CSV result sink keyed by record ID.
///
/// Successes go to the results table, one row per record. Failures are
/// appended to a separate log, one row per attempt, so diagnostics survive
/// without blocking a later retry of the same record.
#[derive(Debug, Clone)]
pub struct ResultSink {
    path: PathBuf,
    failures_path: Option<PathBuf>,
    columns: Vec<String>,
}

impl ResultSink {
    /// Create a sink at `path` writing the given column projection.
    ///
    /// The projection must include `id` and `status`. `original_id` is
    /// inserted after `id` when absent: exclusion reads it first, so a row for
    /// a mismatched model ID would otherwise never match its source record.
    pub fn new(path: impl Into<PathBuf>, mut columns: Vec<String>) -> Result<Self> {
        for required in ["id", "status"] {
            if !columns.iter().any(|c| c == required) {
                return Err(ReviewError::Config(format!(
                    "Sink columns must include '{}'",
                    required
                )));
            }
        }
        if !columns.iter().any(|c| c == "original_id") {
            let after_id = columns.iter().position(|c| c == "id").map_or(0, |i| i + 1);
            columns.insert(after_id, "original_id".to_string());
        }

        Ok(Self {
            path: path.into(),
            failures_path: None,
            columns,
        })
    }

    /// Also log failed outcomes to `path`.
    pub fn with_failure_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.failures_path = Some(path.into());
        self
    }

    /// Path of the results table.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the failure log, if any.
    pub fn failures_path(&self) -> Option<&Path> {
        self.failures_path.as_deref()
    }

    /// Configured column projection.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Merge a batch of outcomes into durable storage.
    ///
    /// A success is written unless its record key is missing, already has a
    /// success row, or appeared earlier in `outcomes`. Existing rows and
    /// columns are left as they are.
    pub async fn merge(&self, outcomes: &[ReviewOutcome]) -> Result<SinkReport> {
        let existing = SinkTable::load(&self.path).await?;
        let created = existing.is_none();
        let mut table = existing.unwrap_or_default();
        table.ensure_columns(&self.columns);

        let mut seen: HashSet<String> = table.success_keys().unwrap_or_default();
        let mut report = SinkReport::default();
        let mut failures = Vec::new();

        for outcome in outcomes {
            if !outcome.is_success() {
                failures.push(outcome);
                continue;
            }

            let Some(key) = outcome.record_key() else {
                report.skipped_missing_id += 1;
                continue;
            };

            if !seen.insert(key.to_string()) {
                debug!(exercise_id = key, "Already in sink; skipping");
                report.skipped_duplicates += 1;
                continue;
            }

            table.push_row(&project(outcome, &self.columns));
            report.appended += 1;
        }

        if report.appended > 0 || created {
            table.save(&self.path).await?;
        }

        if let Some(ref failures_path) = self.failures_path {
            if !failures.is_empty() {
                report.failures_logged = append_failures(failures_path, &failures).await?;
            }
        }

        info!(
            path = %self.path.display(),
            appended = report.appended,
            skipped_duplicates = report.skipped_duplicates,
            skipped_missing_id = report.skipped_missing_id,
            failures_logged = report.failures_logged,
            "Merged outcomes into sink"
        );

        Ok(report)
    }

    /// Summarize the sink and failure log as they are on disk.
    pub async fn summary(&self) -> Result<SinkSummary> {
        let mut summary = SinkSummary::default();

        if let Some(table) = SinkTable::load(&self.path).await? {
            summary.reviewed = table.success_keys().map(|k| k.len()).unwrap_or(0);

            let scores: Vec<f64> = table
                .column_values("correctness")
                .unwrap_or_default()
                .into_iter()
                .filter_map(|v| v.trim().parse::<f64>().ok())
                .collect();
            if !scores.is_empty() {
                summary.mean_correctness = Some(scores.iter().sum::<f64>() / scores.len() as f64);
            }
        }

        if let Some(ref failures_path) = self.failures_path {
            if let Some(log) = SinkTable::load(failures_path).await? {
                summary.failed_attempts = log.row_count();
                for tag in log.column_values("error").unwrap_or_default() {
                    *summary.failures_by_error.entry(tag.to_string()).or_insert(0) += 1;
                }
            }
        }

        Ok(summary)
    }
}

/// Project an outcome onto the given columns.
fn project<S: AsRef<str>>(outcome: &ReviewOutcome, columns: &[S]) -> IndexMap<String, String> {
    columns
        .iter()
        .map(|c| {
            let c = c.as_ref();
            (c.to_string(), outcome.column(c).unwrap_or_default())
        })
        .collect()
}

async fn append_failures(path: &Path, failures: &[&ReviewOutcome]) -> Result<usize> {
    let mut log = SinkTable::load(path).await?.unwrap_or_default();
    log.ensure_columns(FAILURE_COLUMNS);

    let attempted_at = Utc::now().to_rfc3339();
    for outcome in failures {
        let mut row = project(outcome, FAILURE_COLUMNS);
        row.insert("attempted_at".to_string(), attempted_at.clone());
        log.push_row(&row);
    }

    log.save(path).await?;
    Ok(failures.len())
}
