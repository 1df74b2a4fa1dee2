//! Set of record IDs already reviewed successfully.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;

use super::table::SinkTable;

/// Reads the result sink to find records that need no further review.
#[derive(Debug, Clone)]
pub struct ProcessedIdTracker {
    path: PathBuf,
}

impl ProcessedIdTracker {
    /// Track the sink at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the tracked sink.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record keys (string form) whose recorded status is `success`.
    ///
    /// A missing or empty sink, or one without `id`/`status` columns, is a
    /// first run: the set is empty and a warning is logged. A sink that
    /// exists but cannot be parsed is an error.
    pub async fn load(&self) -> Result<HashSet<String>> {
        let Some(table) = SinkTable::load(&self.path).await? else {
            warn!(path = %self.path.display(), "No result sink yet; starting fresh");
            return Ok(HashSet::new());
        };

        if table.is_empty() {
            warn!(path = %self.path.display(), "Result sink is empty; starting fresh");
            return Ok(HashSet::new());
        }

        match table.success_keys() {
            Some(keys) => {
                info!(
                    path = %self.path.display(),
                    processed = keys.len(),
                    "Loaded processed exercise IDs"
                );
                Ok(keys)
            }
            None => {
                warn!(
                    path = %self.path.display(),
                    headers = ?table.headers,
                    "Result sink has no 'id'/'status' columns; treating as empty"
                );
                Ok(HashSet::new())
            }
        }
    }
}
