//! Run configuration.
//!
//! A [`RunConfig`] is read from TOML, overridden by command-line flags and
//! validated once before a run starts. Every field has a default, so an
//! empty file (or no file at all) is a valid configuration.
//!
//! ```toml
//! fetch_count = 10
//! concurrency = 4
//! delay_ms = 300
//! output_dir = "responses"
//!
//! [model]
//! provider = "gemini"
//! temperature = 1.0
//!
//! [source]
//! kind = "sqlite"
//! url = "sqlite://exercises.db"
//! table = "exercises"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ReviewError, Result};
use crate::input::{DEFAULT_TABLE, JsonFileSource, RecordSource, SqliteSource};
use crate::llm::{DEFAULT_INSTRUCTIONS, ModelConfig};
use crate::review::KNOWN_COLUMNS;

/// Column projection of the result sink when none is configured.
pub fn default_columns() -> Vec<String> {
    ["id", "original_id", "status", "correctness", "suggestion"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

/// Where candidate records come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// A JSON array export on disk.
    Json { path: PathBuf },
    /// A SQLite database table.
    Sqlite {
        url: String,
        #[serde(default = "default_table")]
        table: String,
    },
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

impl SourceConfig {
    /// Open the configured source.
    pub async fn connect(&self) -> Result<Box<dyn RecordSource>> {
        match self {
            SourceConfig::Json { path } => Ok(Box::new(JsonFileSource::new(path))),
            SourceConfig::Sqlite { url, table } => {
                Ok(Box::new(SqliteSource::connect(url, table.clone()).await?))
            }
        }
    }

    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            SourceConfig::Json { path } => format!("json:{}", path.display()),
            SourceConfig::Sqlite { url, table } => format!("sqlite:{}#{}", url, table),
        }
    }
}

/// Settings for one batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Maximum candidates fetched per run.
    pub fetch_count: usize,

    /// Inclusive lower bound on record IDs.
    pub starting_id: Option<String>,

    /// Only review records in this category.
    pub category_id: Option<String>,

    /// Maximum records in flight at once.
    pub concurrency: usize,

    /// Pause before each admitted record's model call.
    pub delay_ms: u64,

    /// Directory holding the sink and failure log.
    pub output_dir: PathBuf,

    /// Sink file name within `output_dir`.
    pub output_file: String,

    /// Failure log file name within `output_dir`.
    pub failures_file: String,

    /// Ordered sink column projection.
    pub columns: Vec<String>,

    /// Review instruction template.
    pub instructions: String,

    /// Model provider settings.
    pub model: ModelConfig,

    /// Record source; may also be given on the command line.
    pub source: Option<SourceConfig>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            fetch_count: 3,
            starting_id: None,
            category_id: None,
            concurrency: 1,
            delay_ms: 300,
            output_dir: PathBuf::from("responses"),
            output_file: "ai_feedback_results.csv".to_string(),
            failures_file: "ai_feedback_failures.csv".to_string(),
            columns: default_columns(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            model: ModelConfig::default(),
            source: None,
        }
    }
}

impl RunConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ReviewError::io(path, e))?;
        Self::from_toml(&text)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Check the settings a run depends on.
    pub fn validate(&self) -> Result<()> {
        if self.fetch_count == 0 {
            return Err(ReviewError::Config("fetch_count must be at least 1".into()));
        }
        if self.concurrency == 0 {
            return Err(ReviewError::Config("concurrency must be at least 1".into()));
        }
        if self.output_file.trim().is_empty() {
            return Err(ReviewError::Config("output_file must not be empty".into()));
        }
        if self.failures_file == self.output_file {
            return Err(ReviewError::Config(
                "failures_file must differ from output_file".into(),
            ));
        }
        for required in ["id", "status"] {
            if !self.columns.iter().any(|c| c == required) {
                return Err(ReviewError::Config(format!(
                    "columns must include '{}'",
                    required
                )));
            }
        }
        if let Some(unknown) = self
            .columns
            .iter()
            .find(|c| !KNOWN_COLUMNS.contains(&c.as_str()))
        {
            return Err(ReviewError::Config(format!(
                "Unknown sink column '{}'. Known columns: {}",
                unknown,
                KNOWN_COLUMNS.join(", ")
            )));
        }
        if self.instructions.trim().is_empty() {
            return Err(ReviewError::Config("instructions must not be empty".into()));
        }
        Ok(())
    }

    /// Full path of the result sink.
    pub fn sink_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_file)
    }

    /// Full path of the failure log.
    pub fn failures_path(&self) -> PathBuf {
        self.output_dir.join(&self.failures_file)
    }
}
