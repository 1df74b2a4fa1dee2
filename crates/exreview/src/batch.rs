//! Batch coordination: one idempotent review run.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::{RunConfig, SourceConfig};
use crate::error::Result;
use crate::input::{FetchQuery, RecordSource, SourceRecord};
use crate::llm::{self, PromptBuilder, ReviewModel};
use crate::review::{FailureKind, RecordProcessor, ReviewOutcome};
use crate::store::{ProcessedIdTracker, ResultSink, SinkReport};

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    #[default]
    Idle,
    Fetching,
    Dispatching,
    AwaitingCompletion,
    Persisting,
    Done,
    /// The source could not be opened or queried.
    Aborted,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Fetching => "fetching",
            RunPhase::Dispatching => "dispatching",
            RunPhase::AwaitingCompletion => "awaiting_completion",
            RunPhase::Persisting => "persisting",
            RunPhase::Done => "done",
            RunPhase::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record that failed review in this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRecord {
    pub id: String,
    pub error: FailureKind,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Final phase reached.
    pub phase: RunPhase,
    /// Candidates returned by the source.
    pub fetched: usize,
    /// Record keys reviewed successfully, in candidate order.
    pub succeeded: Vec<String>,
    /// Records that failed, in candidate order.
    pub failed: Vec<FailedRecord>,
    /// What the sink merge did; `None` when nothing was fetched.
    pub sink: Option<SinkReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    fn started() -> Self {
        Self {
            phase: RunPhase::Idle,
            fetched: 0,
            succeeded: Vec::new(),
            failed: Vec::new(),
            sink: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    fn enter(&mut self, phase: RunPhase) {
        self.phase = phase;
        info!(phase = phase.as_str(), fetched = self.fetched, "Run phase");
    }

    fn finish(mut self) -> Self {
        self.enter(RunPhase::Done);
        self.finished_at = Some(Utc::now());
        self
    }

    /// Wall-clock duration of the run, if it finished.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}

/// Drives one run: exclusion set, fetch, bounded dispatch, persistence.
pub struct BatchCoordinator {
    config: RunConfig,
    processor: RecordProcessor,
}

impl BatchCoordinator {
    /// Create a coordinator reviewing with `model`.
    ///
    /// The configuration is validated here, once.
    pub fn new(config: RunConfig, model: Arc<dyn ReviewModel>) -> Result<Self> {
        config.validate()?;
        let prompts = PromptBuilder::new(config.instructions.clone());
        Ok(Self {
            processor: RecordProcessor::new(model, prompts),
            config,
        })
    }

    /// Create a coordinator using the provider named in the configuration.
    pub fn from_config(config: RunConfig) -> Result<Self> {
        let model = llm::connect(&config.model)?;
        Self::new(config, model)
    }

    /// The validated configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Sink described by the configuration.
    pub fn sink(&self) -> Result<ResultSink> {
        Ok(
            ResultSink::new(self.config.sink_path(), self.config.columns.clone())?
                .with_failure_log(self.config.failures_path()),
        )
    }

    /// Open `source`, run against it and close it again.
    ///
    /// The source is closed whether or not the run succeeds.
    pub async fn run_with(&self, source: &SourceConfig) -> Result<RunReport> {
        info!(source = %source.describe(), "Opening record source");
        let opened = match source.connect().await {
            Ok(opened) => opened,
            Err(e) => {
                error!(phase = RunPhase::Aborted.as_str(), error = %e, "Could not open record source");
                return Err(e);
            }
        };

        let result = self.run(opened.as_ref()).await;
        opened.close().await;
        result
    }

    /// Review up to `fetch_count` records from `source` that have no
    /// successful result yet, and merge the outcomes into the sink.
    ///
    /// Per-record failures are part of the report. Only a failure to read
    /// the sink, query the source or write the sink is an error.
    pub async fn run(&self, source: &dyn RecordSource) -> Result<RunReport> {
        let mut report = RunReport::started();
        let sink = self.sink()?;

        report.enter(RunPhase::Fetching);
        let candidates = match self.fetch(source).await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(
                    phase = RunPhase::Aborted.as_str(),
                    source = source.name(),
                    error = %e,
                    "Fetching candidates failed"
                );
                return Err(e);
            }
        };
        report.fetched = candidates.len();

        if candidates.is_empty() {
            info!("No unprocessed exercises found");
            return Ok(report.finish());
        }

        report.enter(RunPhase::Dispatching);
        let delay = Duration::from_millis(self.config.delay_ms);
        let processor = &self.processor;
        let in_flight = stream::iter(candidates.iter().enumerate())
            .map(|(index, record)| async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                processor.process(record, index).await
            })
            .buffered(self.config.concurrency.max(1));

        report.enter(RunPhase::AwaitingCompletion);
        let outcomes: Vec<ReviewOutcome> = in_flight.collect().await;

        for outcome in &outcomes {
            match (outcome.failure_kind(), outcome.record_key()) {
                (None, Some(key)) => report.succeeded.push(key.to_string()),
                (None, None) => warn!("Successful review without an ID"),
                (Some(error), _) => report.failed.push(FailedRecord {
                    id: outcome.id().unwrap_or_default().to_string(),
                    error,
                }),
            }
        }
        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "All exercises processed"
        );

        report.enter(RunPhase::Persisting);
        report.sink = Some(sink.merge(&outcomes).await?);

        Ok(report.finish())
    }

    async fn fetch(&self, source: &dyn RecordSource) -> Result<Vec<SourceRecord>> {
        let processed = ProcessedIdTracker::new(self.config.sink_path()).load().await?;

        let mut query = FetchQuery::new(self.config.fetch_count).excluding(processed);
        if let Some(ref start) = self.config.starting_id {
            query = query.starting_at(start.clone());
        }
        if let Some(ref category) = self.config.category_id {
            query = query.in_category(category.clone());
        }

        let candidates = source.fetch(&query).await?;
        info!(
            source = source.name(),
            excluded = query.exclude_ids.len(),
            fetched = candidates.len(),
            "Fetched candidate exercises"
        );
        Ok(candidates)
    }
}
