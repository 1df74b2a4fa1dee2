//! exreview: idempotent LLM quality review for batches of exercise records.
//!
//! Each run picks up to `fetch_count` exercises that have no successful
//! review yet, asks a language model to assess them with bounded
//! concurrency, and merges the results into a CSV sink. The sink is also
//! the record of what has been done: running again never re-reviews an
//! exercise that already has a `success` row.
//!
//! # Core Principles
//!
//! - **Idempotent**: a record with a success row is never fetched again
//! - **Isolated failures**: one bad record or model reply never affects another
//! - **Bounded**: at most `concurrency` model calls are outstanding
//!
//! # Example
//!
//! ```no_run
//! use exreview::{BatchCoordinator, RunConfig, SourceConfig};
//!
//! # async fn example() -> exreview::Result<()> {
//! let config = RunConfig::load("exreview.toml")?;
//! let coordinator = BatchCoordinator::from_config(config)?;
//! let source = SourceConfig::Json { path: "exercises.json".into() };
//! let report = coordinator.run_with(&source).await?;
//!
//! println!("Reviewed: {}", report.succeeded.len());
//! println!("Failed: {}", report.failed.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod input;
pub mod llm;
pub mod review;
pub mod store;

mod batch;

pub use batch::{BatchCoordinator, FailedRecord, RunPhase, RunReport};
pub use config::{RunConfig, SourceConfig};
pub use error::{Result, ReviewError};
pub use input::{FetchQuery, RecordSource, SourceRecord};
pub use review::{FailureKind, ReviewOutcome};
pub use store::{ResultSink, SinkReport, SinkSummary};
