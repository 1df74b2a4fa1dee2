//! Durable storage of review results.
//!
//! The sink is a CSV table with one `success` row per reviewed record. It is
//! both the output of a run and the input of the next: the
//! [`ProcessedIdTracker`] reads it to decide which records to skip.

mod sink;
mod table;
mod tracker;

pub use sink::{FAILURE_COLUMNS, ResultSink, SinkReport, SinkSummary};
pub use table::SinkTable;
pub use tracker::ProcessedIdTracker;
