//! Per-record review: extraction, validation and the record processor.

mod extract;
mod outcome;
mod processor;
mod validate;

pub use extract::extract_json;
pub use outcome::{FailureKind, KNOWN_COLUMNS, OutcomeStatus, ReviewOutcome};
pub use processor::{PREVIEW_CHARS, RecordProcessor, preview};
pub use validate::{CORRECTNESS_RANGE, validate_response};
