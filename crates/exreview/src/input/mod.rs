//! Record sources and record normalization.

mod record;
mod source;
mod sqlite;

pub use record::{ExerciseRecord, SourceRecord, id_string};
pub use source::{FetchQuery, JsonFileSource, MemorySource, RecordSource, compare_ids};
pub use sqlite::{DEFAULT_TABLE, SqliteSource};
