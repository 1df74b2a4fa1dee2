//! Review of a single exercise record.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::input::{ExerciseRecord, SourceRecord};
use crate::llm::{PromptBuilder, ReviewModel};

use super::extract::extract_json;
use super::outcome::ReviewOutcome;
use super::validate::validate_response;

/// Characters of a response kept as a preview in extraction failures.
pub const PREVIEW_CHARS: usize = 500;

/// Runs one record through prompt, model call, extraction and validation.
#[derive(Clone)]
pub struct RecordProcessor {
    model: Arc<dyn ReviewModel>,
    prompts: PromptBuilder,
}

impl RecordProcessor {
    /// Create a processor calling `model` with prompts from `prompts`.
    pub fn new(model: Arc<dyn ReviewModel>, prompts: PromptBuilder) -> Self {
        Self { model, prompts }
    }

    /// The model this processor calls.
    pub fn model(&self) -> &dyn ReviewModel {
        self.model.as_ref()
    }

    /// Review one record.
    ///
    /// `index` is the record's position in the batch and names records that
    /// carry no ID in logs and failures. Every failure is returned as a
    /// tagged outcome.
    ///
    /// A success for a record without an ID carries no ID at all: the
    /// synthesized name is positional, so it could neither exclude the record
    /// on a later run nor tell two such records apart.
    pub async fn process(&self, record: &SourceRecord, index: usize) -> ReviewOutcome {
        let source_id = record.id();
        let record_id = source_id
            .clone()
            .unwrap_or_else(|| format!("exercise_{}", index));

        let exercise = match ExerciseRecord::normalize(record, &record_id) {
            Ok(exercise) => exercise,
            Err(details) => {
                warn!(exercise_id = %record_id, %details, "Exercise parsing failed");
                return ReviewOutcome::ParsingFailed {
                    id: record_id,
                    details,
                };
            }
        };

        let prompt = match self.prompts.build(&record_id, &exercise) {
            Ok(prompt) => prompt,
            Err(e) => {
                return ReviewOutcome::ParsingFailed {
                    id: record_id,
                    details: e.to_string(),
                };
            }
        };

        info!(exercise_id = %record_id, model = self.model.name(), "Sending to model");
        let raw_response = match self.model.invoke(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(exercise_id = %record_id, error = %e, "Model request failed");
                return ReviewOutcome::AiRequestFailed {
                    id: record_id,
                    details: e.to_string(),
                };
            }
        };
        debug!(exercise_id = %record_id, bytes = raw_response.len(), "Model responded");

        let extracted = match extract_json(&raw_response) {
            Some(text) => text.to_string(),
            None => {
                let preview = preview(&raw_response);
                warn!(exercise_id = %record_id, %preview, "Failed to extract JSON from response");
                return ReviewOutcome::ExtractionFailed {
                    id: record_id,
                    preview,
                    raw_response,
                };
            }
        };

        let parsed: Value = match serde_json::from_str(&extracted) {
            Ok(value) => value,
            Err(e) => {
                warn!(exercise_id = %record_id, error = %e, %extracted, "Extracted JSON did not parse");
                return ReviewOutcome::ResponseParseFailed {
                    id: record_id,
                    details: e.to_string(),
                    extracted,
                    raw_response,
                };
            }
        };

        match validate_response(parsed, &record_id) {
            ReviewOutcome::Success {
                correctness,
                suggestion,
                ..
            } if source_id.is_none() => {
                warn!(exercise_id = %record_id, "Reviewed a record without an ID; it will not be stored");
                ReviewOutcome::Success {
                    id: None,
                    original_id: None,
                    correctness,
                    suggestion,
                }
            }
            outcome => {
                if outcome.is_success() {
                    info!(exercise_id = %record_id, "Successfully processed");
                }
                outcome
            }
        }
    }
}

/// First [`PREVIEW_CHARS`] characters of `text`, with `...` when cut.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
