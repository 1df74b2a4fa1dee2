//! Review outcome types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether a record was reviewed successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Failed,
}

impl OutcomeStatus {
    /// Value written to the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Success => "success",
            OutcomeStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a record could not be reviewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The input record is malformed.
    ParsingFailed,
    /// The model call failed (transport, quota, bad request).
    AiRequestFailed,
    /// No JSON-like text in the model output.
    ExtractionFailed,
    /// The extracted text is not valid JSON.
    ResponseParseFailed,
    /// Valid JSON without the required fields.
    ValidationFailed,
}

impl FailureKind {
    /// Tag written to the `error` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ParsingFailed => "parsing_failed",
            FailureKind::AiRequestFailed => "ai_request_failed",
            FailureKind::ExtractionFailed => "extraction_failed",
            FailureKind::ResponseParseFailed => "response_parse_failed",
            FailureKind::ValidationFailed => "validation_failed",
        }
    }

    /// Parse a tag from the `error` column.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "parsing_failed" => Some(FailureKind::ParsingFailed),
            "ai_request_failed" => Some(FailureKind::AiRequestFailed),
            "extraction_failed" => Some(FailureKind::ExtractionFailed),
            "response_parse_failed" => Some(FailureKind::ResponseParseFailed),
            "validation_failed" => Some(FailureKind::ValidationFailed),
            _ => None,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of attempting to review one record.
///
/// Each variant carries only the fields relevant to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReviewOutcome {
    /// The model produced a valid review.
    Success {
        /// ID claimed by the model, kept verbatim.
        id: Option<String>,
        /// Source record ID, set when the claim is absent or differs.
        original_id: Option<String>,
        correctness: f64,
        suggestion: String,
    },
    ParsingFailed {
        id: String,
        details: String,
    },
    AiRequestFailed {
        id: String,
        details: String,
    },
    ExtractionFailed {
        id: String,
        /// First characters of the response.
        preview: String,
        raw_response: String,
    },
    ResponseParseFailed {
        id: String,
        details: String,
        /// The text handed to the JSON parser, verbatim.
        extracted: String,
        raw_response: String,
    },
    ValidationFailed {
        id: String,
        details: String,
        /// The parsed model response.
        response: Value,
    },
}

/// Columns an outcome can populate, in default order.
pub const KNOWN_COLUMNS: &[&str] = &[
    "id",
    "original_id",
    "status",
    "correctness",
    "suggestion",
    "error",
    "details",
    "raw_preview",
    "extracted_string",
    "ai_response",
    "raw_response",
];

impl ReviewOutcome {
    /// Success or failure.
    pub fn status(&self) -> OutcomeStatus {
        match self {
            ReviewOutcome::Success { .. } => OutcomeStatus::Success,
            _ => OutcomeStatus::Failed,
        }
    }

    /// Whether this outcome is a success.
    pub fn is_success(&self) -> bool {
        self.status() == OutcomeStatus::Success
    }

    /// Failure tag, `None` for a success.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ReviewOutcome::Success { .. } => None,
            ReviewOutcome::ParsingFailed { .. } => Some(FailureKind::ParsingFailed),
            ReviewOutcome::AiRequestFailed { .. } => Some(FailureKind::AiRequestFailed),
            ReviewOutcome::ExtractionFailed { .. } => Some(FailureKind::ExtractionFailed),
            ReviewOutcome::ResponseParseFailed { .. } => Some(FailureKind::ResponseParseFailed),
            ReviewOutcome::ValidationFailed { .. } => Some(FailureKind::ValidationFailed),
        }
    }

    /// The outcome's `id` field.
    pub fn id(&self) -> Option<&str> {
        match self {
            ReviewOutcome::Success { id, .. } => id.as_deref(),
            ReviewOutcome::ParsingFailed { id, .. }
            | ReviewOutcome::AiRequestFailed { id, .. }
            | ReviewOutcome::ExtractionFailed { id, .. }
            | ReviewOutcome::ResponseParseFailed { id, .. }
            | ReviewOutcome::ValidationFailed { id, .. } => Some(id),
        }
    }

    /// The outcome's `original_id` field.
    pub fn original_id(&self) -> Option<&str> {
        match self {
            ReviewOutcome::Success { original_id, .. } => original_id.as_deref(),
            _ => None,
        }
    }

    /// ID of the source record this outcome belongs to.
    ///
    /// `original_id` when set, since the model's own `id` may be wrong.
    pub fn record_key(&self) -> Option<&str> {
        self.original_id()
            .or_else(|| self.id())
            .filter(|id| !id.is_empty())
    }

    /// Value of a named column, `None` when the outcome has no such field.
    pub fn column(&self, name: &str) -> Option<String> {
        match (name, self) {
            ("id", _) => self.id().map(str::to_string),
            ("original_id", _) => self.original_id().map(str::to_string),
            ("status", _) => Some(self.status().to_string()),
            ("error", _) => self.failure_kind().map(|k| k.to_string()),
            ("correctness", ReviewOutcome::Success { correctness, .. }) => {
                Some(correctness.to_string())
            }
            ("suggestion", ReviewOutcome::Success { suggestion, .. }) => Some(suggestion.clone()),
            ("details", ReviewOutcome::ParsingFailed { details, .. })
            | ("details", ReviewOutcome::AiRequestFailed { details, .. })
            | ("details", ReviewOutcome::ResponseParseFailed { details, .. })
            | ("details", ReviewOutcome::ValidationFailed { details, .. }) => Some(details.clone()),
            ("raw_preview", ReviewOutcome::ExtractionFailed { preview, .. }) => {
                Some(preview.clone())
            }
            ("extracted_string", ReviewOutcome::ResponseParseFailed { extracted, .. }) => {
                Some(extracted.clone())
            }
            ("ai_response", ReviewOutcome::ValidationFailed { response, .. }) => {
                Some(response.to_string())
            }
            ("raw_response", ReviewOutcome::ExtractionFailed { raw_response, .. })
            | ("raw_response", ReviewOutcome::ResponseParseFailed { raw_response, .. }) => {
                Some(raw_response.clone())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_record_key_prefers_original_id() {
        let outcome = ReviewOutcome::Success {
            id: Some("100099".to_string()),
            original_id: Some("100047".to_string()),
            correctness: 0.9,
            suggestion: "Fine".to_string(),
        };
        assert_eq!(outcome.id(), Some("100099"));
        assert_eq!(outcome.record_key(), Some("100047"));
        assert_eq!(outcome.failure_kind(), None);
    }

    #[test]
    fn test_columns_for_success() {
        let outcome = ReviewOutcome::Success {
            id: Some("7".to_string()),
            original_id: None,
            correctness: 0.75,
            suggestion: "Add an example".to_string(),
        };
        assert_eq!(outcome.column("status").as_deref(), Some("success"));
        assert_eq!(outcome.column("correctness").as_deref(), Some("0.75"));
        assert_eq!(outcome.column("error"), None);
        assert_eq!(outcome.column("unknown"), None);
    }

    #[test]
    fn test_columns_for_failures() {
        let outcome = ReviewOutcome::ResponseParseFailed {
            id: "9".to_string(),
            details: "EOF while parsing".to_string(),
            extracted: "{\"a\":".to_string(),
            raw_response: "```json\n{\"a\":\n```".to_string(),
        };
        assert_eq!(outcome.column("error").as_deref(), Some("response_parse_failed"));
        assert_eq!(outcome.column("extracted_string").as_deref(), Some("{\"a\":"));
        assert_eq!(outcome.column("suggestion"), None);
        assert_eq!(outcome.record_key(), Some("9"));

        let outcome = ReviewOutcome::ValidationFailed {
            id: "9".to_string(),
            details: "missing".to_string(),
            response: json!({"correctness": "high"}),
        };
        assert_eq!(
            outcome.column("ai_response").as_deref(),
            Some(r#"{"correctness":"high"}"#)
        );
    }

    #[test]
    fn test_failure_tags_round_trip() {
        for kind in [
            FailureKind::ParsingFailed,
            FailureKind::AiRequestFailed,
            FailureKind::ExtractionFailed,
            FailureKind::ResponseParseFailed,
            FailureKind::ValidationFailed,
        ] {
            assert_eq!(FailureKind::from_tag(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_serialized_tag() {
        let outcome = ReviewOutcome::AiRequestFailed {
            id: "1".to_string(),
            details: "timeout".to_string(),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["outcome"], "ai_request_failed");
    }
}
