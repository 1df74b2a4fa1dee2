//! Schema checks for parsed model responses.

use serde_json::Value;
use tracing::warn;

use crate::input::id_string;

use super::outcome::ReviewOutcome;

/// Accepted range for `correctness`.
pub const CORRECTNESS_RANGE: std::ops::RangeInclusive<f64> = 0.0..=1.0;

/// Decide whether a parsed response is an acceptable review.
///
/// Returns a `Success` outcome on acceptance and a `ValidationFailed`
/// outcome otherwise. When the model's `id` is absent or disagrees with
/// `record_id`, the model's claim is kept and `original_id` records the
/// source ID.
pub fn validate_response(response: Value, record_id: &str) -> ReviewOutcome {
    let correctness = match response.get("correctness") {
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    };
    let Some(correctness) = correctness else {
        return rejected(response, record_id, "Missing or invalid 'correctness' field.");
    };

    let suggestion = match response.get("suggestion") {
        Some(Value::String(s)) => s.clone(),
        _ => return rejected(response, record_id, "Missing or invalid 'suggestion' field."),
    };

    if !CORRECTNESS_RANGE.contains(&correctness) {
        let details = format!("'correctness' {} is outside 0.0..=1.0.", correctness);
        return rejected(response, record_id, &details);
    }

    if suggestion.trim().is_empty() {
        return rejected(response, record_id, "'suggestion' is empty.");
    }

    let claimed_id = response.get("id").and_then(id_string);
    let original_id = if claimed_id.as_deref() == Some(record_id) {
        None
    } else {
        warn!(
            exercise_id = record_id,
            claimed_id = claimed_id.as_deref().unwrap_or("<none>"),
            "Response ID does not match record; recording original_id"
        );
        Some(record_id.to_string())
    };

    ReviewOutcome::Success {
        id: claimed_id,
        original_id,
        correctness,
        suggestion,
    }
}

fn rejected(response: Value, record_id: &str, details: &str) -> ReviewOutcome {
    warn!(exercise_id = record_id, details, "Response failed validation");
    ReviewOutcome::ValidationFailed {
        id: record_id.to_string(),
        details: details.to_string(),
        response,
    }
}
