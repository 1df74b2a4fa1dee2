//! Recover a JSON payload from free-form model output.

use once_cell::sync::Lazy;
use regex::Regex;

/// Non-greedy fenced block, optionally tagged `json`.
static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("valid fence regex"));

/// Find the substring of `text` most likely to be a JSON object.
///
/// A fenced code block wins; otherwise the span from the first `{` to the
/// last `}` is returned. Brace balance is not checked, so the result may
/// still fail to parse.
pub fn extract_json(text: &str) -> Option<&str> {
    if let Some(inner) = FENCED_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
    {
        if !inner.is_empty() {
            return Some(inner);
        }
    }

    let first = text.find('{')?;
    let last = text.rfind('}')?;
    if last > first {
        Some(text[first..=last].trim())
    } else {
        None
    }
}
