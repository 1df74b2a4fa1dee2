//! Exercise records as fetched from a source and their canonical projection.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A raw record as returned by a [`RecordSource`](super::RecordSource).
///
/// The payload is kept as untyped JSON; different sources use different
/// column names and encodings, and normalization is a per-record step whose
/// failure must be reported rather than aborting the fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRecord(Value);

impl SourceRecord {
    /// Wrap a raw JSON value.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Build a record from a JSON object.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(Value::Object(map))
    }

    /// The raw JSON payload.
    pub fn raw(&self) -> &Value {
        &self.0
    }

    /// The record's ID in string form, if it has one.
    pub fn id(&self) -> Option<String> {
        self.0.get("id").and_then(id_string)
    }

    /// Look up a field by any of the given names.
    pub fn field(&self, names: &[&str]) -> Option<&Value> {
        names.iter().find_map(|name| self.0.get(*name))
    }
}

impl From<Value> for SourceRecord {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Canonical projection of an exercise, the form sent to the model.
///
/// Field order is fixed so the serialized prompt is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseRecord {
    pub id: String,
    pub title: Value,
    pub instruction: Value,
    pub instruction_elements: Value,
    pub answer_elements: Value,
    #[serde(rename = "type")]
    pub exercise_type: Value,
}

impl ExerciseRecord {
    /// Project a raw record onto the canonical fields.
    ///
    /// `id` is the already-resolved record ID (synthesized by the caller when
    /// the record has none). Element fields stored as JSON text are decoded;
    /// text that looks like JSON but does not parse is an error.
    pub fn normalize(record: &SourceRecord, id: &str) -> Result<Self, String> {
        if !record.raw().is_object() {
            return Err(format!(
                "expected an object, found {}",
                value_kind(record.raw())
            ));
        }

        let text = |names: &[&str]| record.field(names).cloned().unwrap_or(Value::Null);

        Ok(Self {
            id: id.to_string(),
            title: text(&["title", "public_title"]),
            instruction: text(&["instruction"]),
            instruction_elements: decode_elements(
                "instruction_elements",
                record.field(&["instruction_elements", "instructionElements"]),
            )?,
            answer_elements: decode_elements(
                "answer_elements",
                record.field(&["answer_elements", "answerElements"]),
            )?,
            exercise_type: text(&["type"]),
        })
    }
}

/// Decode an element field that may hold JSON encoded as text.
fn decode_elements(name: &str, value: Option<&Value>) -> Result<Value, String> {
    match value {
        None => Ok(Value::Null),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                serde_json::from_str(trimmed)
                    .map_err(|e| format!("{} is not valid JSON: {}", name, e))
            } else {
                Ok(Value::String(s.clone()))
            }
        }
        Some(other) => Ok(other.clone()),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// String form of an identifier value.
///
/// IDs are compared as strings everywhere so that `100047` and `"100047"`
/// refer to the same record. Integral floats lose their fraction.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().map(|f| {
                    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
                        format!("{}", f as i64)
                    } else {
                        f.to_string()
                    }
                })
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_string_normalizes_numbers_and_text() {
        assert_eq!(id_string(&json!(100047)).as_deref(), Some("100047"));
        assert_eq!(id_string(&json!(" 100047 ")).as_deref(), Some("100047"));
        assert_eq!(id_string(&json!(100047.0)).as_deref(), Some("100047"));
        assert_eq!(id_string(&json!("")), None);
        assert_eq!(id_string(&json!(null)), None);
        assert_eq!(id_string(&json!(true)), None);
    }

    #[test]
    fn test_normalize_reads_aliases() {
        let record = SourceRecord::new(json!({
            "id": 7,
            "public_title": "Past tense",
            "instruction": "Fill the gap",
            "instructionElements": ["I", "___", "home"],
            "answer_elements": "[\"went\"]",
            "type": "gap_fill",
            "category_id": 100052
        }));

        let exercise = ExerciseRecord::normalize(&record, "7").unwrap();
        assert_eq!(exercise.id, "7");
        assert_eq!(exercise.title, json!("Past tense"));
        assert_eq!(exercise.instruction_elements, json!(["I", "___", "home"]));
        assert_eq!(exercise.answer_elements, json!(["went"]));
        assert_eq!(exercise.exercise_type, json!("gap_fill"));
    }

    #[test]
    fn test_normalize_keeps_plain_text_elements() {
        let record = SourceRecord::new(json!({"instruction_elements": "plain words"}));
        let exercise = ExerciseRecord::normalize(&record, "exercise_0").unwrap();
        assert_eq!(exercise.instruction_elements, json!("plain words"));
        assert_eq!(exercise.answer_elements, Value::Null);
    }

    #[test]
    fn test_normalize_rejects_broken_json_text() {
        let record = SourceRecord::new(json!({"id": 1, "answer_elements": "[\"went\""}));
        let err = ExerciseRecord::normalize(&record, "1").unwrap_err();
        assert!(err.contains("answer_elements"));
    }

    #[test]
    fn test_normalize_rejects_non_object() {
        let record = SourceRecord::new(json!([1, 2, 3]));
        let err = ExerciseRecord::normalize(&record, "exercise_3").unwrap_err();
        assert!(err.contains("an array"));
    }

    #[test]
    fn test_serialized_field_order_is_fixed() {
        let record = SourceRecord::new(json!({"type": "quiz", "id": 1, "title": "T"}));
        let exercise = ExerciseRecord::normalize(&record, "1").unwrap();
        let text = serde_json::to_string(&exercise).unwrap();
        assert!(text.starts_with(r#"{"id":"1","title":"T","instruction":null"#));
        assert!(text.ends_with(r#""type":"quiz"}"#));
    }
}
