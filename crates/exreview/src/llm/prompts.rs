//! Prompt construction for exercise reviews.

use crate::error::Result;
use crate::input::ExerciseRecord;

/// Substitution point for the exercise ID in an instruction template.
pub const EXERCISE_ID_PLACEHOLDER: &str = "[EXERCISE_ID]";

/// Instruction template used when none is configured.
pub const DEFAULT_INSTRUCTIONS: &str = r#"I have an exercise and I will share it with you, please check it out and let me know if there is any problem with it.
Please return the response ONLY in JSON format like this (do not include any other text or markdown fences):

{
    "id": "[EXERCISE_ID]",
    "correctness": 0.9,
    "suggestion": "You can improve this exercise by..."
}

"id" must be the exercise ID, "correctness" a score between 0.0 and 1.0, and "suggestion" constructive feedback."#;

/// Renders exercises into review prompts.
///
/// Output depends only on the template, the ID and the record, so identical
/// inputs always produce identical prompts.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    instructions: String,
}

impl PromptBuilder {
    /// Create a builder with the given instruction template.
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
        }
    }

    /// The instruction template.
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Instruction text with the exercise ID substituted.
    ///
    /// A quoted placeholder becomes a JSON string literal; any bare
    /// placeholder left over gets the raw ID.
    pub fn instructions_for(&self, exercise_id: &str) -> String {
        let quoted = format!("\"{}\"", EXERCISE_ID_PLACEHOLDER);
        let literal = serde_json::Value::String(exercise_id.to_string()).to_string();
        self.instructions
            .replace(&quoted, &literal)
            .replace(EXERCISE_ID_PLACEHOLDER, exercise_id)
    }

    /// Build the full prompt for one exercise.
    pub fn build(&self, exercise_id: &str, exercise: &ExerciseRecord) -> Result<String> {
        let data = serde_json::to_string_pretty(exercise)?;
        Ok(format!(
            "\n{}\n\nThis is the exercise data:\n```json\n{}\n```\n",
            self.instructions_for(exercise_id),
            data
        ))
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_INSTRUCTIONS)
    }
}
