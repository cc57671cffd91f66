use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::application::ports::language_model::ToolDefinition;

#[derive(Debug, Clone, PartialEq)]
pub enum ToolInputError {
    MissingField(String),
    InvalidField { field: String, reason: String },
    Unsupported(String),
}

impl std::fmt::Display for ToolInputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolInputError::MissingField(field) => write!(f, "Missing required argument: {}", field),
            ToolInputError::InvalidField { field, reason } => {
                write!(f, "Invalid argument '{}': {}", field, reason)
            }
            ToolInputError::Unsupported(msg) => write!(f, "Unsupported input: {}", msg),
        }
    }
}

impl std::error::Error for ToolInputError {}

/// Tool input after the single parse step.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedInput {
    /// A JSON object of named arguments.
    Structured(Map<String, Value>),
    /// Anything else, treated as plain search text.
    Freeform(String),
}

impl ParsedInput {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => Self::from_value(value),
            Err(_) => ParsedInput::Freeform(trimmed.to_string()),
        }
    }

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => ParsedInput::Structured(fields),
            Value::String(text) => ParsedInput::Freeform(text.trim().to_string()),
            Value::Null => ParsedInput::Structured(Map::new()),
            other => ParsedInput::Freeform(other.to_string()),
        }
    }

    /// Argument object used for schema validation; free text carries no named arguments.
    pub fn as_arguments(&self) -> Value {
        match self {
            ParsedInput::Structured(fields) => Value::Object(fields.clone()),
            ParsedInput::Freeform(_) => Value::Object(Map::new()),
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON schema of the accepted arguments.
    fn parameters(&self) -> Value;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }

    /// Runs the tool. Failures are reported inside the returned payload.
    async fn execute(&self, input: ParsedInput) -> Value;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_object_is_structured() {
        let parsed = ParsedInput::parse(r#" {"search": "wine", "maxPrice": 20} "#);
        match parsed {
            ParsedInput::Structured(fields) => {
                assert_eq!(fields.get("maxPrice"), Some(&json!(20)));
            }
            other => panic!("expected structured input, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_text_is_freeform() {
        assert_eq!(
            ParsedInput::parse("cheap red wine"),
            ParsedInput::Freeform("cheap red wine".to_string())
        );
        assert_eq!(
            ParsedInput::parse(r#""quoted text""#),
            ParsedInput::Freeform("quoted text".to_string())
        );
        assert_eq!(ParsedInput::parse("{broken"), ParsedInput::Freeform("{broken".to_string()));
    }

    #[test]
    fn test_freeform_has_no_named_arguments() {
        assert_eq!(ParsedInput::Freeform("x".into()).as_arguments(), json!({}));
    }
}
