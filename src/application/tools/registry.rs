use serde_json::{Value, json};
use std::sync::Arc;

use crate::application::ports::language_model::ToolDefinition;
use crate::application::tools::tool::{ParsedInput, Tool};
use crate::domain::entities::ToolCall;

/// Longest tool output handed back to the model, in characters.
pub const TOOL_OUTPUT_MAX_CHARS: usize = 4000;

/// A validated-on-dispatch request to run one tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCommand {
    pub tool_name: String,
    pub arguments: ParsedInput,
}

impl ToolCommand {
    pub fn new(tool_name: impl Into<String>, arguments: ParsedInput) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }

    pub fn from_call(call: &ToolCall) -> Self {
        Self::new(call.name.clone(), ParsedInput::parse(&call.arguments))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub content: String,
    pub is_error: bool,
}

/// Static table of the tools the agent may call.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    pub fn find(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|tool| tool.name().to_string()).collect()
    }

    /// Runs a command. Unknown tools and missing arguments come back as error payloads.
    pub async fn dispatch(&self, command: ToolCommand) -> ToolOutcome {
        let Some(tool) = self.find(&command.tool_name) else {
            tracing::warn!("Model requested unknown tool '{}'", command.tool_name);
            return Self::error(json!({
                "error": format!("Unknown tool: {}", command.tool_name),
                "availableTools": self.names(),
            }));
        };

        let definition = tool.definition();
        if let Err(e) = validate_args(&definition, &command.arguments.as_arguments()) {
            tracing::warn!("Rejected call to {}: {}", definition.name, e);
            return Self::error(json!({ "error": e }));
        }

        tracing::info!("Executing tool {}", definition.name);
        let payload = tool.execute(command.arguments).await;
        let is_error = payload.get("error").is_some_and(|e| !e.is_null());

        ToolOutcome {
            content: truncate_output(payload, TOOL_OUTPUT_MAX_CHARS),
            is_error,
        }
    }

    fn error(payload: Value) -> ToolOutcome {
        ToolOutcome {
            content: payload.to_string(),
            is_error: true,
        }
    }
}

pub fn validate_args(definition: &ToolDefinition, args: &Value) -> Result<(), String> {
    if let Some(required) = definition.parameters.get("required").and_then(|r| r.as_array()) {
        for key in required.iter().filter_map(|r| r.as_str()) {
            if args.get(key).is_none() {
                return Err(format!("Missing required argument: {}", key));
            }
        }
    }
    Ok(())
}

/// Serialises a payload within `max_chars`, dropping trailing entries of its largest
/// array and marking it `"truncated": true`. The result is always valid JSON.
fn truncate_output(payload: Value, max_chars: usize) -> String {
    let text = payload.to_string();
    if text.chars().count() <= max_chars {
        return text;
    }

    let mut payload = payload;
    if let Value::Object(fields) = &mut payload {
        fields.insert("truncated".to_string(), Value::Bool(true));
        loop {
            let largest = fields
                .iter()
                .filter_map(|(key, value)| match value {
                    Value::Array(items) if !items.is_empty() => {
                        Some((key.clone(), value.to_string().len()))
                    }
                    _ => None,
                })
                .max_by_key(|(_, size)| *size)
                .map(|(key, _)| key);

            let Some(key) = largest else { break };
            if let Some(Value::Array(items)) = fields.get_mut(&key) {
                items.pop();
            }

            let text = Value::Object(fields.clone()).to_string();
            if text.chars().count() <= max_chars {
                return text;
            }
        }
    }

    let mut budget = max_chars.saturating_sub(32);
    loop {
        let preview: String = text.chars().take(budget).collect();
        let output = json!({ "truncated": true, "preview": preview }).to_string();
        if budget == 0 || output.chars().count() <= max_chars {
            return output;
        }
        budget = budget * 3 / 4;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes its text argument"
        }

        fn parameters(&self) -> Value {
            json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            })
        }

        async fn execute(&self, input: ParsedInput) -> Value {
            match input {
                ParsedInput::Structured(fields) => json!({ "echo": fields.get("text") }),
                ParsedInput::Freeform(text) => json!({ "echo": text }),
            }
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new(vec![Arc::new(EchoTool)])
    }

    #[tokio::test]
    async fn test_unknown_tool_is_rejected() {
        let outcome = registry()
            .dispatch(ToolCommand::new("drop_tables", ParsedInput::Freeform(String::new())))
            .await;

        assert!(outcome.is_error);
        assert!(outcome.content.contains("Unknown tool: drop_tables"));
        assert!(outcome.content.contains("echo"));
    }

    #[tokio::test]
    async fn test_required_arguments_are_checked() {
        let outcome = registry()
            .dispatch(ToolCommand::new("echo", ParsedInput::parse("{}")))
            .await;
        assert!(outcome.is_error);
        assert!(outcome.content.contains("Missing required argument: text"));

        let outcome = registry()
            .dispatch(ToolCommand::from_call(&ToolCall {
                id: "call_1".into(),
                name: "echo".into(),
                arguments: r#"{"text": "hi"}"#.into(),
            }))
            .await;
        assert!(!outcome.is_error);
        assert_eq!(outcome.content, r#"{"echo":"hi"}"#);
    }

    #[test]
    fn test_long_output_stays_valid_json() {
        let items: Vec<Value> = (0..200)
            .map(|i| json!({ "name": format!("Item {i}"), "description": "é".repeat(40) }))
            .collect();
        let payload = json!({ "products": items, "total": 200, "searchType": "embedding" });

        let output = truncate_output(payload, TOOL_OUTPUT_MAX_CHARS);
        assert!(output.chars().count() <= TOOL_OUTPUT_MAX_CHARS);

        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["truncated"], json!(true));
        assert_eq!(parsed["total"], 200);
        let kept = parsed["products"].as_array().unwrap();
        assert!(!kept.is_empty() && kept.len() < 200);
        assert_eq!(kept[0]["name"], "Item 0");
    }

    #[test]
    fn test_output_without_arrays_falls_back_to_preview() {
        let payload = json!({ "text": "é".repeat(TOOL_OUTPUT_MAX_CHARS + 10) });

        let output = truncate_output(payload, TOOL_OUTPUT_MAX_CHARS);
        assert!(output.chars().count() <= TOOL_OUTPUT_MAX_CHARS);

        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["truncated"], json!(true));
        assert!(parsed["preview"].as_str().unwrap().starts_with(r#"{"text":"é"#));
    }

    #[test]
    fn test_short_output_is_unchanged() {
        assert_eq!(truncate_output(json!({ "ok": true }), 100), r#"{"ok":true}"#);
    }

    #[test]
    fn test_definitions_expose_schema() {
        let definitions = registry().definitions();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].parameters["required"], json!(["text"]));
    }
}
