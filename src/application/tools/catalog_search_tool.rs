use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;

use crate::application::services::cascade_search::{
    CascadeSearchController, RetrievalRequest, RetrievalResponse,
};
use crate::application::tools::tool::{ParsedInput, Tool, ToolInputError};
use crate::domain::value_objects::EntityKind;

const NUMERIC_FIELDS: [&str; 5] = ["minPrice", "maxPrice", "min_price", "max_price", "limit"];

/// `search_<kind>` tool backed by the cascade controller of that kind.
pub struct CatalogSearchTool {
    name: String,
    description: String,
    controller: Arc<CascadeSearchController>,
}

impl CatalogSearchTool {
    pub fn new(controller: Arc<CascadeSearchController>) -> Self {
        let kind = controller.kind();
        Self {
            name: format!("search_{}", kind.plural()),
            description: describe(kind).to_string(),
            controller,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.controller.kind()
    }

    fn request_from(&self, input: ParsedInput) -> Result<RetrievalRequest, ToolInputError> {
        match input {
            ParsedInput::Freeform(text) => Ok(RetrievalRequest::search(&text)),
            ParsedInput::Structured(mut fields) => {
                for field in NUMERIC_FIELDS {
                    coerce_number(&mut fields, field)?;
                }
                serde_json::from_value(Value::Object(fields)).map_err(|e| {
                    ToolInputError::InvalidField {
                        field: "arguments".to_string(),
                        reason: e.to_string(),
                    }
                })
            }
        }
    }
}

#[async_trait]
impl Tool for CatalogSearchTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        let kind = self.kind();
        let category_hint = if kind == EntityKind::Document {
            "Restrict to documents whose path contains this text"
        } else {
            "Restrict to a category"
        };
        let mut properties = json!({
            "search": {
                "type": "string",
                "description": format!("Words describing the {} to look for", kind.plural())
            },
            "categoryOrPath": {
                "type": "string",
                "description": category_hint
            },
            "isActive": { "type": "boolean", "description": "Only active or only inactive entries" },
            "limit": { "type": "integer", "description": "Maximum number of results (default 10, max 50)" },
            "countOnly": { "type": "boolean", "description": "Return counts per category instead of items" }
        });

        if kind.is_priced() {
            if let Value::Object(map) = &mut properties {
                map.insert(
                    "minPrice".to_string(),
                    json!({ "type": "number", "description": "Lowest acceptable price" }),
                );
                map.insert(
                    "maxPrice".to_string(),
                    json!({ "type": "number", "description": "Highest acceptable price" }),
                );
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": []
        })
    }

    async fn execute(&self, input: ParsedInput) -> Value {
        let kind = self.kind();
        match self.request_from(input) {
            Ok(request) => self.controller.execute(request).await.to_tool_payload(kind),
            Err(e) => {
                tracing::warn!("{} rejected its arguments: {}", self.name, e);
                RetrievalResponse::failed(e.to_string()).to_tool_payload(kind)
            }
        }
    }
}

fn describe(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Product => {
            "Search the product catalog by meaning or keyword. Supports price, category and availability filters."
        }
        EntityKind::Service => {
            "Search the services offered, with optional price and category filters."
        }
        EntityKind::Faq => "Search frequently asked questions and their answers.",
        EntityKind::Document => {
            "Search uploaded documents such as policies and manuals. Results include the matching passage."
        }
    }
}

/// Accepts numbers sent as strings, e.g. "20", "€20" or "1,250.50".
fn coerce_number(fields: &mut Map<String, Value>, field: &str) -> Result<(), ToolInputError> {
    let Some(Value::String(raw)) = fields.get(field) else {
        return Ok(());
    };

    let invalid = |reason: &str| ToolInputError::InvalidField {
        field: field.to_string(),
        reason: format!("'{}' {}", raw, reason),
    };
    let number = parse_amount(raw).ok_or_else(|| invalid("is not a number"))?;

    let value = if field == "limit" {
        if number < 0.0 || number.fract() != 0.0 {
            return Err(invalid("is not a whole, non-negative count"));
        }
        json!(number as u64)
    } else {
        json!(number)
    };
    fields.insert(field.to_string(), value);
    Ok(())
}

const CURRENCY_SYMBOLS: [char; 3] = ['€', '$', '£'];

/// Optional sign and currency symbol, digits with `,` thousands groups, optional `.` fraction.
fn parse_amount(raw: &str) -> Option<f64> {
    let mut rest = raw.trim();
    let mut negative = false;
    if let Some(unsigned) = rest.strip_prefix('-') {
        negative = true;
        rest = unsigned.trim_start();
    }
    if let Some(bare) = rest.strip_prefix(CURRENCY_SYMBOLS) {
        rest = bare.trim_start();
    }
    if !negative {
        if let Some(unsigned) = rest.strip_prefix('-') {
            negative = true;
            rest = unsigned;
        }
    }

    let (whole, fraction) = match rest.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (rest, None),
    };

    let groups: Vec<&str> = whole.split(',').collect();
    let (head, tail) = groups.split_first()?;
    let head_ok = if tail.is_empty() {
        all_digits(head)
    } else {
        all_digits(head) && head.len() <= 3
    };
    if !head_ok || !tail.iter().all(|group| group.len() == 3 && all_digits(group)) {
        return None;
    }

    let mut digits = groups.concat();
    if let Some(fraction) = fraction {
        if !all_digits(fraction) {
            return None;
        }
        digits.push('.');
        digits.push_str(fraction);
    }

    let value: f64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}

fn all_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}
