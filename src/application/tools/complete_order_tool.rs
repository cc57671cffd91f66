use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::application::services::order_quote::{
    OrderLineRequest, OrderQuote, OrderQuoteService, format_cents,
};
use crate::application::tools::tool::{ParsedInput, Tool, ToolInputError};

pub const COMPLETE_ORDER_TOOL: &str = "complete_order";

/// Prices a cart with current catalog prices. Nothing is placed or persisted.
pub struct CompleteOrderTool {
    quote_service: Arc<OrderQuoteService>,
}

impl CompleteOrderTool {
    pub fn new(quote_service: Arc<OrderQuoteService>) -> Self {
        Self { quote_service }
    }

    fn lines_from(input: ParsedInput) -> Result<Vec<OrderLineRequest>, ToolInputError> {
        let ParsedInput::Structured(mut fields) = input else {
            return Err(ToolInputError::Unsupported(
                "complete_order needs an 'items' list".to_string(),
            ));
        };
        let items = fields
            .remove("items")
            .ok_or_else(|| ToolInputError::MissingField("items".to_string()))?;

        serde_json::from_value(items).map_err(|e| ToolInputError::InvalidField {
            field: "items".to_string(),
            reason: e.to_string(),
        })
    }
}

fn render(quote: &OrderQuote) -> Value {
    let lines: Vec<Value> = quote
        .lines
        .iter()
        .map(|line| {
            json!({
                "id": line.item_id,
                "name": line.name,
                "kind": line.kind,
                "quantity": line.quantity,
                "unitPrice": format_cents(line.unit_price_cents),
                "lineTotal": format_cents(line.line_total_cents),
            })
        })
        .collect();

    json!({
        "lines": lines,
        "total": quote.total(),
        "issues": quote.issues,
        "placed": false,
    })
}

#[async_trait]
impl Tool for CompleteOrderTool {
    fn name(&self) -> &str {
        COMPLETE_ORDER_TOOL
    }

    fn description(&self) -> &str {
        "Compute the price of a cart of products or services using current catalog prices. \
         Reports unknown or unavailable items. Does not place the order."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "description": "Catalog id from a search result" },
                            "name": { "type": "string", "description": "Exact product or service name" },
                            "quantity": { "type": "integer", "minimum": 1 }
                        }
                    }
                }
            },
            "required": ["items"]
        })
    }

    async fn execute(&self, input: ParsedInput) -> Value {
        let lines = match Self::lines_from(input) {
            Ok(lines) => lines,
            Err(e) => return json!({ "error": e.to_string() }),
        };

        match self.quote_service.quote(&lines).await {
            Ok(quote) => render(&quote),
            Err(e) => {
                tracing::warn!("Order quote failed: {}", e);
                json!({ "error": e.to_string() })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::CatalogItem;
    use crate::domain::value_objects::EntityKind;
    use crate::infrastructure::memory::InMemoryCatalogRepository;

    fn tool() -> CompleteOrderTool {
        let items = vec![
            CatalogItem::new(EntityKind::Product, "Focaccia".into(), "Baked daily.".into())
                .with_price(4.5),
        ];
        CompleteOrderTool::new(Arc::new(OrderQuoteService::new(Arc::new(
            InMemoryCatalogRepository::new(items),
        ))))
    }

    #[tokio::test]
    async fn test_cart_is_priced() {
        let payload = tool()
            .execute(ParsedInput::parse(
                r#"{"items": [{"name": "Focaccia", "quantity": 2}, {"name": "Caviar"}]}"#,
            ))
            .await;

        assert_eq!(payload["total"], "9.00");
        assert_eq!(payload["lines"][0]["unitPrice"], "4.50");
        assert_eq!(payload["issues"][0]["reference"], "Caviar");
        assert_eq!(payload["placed"], false);
    }

    #[tokio::test]
    async fn test_freeform_input_is_rejected() {
        let payload = tool().execute(ParsedInput::parse("two focaccia please")).await;
        assert!(payload["error"].as_str().unwrap().contains("items"));
    }
}
