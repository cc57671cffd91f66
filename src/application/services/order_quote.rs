use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::CatalogItem;
use crate::domain::repositories::CatalogRepository;
use crate::domain::value_objects::EntityKind;

#[derive(Debug)]
pub enum OrderQuoteError {
    EmptyOrder,
    CatalogError(String),
}

impl std::fmt::Display for OrderQuoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderQuoteError::EmptyOrder => write!(f, "Order contains no items"),
            OrderQuoteError::CatalogError(msg) => write!(f, "Catalog error: {}", msg),
        }
    }
}

impl std::error::Error for OrderQuoteError {}

fn default_quantity() -> u32 {
    1
}

/// One cart line, identified by catalog id or by exact name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl OrderLineRequest {
    fn reference(&self) -> String {
        match (&self.id, &self.name) {
            (Some(id), _) => id.to_string(),
            (None, Some(name)) => name.clone(),
            (None, None) => "<unnamed>".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotedLine {
    pub item_id: Uuid,
    pub name: String,
    pub kind: EntityKind,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderIssue {
    pub reference: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuote {
    pub lines: Vec<QuotedLine>,
    pub total_cents: i64,
    pub issues: Vec<OrderIssue>,
}

impl OrderQuote {
    pub fn total(&self) -> String {
        format_cents(self.total_cents)
    }
}

pub fn to_cents(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, cents.abs() / 100, cents.abs() % 100)
}

/// Prices a cart against the current catalog. Read-only: nothing is reserved or persisted.
pub struct OrderQuoteService {
    catalog_repository: Arc<dyn CatalogRepository>,
}

impl OrderQuoteService {
    pub fn new(catalog_repository: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog_repository }
    }

    pub async fn quote(&self, lines: &[OrderLineRequest]) -> Result<OrderQuote, OrderQuoteError> {
        if lines.is_empty() {
            return Err(OrderQuoteError::EmptyOrder);
        }

        let mut priced = Vec::new();
        for kind in [EntityKind::Product, EntityKind::Service] {
            priced.extend(
                self.catalog_repository
                    .list_by_kind(kind)
                    .await
                    .map_err(|e| OrderQuoteError::CatalogError(e.to_string()))?,
            );
        }

        let mut quote = OrderQuote {
            lines: Vec::new(),
            total_cents: 0,
            issues: Vec::new(),
        };

        for line in lines {
            match Self::price_line(&priced, line) {
                Ok(quoted) => {
                    quote.total_cents += quoted.line_total_cents;
                    quote.lines.push(quoted);
                }
                Err(reason) => quote.issues.push(OrderIssue {
                    reference: line.reference(),
                    reason,
                }),
            }
        }

        tracing::debug!(
            "Quoted {} lines, {} issues, total {}",
            quote.lines.len(),
            quote.issues.len(),
            quote.total()
        );
        Ok(quote)
    }

    fn price_line(priced: &[CatalogItem], line: &OrderLineRequest) -> Result<QuotedLine, String> {
        if line.quantity == 0 {
            return Err("quantity must be at least 1".to_string());
        }

        let item = match (&line.id, &line.name) {
            (Some(id), _) => priced.iter().find(|item| item.id() == *id),
            (None, Some(name)) => {
                let wanted = name.trim().to_lowercase();
                priced
                    .iter()
                    .find(|item| item.title().to_lowercase() == wanted)
            }
            (None, None) => return Err("line has neither id nor name".to_string()),
        }
        .ok_or_else(|| "not found in catalog".to_string())?;

        if !item.is_active() {
            return Err("no longer available".to_string());
        }
        let price = item.price().ok_or_else(|| "has no price".to_string())?;

        let unit_price_cents = to_cents(price);
        Ok(QuotedLine {
            item_id: item.id(),
            name: item.title().to_string(),
            kind: item.kind(),
            quantity: line.quantity,
            unit_price_cents,
            line_total_cents: unit_price_cents * line.quantity as i64,
        })
    }
}
