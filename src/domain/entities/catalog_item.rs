use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::domain::value_objects::EntityKind;

/// Form feed separating document pages.
pub const PAGE_BREAK: char = '\u{0C}';

/// Read-only view of a product, service, FAQ or document owned by the catalog CRUD layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    id: Uuid,
    kind: EntityKind,
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default = "default_active")]
    is_active: bool,
    #[serde(default = "Utc::now")]
    updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl CatalogItem {
    pub fn new(kind: EntityKind, title: String, body: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            title,
            body,
            category: None,
            tags: Vec::new(),
            price: None,
            is_active: true,
            updated_at: Utc::now(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: Uuid,
        kind: EntityKind,
        title: String,
        body: String,
        category: Option<String>,
        tags: Vec<String>,
        price: Option<f64>,
        is_active: bool,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            title,
            body,
            category,
            tags,
            price,
            is_active,
            updated_at,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn price(&self) -> Option<f64> {
        self.price
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Text that gets chunked and embedded, split into pages.
    pub fn source_pages(&self) -> Vec<String> {
        match self.kind {
            EntityKind::Document => {
                let mut pages: Vec<String> = self
                    .body
                    .split(PAGE_BREAK)
                    .map(|page| page.trim().to_string())
                    .collect();
                if let Some(first) = pages.first_mut() {
                    *first = join_sentences(&self.title, first);
                }
                pages
            }
            _ => {
                let mut text = join_sentences(&self.title, &self.body);
                if !self.tags.is_empty() {
                    text = join_sentences(&text, &format!("Tags: {}", self.tags.join(", ")));
                }
                vec![text]
            }
        }
    }

    /// First characters of the body, cut on a char boundary.
    pub fn preview(&self, max_chars: usize) -> String {
        let body = self.body.replace(PAGE_BREAK, " ");
        let body = body.trim();
        if body.chars().count() <= max_chars {
            return body.to_string();
        }
        let cut: String = body.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }

    pub fn matches_category(&self, wanted: &str) -> bool {
        let wanted = wanted.trim().to_lowercase();
        self.category
            .as_deref()
            .map(|c| c.to_lowercase().contains(&wanted))
            .unwrap_or(false)
    }

    /// Kind-specific JSON rendering handed to the language model.
    pub fn to_tool_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("id".to_string(), json!(self.id));
        object.insert(self.kind.title_label().to_string(), json!(self.title));
        if self.kind != EntityKind::Document {
            object.insert(self.kind.body_label().to_string(), json!(self.body));
        }
        let category_label = if self.kind == EntityKind::Document {
            "path"
        } else {
            "category"
        };
        object.insert(category_label.to_string(), json!(self.category));
        if !self.tags.is_empty() {
            object.insert("tags".to_string(), json!(self.tags));
        }
        if self.kind.is_priced() {
            object.insert("price".to_string(), json!(self.price));
        }
        object.insert("isActive".to_string(), json!(self.is_active));
        Value::Object(object)
    }
}

fn join_sentences(first: &str, second: &str) -> String {
    let first = first.trim();
    let second = second.trim();
    if first.is_empty() {
        return second.to_string();
    }
    if second.is_empty() {
        return first.to_string();
    }
    if first.ends_with(['.', '!', '?']) {
        format!("{} {}", first, second)
    } else {
        format!("{}. {}", first, second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_source_text_includes_tags() {
        let item = CatalogItem::new(
            EntityKind::Product,
            "Rosso Toscano".to_string(),
            "A dry red wine".to_string(),
        )
        .with_tags(&["chianti", "red"]);

        assert_eq!(
            item.source_pages(),
            vec!["Rosso Toscano. A dry red wine. Tags: chianti, red".to_string()]
        );
    }

    #[test]
    fn test_document_pages_split_on_form_feed() {
        let item = CatalogItem::new(
            EntityKind::Document,
            "Returns policy".to_string(),
            "Page one text.\u{0C}Page two text.".to_string(),
        );

        let pages = item.source_pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0], "Returns policy. Page one text.");
        assert_eq!(pages[1], "Page two text.");
    }

    #[test]
    fn test_tool_json_uses_kind_labels() {
        let faq = CatalogItem::new(
            EntityKind::Faq,
            "Do you ship abroad?".to_string(),
            "Yes, within the EU.".to_string(),
        );
        let value = faq.to_tool_json();
        assert_eq!(value["question"], "Do you ship abroad?");
        assert_eq!(value["answer"], "Yes, within the EU.");
        assert!(value.get("price").is_none());

        let product = CatalogItem::new(EntityKind::Product, "Olive oil".to_string(), String::new())
            .with_price(12.5);
        assert_eq!(product.to_tool_json()["price"], 12.5);
    }

    #[test]
    fn test_preview_truncates() {
        let item = CatalogItem::new(
            EntityKind::Document,
            "Guide".to_string(),
            "abcdefghij".to_string(),
        );
        assert_eq!(item.preview(4), "abcd...");
        assert_eq!(item.preview(40), "abcdefghij");
    }
}
