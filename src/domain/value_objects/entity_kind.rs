use serde::{Deserialize, Serialize};

/// What a cascade does when the embedding provider is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Degrade to keyword search (recall over precision).
    DegradeToKeyword,
    /// Return an empty, error-marked result (precision over recall).
    FailClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Product,
    Service,
    Faq,
    Document,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Product,
        EntityKind::Service,
        EntityKind::Faq,
        EntityKind::Document,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Product => "product",
            EntityKind::Service => "service",
            EntityKind::Faq => "faq",
            EntityKind::Document => "document",
        }
    }

    /// Plural form, used both as the URL segment and as the item key of tool payloads.
    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::Product => "products",
            EntityKind::Service => "services",
            EntityKind::Faq => "faqs",
            EntityKind::Document => "documents",
        }
    }

    pub fn from_string(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "product" | "products" => Ok(EntityKind::Product),
            "service" | "services" => Ok(EntityKind::Service),
            "faq" | "faqs" => Ok(EntityKind::Faq),
            "document" | "documents" => Ok(EntityKind::Document),
            other => Err(format!("Invalid entity kind: {}", other)),
        }
    }

    pub fn fallback_policy(&self) -> FallbackPolicy {
        match self {
            EntityKind::Product | EntityKind::Document => FallbackPolicy::DegradeToKeyword,
            EntityKind::Service | EntityKind::Faq => FallbackPolicy::FailClosed,
        }
    }

    /// Field name the title column is presented under.
    pub fn title_label(&self) -> &'static str {
        match self {
            EntityKind::Product | EntityKind::Service => "name",
            EntityKind::Faq => "question",
            EntityKind::Document => "title",
        }
    }

    /// Field name the body column is presented under.
    pub fn body_label(&self) -> &'static str {
        match self {
            EntityKind::Product | EntityKind::Service => "description",
            EntityKind::Faq => "answer",
            EntityKind::Document => "content",
        }
    }

    pub fn is_priced(&self) -> bool {
        matches!(self, EntityKind::Product | EntityKind::Service)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_strings() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_string(kind.as_str()).unwrap(), kind);
            assert_eq!(EntityKind::from_string(kind.plural()).unwrap(), kind);
        }
        assert!(EntityKind::from_string("widgets").is_err());
    }

    #[test]
    fn test_fallback_asymmetry() {
        assert_eq!(
            EntityKind::Product.fallback_policy(),
            FallbackPolicy::DegradeToKeyword
        );
        assert_eq!(
            EntityKind::Document.fallback_policy(),
            FallbackPolicy::DegradeToKeyword
        );
        assert_eq!(EntityKind::Faq.fallback_policy(), FallbackPolicy::FailClosed);
        assert_eq!(
            EntityKind::Service.fallback_policy(),
            FallbackPolicy::FailClosed
        );
    }
}
