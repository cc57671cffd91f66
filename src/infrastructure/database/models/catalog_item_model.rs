use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::entities::CatalogItem;
use crate::domain::value_objects::EntityKind;
use crate::infrastructure::database::schema::catalog_items;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = catalog_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CatalogItemModel {
    pub id: Uuid,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub price: Option<f64>,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = catalog_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewCatalogItemModel {
    pub id: Uuid,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub price: Option<f64>,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CatalogItemModel> for CatalogItem {
    type Error = String;

    fn try_from(model: CatalogItemModel) -> Result<Self, Self::Error> {
        let kind = EntityKind::from_string(&model.kind)?;
        Ok(CatalogItem::restore(
            model.id,
            kind,
            model.title,
            model.body,
            model.category,
            model.tags,
            model.price,
            model.is_active,
            model.updated_at,
        ))
    }
}

impl From<&CatalogItem> for NewCatalogItemModel {
    fn from(item: &CatalogItem) -> Self {
        Self {
            id: item.id(),
            kind: item.kind().as_str().to_string(),
            title: item.title().to_string(),
            body: item.body().to_string(),
            category: item.category().map(|c| c.to_string()),
            tags: item.tags().to_vec(),
            price: item.price(),
            is_active: item.is_active(),
            updated_at: item.updated_at(),
        }
    }
}
