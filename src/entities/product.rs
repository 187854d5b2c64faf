use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Stock at or below which the storefront warns that few units remain.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "products")]
#[schema(as = Product)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price: Decimal,
    pub image_url: String,
    /// Category slug, e.g. `coques`
    pub category: String,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Lowercased name, description and category, matched by catalog search.
    #[serde(skip)]
    #[sea_orm(column_type = "Text")]
    pub search_text: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_image::Entity")]
    ProductImage,
    #[sea_orm(has_many = "super::product_variant::Entity")]
    ProductVariant,
}

impl Related<super::product_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductImage.def()
    }
}

impl Related<super::product_variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductVariant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Unicode lowercasing done in Rust; SQLite's `LOWER` only folds ASCII.
pub fn search_text(name: &str, description: &str, category: &str) -> String {
    format!("{}\n{}\n{}", name, description, category).to_lowercase()
}

impl Model {
    pub fn is_in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Availability text shown next to the price, `None` when stock is comfortable.
    pub fn stock_label(&self) -> Option<String> {
        match self.stock {
            s if s <= 0 => Some("Rupture de stock".to_string()),
            s if s < LOW_STOCK_THRESHOLD => Some(format!("Plus que {} en stock", s)),
            _ => None,
        }
    }
}
