use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One selectable option of a product, e.g. name `Couleur`, value `Rouge`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "product_variants")]
#[schema(as = ProductVariant)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    /// Option group
    pub name: String,
    pub value: String,
    /// Added to the product price when this option is selected
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price_adjustment: Decimal,
    pub stock: i32,
    /// Options are listed in creation order.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Cascade"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn label(&self) -> String {
        format!("{}: {}", self.name, self.value)
    }
}
