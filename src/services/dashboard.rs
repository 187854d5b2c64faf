use crate::{
    entities::{order, product, OrderStatus},
    errors::ServiceError,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

/// Counters shown on the dashboard overview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_products: u64,
    pub in_stock: u64,
    pub out_of_stock: u64,
    pub categories: u64,
    pub total_orders: u64,
    pub pending_orders: u64,
}

#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DatabaseConnection>,
}

impl DashboardService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<DashboardStats, ServiceError> {
        let db = &*self.db;

        let total_products = product::Entity::find().count(db).await?;
        let in_stock = product::Entity::find()
            .filter(product::Column::Stock.gt(0))
            .count(db)
            .await?;

        let categories: Vec<String> = product::Entity::find()
            .select_only()
            .column(product::Column::Category)
            .distinct()
            .into_tuple()
            .all(db)
            .await?;

        let total_orders = order::Entity::find().count(db).await?;
        let pending_orders = order::Entity::find()
            .filter(order::Column::Status.eq(OrderStatus::Pending))
            .count(db)
            .await?;

        Ok(DashboardStats {
            total_products,
            in_stock,
            out_of_stock: total_products.saturating_sub(in_stock),
            categories: categories.len() as u64,
            total_orders,
            pending_orders,
        })
    }
}
