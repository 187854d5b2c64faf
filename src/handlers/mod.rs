pub mod categories;
pub mod checkout;
pub mod common;
pub mod dashboard;
pub mod delivery;
pub mod orders;
pub mod products;
pub mod uploads;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::events::EventSender;
use crate::services::{
    CategoryService, DashboardService, DeliveryService, MediaService, OrderService,
    ProductCatalogService,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub product_catalog: Arc<ProductCatalogService>,
    pub categories: Arc<CategoryService>,
    pub delivery: Arc<DeliveryService>,
    pub orders: Arc<OrderService>,
    pub media: Arc<MediaService>,
    pub dashboard: Arc<DashboardService>,
    pub auth: Arc<AuthService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        auth_service: Arc<AuthService>,
        config: &AppConfig,
    ) -> Self {
        let product_catalog = Arc::new(ProductCatalogService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let categories = Arc::new(CategoryService::new(db.clone()));
        let delivery = Arc::new(DeliveryService::new(db.clone(), event_sender.clone()));
        let orders = Arc::new(OrderService::new(db.clone(), event_sender.clone()));
        let media = Arc::new(MediaService::new(
            config.storage_dir.clone(),
            config.storage_bucket.clone(),
            config.public_base_url.clone(),
            config.max_upload_bytes,
            event_sender,
        ));
        let dashboard = Arc::new(DashboardService::new(db));

        Self {
            product_catalog,
            categories,
            delivery,
            orders,
            media,
            dashboard,
            auth: auth_service,
        }
    }
}
