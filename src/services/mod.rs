// Storefront
pub mod catalog;
pub mod categories;
pub mod delivery;
pub mod orders;
pub mod share;

// Dashboard
pub mod dashboard;
pub mod media;

pub use catalog::ProductCatalogService;
pub use categories::CategoryService;
pub use dashboard::DashboardService;
pub use delivery::DeliveryService;
pub use media::MediaService;
pub use orders::OrderService;
