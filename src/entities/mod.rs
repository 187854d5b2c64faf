//! sea-orm entities for the storefront tables.

pub mod category;
pub mod delivery_setting;
pub mod order;
pub mod order_item;
pub mod product;
pub mod product_image;
pub mod product_variant;
pub mod user;

pub use order::OrderStatus;
