//! HTTP API handlers for snapcart-server

pub mod admin;
pub mod baskets;
pub mod catalog;
pub mod classify;
pub mod health;
pub mod items;
pub mod sse;

pub use admin::admin_routes;
pub use baskets::basket_routes;
pub use catalog::catalog_routes;
pub use classify::classify_routes;
pub use health::health_routes;
pub use items::item_routes;
pub use sse::event_routes;
