//! Database models and queries
//!
//! SQLite storage for items, baskets and the item/basket join table.

pub mod baskets;
pub mod init;
pub mod items;
pub mod models;

pub use baskets::*;
pub use init::*;
pub use items::*;
pub use models::*;
