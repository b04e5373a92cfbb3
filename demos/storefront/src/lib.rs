//! Storefront demo
//!
//! Drives the storefront core the way a browser front end would: catalog
//! loaded asynchronously, shopper intents emitted on the bus, and the order
//! posted to a backend once the core reports it complete.

pub mod api;
pub mod config;
pub mod error;
pub mod session;

pub use api::{ApiError, FileShopApi, ShopApi};
pub use config::Config;
pub use error::DemoError;
pub use session::{SessionReport, run};
