//! Configuration management for the storefront demo.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::DemoError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Catalog source configuration
    pub catalog: CatalogConfig,
    /// Order gateway configuration
    pub gateway: GatewayConfig,
    /// Scripted shopper configuration
    pub session: SessionConfig,
    /// Log filter (`RUST_LOG` syntax)
    pub log_filter: String,
}

/// Catalog source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path of the catalog JSON file
    pub path: PathBuf,
    /// Base URL relative image paths are resolved against
    pub cdn_url: String,
}

/// Order gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL orders would be posted to
    pub api_url: String,
    /// Simulated round-trip time in milliseconds
    pub latency_ms: u64,
}

/// Scripted shopper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How many priced products the shopper puts in the basket
    pub picks: usize,
    /// Payment method the shopper chooses (`card` or `cash`)
    pub payment: String,
    /// Delivery address
    pub address: String,
    /// Contact email
    pub email: String,
    /// Contact phone
    pub phone: String,
}

impl GatewayConfig {
    /// Simulated latency as a duration.
    #[must_use]
    pub const fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`DemoError::Config`] if a numeric variable is set but does
    /// not parse.
    pub fn from_env() -> Result<Self, DemoError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults for
    /// every key it does not know.
    ///
    /// # Errors
    ///
    /// Returns [`DemoError::Config`] if a numeric value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DemoError> {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            catalog: CatalogConfig {
                path: PathBuf::from(text(
                    "STOREFRONT_CATALOG_PATH",
                    concat!(env!("CARGO_MANIFEST_DIR"), "/data/catalog.json"),
                )),
                cdn_url: text(
                    "STOREFRONT_CDN_URL",
                    "https://larek-api.nomoreparties.co/content/weblarek",
                ),
            },
            gateway: GatewayConfig {
                api_url: text(
                    "STOREFRONT_API_URL",
                    "https://larek-api.nomoreparties.co/api/weblarek",
                ),
                latency_ms: number(&lookup, "STOREFRONT_GATEWAY_LATENCY_MS", 50)?,
            },
            session: SessionConfig {
                picks: number(&lookup, "STOREFRONT_PICKS", 2)?,
                payment: text("STOREFRONT_PAYMENT", "card"),
                address: text("STOREFRONT_ADDRESS", "Lenina 1, Moscow"),
                email: text("STOREFRONT_EMAIL", "buyer@example.com"),
                phone: text("STOREFRONT_PHONE", "+7 999 123 45 67"),
            },
            log_filter: text("RUST_LOG", "info,storefront_core=debug,storefront_demo=debug"),
        })
    }
}

fn number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, DemoError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| DemoError::Config { key, value }),
    }
}
