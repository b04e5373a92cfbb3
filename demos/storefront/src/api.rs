//! Shop backend client.
//!
//! The storefront talks to two endpoints: the product list and order
//! submission. [`FileShopApi`] serves the product list from a JSON file and
//! accepts orders locally after a simulated round trip, so the demo runs
//! without a network.

use crate::config::Config;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use storefront_core::catalog::CatalogError;
use storefront_core::{OrderDraft, OrderResult, ProductList};
use thiserror::Error;

/// Shop backend result
pub type ApiResult<T> = Result<T, ApiError>;

/// Boxed future returned by [`ShopApi`] methods
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = ApiResult<T>> + Send + 'a>>;

/// Shop backend errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// The catalog source could not be read
    #[error("Failed to read catalog from {}: {source}", path.display())]
    Io {
        /// Catalog path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The catalog payload is malformed
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The order body could not be encoded
    #[error("Failed to encode order: {0}")]
    Encode(#[from] serde_json::Error),

    /// The backend refused the order (`{ "error": "..." }` response)
    #[error("Order rejected: {0}")]
    Rejected(String),
}

/// Shop backend trait
///
/// Abstraction over the product list and order endpoints.
pub trait ShopApi {
    /// Fetch the product list
    ///
    /// # Errors
    ///
    /// Returns error if the catalog cannot be read or parsed
    fn product_list(&self) -> ApiFuture<'_, ProductList>;

    /// Submit an order
    ///
    /// # Errors
    ///
    /// Returns error if the backend refuses the order
    fn order_products(&self, order: OrderDraft) -> ApiFuture<'_, OrderResult>;
}

/// File-backed shop (serves a local catalog, accepts orders in memory)
#[derive(Debug)]
pub struct FileShopApi {
    catalog_path: PathBuf,
    cdn_url: String,
    api_url: String,
    latency: Duration,
    next_order: AtomicU64,
}

impl FileShopApi {
    /// Creates a shop reading `catalog_path` and resolving images against
    /// `cdn_url`
    #[must_use]
    pub fn new(catalog_path: impl AsRef<Path>, cdn_url: impl Into<String>) -> Self {
        Self {
            catalog_path: catalog_path.as_ref().to_path_buf(),
            cdn_url: cdn_url.into(),
            api_url: String::new(),
            latency: Duration::ZERO,
            next_order: AtomicU64::new(1),
        }
    }

    /// Creates a shop from the demo configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.catalog.path, config.catalog.cdn_url.clone())
            .with_api_url(config.gateway.api_url.clone())
            .with_latency(config.gateway.latency())
    }

    /// Sets the base URL orders are logged against
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Sets the simulated order round-trip time
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl ShopApi for FileShopApi {
    fn product_list(&self) -> ApiFuture<'_, ProductList> {
        Box::pin(async move {
            let body = tokio::fs::read_to_string(&self.catalog_path)
                .await
                .map_err(|source| ApiError::Io {
                    path: self.catalog_path.clone(),
                    source,
                })?;
            let list = ProductList::from_json(&body)?.with_cdn(&self.cdn_url);

            tracing::info!(
                path = %self.catalog_path.display(),
                items = list.items.len(),
                "Catalog loaded"
            );
            Ok(list)
        })
    }

    fn order_products(&self, order: OrderDraft) -> ApiFuture<'_, OrderResult> {
        Box::pin(async move {
            let body = serde_json::to_string(&order)?;
            tracing::debug!(url = %format!("{}/order", self.api_url), %body, "Posting order");

            tokio::time::sleep(self.latency).await;

            if order.items.is_empty() {
                return Err(ApiError::Rejected("Не выбран товар".to_string()));
            }

            let id = format!("order-{:04}", self.next_order.fetch_add(1, Ordering::Relaxed));
            tracing::info!(order_id = %id, total = order.total, "Order accepted");
            Ok(OrderResult {
                id,
                total: order.total,
            })
        })
    }
}
