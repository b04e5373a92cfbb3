//! Catalog data: products as delivered by the backend and as held in state.
//!
//! The backend delivers a [`ProductList`] whose items are *partial* product
//! records ([`ProductPatch`]). [`AppState::set_catalog`] turns each one into a
//! [`CatalogEntry`]: a [`Product`] bound to the shared bus.
//!
//! [`AppState::set_catalog`]: crate::state::AppState::set_catalog

use crate::entity::{Model, Record};
use crate::event::StoreEvent;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while reading a catalog payload.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The payload is not a valid product list
    #[error("Malformed catalog payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Unique identifier of a product.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Wrap an identifier string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One purchasable product.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier
    pub id: ProductId,
    /// Display title
    pub title: String,
    /// Long description shown in the detail view
    pub description: String,
    /// Image URL
    pub image: String,
    /// Category label (open set, e.g. "софт-скил")
    pub category: String,
    /// Price in whole currency units; `None` means priceless
    pub price: Option<u64>,
}

impl Product {
    /// Priceless products are shown distinctly and never summed.
    #[must_use]
    pub const fn is_priceless(&self) -> bool {
        self.price.is_none()
    }
}

/// A partial [`Product`], as found in catalog payloads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductPatch {
    /// Unique identifier
    pub id: Option<ProductId>,
    /// Display title
    pub title: Option<String>,
    /// Long description
    pub description: Option<String>,
    /// Image URL or CDN-relative path
    pub image: Option<String>,
    /// Category label
    pub category: Option<String>,
    /// Price; absent and `null` both leave the product priceless
    pub price: Option<u64>,
}

impl From<Product> for ProductPatch {
    fn from(product: Product) -> Self {
        Self {
            id: Some(product.id),
            title: Some(product.title),
            description: Some(product.description),
            image: Some(product.image),
            category: Some(product.category),
            price: product.price,
        }
    }
}

impl Record for Product {
    type Patch = ProductPatch;

    fn merge(&mut self, patch: ProductPatch) {
        if let Some(id) = patch.id {
            self.id = id;
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(image) = patch.image {
            self.image = image;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if patch.price.is_some() {
            self.price = patch.price;
        }
    }
}

/// A product bound to the storefront bus.
pub type CatalogEntry = Model<Product, StoreEvent>;

/// The catalog response body: `{ "total": n, "items": [...] }`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductList {
    /// Number of products the backend reports
    #[serde(default)]
    pub total: usize,
    /// Product records
    pub items: Vec<ProductPatch>,
}

impl ProductList {
    /// Parse a catalog response body.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Malformed`] if the JSON does not describe a
    /// product list.
    pub fn from_json(body: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Resolve relative image paths against a CDN base URL.
    ///
    /// Absolute URLs (`http://`, `https://`) are left as they are.
    #[must_use]
    pub fn with_cdn(mut self, cdn: &str) -> Self {
        let base = cdn.trim_end_matches('/');
        let relative = self
            .items
            .iter_mut()
            .filter_map(|item| item.image.as_mut())
            .filter(|image| !image.starts_with("http://") && !image.starts_with("https://"));
        for image in relative {
            let path = image.trim_start_matches('/');
            *image = format!("{base}/{path}");
        }
        self
    }
}

/// Sum of the priced entries; priceless entries are skipped.
#[must_use]
pub fn total_price(entries: &[CatalogEntry]) -> u64 {
    entries
        .iter()
        .filter_map(|entry| entry.price)
        .fold(0, u64::saturating_add)
}
