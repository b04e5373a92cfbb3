//! Error types for the storefront demo.

use crate::api::ApiError;
use thiserror::Error;

/// Errors that stop the demo session.
#[derive(Error, Debug)]
pub enum DemoError {
    /// An environment variable holds a value of the wrong shape
    #[error("Invalid value '{value}' for {key}")]
    Config {
        /// Variable name
        key: &'static str,
        /// Offending value
        value: String,
    },

    /// The shop backend failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The store could not subscribe its intent handlers
    #[error("Failed to connect the storefront: {0}")]
    Wiring(#[from] regex::Error),

    /// The catalog does not hold enough priced products for the script
    #[error("Catalog has {available} priced products, the session needs {wanted}")]
    NotEnoughProducts {
        /// Priced products in the catalog
        available: usize,
        /// Products the session wants to buy
        wanted: usize,
    },
}
