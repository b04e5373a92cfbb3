//! # Storefront Testing
//!
//! Testing utilities and helpers for the storefront core.
//!
//! This crate provides:
//! - An event recorder that captures every emission on a bus
//! - Catalog fixtures and a pre-connected store
//! - A Given-When-Then harness for [`AppState`](storefront_core::AppState)
//! - Property-based testing strategies for basket operations
//!
//! ## Example
//!
//! ```
//! use storefront_core::{CheckoutStep, names};
//! use storefront_testing::{EventRecorder, fixtures};
//!
//! let (bus, store) = fixtures::connected_store();
//! let recorder = EventRecorder::attach(&bus);
//!
//! bus.emit(names::PRODUCT_TOGGLE, fixtures::entry_event(&store, "a"));
//! bus.emit_empty(names::ORDER_OPEN);
//!
//! assert_eq!(store.step(), CheckoutStep::AddressPayment);
//! assert_eq!(recorder.count(names::CHECKOUT_STEP), 1);
//! ```

/// Catalog fixtures and connected stores
pub mod fixtures;

/// Event recording
pub mod recorder;


/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use storefront_core::catalog::ProductId;

    /// One basket operation, addressing a product by catalog index.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum BasketOp {
        /// Add the product at this index
        Add(usize),
        /// Remove every basket entry with this product's id
        Remove(usize),
        /// Add if absent, remove if present
        Toggle(usize),
    }

    /// Strategy for a single operation over a catalog of `len` products.
    pub fn basket_op(len: usize) -> impl Strategy<Value = BasketOp> {
        prop_oneof![
            (0..len).prop_map(BasketOp::Add),
            (0..len).prop_map(BasketOp::Remove),
            (0..len).prop_map(BasketOp::Toggle),
        ]
    }

    /// Strategy for up to `max` operations over a catalog of `len` products.
    pub fn basket_ops(len: usize, max: usize) -> impl Strategy<Value = Vec<BasketOp>> {
        prop::collection::vec(basket_op(len), 0..max)
    }

    /// Strategy for catalog prices: mostly priced, sometimes priceless.
    pub fn price() -> impl Strategy<Value = Option<u64>> {
        prop_oneof![
            4 => (0u64..100_000).prop_map(Some),
            1 => Just(None),
        ]
    }

    /// Reference model of the basket: ids in insertion order.
    ///
    /// `ids[i]` is the id of catalog index `i`.
    #[must_use]
    pub fn simulate(ids: &[ProductId], ops: &[BasketOp]) -> Vec<ProductId> {
        let mut basket: Vec<ProductId> = Vec::new();
        for op in ops {
            match *op {
                BasketOp::Add(i) => basket.push(ids[i].clone()),
                BasketOp::Remove(i) => basket.retain(|id| *id != ids[i]),
                BasketOp::Toggle(i) => {
                    if basket.contains(&ids[i]) {
                        basket.retain(|id| *id != ids[i]);
                    } else {
                        basket.push(ids[i].clone());
                    }
                },
            }
        }
        basket
    }
}

/// Route `tracing` output to the test harness.
///
/// Safe to call from every test; only the first call installs a subscriber.
/// Honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use recorder::{EventRecorder, Recorded};
pub use state_test::{StateTest, assertions};
