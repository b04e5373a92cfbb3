//! # Storefront Core
//!
//! Reactive state and event layer for a single-page storefront.
//!
//! Rendering collaborators never talk to each other. They publish *intent*
//! events on a shared [`EventBus`], the [`wiring`] layer turns intents into
//! [`AppState`] mutations, and the state publishes *fact* events back onto the
//! same bus for the collaborators to redraw from.
//!
//! ## Core Concepts
//!
//! - **EventBus**: synchronous, re-entrant publish/subscribe keyed by exact
//!   names or regex patterns
//! - **Entity**: a plain record built from a partial, bound to the bus
//! - **CatalogEntry**: the product entity held by catalog and basket
//! - **AppState**: catalog, basket, order draft, preview and validation errors
//! - **Checkout**: the `Browsing → AddressPayment → Contacts → Submitted` flow
//!
//! ## Architecture Principles
//!
//! - Single-threaded and synchronous: `Rc`/`RefCell`, no locks, no queues
//! - Payloads are snapshots, never live references into the state
//! - Business-rule failures are data ([`FormErrors`]), not Rust errors
//! - Handler failures are isolated per handler and logged through `tracing`
//!
//! ## Example
//!
//! ```
//! use storefront_core::{AppState, StoreBus, StoreEvent, Storefront, names};
//! use storefront_core::catalog::{ProductId, ProductPatch};
//! use std::rc::Rc;
//!
//! let bus = Rc::new(StoreBus::new());
//! let store = Storefront::connect(AppState::new(Rc::clone(&bus))).unwrap();
//!
//! store.mutate(|state| {
//!     state.set_catalog(vec![ProductPatch {
//!         id: Some(ProductId::from("p-1")),
//!         title: Some("Mouse".to_string()),
//!         price: Some(750),
//!         ..ProductPatch::default()
//!     }]);
//! });
//!
//! let entry = store.state().catalog()[0].clone();
//! bus.emit(names::PRODUCT_TOGGLE, StoreEvent::Entry(entry));
//!
//! assert_eq!(store.state().basket_total(), 750);
//! ```

/// Catalog module - Products, partial product records and the catalog payload
pub mod catalog;

/// Checkout module - The checkout flow state machine
pub mod checkout;

/// Entity module - Records bound to the bus that can publish themselves
pub mod entity;

/// Event module - Storefront event names and the bus payload type
pub mod event;

/// Event bus module - Synchronous publish/subscribe dispatcher
pub mod event_bus;

/// Order module - Order draft, form fields and validation
pub mod order;

/// State module - The application state aggregate
pub mod state;

/// Wiring module - Intent handlers connecting the bus to the state
pub mod wiring;

pub use catalog::{CatalogEntry, Product, ProductId, ProductList, ProductPatch};
pub use checkout::{CheckoutAction, CheckoutError, CheckoutStep};
pub use entity::{Entity, Model, Record};
pub use event::{StoreBus, StoreEvent, names};
pub use event_bus::{Dispatch, EventBus, EventSelector, HandlerError, HandlerResult, SubscriptionId};
pub use order::{FieldChange, FormErrors, OrderDraft, OrderField, OrderResult, PaymentMethod};
pub use state::AppState;
pub use wiring::Storefront;
