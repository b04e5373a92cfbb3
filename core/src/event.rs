//! Event names and the payload type carried on the storefront bus.
//!
//! Two families of events share one [`StoreBus`]:
//!
//! - **Facts** describe something that already happened to the state and are
//!   only ever emitted by [`AppState`](crate::state::AppState) (or, for
//!   checkout progress, by the [`wiring`](crate::wiring) layer).
//! - **Intents** are requests from rendering collaborators ("the user picked
//!   a card") and are turned into state mutations by the wiring layer.
//!
//! Names keep the `area:verb` shape used by the storefront UI so existing
//! collaborators can subscribe unchanged.

use crate::catalog::CatalogEntry;
use crate::checkout::CheckoutStep;
use crate::event_bus::{EventBus, HandlerError};
use crate::order::{FieldChange, FormErrors, OrderDraft};

/// The bus type shared by the whole storefront.
pub type StoreBus = EventBus<StoreEvent>;

/// Event names understood by the storefront.
pub mod names {
    use crate::order::OrderField;

    /// Fact: the catalog was replaced
    pub const CATALOG_CHANGED: &str = "items:changed";
    /// Fact: basket contents changed (basket panel)
    pub const BASKET_CHANGED: &str = "basket:changed";
    /// Fact: basket size changed (header badge)
    pub const COUNTER_CHANGED: &str = "counter:changed";
    /// Fact: a product was opened in the detail view
    pub const PREVIEW_CHANGED: &str = "preview:changed";
    /// Fact: the order draft was reset
    pub const ORDER_CHANGED: &str = "order:changed";
    /// Fact: the payment choice was reset
    pub const PAYMENT_CHANGED: &str = "payment:changed";
    /// Fact: the form being edited passed validation
    pub const ORDER_READY: &str = "order:ready";
    /// Fact: result of the delivery/payment validation pass
    pub const ORDER_ERRORS: &str = "formErrors:change";
    /// Fact: result of the contacts validation pass
    pub const CONTACTS_ERRORS: &str = "formErrorsContacts:change";
    /// Fact: the checkout flow moved to a new step
    pub const CHECKOUT_STEP: &str = "checkout:step";
    /// Fact: the order is complete and should be sent to the backend
    pub const ORDER_SUBMITTED: &str = "order:submitted";

    /// Intent: a catalog card was clicked
    pub const CARD_SELECT: &str = "card:select";
    /// Intent: add the product to the basket, or remove it if present
    pub const PRODUCT_TOGGLE: &str = "product:changed";
    /// Intent: a payment method button was pressed
    pub const PAYMENT_CHANGE: &str = "payment:change";
    /// Intent: open the delivery/payment form
    pub const ORDER_OPEN: &str = "order:open";
    /// Intent: delivery/payment form submitted
    pub const ORDER_SUBMIT: &str = "order:submit";
    /// Intent: contacts form submitted
    pub const CONTACTS_SUBMIT: &str = "contacts:submit";
    /// Intent: the success screen was acknowledged
    pub const SUCCESS_CLOSE: &str = "success:close";
    /// Intent: the modal was dismissed
    pub const MODAL_CLOSE: &str = "modal:close";

    /// Pattern matching every delivery/payment field edit
    pub const ORDER_FIELD_PATTERN: &str = r"^order\..*:change";
    /// Pattern matching every contacts field edit
    pub const CONTACTS_FIELD_PATTERN: &str = r"^contacts\..*:change";

    /// Name of the intent emitted when a delivery/payment field is edited.
    #[must_use]
    pub fn order_field_change(field: OrderField) -> String {
        format!("order.{field}:change")
    }

    /// Name of the intent emitted when a contacts field is edited.
    #[must_use]
    pub fn contacts_field_change(field: OrderField) -> String {
        format!("contacts.{field}:change")
    }
}

/// Payload carried by every storefront event.
///
/// Payloads are snapshots: handlers receive copies of the state they describe
/// and never need to read the state aggregate back while it is being mutated.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum StoreEvent {
    /// No data; the default for intents that carry nothing
    #[default]
    Empty,
    /// The full catalog
    Catalog(Vec<CatalogEntry>),
    /// The basket, in display order
    Basket(Vec<CatalogEntry>),
    /// A single catalog entry
    Entry(CatalogEntry),
    /// The order draft
    Order(OrderDraft),
    /// A complete validation error set
    Errors(FormErrors),
    /// A single form field edit
    FieldChange(FieldChange),
    /// A checkout step
    Step(CheckoutStep),
}

impl StoreEvent {
    /// Stable name of the payload variant, used in logs and errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Catalog(_) => "catalog",
            Self::Basket(_) => "basket",
            Self::Entry(_) => "entry",
            Self::Order(_) => "order",
            Self::Errors(_) => "errors",
            Self::FieldChange(_) => "field change",
            Self::Step(_) => "step",
        }
    }

    /// The carried catalog entry.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::UnexpectedPayload`] for any other variant.
    pub fn entry(&self, event: &str) -> Result<&CatalogEntry, HandlerError> {
        match self {
            Self::Entry(entry) => Ok(entry),
            _ => Err(unexpected(event, "entry")),
        }
    }

    /// The carried field edit.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::UnexpectedPayload`] for any other variant.
    pub fn field_change(&self, event: &str) -> Result<&FieldChange, HandlerError> {
        match self {
            Self::FieldChange(change) => Ok(change),
            _ => Err(unexpected(event, "field change")),
        }
    }

    /// The carried order draft, if any.
    #[must_use]
    pub const fn as_order(&self) -> Option<&OrderDraft> {
        match self {
            Self::Order(order) => Some(order),
            _ => None,
        }
    }

    /// The carried entries for catalog and basket payloads.
    #[must_use]
    pub fn as_entries(&self) -> Option<&[CatalogEntry]> {
        match self {
            Self::Catalog(entries) | Self::Basket(entries) => Some(entries),
            _ => None,
        }
    }

    /// The carried validation errors, if any.
    #[must_use]
    pub const fn as_errors(&self) -> Option<&FormErrors> {
        match self {
            Self::Errors(errors) => Some(errors),
            _ => None,
        }
    }
}

fn unexpected(event: &str, expected: &'static str) -> HandlerError {
    HandlerError::UnexpectedPayload {
        event: event.to_string(),
        expected,
    }
}

impl From<CatalogEntry> for StoreEvent {
    fn from(entry: CatalogEntry) -> Self {
        Self::Entry(entry)
    }
}

impl From<OrderDraft> for StoreEvent {
    fn from(order: OrderDraft) -> Self {
        Self::Order(order)
    }
}

impl From<FieldChange> for StoreEvent {
    fn from(change: FieldChange) -> Self {
        Self::FieldChange(change)
    }
}
