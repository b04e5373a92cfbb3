//! The application state aggregate.
//!
//! [`AppState`] owns everything the storefront knows: the catalog, the
//! basket, the order draft, the preview pointer and the latest validation
//! errors. Collaborators read it freely and write it only through the methods
//! below; every write that others care about ends with a *fact* event on the
//! shared bus.
//!
//! A standalone state emits its facts immediately. Once it is held by a
//! [`Storefront`](crate::wiring::Storefront) the facts are held back and
//! published after the mutation returns, so subscribers can read the state
//! they describe.
//!
//! # Invariants
//!
//! - `order.items` and `order.total` always mirror the basket. They are
//!   recomputed inside every basket mutation *before* any event fires, so no
//!   subscriber can observe a stale order.
//! - `form_errors` is empty iff the last validation pass succeeded.
//! - Basket membership is decided by product id, never by comparing fields.
//!
//! # Example
//!
//! ```
//! use storefront_core::catalog::{ProductId, ProductPatch};
//! use storefront_core::event::StoreBus;
//! use storefront_core::order::OrderField;
//! use storefront_core::state::AppState;
//! use std::rc::Rc;
//!
//! let bus = Rc::new(StoreBus::new());
//! let mut state = AppState::new(Rc::clone(&bus));
//!
//! state.set_catalog(vec![ProductPatch {
//!     id: Some(ProductId::from("a")),
//!     price: Some(10),
//!     ..ProductPatch::default()
//! }]);
//! let entry = state.catalog()[0].clone();
//! state.add_to_basket(&entry);
//! assert_eq!(state.order().total, 10);
//!
//! state.set_order_field(OrderField::Payment, "card");
//! assert!(state.set_order_field(OrderField::Address, "Lenina 1"));
//! ```

use crate::catalog::{CatalogEntry, ProductId, ProductPatch, total_price};
use crate::event::{StoreBus, StoreEvent, names};
use crate::order::{
    FormErrors, OrderDraft, OrderField, PaymentMethod, validate_contacts_form,
    validate_order_form,
};
use std::fmt;
use std::mem;
use std::rc::Rc;

/// A fact waiting to be published.
pub(crate) type Fact = (&'static str, StoreEvent);

/// Mutable state of one storefront session.
pub struct AppState {
    bus: Rc<StoreBus>,
    catalog: Vec<CatalogEntry>,
    basket: Vec<CatalogEntry>,
    order: OrderDraft,
    preview: Option<ProductId>,
    form_errors: FormErrors,
    held: Option<Vec<Fact>>,
}

impl AppState {
    /// Create empty state publishing on `bus`.
    #[must_use]
    pub fn new(bus: Rc<StoreBus>) -> Self {
        Self {
            bus,
            catalog: Vec::new(),
            basket: Vec::new(),
            order: OrderDraft::default(),
            preview: None,
            form_errors: FormErrors::new(),
            held: None,
        }
    }

    /// Stop emitting facts directly; queue them for [`take_facts`](Self::take_facts).
    pub(crate) fn hold_facts(&mut self) {
        self.held.get_or_insert_with(Vec::new);
    }

    /// Drain the facts queued since the last call.
    pub(crate) fn take_facts(&mut self) -> Vec<Fact> {
        self.held.as_mut().map(mem::take).unwrap_or_default()
    }

    fn publish(&mut self, event: &'static str, payload: StoreEvent) {
        match self.held.as_mut() {
            Some(held) => held.push((event, payload)),
            None => {
                self.bus.emit(event, payload);
            }
        }
    }

    // ========== Read surface ==========

    /// The bus this state publishes on.
    #[must_use]
    pub const fn bus(&self) -> &Rc<StoreBus> {
        &self.bus
    }

    /// Current catalog, in backend order.
    #[must_use]
    pub fn catalog(&self) -> &[CatalogEntry] {
        &self.catalog
    }

    /// Basket entries, in insertion order.
    #[must_use]
    pub fn basket(&self) -> &[CatalogEntry] {
        &self.basket
    }

    /// Number of basket entries.
    #[must_use]
    pub fn basket_len(&self) -> usize {
        self.basket.len()
    }

    /// Sum of the priced basket entries.
    #[must_use]
    pub fn basket_total(&self) -> u64 {
        total_price(&self.basket)
    }

    /// The order draft.
    #[must_use]
    pub const fn order(&self) -> &OrderDraft {
        &self.order
    }

    /// Id of the entry shown in the detail view.
    #[must_use]
    pub const fn preview(&self) -> Option<&ProductId> {
        self.preview.as_ref()
    }

    /// Errors from the most recent validation pass.
    #[must_use]
    pub const fn form_errors(&self) -> &FormErrors {
        &self.form_errors
    }

    /// Catalog entry with the given id.
    #[must_use]
    pub fn catalog_entry(&self, id: &ProductId) -> Option<&CatalogEntry> {
        self.catalog.iter().find(|entry| entry.id == *id)
    }

    // ========== Catalog ==========

    /// Replace the catalog with entries built from `items`.
    ///
    /// Emits `items:changed` with the new catalog. The basket is untouched,
    /// even if it holds entries the new catalog no longer lists.
    #[tracing::instrument(skip(self, items))]
    pub fn set_catalog<I, T>(&mut self, items: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<ProductPatch>,
    {
        self.catalog = items
            .into_iter()
            .map(|item| CatalogEntry::new(item.into(), Rc::clone(&self.bus)))
            .collect();
        tracing::debug!(entries = self.catalog.len(), "Catalog replaced");

        let payload = StoreEvent::Catalog(self.catalog.clone());
        self.publish(names::CATALOG_CHANGED, payload);
    }

    /// Point the detail view at `entry` and emit `preview:changed`.
    #[tracing::instrument(skip(self, entry), fields(id = %entry.id))]
    pub fn set_preview(&mut self, entry: &CatalogEntry) {
        self.preview = Some(entry.id.clone());
        self.publish(names::PREVIEW_CHANGED, StoreEvent::Entry(entry.clone()));
    }

    // ========== Basket ==========

    /// Append `entry` to the basket.
    ///
    /// No uniqueness check: callers that want toggle behaviour consult
    /// [`is_in_basket`](Self::is_in_basket) first.
    #[tracing::instrument(skip(self, entry), fields(id = %entry.id))]
    pub fn add_to_basket(&mut self, entry: &CatalogEntry) {
        self.basket.push(entry.clone());
        self.basket_changed();
    }

    /// Remove every basket entry with `entry`'s id.
    #[tracing::instrument(skip(self, entry), fields(id = %entry.id))]
    pub fn remove_from_basket(&mut self, entry: &CatalogEntry) {
        self.basket.retain(|existing| existing.id != entry.id);
        self.basket_changed();
    }

    /// The basket entry with `entry`'s id, if any. Never emits.
    #[must_use]
    pub fn is_in_basket(&self, entry: &CatalogEntry) -> Option<&CatalogEntry> {
        self.basket.iter().find(|existing| existing.id == entry.id)
    }

    /// Empty the basket and the order's item list.
    #[tracing::instrument(skip(self))]
    pub fn clear_basket(&mut self) {
        self.basket.clear();
        self.order.items.clear();
        self.basket_changed();
    }

    fn sync_order_with_basket(&mut self) {
        self.order.items = self.basket.iter().map(|entry| entry.id.clone()).collect();
        self.order.total = total_price(&self.basket);
    }

    fn basket_changed(&mut self) {
        self.sync_order_with_basket();
        tracing::debug!(
            items = self.basket.len(),
            total = self.order.total,
            "Basket changed"
        );

        let payload = StoreEvent::Basket(self.basket.clone());
        self.publish(names::BASKET_CHANGED, payload.clone());
        self.publish(names::COUNTER_CHANGED, payload);
    }

    // ========== Order draft ==========

    /// Write a delivery/payment field, then run [`validate_order`].
    ///
    /// Emits `order:ready` with the draft when the form is valid. Returns
    /// whether it was.
    ///
    /// [`validate_order`]: Self::validate_order
    #[tracing::instrument(skip(self, value))]
    pub fn set_order_field(&mut self, field: OrderField, value: &str) -> bool {
        self.write_field(field, value);
        let ready = self.validate_order();
        if ready {
            self.emit_ready();
        }
        ready
    }

    /// Write a contacts field, then run [`validate_contacts`].
    ///
    /// Emits `order:ready` with the draft when the form is valid. Returns
    /// whether it was.
    ///
    /// [`validate_contacts`]: Self::validate_contacts
    #[tracing::instrument(skip(self, value))]
    pub fn set_contacts_field(&mut self, field: OrderField, value: &str) -> bool {
        self.write_field(field, value);
        let ready = self.validate_contacts();
        if ready {
            self.emit_ready();
        }
        ready
    }

    fn write_field(&mut self, field: OrderField, value: &str) {
        if let Err(error) = self.order.set_field(field, value) {
            // An unknown payment value counts as no choice; validation reports it.
            tracing::warn!(%error, "Treating unparseable payment as unset");
            self.order.payment = PaymentMethod::Unset;
        }
    }

    fn emit_ready(&mut self) {
        let payload = StoreEvent::Order(self.order.clone());
        self.publish(names::ORDER_READY, payload);
    }

    /// Overwrite the order total. No validation, no events.
    pub const fn set_total(&mut self, total: u64) {
        self.order.total = total;
    }

    /// Overwrite the order item list. No validation, no events.
    pub fn set_items(&mut self, items: Vec<ProductId>) {
        self.order.items = items;
    }

    /// Overwrite the payment method. No validation, no events.
    pub const fn set_payment(&mut self, payment: PaymentMethod) {
        self.order.payment = payment;
    }

    /// Reset the draft to its empty shape.
    ///
    /// Emits `order:changed` and `payment:changed`, both with the reset draft.
    #[tracing::instrument(skip(self))]
    pub fn clear_order(&mut self) {
        self.order = OrderDraft::default();
        let payload = StoreEvent::Order(self.order.clone());
        self.publish(names::ORDER_CHANGED, payload.clone());
        self.publish(names::PAYMENT_CHANGED, payload);
    }

    // ========== Validation ==========

    /// Validate the delivery/payment form.
    ///
    /// Replaces [`form_errors`](Self::form_errors), emits `formErrors:change`
    /// with the new set and returns whether it is empty.
    pub fn validate_order(&mut self) -> bool {
        let errors = validate_order_form(&self.order);
        self.replace_errors(errors, names::ORDER_ERRORS)
    }

    /// Validate the contacts form.
    ///
    /// Replaces [`form_errors`](Self::form_errors), emits
    /// `formErrorsContacts:change` with the new set and returns whether it is
    /// empty.
    pub fn validate_contacts(&mut self) -> bool {
        let errors = validate_contacts_form(&self.order);
        self.replace_errors(errors, names::CONTACTS_ERRORS)
    }

    fn replace_errors(&mut self, errors: FormErrors, event: &'static str) -> bool {
        let valid = errors.is_empty();
        tracing::debug!(event, valid, errors = errors.len(), "Validation pass");

        self.form_errors = errors;
        let payload = StoreEvent::Errors(self.form_errors.clone());
        self.publish(event, payload);
        valid
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("catalog", &self.catalog.len())
            .field("basket", &self.basket)
            .field("order", &self.order)
            .field("preview", &self.preview)
            .field("form_errors", &self.form_errors)
            .field("held", &self.held.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::HandlerResult;
    use crate::order::MSG_EMAIL_INVALID;
    use std::cell::RefCell;

    type Seen = Rc<RefCell<Vec<(String, StoreEvent)>>>;

    fn state_with_recorder() -> (AppState, Seen) {
        let bus = Rc::new(StoreBus::new());
        let seen: Seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.on_all(move |name: &str, payload: &StoreEvent| {
            sink.borrow_mut().push((name.to_string(), payload.clone()));
        });
        (AppState::new(bus), seen)
    }

    fn product(id: &str, price: Option<u64>) -> ProductPatch {
        ProductPatch {
            id: Some(ProductId::from(id)),
            title: Some(format!("Product {id}")),
            price,
            ..ProductPatch::default()
        }
    }

    fn names_of(seen: &Seen) -> Vec<String> {
        seen.borrow().iter().map(|(name, _)| name.clone()).collect()
    }

    #[test]
    fn test_set_catalog_emits_and_keeps_basket() {
        let (mut state, seen) = state_with_recorder();
        state.set_catalog(vec![product("a", Some(10))]);
        let a = state.catalog()[0].clone();
        state.add_to_basket(&a);
        seen.borrow_mut().clear();

        state.set_catalog(vec![product("b", Some(5)), product("c", None)]);

        assert_eq!(state.catalog().len(), 2);
        assert_eq!(state.basket_len(), 1);
        assert_eq!(names_of(&seen), vec![names::CATALOG_CHANGED]);
        assert!(matches!(&seen.borrow()[0].1, StoreEvent::Catalog(_)));
        assert_eq!(seen.borrow()[0].1.as_entries().map(<[CatalogEntry]>::len), Some(2));
    }

    #[test]
    fn test_basket_mutation_syncs_order_before_events() {
        let (mut state, _) = state_with_recorder();
        state.set_catalog(vec![product("a", Some(10)), product("b", Some(20))]);

        let observed = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&observed);
        state.bus().subscribe(names::BASKET_CHANGED, move |payload: &StoreEvent| -> HandlerResult {
            if let StoreEvent::Basket(entries) = payload {
                sink.borrow_mut().push(total_price(entries));
            }
            Ok(())
        });

        let a = state.catalog()[0].clone();
        let b = state.catalog()[1].clone();
        state.add_to_basket(&a);
        state.add_to_basket(&b);

        assert_eq!(state.order().total, 30);
        assert_eq!(state.order().items, vec![ProductId::from("a"), ProductId::from("b")]);
        assert_eq!(*observed.borrow(), vec![10, 30]);
    }

    #[test]
    fn test_add_emits_basket_then_counter() {
        let (mut state, seen) = state_with_recorder();
        state.set_catalog(vec![product("a", Some(10))]);
        seen.borrow_mut().clear();

        let a = state.catalog()[0].clone();
        state.add_to_basket(&a);

        assert_eq!(names_of(&seen), vec![names::BASKET_CHANGED, names::COUNTER_CHANGED]);
    }

    #[test]
    fn test_remove_filters_by_id() {
        let (mut state, _) = state_with_recorder();
        state.set_catalog(vec![product("a", Some(10)), product("b", None)]);
        let a = state.catalog()[0].clone();
        let b = state.catalog()[1].clone();
        state.add_to_basket(&a);
        state.add_to_basket(&b);
        state.add_to_basket(&a);

        state.remove_from_basket(&a);

        assert_eq!(state.basket().len(), 1);
        assert_eq!(state.basket()[0].id, ProductId::from("b"));
        assert_eq!(state.order().total, 0);
        assert!(state.is_in_basket(&a).is_none());
    }

    #[test]
    fn test_membership_is_by_id_not_fields() {
        let (mut state, _) = state_with_recorder();
        let twin = |id: &str| ProductPatch {
            id: Some(ProductId::from(id)),
            title: Some("Same".to_string()),
            price: Some(1),
            ..ProductPatch::default()
        };
        state.set_catalog(vec![twin("x"), twin("y")]);
        let x = state.catalog()[0].clone();
        let y = state.catalog()[1].clone();

        state.add_to_basket(&x);

        assert!(state.is_in_basket(&x).is_some());
        assert!(state.is_in_basket(&y).is_none());
    }

    #[test]
    fn test_is_in_basket_does_not_emit() {
        let (mut state, seen) = state_with_recorder();
        state.set_catalog(vec![product("a", Some(1))]);
        let a = state.catalog()[0].clone();
        seen.borrow_mut().clear();

        let _ = state.is_in_basket(&a);

        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_clear_basket() {
        let (mut state, seen) = state_with_recorder();
        state.set_catalog(vec![product("a", Some(10))]);
        let a = state.catalog()[0].clone();
        state.add_to_basket(&a);
        seen.borrow_mut().clear();

        state.clear_basket();

        assert!(state.basket().is_empty());
        assert!(state.order().items.is_empty());
        assert_eq!(state.order().total, 0);
        assert_eq!(names_of(&seen), vec![names::BASKET_CHANGED, names::COUNTER_CHANGED]);
    }

    #[test]
    fn test_set_preview() {
        let (mut state, seen) = state_with_recorder();
        state.set_catalog(vec![product("a", Some(10))]);
        let a = state.catalog()[0].clone();
        seen.borrow_mut().clear();

        state.set_preview(&a);

        assert_eq!(state.preview(), Some(&ProductId::from("a")));
        assert_eq!(seen.borrow()[0], (names::PREVIEW_CHANGED.to_string(), StoreEvent::Entry(a)));
    }

    #[test]
    fn test_order_ready_after_payment_and_address() {
        let (mut state, seen) = state_with_recorder();

        assert!(!state.set_order_field(OrderField::Payment, "card"));
        assert!(state.set_order_field(OrderField::Address, "Lenina 1"));

        assert!(state.form_errors().is_empty());
        assert_eq!(
            names_of(&seen),
            vec![names::ORDER_ERRORS, names::ORDER_ERRORS, names::ORDER_READY]
        );
        let ready = seen.borrow()[2].1.clone();
        let order = ready.as_order().cloned().unwrap_or_default();
        assert_eq!(order.payment, PaymentMethod::Card);
        assert_eq!(order.address, "Lenina 1");
    }

    #[test]
    fn test_bad_email_reports_error_without_ready() {
        let (mut state, seen) = state_with_recorder();

        assert!(!state.set_contacts_field(OrderField::Email, "bad-email"));

        assert_eq!(
            state.form_errors().get(&OrderField::Email).map(String::as_str),
            Some(MSG_EMAIL_INVALID)
        );
        assert_eq!(names_of(&seen), vec![names::CONTACTS_ERRORS]);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let (mut state, seen) = state_with_recorder();
        state.set_payment(PaymentMethod::Cash);

        let first = state.validate_order();
        let second = state.validate_order();

        assert_eq!(first, second);
        let payloads: Vec<StoreEvent> = seen.borrow().iter().map(|(_, p)| p.clone()).collect();
        assert_eq!(payloads[0], payloads[1]);
    }

    #[test]
    fn test_clear_order_then_validate_fails() {
        let (mut state, seen) = state_with_recorder();
        state.set_order_field(OrderField::Payment, "card");
        state.set_order_field(OrderField::Address, "Lenina 1");
        seen.borrow_mut().clear();

        state.clear_order();

        assert_eq!(names_of(&seen), vec![names::ORDER_CHANGED, names::PAYMENT_CHANGED]);
        assert_eq!(*state.order(), OrderDraft::default());
        assert!(!state.validate_order());
    }

    #[test]
    fn test_unknown_payment_is_treated_as_unset() {
        let (mut state, _) = state_with_recorder();
        state.set_payment(PaymentMethod::Card);

        assert!(!state.set_order_field(OrderField::Payment, "barter"));
        assert_eq!(state.order().payment, PaymentMethod::Unset);
    }

    #[test]
    fn test_direct_writers_do_not_emit() {
        let (mut state, seen) = state_with_recorder();

        state.set_total(99);
        state.set_items(vec![ProductId::from("z")]);
        state.set_payment(PaymentMethod::Cash);

        assert!(seen.borrow().is_empty());
        assert_eq!(state.order().total, 99);
        assert_eq!(state.order().payment, PaymentMethod::Cash);
    }

    #[test]
    fn test_held_facts_wait_for_take() {
        let (mut state, seen) = state_with_recorder();
        state.hold_facts();

        state.set_catalog(vec![product("a", Some(10))]);
        let a = state.catalog()[0].clone();
        state.add_to_basket(&a);

        assert!(seen.borrow().is_empty());
        let facts: Vec<&str> = state.take_facts().iter().map(|(name, _)| *name).collect();
        assert_eq!(
            facts,
            vec![names::CATALOG_CHANGED, names::BASKET_CHANGED, names::COUNTER_CHANGED]
        );
        assert!(state.take_facts().is_empty());
    }
}
