//! Ready-made catalog data and connected stores.

use std::rc::Rc;
use storefront_core::catalog::{ProductId, ProductPatch};
use storefront_core::order::{FieldChange, OrderField};
use storefront_core::{AppState, StoreBus, StoreEvent, Storefront, names};

/// A product patch with an id, a title derived from it and an optional price.
#[must_use]
pub fn product(id: &str, price: Option<u64>) -> ProductPatch {
    ProductPatch {
        id: Some(ProductId::from(id)),
        title: Some(format!("Product {id}")),
        category: Some("другое".to_string()),
        price,
        ..ProductPatch::default()
    }
}

/// A small catalog: three priced products and one priceless.
///
/// | id | price |
/// |---|---|
/// | `a` | 10 |
/// | `b` | 20 |
/// | `c` | 750 |
/// | `free` | none |
#[must_use]
pub fn sample_catalog() -> Vec<ProductPatch> {
    vec![
        product("a", Some(10)),
        product("b", Some(20)),
        product("c", Some(750)),
        product("free", None),
    ]
}

/// Fresh state on a fresh bus, with [`sample_catalog`] installed.
#[must_use]
pub fn state_with_catalog() -> AppState {
    let mut state = AppState::new(Rc::new(StoreBus::new()));
    state.set_catalog(sample_catalog());
    state
}

/// A connected store with [`sample_catalog`] installed, plus its bus.
///
/// # Panics
///
/// Panics if the built-in field patterns fail to compile.
#[must_use]
#[allow(clippy::expect_used)] // Fixture code
pub fn connected_store() -> (Rc<StoreBus>, Storefront) {
    let bus = Rc::new(StoreBus::new());
    let store =
        Storefront::connect(AppState::new(Rc::clone(&bus))).expect("field patterns compile");
    store.mutate(|state| state.set_catalog(sample_catalog()));
    (bus, store)
}

/// The `card:select` / `product:changed` payload for the catalog entry `id`.
///
/// # Panics
///
/// Panics if the store's catalog has no such entry.
#[must_use]
#[allow(clippy::expect_used)] // Fixture code
pub fn entry_event(store: &Storefront, id: &str) -> StoreEvent {
    let state = store.state();
    let entry = state
        .catalog_entry(&ProductId::from(id))
        .expect("entry exists in the fixture catalog");
    StoreEvent::Entry(entry.clone())
}

/// Emit the intent for editing `field` on the delivery/payment form.
pub fn edit_order_field(bus: &StoreBus, field: OrderField, value: &str) {
    let event = if field == OrderField::Payment {
        names::PAYMENT_CHANGE.to_string()
    } else {
        names::order_field_change(field)
    };
    bus.emit(&event, StoreEvent::FieldChange(FieldChange::new(field, value)));
}

/// Emit the intent for editing `field` on the contacts form.
pub fn edit_contacts_field(bus: &StoreBus, field: OrderField, value: &str) {
    bus.emit(
        &names::contacts_field_change(field),
        StoreEvent::FieldChange(FieldChange::new(field, value)),
    );
}

/// Fill the delivery/payment form with valid values.
pub fn fill_order_form(bus: &StoreBus) {
    edit_order_field(bus, OrderField::Payment, "card");
    edit_order_field(bus, OrderField::Address, "Lenina 1");
}

/// Fill the contacts form with valid values.
pub fn fill_contacts_form(bus: &StoreBus) {
    edit_contacts_field(bus, OrderField::Email, "buyer@example.com");
    edit_contacts_field(bus, OrderField::Phone, "+7 999 123 45 67");
}
