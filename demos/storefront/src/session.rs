//! A scripted shopping session.
//!
//! Plays the part of the rendering collaborators: it loads the catalog into
//! the state, then emits the same intents a shopper's clicks would, and
//! finally performs the asynchronous order submission the core leaves to the
//! outside world.

use crate::api::ShopApi;
use crate::config::SessionConfig;
use crate::error::DemoError;
use std::cell::Cell;
use std::rc::Rc;
use storefront_core::event_bus::HandlerError;
use storefront_core::order::FieldChange;
use storefront_core::{
    AppState, CheckoutStep, OrderDraft, OrderField, OrderResult, ProductId, StoreBus, StoreEvent,
    Storefront, names,
};
use tokio::sync::mpsc;

/// What happened during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// Products installed in the catalog
    pub catalog_len: usize,
    /// Basket contents when the session ended
    pub basket: Vec<ProductId>,
    /// Backend confirmation, if the order went through
    pub order: Option<OrderResult>,
    /// Checkout step when the session ended
    pub step: CheckoutStep,
    /// Number of events that crossed the bus
    pub events: usize,
}

/// Run one shopper through catalog, basket and checkout.
///
/// A refused order is logged and leaves the basket and draft intact, so the
/// report shows `order: None` with the flow still on
/// [`CheckoutStep::Submitted`].
///
/// # Errors
///
/// - [`DemoError::Api`] if the catalog cannot be loaded
/// - [`DemoError::NotEnoughProducts`] if the catalog has fewer priced
///   products than `shopper.picks`
/// - [`DemoError::Wiring`] if the store cannot subscribe its handlers
pub async fn run(api: &impl ShopApi, shopper: &SessionConfig) -> Result<SessionReport, DemoError> {
    let bus = Rc::new(StoreBus::new());
    let events = Rc::new(Cell::new(0_usize));
    {
        let events = Rc::clone(&events);
        bus.on_all(move |event: &str, payload: &StoreEvent| {
            events.set(events.get() + 1);
            tracing::debug!(event, payload = payload.kind(), "Bus event");
        });
    }

    let store = Storefront::connect(AppState::new(Rc::clone(&bus)))?;

    let (submitted, mut outbox) = mpsc::unbounded_channel::<OrderDraft>();
    bus.subscribe(names::ORDER_SUBMITTED, move |payload: &StoreEvent| {
        let order = payload
            .as_order()
            .cloned()
            .ok_or_else(|| HandlerError::UnexpectedPayload {
                event: names::ORDER_SUBMITTED.to_string(),
                expected: "order",
            })?;
        submitted
            .send(order)
            .map_err(|_| HandlerError::Other("order outbox closed".to_string()))
    });

    let list = api.product_list().await?;
    store.mutate(|state| state.set_catalog(list.items));
    let catalog_len = store.state().catalog().len();

    let picks: Vec<StoreEvent> = store
        .state()
        .catalog()
        .iter()
        .filter(|entry| !entry.is_priceless())
        .take(shopper.picks)
        .map(|entry| StoreEvent::Entry(entry.clone()))
        .collect();
    if picks.len() < shopper.picks {
        return Err(DemoError::NotEnoughProducts {
            available: picks.len(),
            wanted: shopper.picks,
        });
    }

    for pick in picks {
        bus.emit(names::CARD_SELECT, pick.clone());
        bus.emit(names::PRODUCT_TOGGLE, pick);
    }
    tracing::info!(
        items = store.state().basket_len(),
        total = store.state().basket_total(),
        "Basket filled"
    );

    bus.emit_empty(names::ORDER_OPEN);
    edit(&bus, names::PAYMENT_CHANGE, OrderField::Payment, &shopper.payment);
    edit(
        &bus,
        &names::order_field_change(OrderField::Address),
        OrderField::Address,
        &shopper.address,
    );
    bus.emit_empty(names::ORDER_SUBMIT);
    edit(
        &bus,
        &names::contacts_field_change(OrderField::Email),
        OrderField::Email,
        &shopper.email,
    );
    edit(
        &bus,
        &names::contacts_field_change(OrderField::Phone),
        OrderField::Phone,
        &shopper.phone,
    );
    bus.emit_empty(names::CONTACTS_SUBMIT);

    let order = match outbox.try_recv() {
        Ok(draft) => submit(api, &store, draft).await,
        Err(_) => {
            tracing::warn!(
                step = %store.step(),
                errors = ?store.state().form_errors(),
                "Checkout did not reach submission"
            );
            None
        },
    };

    let basket = store
        .state()
        .basket()
        .iter()
        .map(|entry| entry.id.clone())
        .collect();

    Ok(SessionReport {
        catalog_len,
        basket,
        order,
        step: store.step(),
        events: events.get(),
    })
}

fn edit(bus: &StoreBus, event: &str, field: OrderField, value: &str) {
    bus.emit(event, StoreEvent::FieldChange(FieldChange::new(field, value)));
}

async fn submit(api: &impl ShopApi, store: &Storefront, draft: OrderDraft) -> Option<OrderResult> {
    match api.order_products(draft).await {
        Ok(result) => {
            // Only a confirmed order clears the draft.
            store.mutate(AppState::clear_order);
            store.bus().emit_empty(names::SUCCESS_CLOSE);
            Some(result)
        },
        Err(error) => {
            tracing::error!(%error, "Order submission failed");
            None
        },
    }
}
