//! Wiring: turning intent events into state mutations.
//!
//! [`Storefront`] owns the [`AppState`] behind an `Rc<RefCell<_>>` and
//! subscribes one handler per intent on the shared bus. Handlers hold only
//! weak references to the state and the bus, so the bus never keeps the state
//! alive. Dropping the `Storefront` removes every registration it made.
//!
//! # Re-entrancy
//!
//! While connected, the state holds its facts back. Each mutation runs with
//! the state mutably borrowed, and the facts it produced are published once
//! that borrow is released. Fact subscribers may therefore read the state
//! through [`Storefront::state`] or emit further intents. Only an intent
//! emitted from *inside* a [`Storefront::mutate`] closure finds the state
//! busy; its handler gets [`HandlerError::StateBusy`] and the bus logs it and
//! carries on.
//!
//! # Example
//!
//! ```
//! use storefront_core::catalog::{ProductId, ProductPatch};
//! use storefront_core::checkout::CheckoutStep;
//! use storefront_core::event::{StoreBus, StoreEvent, names};
//! use storefront_core::state::AppState;
//! use storefront_core::wiring::Storefront;
//! use std::rc::Rc;
//!
//! let bus = Rc::new(StoreBus::new());
//! let store = Storefront::connect(AppState::new(Rc::clone(&bus))).unwrap();
//! store.mutate(|state| {
//!     state.set_catalog(vec![ProductPatch {
//!         id: Some(ProductId::from("a")),
//!         price: Some(10),
//!         ..ProductPatch::default()
//!     }]);
//! });
//!
//! let entry = store.state().catalog()[0].clone();
//! bus.emit(names::PRODUCT_TOGGLE, StoreEvent::Entry(entry));
//! bus.emit_empty(names::ORDER_OPEN);
//!
//! assert_eq!(store.state().basket_len(), 1);
//! assert_eq!(store.step(), CheckoutStep::AddressPayment);
//! ```

use crate::checkout::{CheckoutAction, CheckoutError, CheckoutStep};
use crate::event::{StoreBus, StoreEvent, names};
use crate::event_bus::{EventSelector, HandlerError, HandlerResult, SubscriptionId};
use crate::order::{
    OrderField, PaymentMethod, validate_contacts_form, validate_order_form,
};
use crate::state::{AppState, Fact};
use std::cell::{Cell, Ref, RefCell};
use std::rc::{Rc, Weak};

/// Handles shared by every intent handler.
#[derive(Clone)]
struct Links {
    state: Weak<RefCell<AppState>>,
    bus: Weak<StoreBus>,
    step: Rc<Cell<CheckoutStep>>,
}

impl Links {
    fn with_state<R>(
        &self,
        event: &str,
        f: impl FnOnce(&mut AppState) -> R,
    ) -> Result<R, HandlerError> {
        let state = self.state.upgrade().ok_or_else(|| HandlerError::StateDropped {
            event: event.to_string(),
        })?;
        let (result, facts) = {
            let mut state = state.try_borrow_mut().map_err(|_| HandlerError::StateBusy {
                event: event.to_string(),
            })?;
            let result = f(&mut state);
            (result, state.take_facts())
        };
        if let Some(bus) = self.bus.upgrade() {
            publish(&bus, facts);
        }
        Ok(result)
    }

    fn read_state<R>(&self, event: &str, f: impl FnOnce(&AppState) -> R) -> Result<R, HandlerError> {
        let state = self.state.upgrade().ok_or_else(|| HandlerError::StateDropped {
            event: event.to_string(),
        })?;
        let state = state.try_borrow().map_err(|_| HandlerError::StateBusy {
            event: event.to_string(),
        })?;
        Ok(f(&state))
    }

    /// Move the flow to `next` and publish it if it changed.
    fn enter(&self, next: CheckoutStep) {
        let previous = self.step.replace(next);
        if previous == next {
            return;
        }
        tracing::info!(from = %previous, to = %next, "Checkout step changed");
        if let Some(bus) = self.bus.upgrade() {
            bus.emit(names::CHECKOUT_STEP, StoreEvent::Step(next));
        }
    }

    fn emit(&self, event: &str, payload: StoreEvent) {
        if let Some(bus) = self.bus.upgrade() {
            bus.emit(event, payload);
        }
    }
}

/// The storefront state connected to its bus.
pub struct Storefront {
    bus: Rc<StoreBus>,
    state: Rc<RefCell<AppState>>,
    step: Rc<Cell<CheckoutStep>>,
    subscriptions: Vec<(EventSelector, SubscriptionId)>,
}

impl Storefront {
    /// Take ownership of `state` and subscribe the intent handlers on its bus.
    ///
    /// # Errors
    ///
    /// Returns a regex error if a field-edit pattern fails to compile.
    pub fn connect(mut state: AppState) -> Result<Self, regex::Error> {
        let bus = Rc::clone(state.bus());
        state.hold_facts();
        let state = Rc::new(RefCell::new(state));
        let step = Rc::new(Cell::new(CheckoutStep::default()));
        let links = Links {
            state: Rc::downgrade(&state),
            bus: Rc::downgrade(&bus),
            step: Rc::clone(&step),
        };

        let mut store = Self {
            bus,
            state,
            step,
            subscriptions: Vec::new(),
        };

        store.on(EventSelector::name(names::CARD_SELECT), &links, |links, payload| {
            let entry = payload.entry(names::CARD_SELECT)?;
            links.with_state(names::CARD_SELECT, |state| state.set_preview(entry))
        });

        store.on(EventSelector::name(names::PRODUCT_TOGGLE), &links, |links, payload| {
            let entry = payload.entry(names::PRODUCT_TOGGLE)?;
            links.with_state(names::PRODUCT_TOGGLE, |state| {
                if state.is_in_basket(entry).is_some() {
                    state.remove_from_basket(entry);
                } else {
                    state.add_to_basket(entry);
                }
            })
        });

        store.on(EventSelector::name(names::PAYMENT_CHANGE), &links, |links, payload| {
            let change = payload.field_change(names::PAYMENT_CHANGE)?;
            let payment: PaymentMethod = change.value.parse()?;
            links.with_state(names::PAYMENT_CHANGE, |state| {
                state.set_payment(payment);
                state.set_order_field(OrderField::Payment, &change.value);
            })
        });

        store.on(
            EventSelector::pattern(names::ORDER_FIELD_PATTERN)?,
            &links,
            |links, payload| {
                let change = payload.field_change(names::ORDER_FIELD_PATTERN)?;
                links.with_state(names::ORDER_FIELD_PATTERN, |state| {
                    state.set_order_field(change.field, &change.value);
                })
            },
        );

        store.on(
            EventSelector::pattern(names::CONTACTS_FIELD_PATTERN)?,
            &links,
            |links, payload| {
                let change = payload.field_change(names::CONTACTS_FIELD_PATTERN)?;
                links.with_state(names::CONTACTS_FIELD_PATTERN, |state| {
                    state.set_contacts_field(change.field, &change.value);
                })
            },
        );

        store.on(EventSelector::name(names::ORDER_OPEN), &links, |links, _| {
            let basket_len = links.read_state(names::ORDER_OPEN, AppState::basket_len)?;
            let next = links.step.get().apply(CheckoutAction::OpenOrder, basket_len)?;
            links.enter(next);
            Ok(())
        });

        store.on(EventSelector::name(names::ORDER_SUBMIT), &links, |links, _| {
            let complete = links.read_state(names::ORDER_SUBMIT, |state| {
                validate_order_form(state.order()).is_empty()
            })?;
            if !complete {
                return Err(CheckoutError::IncompleteForm { form: "order" }.into());
            }
            let next = links.step.get().apply(CheckoutAction::SubmitOrder, 0)?;
            links.enter(next);
            Ok(())
        });

        store.on(EventSelector::name(names::CONTACTS_SUBMIT), &links, |links, _| {
            let (complete, order) = links.read_state(names::CONTACTS_SUBMIT, |state| {
                (
                    validate_contacts_form(state.order()).is_empty(),
                    state.order().clone(),
                )
            })?;
            if !complete {
                return Err(CheckoutError::IncompleteForm { form: "contacts" }.into());
            }
            let next = links.step.get().apply(CheckoutAction::SubmitContacts, 0)?;
            links.enter(next);

            tracing::info!(items = order.items.len(), total = order.total, "Order submitted");
            links.emit(names::ORDER_SUBMITTED, StoreEvent::Order(order));
            Ok(())
        });

        store.on(EventSelector::name(names::SUCCESS_CLOSE), &links, |links, _| {
            acknowledge(links, names::SUCCESS_CLOSE)
        });

        store.on(EventSelector::name(names::MODAL_CLOSE), &links, |links, _| {
            if links.step.get() == CheckoutStep::Submitted {
                return acknowledge(links, names::MODAL_CLOSE);
            }
            let next = links.step.get().apply(CheckoutAction::Cancel, 0)?;
            links.enter(next);
            Ok(())
        });

        tracing::debug!(subscriptions = store.subscriptions.len(), "Storefront connected");
        Ok(store)
    }

    fn on<F>(&mut self, selector: EventSelector, links: &Links, handler: F)
    where
        F: Fn(&Links, &StoreEvent) -> HandlerResult + 'static,
    {
        let links = links.clone();
        let id = self
            .bus
            .subscribe(selector.clone(), move |payload: &StoreEvent| handler(&links, payload));
        self.subscriptions.push((selector, id));
    }

    /// The shared bus.
    #[must_use]
    pub const fn bus(&self) -> &Rc<StoreBus> {
        &self.bus
    }

    /// Borrow the state for reading.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a [`mutate`](Self::mutate) closure.
    #[must_use]
    pub fn state(&self) -> Ref<'_, AppState> {
        self.state.borrow()
    }

    /// Mutate the state directly, e.g. to install a freshly fetched catalog
    /// or to clear the order after a successful submission.
    ///
    /// Facts produced by `f` are published after it returns.
    ///
    /// # Panics
    ///
    /// Panics if the state is already borrowed, i.e. when called from inside
    /// another `mutate` closure or while a [`state`](Self::state) guard is
    /// alive.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut AppState) -> R) -> R {
        let (result, facts) = {
            let mut state = self.state.borrow_mut();
            let result = f(&mut state);
            (result, state.take_facts())
        };
        publish(&self.bus, facts);
        result
    }

    /// Current checkout step.
    #[must_use]
    pub fn step(&self) -> CheckoutStep {
        self.step.get()
    }
}

fn publish(bus: &StoreBus, facts: Vec<Fact>) {
    for (event, payload) in facts {
        bus.emit(event, payload);
    }
}

/// Leave the success screen: empty the basket and return to browsing.
fn acknowledge(links: &Links, event: &str) -> HandlerResult {
    let next = links.step.get().apply(CheckoutAction::Acknowledge, 0)?;
    links.with_state(event, AppState::clear_basket)?;
    links.enter(next);
    Ok(())
}

impl Drop for Storefront {
    fn drop(&mut self) {
        for (selector, id) in self.subscriptions.drain(..) {
            self.bus.unsubscribe(&selector, id);
        }
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("step", &self.step.get())
            .field("subscriptions", &self.subscriptions.len())
            .finish_non_exhaustive()
    }
}
