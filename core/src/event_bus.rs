//! Synchronous publish/subscribe dispatcher.
//!
//! The [`EventBus`] is the only coordination mechanism between the application
//! state and the collaborators that render it. Collaborators emit *intent*
//! events ("the user clicked add-to-basket"), a wiring layer turns those into
//! state mutations, and the state emits *fact* events ("the basket changed")
//! back onto the same bus.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   intent    ┌──────────────┐   mutate   ┌──────────────┐
//! │ Collaborator │────────────►│   EventBus   │───────────►│   AppState   │
//! └──────────────┘             └──────────────┘            └──────┬───────┘
//!        ▲                            ▲                           │
//!        │            fact            │            fact           │
//!        └────────────────────────────┴───────────────────────────┘
//! ```
//!
//! # Dispatch Rules
//!
//! - **Selectors**: a handler is registered against an exact event name or a
//!   regex pattern. Exact names live in a lookup table, patterns in an ordered
//!   list; the handlers for one emission are the union of both, ordered by
//!   registration.
//! - **Monitors**: [`EventBus::on_all`] handlers see every emission and run
//!   *before* the selector handlers.
//! - **Synchronous and re-entrant**: a handler may emit; the nested emission
//!   runs to completion before the outer handler continues. There is no queue,
//!   no deduplication and no scheduling.
//! - **Snapshot per emission**: the handler set is captured when an emission
//!   starts. Handlers added or removed while it runs take effect from the next
//!   emission.
//! - **Isolated failures**: a handler that returns an error or panics is
//!   logged and counted in the returned [`Dispatch`]; the remaining handlers
//!   still run. Emitting with no subscribers is a silent no-op.
//!
//! # Example
//!
//! ```
//! use storefront_core::event_bus::{EventBus, EventSelector};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let bus: EventBus<String> = EventBus::new();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//!
//! let sink = Rc::clone(&seen);
//! bus.subscribe(EventSelector::pattern(r"^basket:").unwrap(), move |payload: &String| {
//!     sink.borrow_mut().push(payload.clone());
//!     Ok(())
//! });
//!
//! bus.emit("basket:changed", "two items".to_string());
//! bus.emit("catalog:changed", "ignored".to_string());
//!
//! assert_eq!(*seen.borrow(), vec!["two items".to_string()]);
//! ```

use crate::checkout::CheckoutError;
use crate::order::ParseFieldError;
use regex::Regex;
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use thiserror::Error;

/// Errors a handler can report back to the bus.
///
/// The bus never propagates these to the emitter; they are logged and
/// counted in [`Dispatch::failed`].
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The payload did not carry the variant the handler expects
    #[error("Unexpected payload for '{event}': expected {expected}")]
    UnexpectedPayload {
        /// The event being handled
        event: String,
        /// The payload kind the handler expected
        expected: &'static str,
    },

    /// The application state is already mutably borrowed (an intent was
    /// emitted from inside a state mutation)
    #[error("State is busy while handling '{event}'")]
    StateBusy {
        /// The event being handled
        event: String,
    },

    /// The application state was dropped while handlers were still subscribed
    #[error("State was dropped before '{event}' was handled")]
    StateDropped {
        /// The event being handled
        event: String,
    },

    /// A checkout transition was rejected
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// A form field or value could not be parsed
    #[error(transparent)]
    Field(#[from] ParseFieldError),

    /// Generic handler failure
    #[error("Handler failed: {0}")]
    Other(String),
}

/// Result type returned by event handlers.
pub type HandlerResult = Result<(), HandlerError>;

/// Identifies one registration on an [`EventBus`].
///
/// Ids are allocated in increasing order, so they double as the registration
/// sequence used to order handlers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Chooses which emitted event names a handler receives.
#[derive(Clone, Debug)]
pub enum EventSelector {
    /// Matches exactly one event name
    Name(String),
    /// Matches every event name the regex finds a match in
    Pattern(Regex),
}

impl EventSelector {
    /// Selector for a single exact event name.
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Selector compiled from a regex pattern.
    ///
    /// # Errors
    ///
    /// Returns the regex compilation error if `pattern` is not a valid regex.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::Pattern)
    }

    /// Whether an event with this name should reach the selector's handlers.
    #[must_use]
    pub fn matches(&self, event: &str) -> bool {
        match self {
            Self::Name(name) => name == event,
            Self::Pattern(regex) => regex.is_match(event),
        }
    }
}

impl From<&str> for EventSelector {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for EventSelector {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Regex> for EventSelector {
    fn from(regex: Regex) -> Self {
        Self::Pattern(regex)
    }
}

impl fmt::Display for EventSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

/// Outcome of a single [`EventBus::emit`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Dispatch {
    /// Handlers that ran and returned `Ok`
    pub delivered: usize,
    /// Handlers that returned an error or panicked
    pub failed: usize,
}

impl Dispatch {
    /// True when no selector handler matched the event.
    #[must_use]
    pub const fn is_unobserved(&self) -> bool {
        self.delivered == 0 && self.failed == 0
    }

    /// True when every matching handler succeeded.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

type Handler<P> = Rc<dyn Fn(&P) -> HandlerResult>;
type Monitor<P> = Rc<dyn Fn(&str, &P)>;
type Matched<P> = SmallVec<[(SubscriptionId, Handler<P>); 4]>;

/// Single-threaded, synchronous event dispatcher.
///
/// The bus holds no application state, only registrations. It is shared via
/// `Rc` between the state aggregate, its entities and the wiring layer; all
/// methods take `&self` so handlers can subscribe, unsubscribe and emit from
/// inside a dispatch.
pub struct EventBus<P> {
    exact: RefCell<HashMap<String, Vec<(SubscriptionId, Handler<P>)>>>,
    patterns: RefCell<Vec<(SubscriptionId, Regex, Handler<P>)>>,
    monitors: RefCell<Vec<(SubscriptionId, Monitor<P>)>>,
    next_id: Cell<u64>,
}

impl<P> EventBus<P> {
    /// Create a bus with no registrations.
    #[must_use]
    pub fn new() -> Self {
        Self {
            exact: RefCell::new(HashMap::new()),
            patterns: RefCell::new(Vec::new()),
            monitors: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    fn allocate_id(&self) -> SubscriptionId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        SubscriptionId(id)
    }

    /// Register `handler` for every event whose name satisfies `selector`.
    ///
    /// Handlers run in registration order. The returned id is needed to
    /// [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe<F>(&self, selector: impl Into<EventSelector>, handler: F) -> SubscriptionId
    where
        F: Fn(&P) -> HandlerResult + 'static,
    {
        let id = self.allocate_id();
        let handler: Handler<P> = Rc::new(handler);
        let selector = selector.into();
        tracing::trace!(%selector, subscription = %id, "Subscribing handler");

        match selector {
            EventSelector::Name(name) => {
                self.exact
                    .borrow_mut()
                    .entry(name)
                    .or_default()
                    .push((id, handler));
            },
            EventSelector::Pattern(regex) => {
                self.patterns.borrow_mut().push((id, regex, handler));
            },
        }
        id
    }

    /// Remove a registration made with [`subscribe`](Self::subscribe).
    ///
    /// Returns `false` (and does nothing) when no registration with this id
    /// exists under `selector`.
    pub fn unsubscribe(&self, selector: &EventSelector, id: SubscriptionId) -> bool {
        let removed = match selector {
            EventSelector::Name(name) => {
                let mut exact = self.exact.borrow_mut();
                let Some(handlers) = exact.get_mut(name) else {
                    return false;
                };
                let before = handlers.len();
                handlers.retain(|(existing, _)| *existing != id);
                let removed = handlers.len() != before;
                if handlers.is_empty() {
                    exact.remove(name);
                }
                removed
            },
            EventSelector::Pattern(wanted) => {
                let mut patterns = self.patterns.borrow_mut();
                let before = patterns.len();
                patterns.retain(|(existing, regex, _)| {
                    !(*existing == id && regex.as_str() == wanted.as_str())
                });
                patterns.len() != before
            },
        };

        if removed {
            tracing::trace!(%selector, subscription = %id, "Unsubscribed handler");
        }
        removed
    }

    /// Register a monitor that observes every emission, before any selector
    /// handler runs. Intended for debugging and event recording.
    pub fn on_all<F>(&self, monitor: F) -> SubscriptionId
    where
        F: Fn(&str, &P) + 'static,
    {
        let id = self.allocate_id();
        self.monitors.borrow_mut().push((id, Rc::new(monitor)));
        id
    }

    /// Remove a monitor registered with [`on_all`](Self::on_all).
    pub fn off_all(&self, id: SubscriptionId) -> bool {
        let mut monitors = self.monitors.borrow_mut();
        let before = monitors.len();
        monitors.retain(|(existing, _)| *existing != id);
        monitors.len() != before
    }

    /// Number of selector handlers an emission of `event` would reach.
    #[must_use]
    pub fn handler_count(&self, event: &str) -> usize {
        self.matching(event).len()
    }

    fn matching(&self, event: &str) -> Matched<P> {
        let mut matched: Matched<P> = SmallVec::new();

        if let Some(handlers) = self.exact.borrow().get(event) {
            matched.extend(handlers.iter().map(|(id, handler)| (*id, Rc::clone(handler))));
        }
        matched.extend(
            self.patterns
                .borrow()
                .iter()
                .filter(|(_, regex, _)| regex.is_match(event))
                .map(|(id, _, handler)| (*id, Rc::clone(handler))),
        );

        matched.sort_unstable_by_key(|(id, _)| *id);
        matched
    }

    /// Synchronously deliver `payload` to every monitor, then to every handler
    /// whose selector matches `event`.
    pub fn emit(&self, event: &str, payload: P) -> Dispatch {
        let monitors: SmallVec<[Monitor<P>; 2]> = self
            .monitors
            .borrow()
            .iter()
            .map(|(_, monitor)| Rc::clone(monitor))
            .collect();
        for monitor in monitors {
            if panic::catch_unwind(AssertUnwindSafe(|| monitor(event, &payload))).is_err() {
                tracing::error!(event, "Event monitor panicked");
            }
        }

        let handlers = self.matching(event);
        tracing::debug!(event, handlers = handlers.len(), "Emitting event");

        let mut dispatch = Dispatch::default();
        for (id, handler) in handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(&payload))) {
                Ok(Ok(())) => dispatch.delivered += 1,
                Ok(Err(error)) => {
                    dispatch.failed += 1;
                    tracing::warn!(event, subscription = %id, error = %error, "Event handler failed");
                },
                Err(_) => {
                    dispatch.failed += 1;
                    tracing::error!(event, subscription = %id, "Event handler panicked");
                },
            }
        }
        dispatch
    }
}

impl<P: Default> EventBus<P> {
    /// Emit `event` with the payload type's empty value.
    pub fn emit_empty(&self, event: &str) -> Dispatch {
        self.emit(event, P::default())
    }
}

impl<P> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for EventBus<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("exact_names", &self.exact.borrow().len())
            .field("patterns", &self.patterns.borrow().len())
            .field("monitors", &self.monitors.borrow().len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    type Log = Rc<RefCell<Vec<String>>>;

    fn log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn recorder(log: &Log, tag: &'static str) -> impl Fn(&String) -> HandlerResult + 'static {
        let log = Rc::clone(log);
        move |payload: &String| {
            log.borrow_mut().push(format!("{tag}:{payload}"));
            Ok(())
        }
    }

    #[test]
    fn test_exact_subscription_receives_payload() {
        let bus = EventBus::new();
        let seen = log();
        bus.subscribe("basket:changed", recorder(&seen, "a"));

        let dispatch = bus.emit("basket:changed", "x".to_string());

        assert_eq!(dispatch, Dispatch { delivered: 1, failed: 0 });
        assert_eq!(*seen.borrow(), vec!["a:x"]);
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus: EventBus<String> = EventBus::new();
        let dispatch = bus.emit("nobody:listens", String::new());
        assert!(dispatch.is_unobserved());
        assert!(dispatch.is_clean());
    }

    #[test]
    fn test_exact_and_pattern_handlers_run_in_registration_order() {
        let bus = EventBus::new();
        let seen = log();
        bus.subscribe("order:ready", recorder(&seen, "first"));
        bus.subscribe(EventSelector::pattern("^order:").unwrap(), recorder(&seen, "second"));
        bus.subscribe("order:ready", recorder(&seen, "third"));

        bus.emit("order:ready", "p".to_string());

        assert_eq!(*seen.borrow(), vec!["first:p", "second:p", "third:p"]);
    }

    #[test]
    fn test_pattern_receives_each_matching_event_once() {
        let bus = EventBus::new();
        let seen = log();
        bus.subscribe(
            EventSelector::pattern(r"^order\..*:change").unwrap(),
            recorder(&seen, "order"),
        );

        bus.emit("order.address:change", "1".to_string());
        bus.emit("order.payment:change", "2".to_string());
        bus.emit("order:open", "3".to_string());
        bus.emit("contacts.email:change", "4".to_string());

        assert_eq!(*seen.borrow(), vec!["order:1", "order:2"]);
    }

    #[test]
    fn test_nested_emit_completes_before_outer_handler_continues() {
        let bus = Rc::new(EventBus::new());
        let seen = log();

        let inner_bus = Rc::downgrade(&bus);
        let outer_log = Rc::clone(&seen);
        bus.subscribe("outer", move |_: &String| {
            outer_log.borrow_mut().push("outer:start".to_string());
            if let Some(bus) = inner_bus.upgrade() {
                bus.emit("inner", "nested".to_string());
            }
            outer_log.borrow_mut().push("outer:end".to_string());
            Ok(())
        });
        bus.subscribe("inner", recorder(&seen, "inner"));

        bus.emit("outer", String::new());

        assert_eq!(*seen.borrow(), vec!["outer:start", "inner:nested", "outer:end"]);
    }

    #[test]
    fn test_failing_handler_does_not_stop_others() {
        let bus = EventBus::new();
        let seen = log();
        bus.subscribe("evt", |_: &String| Err(HandlerError::Other("boom".to_string())));
        bus.subscribe("evt", recorder(&seen, "after"));

        let dispatch = bus.emit("evt", "ok".to_string());

        assert_eq!(dispatch, Dispatch { delivered: 1, failed: 1 });
        assert_eq!(*seen.borrow(), vec!["after:ok"]);
    }

    #[test]
    #[allow(clippy::panic)]
    fn test_panicking_handler_is_isolated() {
        let bus = EventBus::new();
        let seen = log();
        bus.subscribe("evt", |_: &String| panic!("handler blew up"));
        bus.subscribe("evt", recorder(&seen, "after"));

        let dispatch = bus.emit("evt", "ok".to_string());

        assert_eq!(dispatch.failed, 1);
        assert_eq!(*seen.borrow(), vec!["after:ok"]);
    }

    #[test]
    fn test_unsubscribe_removes_only_that_handler() {
        let bus = EventBus::new();
        let seen = log();
        let first = bus.subscribe("evt", recorder(&seen, "first"));
        bus.subscribe("evt", recorder(&seen, "second"));

        assert!(bus.unsubscribe(&EventSelector::name("evt"), first));
        bus.emit("evt", "p".to_string());

        assert_eq!(*seen.borrow(), vec!["second:p"]);
    }

    #[test]
    fn test_unsubscribe_unknown_is_noop() {
        let bus = EventBus::new();
        let seen = log();
        let id = bus.subscribe("evt", recorder(&seen, "kept"));

        assert!(!bus.unsubscribe(&EventSelector::name("other"), id));
        assert!(!bus.unsubscribe(&EventSelector::pattern("^evt").unwrap(), id));
        assert_eq!(bus.handler_count("evt"), 1);
    }

    #[test]
    fn test_unsubscribe_pattern() {
        let bus = EventBus::new();
        let seen = log();
        let selector = EventSelector::pattern("^evt").unwrap();
        let id = bus.subscribe(selector.clone(), recorder(&seen, "pattern"));

        assert!(bus.unsubscribe(&selector, id));
        assert_eq!(bus.handler_count("evt"), 0);
    }

    #[test]
    fn test_monitor_runs_before_handlers() {
        let bus = EventBus::new();
        let seen = log();
        bus.subscribe("evt", recorder(&seen, "handler"));
        let monitor_log = Rc::clone(&seen);
        bus.on_all(move |name: &str, payload: &String| {
            monitor_log.borrow_mut().push(format!("monitor:{name}:{payload}"));
        });

        bus.emit("evt", "p".to_string());
        bus.emit("unhandled", "q".to_string());

        assert_eq!(
            *seen.borrow(),
            vec!["monitor:evt:p", "handler:p", "monitor:unhandled:q"]
        );
    }

    #[test]
    fn test_off_all_stops_monitor() {
        let bus: EventBus<String> = EventBus::new();
        let seen = log();
        let monitor_log = Rc::clone(&seen);
        let id = bus.on_all(move |name: &str, _: &String| {
            monitor_log.borrow_mut().push(name.to_string());
        });

        assert!(bus.off_all(id));
        bus.emit("evt", String::new());
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_emit_empty_uses_default_payload() {
        let bus = EventBus::new();
        let seen = log();
        bus.subscribe("evt", recorder(&seen, "empty"));

        bus.emit_empty("evt");

        assert_eq!(*seen.borrow(), vec!["empty:"]);
    }

    #[test]
    fn test_handler_subscribed_during_emit_waits_for_next_emission() {
        let bus = Rc::new(EventBus::new());
        let seen = log();

        let weak = Rc::downgrade(&bus);
        let late_log = Rc::clone(&seen);
        bus.subscribe("evt", move |_: &String| {
            if let Some(bus) = weak.upgrade() {
                bus.subscribe("evt", recorder(&late_log, "late"));
            }
            Ok(())
        });

        bus.emit("evt", "first".to_string());
        assert!(seen.borrow().is_empty());

        bus.emit("evt", "second".to_string());
        assert_eq!(*seen.borrow(), vec!["late:second"]);
    }

    #[test]
    fn test_selector_display() {
        assert_eq!(EventSelector::name("a:b").to_string(), "a:b");
        assert_eq!(EventSelector::pattern("^a").unwrap().to_string(), "/^a/");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn delivery_follows_registration_order(
                exact in prop::collection::vec(any::<bool>(), 1..12),
            ) {
                let bus = EventBus::new();
                let seen = Rc::new(RefCell::new(Vec::new()));
                for (index, by_name) in exact.iter().enumerate() {
                    let selector = if *by_name {
                        EventSelector::name("order.address:change")
                    } else {
                        EventSelector::pattern(r"^order\..*:change").unwrap()
                    };
                    let sink = Rc::clone(&seen);
                    bus.subscribe(selector, move |_: &String| {
                        sink.borrow_mut().push(index);
                        Ok(())
                    });
                }

                let dispatch = bus.emit("order.address:change", String::new());

                prop_assert_eq!(dispatch.delivered, exact.len());
                prop_assert_eq!(seen.borrow().clone(), (0..exact.len()).collect::<Vec<_>>());
            }

            #[test]
            fn unsubscribed_handlers_leave_order_intact(
                keep in prop::collection::vec(any::<bool>(), 1..12),
            ) {
                let bus = EventBus::new();
                let seen = Rc::new(RefCell::new(Vec::new()));
                let selector = EventSelector::pattern("^evt$").unwrap();
                let ids: Vec<SubscriptionId> = (0..keep.len())
                    .map(|index| {
                        let sink = Rc::clone(&seen);
                        bus.subscribe(selector.clone(), move |_: &String| {
                            sink.borrow_mut().push(index);
                            Ok(())
                        })
                    })
                    .collect();
                for (id, kept) in ids.iter().zip(&keep) {
                    if !kept {
                        bus.unsubscribe(&selector, *id);
                    }
                }

                bus.emit("evt", String::new());

                let expected: Vec<usize> = keep
                    .iter()
                    .enumerate()
                    .filter_map(|(index, kept)| kept.then_some(index))
                    .collect();
                prop_assert_eq!(seen.borrow().clone(), expected);
            }
        }
    }
}
