//! Event recording for assertions about what the bus carried.

#![allow(clippy::module_name_repetitions)] // EventRecorder is the natural name

use std::cell::RefCell;
use std::rc::Rc;
use storefront_core::event_bus::SubscriptionId;
use storefront_core::{StoreBus, StoreEvent};

/// One recorded emission.
pub type Recorded = (String, StoreEvent);

/// Records every emission on a bus through an `on_all` monitor.
///
/// The monitor is removed when the recorder is dropped.
///
/// # Example
///
/// ```
/// use storefront_core::StoreBus;
/// use storefront_testing::EventRecorder;
/// use std::rc::Rc;
///
/// let bus = Rc::new(StoreBus::new());
/// let recorder = EventRecorder::attach(&bus);
///
/// bus.emit_empty("order:open");
///
/// assert_eq!(recorder.names(), vec!["order:open"]);
/// ```
pub struct EventRecorder {
    bus: Rc<StoreBus>,
    monitor: SubscriptionId,
    log: Rc<RefCell<Vec<Recorded>>>,
}

impl EventRecorder {
    /// Start recording emissions on `bus`.
    #[must_use]
    pub fn attach(bus: &Rc<StoreBus>) -> Self {
        let log: Rc<RefCell<Vec<Recorded>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let monitor = bus.on_all(move |name: &str, payload: &StoreEvent| {
            sink.borrow_mut().push((name.to_string(), payload.clone()));
        });
        Self {
            bus: Rc::clone(bus),
            monitor,
            log,
        }
    }

    /// Names of every recorded emission, in emission order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.log.borrow().iter().map(|(name, _)| name.clone()).collect()
    }

    /// Every recorded emission, in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<Recorded> {
        self.log.borrow().clone()
    }

    /// Payloads of every emission named `event`.
    #[must_use]
    pub fn payloads(&self, event: &str) -> Vec<StoreEvent> {
        self.log
            .borrow()
            .iter()
            .filter(|(name, _)| name == event)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Payload of the most recent emission named `event`.
    #[must_use]
    pub fn last(&self, event: &str) -> Option<StoreEvent> {
        self.log
            .borrow()
            .iter()
            .rev()
            .find(|(name, _)| name == event)
            .map(|(_, payload)| payload.clone())
    }

    /// How many times `event` was emitted.
    #[must_use]
    pub fn count(&self, event: &str) -> usize {
        self.log.borrow().iter().filter(|(name, _)| name == event).count()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }
}

impl Drop for EventRecorder {
    fn drop(&mut self) {
        self.bus.off_all(self.monitor);
    }
}

impl std::fmt::Debug for EventRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRecorder")
            .field("recorded", &self.log.borrow().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_in_order_and_detaches_on_drop() {
        let bus = Rc::new(StoreBus::new());
        let recorder = EventRecorder::attach(&bus);

        bus.emit_empty("a");
        bus.emit_empty("b");
        bus.emit_empty("a");

        assert_eq!(recorder.names(), vec!["a", "b", "a"]);
        assert_eq!(recorder.count("a"), 2);
        assert_eq!(recorder.last("b"), Some(StoreEvent::Empty));
        assert_eq!(recorder.last("c"), None);

        recorder.clear();
        assert!(recorder.events().is_empty());

        let log = Rc::clone(&recorder.log);
        drop(recorder);
        bus.emit_empty("a");
        assert!(log.borrow().is_empty());
    }
}
