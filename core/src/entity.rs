//! Entities: plain data records bound to an event bus.
//!
//! An entity is built from a *partial* record. Fields present in the partial
//! overwrite the record's defaults and absent fields keep them. The entity
//! holds a handle to the bus it was created with and can publish a change
//! notification through it. It never subscribes: entities only publish, and
//! only when asked.
//!
//! # Example
//!
//! ```
//! use storefront_core::catalog::{CatalogEntry, ProductId, ProductPatch};
//! use storefront_core::entity::Entity;
//! use storefront_core::event::StoreBus;
//! use std::rc::Rc;
//!
//! let bus = Rc::new(StoreBus::new());
//! let patch = ProductPatch {
//!     id: Some(ProductId::from("p-1")),
//!     title: Some("Mouse".to_string()),
//!     ..ProductPatch::default()
//! };
//! let entry = CatalogEntry::new(patch, Rc::clone(&bus));
//!
//! assert_eq!(entry.title, "Mouse");
//! assert_eq!(entry.price, None); // default kept
//!
//! // Without an explicit payload, the entity publishes itself.
//! let dispatch = entry.notify("preview:changed", None);
//! assert!(dispatch.is_unobserved());
//! ```

use crate::event_bus::{Dispatch, EventBus};
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

/// A plain data record that can absorb a partial version of itself.
pub trait Record: Clone + Default {
    /// The partial form of the record: every field optional
    type Patch;

    /// Copy every field present in `patch` onto `self`, leaving the rest
    /// untouched.
    fn merge(&mut self, patch: Self::Patch);
}

/// Something that can publish change notifications on a bus.
pub trait Entity {
    /// Payload type of the bus the entity publishes on
    type Payload;

    /// The bus this entity was created with.
    fn bus(&self) -> &EventBus<Self::Payload>;

    /// The entity's current data as a payload.
    fn snapshot(&self) -> Self::Payload;

    /// Emit `event` on the entity's bus.
    ///
    /// When `payload` is `None` the entity's own [`snapshot`](Self::snapshot)
    /// is sent.
    fn notify(&self, event: &str, payload: Option<Self::Payload>) -> Dispatch {
        let payload = payload.unwrap_or_else(|| self.snapshot());
        self.bus().emit(event, payload)
    }
}

/// A [`Record`] bound to the bus it publishes on.
///
/// Derefs to the record so fields read naturally (`entry.title`). The data is
/// immutable once constructed; replacing an entity means building a new one.
pub struct Model<D, P> {
    data: D,
    bus: Rc<EventBus<P>>,
}

impl<D: Record, P> Model<D, P> {
    /// Build an entity from a partial record merged over `D::default()`.
    #[must_use]
    pub fn new(patch: D::Patch, bus: Rc<EventBus<P>>) -> Self {
        let mut data = D::default();
        data.merge(patch);
        Self { data, bus }
    }
}

impl<D, P> Model<D, P> {
    /// The wrapped record.
    #[must_use]
    pub const fn data(&self) -> &D {
        &self.data
    }

    /// Consume the entity, keeping only its record.
    #[must_use]
    pub fn into_data(self) -> D {
        self.data
    }

    /// The shared bus handle.
    #[must_use]
    pub const fn bus_handle(&self) -> &Rc<EventBus<P>> {
        &self.bus
    }
}

impl<D, P> Entity for Model<D, P>
where
    D: Clone,
    P: From<Self>,
{
    type Payload = P;

    fn bus(&self) -> &EventBus<P> {
        &self.bus
    }

    fn snapshot(&self) -> P {
        P::from(self.clone())
    }
}

impl<D, P> Deref for Model<D, P> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.data
    }
}

// Manual impls: the bus handle is shared identity, not data, so neither
// `P: Clone` nor `EventBus: PartialEq` should be required.
impl<D: Clone, P> Clone for Model<D, P> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            bus: Rc::clone(&self.bus),
        }
    }
}

impl<D: PartialEq, P> PartialEq for Model<D, P> {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl<D: fmt::Debug, P> fmt::Debug for Model<D, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}
