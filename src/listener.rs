//! Subscriber fan-out.
//!
//! [`Listeners`] is an ordered set of subscribers keyed by identity: adding
//! the same `Rc` twice is a no-op, and notifications go out synchronously
//! in registration order. A listener that misbehaves is not isolated from
//! the others; listeners must not call back into the controller that
//! notifies them.

use std::{collections::BTreeMap, rc::Rc};

use crate::events::Event;

/// Receives controller events.
pub trait Listener {
    fn on_event(&self, event: &Event);
}

impl<F> Listener for F
where
    F: Fn(&Event),
{
    fn on_event(&self, event: &Event) {
        self(event);
    }
}

/// Handle returned on registration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct Listeners {
    next_id: u64,
    listeners: BTreeMap<ListenerId, Rc<dyn Listener>>,
}

impl Listeners {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` unless that same instance already is.
    ///
    /// Returns the handle of the registration, new or existing.
    pub fn add(&mut self, listener: Rc<dyn Listener>) -> ListenerId {
        if let Some(id) = self.find(&listener) {
            return id;
        }

        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.insert(id, listener);
        id
    }

    /// Unregisters a listener. Returns whether it was registered.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    #[must_use]
    pub fn contains(&self, listener: &Rc<dyn Listener>) -> bool {
        self.find(listener).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Delivers `event` to every listener in registration order.
    pub fn notify(&self, event: &Event) {
        trace!("notifying {} listener(s) of {event:?}", self.listeners.len());
        for listener in self.listeners.values() {
            listener.on_event(event);
        }
    }

    fn find(&self, listener: &Rc<dyn Listener>) -> Option<ListenerId> {
        // Compare data pointers only: vtable pointers of the same type may
        // differ between codegen units.
        let wanted = Rc::as_ptr(listener).cast::<()>();
        self.listeners
            .iter()
            .find(|(_, existing)| Rc::as_ptr(existing).cast::<()>() == wanted)
            .map(|(id, _)| *id)
    }
}
