//! Session membership and authority.
//!
//! Exactly one peer of a session is its authority: the only one allowed to
//! write the shared playback state and broadcast it. Who that is gets
//! decided outside this crate; the controller only asks through
//! [`Session`]. Transmission is also external: the controller requests a
//! broadcast and the session implementation serializes the controller's
//! shared state whenever it gets around to it, delivering it to the other
//! peers' [`Controller::apply_remote_state`](crate::controller::Controller::apply_remote_state).
//!
//! [`LoopbackHub`] implements all of this in-process for the demo binary
//! and for tests that run several peers side by side.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeSet,
    rc::Rc,
};

use crate::clock::Clock;

/// A peer's view of its session.
pub trait Session {
    /// Whether this peer currently holds authority.
    fn is_authority(&self) -> bool;

    /// Asks for the shared state to be broadcast to the other peers.
    fn request_broadcast(&self);

    /// Session-wide clock in seconds, comparable across peers.
    fn server_time(&self) -> f64;
}

/// Peer index within a [`LoopbackHub`].
pub type PeerId = usize;

/// In-process session shared by a set of peers.
pub struct LoopbackHub {
    clock: Box<dyn Clock>,
    authority: Cell<PeerId>,
    requests: RefCell<BTreeSet<PeerId>>,
}

impl LoopbackHub {
    /// Creates a hub whose server time is read from `clock`. Peer `0` starts
    /// out as the authority.
    #[must_use]
    pub fn new(clock: impl Clock + 'static) -> Rc<Self> {
        Rc::new(Self {
            clock: Box::new(clock),
            authority: Cell::new(0),
            requests: RefCell::new(BTreeSet::new()),
        })
    }

    /// A session handle for `peer`.
    #[must_use]
    pub fn join(self: &Rc<Self>, peer: PeerId) -> LoopbackSession {
        LoopbackSession {
            peer,
            hub: Rc::clone(self),
        }
    }

    #[must_use]
    pub fn authority(&self) -> PeerId {
        self.authority.get()
    }

    /// Hands authority to `peer`.
    pub fn transfer(&self, peer: PeerId) {
        let previous = self.authority.replace(peer);
        if previous != peer {
            info!("authority transferred from peer {previous} to peer {peer}");
        }
    }

    /// Takes the set of peers that requested a broadcast since the last call.
    pub fn take_requests(&self) -> BTreeSet<PeerId> {
        std::mem::take(&mut *self.requests.borrow_mut())
    }
}

#[derive(Clone)]
pub struct LoopbackSession {
    peer: PeerId,
    hub: Rc<LoopbackHub>,
}

impl LoopbackSession {
    #[must_use]
    pub fn peer(&self) -> PeerId {
        self.peer
    }
}

impl Session for LoopbackSession {
    fn is_authority(&self) -> bool {
        self.hub.authority() == self.peer
    }

    fn request_broadcast(&self) {
        trace!("peer {} requests broadcast", self.peer);
        self.hub.requests.borrow_mut().insert(self.peer);
    }

    fn server_time(&self) -> f64 {
        self.hub.clock.now().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn authority_is_unique() {
        let hub = LoopbackHub::new(ManualClock::new());
        let a = hub.join(0);
        let b = hub.join(1);
        assert!(a.is_authority() && !b.is_authority());

        hub.transfer(1);
        assert!(!a.is_authority() && b.is_authority());
    }

    #[test]
    fn requests_coalesce() {
        let hub = LoopbackHub::new(ManualClock::new());
        let a = hub.join(0);
        a.request_broadcast();
        a.request_broadcast();
        assert_eq!(hub.take_requests().into_iter().collect::<Vec<_>>(), [0]);
        assert!(hub.take_requests().is_empty());
    }

    #[test]
    fn server_time_follows_clock() {
        let clock = ManualClock::new();
        let hub = LoopbackHub::new(clock.clone());
        clock.advance(Duration::from_millis(2500));
        assert!((hub.join(3).server_time() - 2.5).abs() < 1e-9);
    }
}
