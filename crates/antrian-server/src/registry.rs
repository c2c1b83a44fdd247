//! Live display subscriptions keyed by connection.
//!
//! Each WebSocket connection gets a stable [`ConnectionId`] and an outbound
//! frame queue. The registry maps connection to the one counter it watches
//! plus the sending half of that queue. Fan-out reads the registry under
//! the shared lock; registration and removal take the exclusive lock.
//!
//! The lock is a `std` lock rather than an async one: every critical
//! section is a short map operation with no `.await` inside, and removal
//! must be callable from [`Drop`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use antrian_types::Loket;
use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc;
use tracing::debug;

/// A serialized display message, shared cheaply between subscribers.
pub type Frame = Utf8Bytes;

/// Sending half of a connection's outbound frame queue.
pub type Outbound = mpsc::Sender<Frame>;

/// Stable handle for one display connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl core::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug)]
struct Subscriber {
    loket: Loket,
    outbound: Outbound,
}

/// Every live display connection and the counter it is bound to.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subscribers: RwLock<HashMap<ConnectionId, Subscriber>>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a connection handle whose registration is removed when the
    /// returned guard is dropped.
    pub fn lease(self: &Arc<Self>) -> Registration {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        Registration {
            registry: Arc::clone(self),
            id,
        }
    }

    /// Bind a connection to a counter.
    ///
    /// A connection watches at most one counter; registering again replaces
    /// the previous binding, which is returned.
    pub fn register(&self, id: ConnectionId, loket: Loket, outbound: Outbound) -> Option<Loket> {
        let previous = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Subscriber { loket, outbound });
        previous.map(|s| s.loket)
    }

    /// Remove a connection. Dropping its sender closes the connection's
    /// outbound queue. Returns whether it was registered.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let removed = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if let Some(subscriber) = &removed {
            debug!(connection = %id, loket = %subscriber.loket, "Subscriber removed");
        }
        removed.is_some()
    }

    /// Connections currently bound to a counter.
    pub fn subscribers_of(&self, loket: &Loket) -> Vec<(ConnectionId, Outbound)> {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, s)| &s.loket == loket)
            .map(|(id, s)| (*id, s.outbound.clone()))
            .collect()
    }

    /// The counter a connection is bound to, if registered.
    pub fn loket_of(&self, id: ConnectionId) -> Option<Loket> {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .map(|s| s.loket.clone())
    }

    /// Total registered connections.
    pub fn len(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scoped ownership of a connection's registry entry.
///
/// Held by the connection task for its whole lifetime. Dropping it on any
/// exit path, including a panic or an abrupt disconnect, removes the
/// entry.
#[derive(Debug)]
pub struct Registration {
    registry: Arc<SubscriptionRegistry>,
    id: ConnectionId,
}

impl Registration {
    /// The leased connection handle.
    pub const fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outbound() -> (Outbound, mpsc::Receiver<Frame>) {
        mpsc::channel(4)
    }

    #[test]
    fn subscribers_are_filtered_by_counter() {
        let registry = SubscriptionRegistry::new();
        let (tx1, _rx1) = outbound();
        let (tx2, _rx2) = outbound();
        let (tx3, _rx3) = outbound();

        registry.register(ConnectionId(1), Loket::from("1"), tx1);
        registry.register(ConnectionId(2), Loket::from("2"), tx2);
        registry.register(ConnectionId(3), Loket::from("1"), tx3);

        let mut ids: Vec<_> = registry
            .subscribers_of(&Loket::from("1"))
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec![ConnectionId(1), ConnectionId(3)]);
        assert!(registry.subscribers_of(&Loket::from("4")).is_empty());
    }

    #[test]
    fn re_registering_replaces_the_binding() {
        let registry = SubscriptionRegistry::new();
        let (tx, _rx) = outbound();

        assert_eq!(registry.register(ConnectionId(7), Loket::from("1"), tx.clone()), None);
        assert_eq!(
            registry.register(ConnectionId(7), Loket::from("3"), tx),
            Some(Loket::from("1"))
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.loket_of(ConnectionId(7)), Some(Loket::from("3")));
        assert!(registry.subscribers_of(&Loket::from("1")).is_empty());
    }

    #[test]
    fn unregister_closes_the_outbound_queue() {
        let registry = SubscriptionRegistry::new();
        let (tx, mut rx) = outbound();
        registry.register(ConnectionId(1), Loket::from("2"), tx);

        assert!(registry.unregister(ConnectionId(1)));
        assert!(!registry.unregister(ConnectionId(1)));
        assert!(registry.is_empty());
        // The registry held the only sender.
        assert!(rx.try_recv().is_err());
        assert!(rx.is_closed());
    }

    #[test]
    fn dropping_a_registration_removes_the_entry() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let lease = registry.lease();
        let other = registry.lease();
        assert_ne!(lease.id(), other.id());

        let (tx, _rx) = outbound();
        registry.register(lease.id(), Loket::from("1"), tx);
        assert_eq!(registry.len(), 1);

        drop(lease);
        assert!(registry.is_empty());
    }
}
