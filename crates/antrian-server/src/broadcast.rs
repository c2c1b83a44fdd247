//! Display fan-out: keeps every counter display in step with the store.
//!
//! Request handlers never write to displays themselves. After mutating the
//! [`QueueStore`] they hand a [`BroadcastRequest`] to the [`Broadcaster`],
//! which queues it on an unbounded channel and returns immediately. A
//! single background task drains the channel in order:
//!
//! - `Subscribe` sends the counter's `initial` list to the new connection
//!   and then registers it, so a display never sees an `update` older
//!   than its `initial`.
//! - `Update` reads the counter's current list from the store, serializes
//!   it once, and delivers it to every subscriber of that counter.
//! - `Recall` delivers a single-patient `recall` message.
//!
//! Delivery never waits on a display. Each frame is offered to the
//! subscriber's bounded outbound queue with `try_send`; a subscriber whose
//! queue is closed or full is removed from the registry, which drops its
//! sender and ends the connection. A display that stops reading therefore
//! loses its subscription instead of stalling every counter.

use std::sync::Arc;

use antrian_core::QueueStore;
use antrian_types::{DisplayMessage, Loket, Patient};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::registry::{ConnectionId, Frame, Outbound, SubscriptionRegistry};

/// Work item for the broadcast task.
#[derive(Debug)]
pub enum BroadcastRequest {
    /// A display connected and wants a counter's messages.
    Subscribe {
        /// The display's connection handle.
        connection: ConnectionId,
        /// Counter to bind to.
        loket: Loket,
        /// The display's outbound frame queue.
        outbound: Outbound,
    },
    /// A record at this counter changed; push the current list.
    Update {
        /// The counter whose list changed.
        loket: Loket,
    },
    /// Re-announce an already-called patient at their counter.
    Recall {
        /// The patient being recalled.
        patient: Patient,
    },
}

/// Result of delivering one frame to a counter's subscribers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Subscribers the frame was queued for.
    pub delivered: usize,
    /// Subscribers removed because their connection was gone or their
    /// queue was full.
    pub pruned: usize,
}

/// Cloneable handle for queueing broadcast work.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: mpsc::UnboundedSender<BroadcastRequest>,
}

impl Broadcaster {
    /// Start the broadcast task.
    ///
    /// The task runs until every [`Broadcaster`] clone is dropped. Must be
    /// called from within a Tokio runtime.
    pub fn spawn(
        store: Arc<QueueStore>,
        registry: Arc<SubscriptionRegistry>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = BroadcastWorker {
            store,
            registry,
            rx,
        };
        let handle = tokio::spawn(worker.run());
        (Self { tx }, handle)
    }

    /// Bind a display connection to a counter and send it the counter's
    /// `initial` list.
    pub fn subscribe(&self, connection: ConnectionId, loket: Loket, outbound: Outbound) {
        self.submit(BroadcastRequest::Subscribe {
            connection,
            loket,
            outbound,
        });
    }

    /// Push the current list of a counter to its displays.
    pub fn counter_changed(&self, loket: Loket) {
        self.submit(BroadcastRequest::Update { loket });
    }

    /// Re-announce a patient at their counter.
    pub fn recall(&self, patient: Patient) {
        self.submit(BroadcastRequest::Recall { patient });
    }

    fn submit(&self, request: BroadcastRequest) {
        if let Err(e) = self.tx.send(request) {
            warn!(request = ?e.0, "Broadcast task stopped, dropping request");
        }
    }
}

/// Serialize a display message once for every recipient.
pub fn encode(message: &DisplayMessage) -> Option<Frame> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Frame::from(json)),
        Err(e) => {
            warn!(error = %e, kind = message.kind(), "Failed to serialize display message");
            None
        }
    }
}

/// Queue a frame for every subscriber of a counter without waiting,
/// pruning any whose connection has gone away or stopped reading.
pub fn deliver(registry: &SubscriptionRegistry, loket: &Loket, frame: &Frame) -> Delivery {
    let mut delivery = Delivery::default();
    for (connection, outbound) in registry.subscribers_of(loket) {
        match outbound.try_send(frame.clone()) {
            Ok(()) => {
                delivery.delivered = delivery.delivered.saturating_add(1);
                continue;
            }
            Err(TrySendError::Full(_)) => {
                warn!(connection = %connection, loket = %loket, "Display not reading, pruning");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(connection = %connection, loket = %loket, "Display gone, pruning");
            }
        }
        if registry.unregister(connection) {
            delivery.pruned = delivery.pruned.saturating_add(1);
        }
    }
    delivery
}

struct BroadcastWorker {
    store: Arc<QueueStore>,
    registry: Arc<SubscriptionRegistry>,
    rx: mpsc::UnboundedReceiver<BroadcastRequest>,
}

impl BroadcastWorker {
    async fn run(mut self) {
        while let Some(request) = self.rx.recv().await {
            self.handle(request).await;
        }
        debug!("Broadcast channel closed, stopping broadcast task");
    }

    async fn handle(&self, request: BroadcastRequest) {
        match request {
            BroadcastRequest::Subscribe {
                connection,
                loket,
                outbound,
            } => self.subscribe(connection, loket, outbound).await,
            BroadcastRequest::Update { loket } => {
                let patients = self.store.list_by_counter(&loket).await;
                let message = DisplayMessage::Update {
                    loket: loket.clone(),
                    patients,
                };
                self.publish(&loket, &message);
            }
            BroadcastRequest::Recall { patient } => {
                let loket = patient.loket_number.clone();
                let message = DisplayMessage::Recall {
                    loket: loket.clone(),
                    patient,
                };
                self.publish(&loket, &message);
            }
        }
    }

    async fn subscribe(&self, connection: ConnectionId, loket: Loket, outbound: Outbound) {
        let patients = self.store.list_by_counter(&loket).await;
        let message = DisplayMessage::Initial {
            loket: loket.clone(),
            patients,
        };
        let Some(frame) = encode(&message) else {
            return;
        };
        if outbound.try_send(frame).is_err() {
            debug!(connection = %connection, loket = %loket, "Display left before initial list");
            return;
        }
        let watch = outbound.clone();
        if let Some(previous) = self.registry.register(connection, loket.clone(), outbound) {
            debug!(connection = %connection, previous = %previous, loket = %loket, "Display rebound");
        }
        // The connection closes its queue before releasing its registration,
        // so a close that raced the register above is visible here.
        if watch.is_closed() {
            self.registry.unregister(connection);
            debug!(connection = %connection, loket = %loket, "Display left during subscribe");
            return;
        }
        debug!(connection = %connection, loket = %loket, "Display subscribed");
    }

    fn publish(&self, loket: &Loket, message: &DisplayMessage) {
        let Some(frame) = encode(message) else {
            return;
        };
        let delivery = deliver(&self.registry, loket, &frame);
        debug!(
            loket = %loket,
            kind = message.kind(),
            delivered = delivery.delivered,
            pruned = delivery.pruned,
            "Display message broadcast"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use antrian_types::{NewPatient, Status};

    use super::*;

    const WAIT: Duration = Duration::from_secs(2);

    fn registration(name: &str, specialist: &str) -> NewPatient {
        NewPatient {
            full_name: name.to_owned(),
            specialist: specialist.to_owned(),
            ..NewPatient::default()
        }
    }

    async fn next_message(rx: &mut mpsc::Receiver<Frame>) -> DisplayMessage {
        let frame = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        serde_json::from_str(frame.as_str()).unwrap()
    }

    #[tokio::test]
    async fn subscriber_gets_initial_then_updates_for_its_counter_only() {
        let store = Arc::new(QueueStore::in_memory());
        let registry = Arc::new(SubscriptionRegistry::new());
        let existing = store.create(registration("Ani", "Poli Umum")).await.unwrap();
        store.create(registration("Beni", "Poli Gigi")).await.unwrap();
        let (broadcaster, _task) = Broadcaster::spawn(Arc::clone(&store), Arc::clone(&registry));

        let (tx, mut rx) = mpsc::channel(8);
        broadcaster.subscribe(ConnectionId(1), Loket::from("1"), tx);

        match next_message(&mut rx).await {
            DisplayMessage::Initial { loket, patients } => {
                assert_eq!(loket, Loket::from("1"));
                assert_eq!(patients, vec![existing.clone()]);
            }
            other => panic!("expected initial, got {other:?}"),
        }

        // A change at counter 2 produces nothing for this display.
        let gigi = store.create(registration("Cici", "Poli Gigi")).await.unwrap();
        broadcaster.counter_changed(gigi.loket_number.clone());

        let called = store.update_status(&existing.id, Status::Called).await.unwrap();
        broadcaster.counter_changed(called.loket_number.clone());

        match next_message(&mut rx).await {
            DisplayMessage::Update { loket, patients } => {
                assert_eq!(loket, Loket::from("1"));
                assert_eq!(patients, vec![called]);
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn recall_is_sent_to_the_patients_counter() {
        let store = Arc::new(QueueStore::in_memory());
        let registry = Arc::new(SubscriptionRegistry::new());
        let (broadcaster, _task) = Broadcaster::spawn(Arc::clone(&store), Arc::clone(&registry));

        let (tx, mut rx) = mpsc::channel(8);
        broadcaster.subscribe(ConnectionId(9), Loket::from("2"), tx);
        assert!(matches!(next_message(&mut rx).await, DisplayMessage::Initial { .. }));

        let patient = store.create(registration("Dodi", "Poli Gigi")).await.unwrap();
        let patient = store.update_status(&patient.id, Status::Called).await.unwrap();
        broadcaster.recall(patient.clone());

        assert_eq!(
            next_message(&mut rx).await,
            DisplayMessage::Recall {
                loket: Loket::from("2"),
                patient,
            }
        );
    }

    #[tokio::test]
    async fn deliver_prunes_dead_subscribers_and_reaches_the_rest() {
        let registry = SubscriptionRegistry::new();
        let loket = Loket::from("3");
        let (live_tx, mut live_rx) = mpsc::channel(4);
        let (dead_tx, dead_rx) = mpsc::channel(4);
        registry.register(ConnectionId(1), loket.clone(), dead_tx);
        registry.register(ConnectionId(2), loket.clone(), live_tx);
        drop(dead_rx);

        let frame = Frame::from("{\"type\":\"update\"}");
        let delivery = deliver(&registry, &loket, &frame);

        assert_eq!(
            delivery,
            Delivery {
                delivered: 1,
                pruned: 1,
            }
        );
        assert_eq!(live_rx.recv().await.unwrap(), frame);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.loket_of(ConnectionId(2)), Some(loket));
    }

    #[tokio::test]
    async fn display_that_stops_reading_is_dropped_without_stalling_others() {
        let store = Arc::new(QueueStore::in_memory());
        let registry = Arc::new(SubscriptionRegistry::new());
        let (broadcaster, _task) = Broadcaster::spawn(Arc::clone(&store), Arc::clone(&registry));

        // Capacity one: the initial list fills the queue and is never read.
        let (stuck_tx, mut stuck_rx) = mpsc::channel(1);
        broadcaster.subscribe(ConnectionId(1), Loket::from("1"), stuck_tx);
        broadcaster.counter_changed(Loket::from("1"));
        broadcaster.counter_changed(Loket::from("1"));

        let (tx, mut rx) = mpsc::channel(8);
        broadcaster.subscribe(ConnectionId(2), Loket::from("2"), tx);
        assert!(matches!(next_message(&mut rx).await, DisplayMessage::Initial { .. }));

        let gigi = store.create(registration("Eka", "Poli Gigi")).await.unwrap();
        broadcaster.counter_changed(gigi.loket_number.clone());
        assert!(matches!(next_message(&mut rx).await, DisplayMessage::Update { .. }));

        assert_eq!(registry.loket_of(ConnectionId(1)), None);
        assert_eq!(registry.len(), 1);
        // The stuck display keeps what was queued, then sees its queue close.
        assert!(matches!(next_message(&mut stuck_rx).await, DisplayMessage::Initial { .. }));
        assert!(stuck_rx.recv().await.is_none());
    }

    #[test]
    fn deliver_prunes_a_full_queue() {
        let registry = SubscriptionRegistry::new();
        let loket = Loket::from("1");
        let (tx, mut rx) = mpsc::channel(1);
        registry.register(ConnectionId(5), loket.clone(), tx);

        let frame = Frame::from("{\"type\":\"update\"}");
        assert_eq!(deliver(&registry, &loket, &frame).delivered, 1);
        assert_eq!(
            deliver(&registry, &loket, &frame),
            Delivery {
                delivered: 0,
                pruned: 1,
            }
        );
        assert!(registry.is_empty());
        assert_eq!(rx.try_recv().unwrap(), frame);
        assert!(rx.is_closed());
    }

    #[tokio::test]
    async fn subscriber_that_left_before_initial_is_not_registered() {
        let store = Arc::new(QueueStore::in_memory());
        let registry = Arc::new(SubscriptionRegistry::new());
        let (broadcaster, task) = Broadcaster::spawn(Arc::clone(&store), Arc::clone(&registry));

        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        broadcaster.subscribe(ConnectionId(4), Loket::from("1"), tx);

        // Closing the channel lets the task drain and exit.
        drop(broadcaster);
        tokio::time::timeout(WAIT, task).await.unwrap().unwrap();
        assert!(registry.is_empty());
    }
}
