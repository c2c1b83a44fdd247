//! Shared application state for the API server.
//!
//! [`AppState`] is wrapped in an `Arc` and passed to every Axum handler
//! via the `State` extractor. It bundles the queue store, the display
//! registry, and the broadcaster handle.

use std::sync::Arc;

use antrian_core::QueueStore;
use antrian_core::config::BroadcastConfig;

use crate::broadcast::Broadcaster;
use crate::registry::SubscriptionRegistry;

/// State shared by every request handler and display connection.
#[derive(Debug)]
pub struct AppState {
    /// The authoritative patient queue.
    pub store: Arc<QueueStore>,
    /// Live display connections.
    pub registry: Arc<SubscriptionRegistry>,
    /// Queues display broadcasts.
    pub broadcaster: Broadcaster,
    /// Capacity of each display's outbound frame queue.
    pub subscriber_buffer: usize,
}

impl AppState {
    /// Create state around a store with the default display buffer.
    ///
    /// Spawns the broadcast task, so this must be called from within a
    /// Tokio runtime.
    pub fn new(store: Arc<QueueStore>) -> Self {
        Self::with_buffer(store, BroadcastConfig::default().subscriber_buffer)
    }

    /// Create state with an explicit per-display buffer size.
    ///
    /// A zero buffer is raised to one, the smallest capacity a bounded
    /// channel accepts.
    pub fn with_buffer(store: Arc<QueueStore>, subscriber_buffer: usize) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new());
        let (broadcaster, _task) = Broadcaster::spawn(Arc::clone(&store), Arc::clone(&registry));
        Self {
            store,
            registry,
            broadcaster,
            subscriber_buffer: subscriber_buffer.max(1),
        }
    }
}
