//! HTTP and `WebSocket` server for the Antrian patient queue.
//!
//! Exposes the queue over a REST API for registration kiosks and counter
//! staff, and streams live per-counter lists to display screens over
//! `WebSocket`.
//!
//! # Modules
//!
//! - [`broadcast`] -- Background task that fans display messages out to
//!   the subscribers of one counter.
//! - [`error`] -- [`ApiError`] and its HTTP response mapping.
//! - [`handlers`] -- REST endpoint handlers.
//! - [`registry`] -- Live display connections keyed by connection handle.
//! - [`router`] -- Route table, CORS, and tracing middleware.
//! - [`server`] -- Bind and serve with graceful shutdown.
//! - [`state`] -- [`AppState`] shared by every handler.
//! - [`ws`] -- Display connection lifecycle.

pub mod broadcast;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use broadcast::{Broadcaster, Delivery};
pub use error::ApiError;
pub use registry::{ConnectionId, Frame, Outbound, Registration, SubscriptionRegistry};
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
