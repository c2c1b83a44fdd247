//! Queue store, persistence, and configuration for the Antrian service.
//!
//! This crate owns the authoritative patient queue. Everything else in the
//! workspace reads and mutates patient records through [`QueueStore`].
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `antrian-config.yaml` into
//!   strongly-typed structs.
//! - [`persist`] -- JSON snapshot file with atomic replace and
//!   revision-ordered writes.
//! - [`profile`] -- Synthetic contact details for sparse registrations.
//! - [`store`] -- The queue store: records, queue-number sequences, and
//!   every query and mutation on them.

pub mod config;
pub mod persist;
pub mod profile;
pub mod store;

pub use config::{ConfigError, ServiceConfig};
pub use persist::{PersistError, SnapshotFile};
pub use store::{QueueStore, Replaced, StoreError};
