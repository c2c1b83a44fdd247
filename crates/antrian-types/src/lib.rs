//! Shared type definitions for the Antrian patient-queueing service.
//!
//! This crate is the single source of truth for the records, payloads, and
//! display messages exchanged between the queue store, the HTTP/WebSocket
//! server, and the front-ends. Types flow downstream to `TypeScript` via
//! `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- String-backed identifier wrappers (patient IDs, counters)
//! - [`enums`] -- Patient status and the specialty routing table
//! - [`structs`] -- Patient records, request payloads, queue statistics
//! - [`messages`] -- Push messages for counter displays

pub mod enums;
pub mod ids;
pub mod messages;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{Specialty, Status};
pub use ids::{Loket, PatientId};
pub use messages::DisplayMessage;
pub use structs::{NewPatient, Patient, PatientUpdate, QueueStats, StatusUpdate};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the display front-end.

    #[test]
    fn export_bindings() {
        // ts-rs generates TypeScript bindings when types with
        // #[ts(export)] are used. The files are written to the
        // `bindings/` directory relative to the crate root.
        use ts_rs::TS;

        let _ = crate::ids::PatientId::export_all();
        let _ = crate::ids::Loket::export_all();
        let _ = crate::enums::Status::export_all();
        let _ = crate::structs::Patient::export_all();
        let _ = crate::structs::NewPatient::export_all();
        let _ = crate::structs::PatientUpdate::export_all();
        let _ = crate::structs::StatusUpdate::export_all();
        let _ = crate::structs::QueueStats::export_all();
        let _ = crate::messages::DisplayMessage::export_all();
    }
}
