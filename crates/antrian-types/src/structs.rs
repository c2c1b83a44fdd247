//! Patient records, request payloads, and derived queue statistics.
//!
//! Field names are serialized in camelCase to stay compatible with the
//! registration and display front-ends and with existing snapshot files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Specialty, Status};
use crate::ids::{Loket, PatientId};

// ---------------------------------------------------------------------------
// Patient
// ---------------------------------------------------------------------------

/// A registered patient and their place in a counter's queue.
///
/// `id`, `queue_number`, and `created_at` are assigned by the store at
/// creation and never change afterwards. `loket_number` is always the
/// counter of the record's specialty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Patient {
    /// Unique record identifier.
    pub id: PatientId,
    /// Human-facing ticket, e.g. `B-002`.
    pub queue_number: String,
    /// Patient's full name.
    pub full_name: String,
    /// Contact email.
    pub email: String,
    /// Date of birth as `YYYY-MM-DD`.
    pub date_of_birth: String,
    /// Postal address.
    pub address: String,
    /// Specialty name as submitted.
    pub specialist: String,
    /// Assigned doctor, free text.
    #[serde(default)]
    pub doctor: String,
    /// Presenting complaint, free text.
    #[serde(default)]
    pub complaint: String,
    /// Current queue status.
    pub status: Status,
    /// Counter serving this patient.
    pub loket_number: Loket,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl Patient {
    /// The specialty this record is routed under.
    pub fn specialty(&self) -> Specialty {
        Specialty::classify(&self.specialist)
    }
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Registration payload for a new patient.
///
/// Only `specialist` is required. Empty contact fields are filled by the
/// profile generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct NewPatient {
    /// Patient's full name.
    pub full_name: String,
    /// Contact email; generated when blank.
    pub email: String,
    /// Date of birth; generated when blank.
    pub date_of_birth: String,
    /// Postal address; generated when blank.
    pub address: String,
    /// Specialty name.
    pub specialist: String,
    /// Assigned doctor.
    pub doctor: String,
    /// Presenting complaint.
    pub complaint: String,
}

/// Full-record replacement payload.
///
/// Identity fields (`id`, `queueNumber`, `loketNumber`, `createdAt`) may be
/// present in the body but are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PatientUpdate {
    /// Patient's full name.
    #[serde(default)]
    pub full_name: String,
    /// Contact email.
    #[serde(default)]
    pub email: String,
    /// Date of birth.
    #[serde(default)]
    pub date_of_birth: String,
    /// Postal address.
    #[serde(default)]
    pub address: String,
    /// Specialty name; determines the counter after replacement.
    #[serde(default)]
    pub specialist: String,
    /// Assigned doctor.
    #[serde(default)]
    pub doctor: String,
    /// Presenting complaint.
    #[serde(default)]
    pub complaint: String,
    /// New status.
    pub status: Status,
}

impl From<Patient> for PatientUpdate {
    fn from(patient: Patient) -> Self {
        Self {
            full_name: patient.full_name,
            email: patient.email,
            date_of_birth: patient.date_of_birth,
            address: patient.address,
            specialist: patient.specialist,
            doctor: patient.doctor,
            complaint: patient.complaint,
            status: patient.status,
        }
    }
}

/// Status-only update payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StatusUpdate {
    /// New status.
    pub status: Status,
}

// ---------------------------------------------------------------------------
// Queue statistics
// ---------------------------------------------------------------------------

/// Counts of patients by status, recomputed on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct QueueStats {
    /// All records.
    pub total: usize,
    /// Records in `waiting`.
    pub waiting: usize,
    /// Records in `called`.
    pub called: usize,
    /// Records in `completed`.
    pub completed: usize,
}

impl QueueStats {
    /// Tally statuses over a set of records.
    pub fn tally<'a>(patients: impl IntoIterator<Item = &'a Patient>) -> Self {
        patients.into_iter().fold(Self::default(), |mut stats, p| {
            stats.total = stats.total.saturating_add(1);
            let bucket = match p.status {
                Status::Waiting => &mut stats.waiting,
                Status::Called => &mut stats.called,
                Status::Completed => &mut stats.completed,
            };
            *bucket = bucket.saturating_add(1);
            stats
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn patient(status: Status) -> Patient {
        Patient {
            id: PatientId::generate(),
            queue_number: String::from("A-001"),
            full_name: String::from("Siti Rahma"),
            email: String::from("siti@example.com"),
            date_of_birth: String::from("1990-04-12"),
            address: String::from("Jl. Sudirman No. 45"),
            specialist: String::from("Poli Umum"),
            doctor: String::new(),
            complaint: String::from("Demam"),
            status,
            loket_number: Loket::from("1"),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn patient_uses_camel_case_wire_names() {
        let json = serde_json::to_value(patient(Status::Waiting)).unwrap();
        assert_eq!(json["queueNumber"], "A-001");
        assert_eq!(json["fullName"], "Siti Rahma");
        assert_eq!(json["loketNumber"], "1");
        assert_eq!(json["status"], "waiting");
        assert!(json["createdAt"].is_string());
    }

    #[test]
    fn new_patient_accepts_partial_body() {
        let input: NewPatient =
            serde_json::from_str(r#"{"fullName":"Budi","specialist":"Poli Gigi"}"#).unwrap();
        assert_eq!(input.full_name, "Budi");
        assert_eq!(input.specialist, "Poli Gigi");
        assert!(input.email.is_empty());
    }

    #[test]
    fn patient_update_ignores_identity_fields() {
        let body = r#"{
            "id": "forged",
            "queueNumber": "Z-999",
            "createdAt": "2001-01-01T00:00:00Z",
            "fullName": "Budi",
            "specialist": "Poli Anak",
            "status": "called"
        }"#;
        let update: PatientUpdate = serde_json::from_str(body).unwrap();
        assert_eq!(update.full_name, "Budi");
        assert_eq!(update.status, Status::Called);
    }

    #[test]
    fn stats_tally_counts_each_status() {
        let records = [
            patient(Status::Waiting),
            patient(Status::Waiting),
            patient(Status::Called),
            patient(Status::Completed),
        ];
        let stats = QueueStats::tally(&records);
        assert_eq!(
            stats,
            QueueStats {
                total: 4,
                waiting: 2,
                called: 1,
                completed: 1,
            }
        );
    }
}
