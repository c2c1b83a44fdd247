//! The authoritative in-memory queue store.
//!
//! [`QueueStore`] owns every patient record and the per-prefix queue-number
//! sequences. It is constructed once at startup and shared by [`Arc`]
//! between request handlers and the display broadcaster.
//!
//! # Locking
//!
//! Records and sequences live behind a single [`RwLock`]. Reads take the
//! shared side. Every mutation takes the exclusive side once, so issuing a
//! queue number and appending the record it belongs to form one atomic
//! step: two concurrent registrations can never observe the same next
//! sequence, and a number is never issued for a record that is not stored.
//!
//! # Persistence
//!
//! When opened with a snapshot path, each mutation serializes the record
//! set while still holding the lock (so the snapshot is consistent), then
//! writes it after releasing the lock. Write failures are logged and
//! otherwise ignored; the in-memory state stays authoritative.
//!
//! [`Arc`]: std::sync::Arc

use std::collections::BTreeMap;
use std::path::PathBuf;

use antrian_types::{
    Loket, NewPatient, Patient, PatientId, PatientUpdate, QueueStats, Specialty, Status,
};
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::persist::SnapshotFile;
use crate::profile;

/// Errors returned by store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No record has the given ID.
    #[error("patient not found: {0}")]
    NotFound(PatientId),

    /// The submitted data cannot be stored.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The record exists but is not in a state that allows the operation.
    #[error("patient {id} is {status}, expected called")]
    InvalidState {
        /// The record that was targeted.
        id: PatientId,
        /// Its current status.
        status: Status,
    },
}

/// Outcome of a full-record replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replaced {
    /// The record as stored after the replacement.
    pub patient: Patient,
    /// The counter the record was assigned to before the replacement.
    pub previous_loket: Loket,
}

impl Replaced {
    /// Counters whose lists changed: the previous one, plus the new one if
    /// the specialty moved the record.
    pub fn affected_lokets(&self) -> Vec<Loket> {
        let mut lokets = vec![self.previous_loket.clone()];
        if self.patient.loket_number != self.previous_loket {
            lokets.push(self.patient.loket_number.clone());
        }
        lokets
    }
}

/// Records plus sequence counters, guarded together.
#[derive(Debug, Default)]
struct QueueState {
    /// Records in creation order.
    patients: Vec<Patient>,
    /// Last issued sequence per specialty prefix.
    sequences: BTreeMap<Specialty, u32>,
    /// Bumped on every mutation; orders snapshot writes.
    revision: u64,
}

impl QueueState {
    /// Rebuild state from persisted records, seeding each prefix's
    /// sequence from the highest number already issued.
    fn from_records(patients: Vec<Patient>) -> Self {
        let mut sequences = BTreeMap::new();
        for patient in &patients {
            let specialty = patient.specialty();
            if let Some(seq) = specialty.parse_sequence(&patient.queue_number) {
                let last = sequences.entry(specialty).or_insert(0);
                *last = (*last).max(seq);
            }
        }
        Self {
            patients,
            sequences,
            revision: 0,
        }
    }

    fn next_sequence(&mut self, specialty: Specialty) -> u32 {
        let last = self.sequences.entry(specialty).or_insert(0);
        *last = last.saturating_add(1);
        *last
    }

    fn find(&self, id: &PatientId) -> Option<&Patient> {
        self.patients.iter().find(|p| &p.id == id)
    }

    fn find_mut(&mut self, id: &PatientId) -> Option<&mut Patient> {
        self.patients.iter_mut().find(|p| &p.id == id)
    }
}

/// A serialized snapshot waiting to be written after the lock is released.
struct PendingSnapshot {
    revision: u64,
    bytes: Vec<u8>,
}

/// The authoritative patient queue.
#[derive(Debug)]
pub struct QueueStore {
    state: RwLock<QueueState>,
    snapshot: Option<SnapshotFile>,
}

impl QueueStore {
    /// A store with no backing file. Used by tests and ephemeral setups.
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(QueueState::default()),
            snapshot: None,
        }
    }

    /// Open a store backed by a snapshot file.
    ///
    /// A missing file starts an empty store. An unreadable or corrupt file
    /// is moved aside and the store starts empty. If it cannot be moved,
    /// the store runs without persistence rather than overwrite it.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let file = SnapshotFile::new(path);
        let (patients, snapshot) = match file.load().await {
            Ok(patients) => (patients, Some(file)),
            Err(e) => {
                warn!(
                    error = %e,
                    path = %file.path().display(),
                    "Failed to load patient snapshot, starting empty"
                );
                match file.quarantine().await {
                    Ok(moved) => {
                        warn!(
                            moved_to = %moved.display(),
                            "Unreadable patient snapshot moved aside"
                        );
                        (Vec::new(), Some(file))
                    }
                    Err(e) => {
                        error!(
                            error = %e,
                            path = %file.path().display(),
                            "Cannot move unreadable snapshot aside, persistence disabled"
                        );
                        (Vec::new(), None)
                    }
                }
            }
        };

        info!(
            patients = patients.len(),
            persistent = snapshot.is_some(),
            "Queue store opened"
        );

        Self {
            state: RwLock::new(QueueState::from_records(patients)),
            snapshot,
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Register a new patient.
    ///
    /// Issues the next queue number for the specialty's prefix, assigns
    /// the specialty's counter, and fills blank contact fields.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidInput`] if no specialty was given.
    pub async fn create(&self, mut input: NewPatient) -> Result<Patient, StoreError> {
        if input.specialist.trim().is_empty() {
            return Err(StoreError::InvalidInput(String::from(
                "specialist is required",
            )));
        }
        profile::fill_missing(&mut input, &mut rand::rng());
        let specialty = Specialty::classify(&input.specialist);

        let (patient, pending) = {
            let mut state = self.state.write().await;
            let sequence = state.next_sequence(specialty);
            let patient = Patient {
                id: PatientId::generate(),
                queue_number: specialty.queue_number(sequence),
                full_name: input.full_name,
                email: input.email,
                date_of_birth: input.date_of_birth,
                address: input.address,
                specialist: input.specialist,
                doctor: input.doctor,
                complaint: input.complaint,
                status: Status::Waiting,
                loket_number: specialty.loket(),
                created_at: Utc::now(),
            };
            state.patients.push(patient.clone());
            (patient, self.capture(&mut state))
        };
        self.persist(pending).await;

        info!(
            patient_id = %patient.id,
            queue_number = %patient.queue_number,
            loket = %patient.loket_number,
            "Patient registered"
        );
        Ok(patient)
    }

    /// Overwrite a record's status. Any status may be assigned.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the ID is unknown.
    pub async fn update_status(
        &self,
        id: &PatientId,
        status: Status,
    ) -> Result<Patient, StoreError> {
        let (patient, pending) = {
            let mut state = self.state.write().await;
            let record = state
                .find_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            record.status = status;
            let patient = record.clone();
            (patient, self.capture(&mut state))
        };
        self.persist(pending).await;

        debug!(patient_id = %id, status = %status, "Patient status updated");
        Ok(patient)
    }

    /// Replace every mutable field of a record.
    ///
    /// `id` and `created_at` are always preserved. The counter is derived
    /// from the new specialty. The queue number is kept while the prefix
    /// stays the same; moving to another prefix issues a fresh number from
    /// that prefix's sequence.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidInput`] if the specialty is blank, or
    /// [`StoreError::NotFound`] if the ID is unknown.
    pub async fn replace(
        &self,
        id: &PatientId,
        update: PatientUpdate,
    ) -> Result<Replaced, StoreError> {
        if update.specialist.trim().is_empty() {
            return Err(StoreError::InvalidInput(String::from(
                "specialist is required",
            )));
        }
        let specialty = Specialty::classify(&update.specialist);

        let (replaced, pending) = {
            let mut state = self.state.write().await;
            let current = state
                .find(id)
                .map(Patient::specialty)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            // Moving to another prefix draws from that prefix's sequence.
            let new_number = if current == specialty {
                None
            } else {
                let sequence = state.next_sequence(specialty);
                Some(specialty.queue_number(sequence))
            };

            let record = state
                .find_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            let previous_loket = record.loket_number.clone();
            if let Some(number) = new_number {
                record.queue_number = number;
            }
            record.full_name = update.full_name;
            record.email = update.email;
            record.date_of_birth = update.date_of_birth;
            record.address = update.address;
            record.specialist = update.specialist;
            record.doctor = update.doctor;
            record.complaint = update.complaint;
            record.status = update.status;
            record.loket_number = specialty.loket();

            let replaced = Replaced {
                patient: record.clone(),
                previous_loket,
            };
            (replaced, self.capture(&mut state))
        };
        self.persist(pending).await;

        debug!(
            patient_id = %id,
            loket = %replaced.patient.loket_number,
            previous_loket = %replaced.previous_loket,
            "Patient record replaced"
        );
        Ok(replaced)
    }

    /// Clear every record and restart every prefix at sequence 1.
    pub async fn reset(&self) {
        let pending = {
            let mut state = self.state.write().await;
            state.patients.clear();
            state.sequences.clear();
            self.capture(&mut state)
        };
        self.persist(pending).await;

        info!("Queue store reset");
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Copy of every record in creation order.
    pub async fn all(&self) -> Vec<Patient> {
        self.state.read().await.patients.clone()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.state.read().await.patients.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.patients.is_empty()
    }

    /// Look up a single record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the ID is unknown.
    pub async fn get(&self, id: &PatientId) -> Result<Patient, StoreError> {
        self.state
            .read()
            .await
            .find(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// The most recently created `waiting` or `called` record with this
    /// exact name, if any.
    pub async fn find_active_by_name(&self, full_name: &str) -> Option<Patient> {
        self.state
            .read()
            .await
            .patients
            .iter()
            .rev()
            .find(|p| p.full_name == full_name && p.status.is_active())
            .cloned()
    }

    /// Every record at a counter, in creation order, regardless of status.
    pub async fn list_by_counter(&self, loket: &Loket) -> Vec<Patient> {
        self.state
            .read()
            .await
            .patients
            .iter()
            .filter(|p| &p.loket_number == loket)
            .cloned()
            .collect()
    }

    /// The oldest `waiting` record at a counter.
    pub async fn next_waiting(&self, loket: &Loket) -> Option<Patient> {
        self.state
            .read()
            .await
            .patients
            .iter()
            .find(|p| &p.loket_number == loket && p.status == Status::Waiting)
            .cloned()
    }

    /// Check that a record may be recalled and return it.
    ///
    /// Recall never mutates state, so it can be repeated freely.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the ID is unknown, or
    /// [`StoreError::InvalidState`] if the record is not `called`.
    pub async fn recall(&self, id: &PatientId) -> Result<Patient, StoreError> {
        let state = self.state.read().await;
        let patient = state
            .find(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        if patient.status != Status::Called {
            return Err(StoreError::InvalidState {
                id: id.clone(),
                status: patient.status,
            });
        }
        Ok(patient.clone())
    }

    /// Status counts over every record.
    pub async fn stats(&self) -> QueueStats {
        QueueStats::tally(&self.state.read().await.patients)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Serialize the current record set under the held write lock.
    fn capture(&self, state: &mut QueueState) -> Option<PendingSnapshot> {
        state.revision = state.revision.saturating_add(1);
        if self.snapshot.is_none() {
            return None;
        }
        match serde_json::to_vec(&state.patients) {
            Ok(bytes) => Some(PendingSnapshot {
                revision: state.revision,
                bytes,
            }),
            Err(e) => {
                warn!(error = %e, "Failed to serialize patient snapshot");
                None
            }
        }
    }

    async fn persist(&self, pending: Option<PendingSnapshot>) {
        let (Some(file), Some(pending)) = (&self.snapshot, pending) else {
            return;
        };
        if let Err(e) = file.write(pending.revision, &pending.bytes).await {
            warn!(
                error = %e,
                revision = pending.revision,
                "Failed to persist patient snapshot"
            );
        }
    }
}
