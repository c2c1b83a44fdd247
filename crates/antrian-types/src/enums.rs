//! Enumeration types for the queueing workflow.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::Loket;

// ---------------------------------------------------------------------------
// Patient status
// ---------------------------------------------------------------------------

/// Where a patient is in the queue.
///
/// The intended progression is `waiting -> called -> completed`, but the
/// store accepts any assignment. Only recall checks the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Status {
    /// Registered and waiting to be called.
    Waiting,
    /// Called to the counter by staff.
    Called,
    /// Served; no longer part of the active queue.
    Completed,
}

impl Status {
    /// Whether the patient still holds a place in the queue.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Waiting | Self::Called)
    }

    /// The wire name of this status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Called => "called",
            Self::Completed => "completed",
        }
    }
}

impl core::fmt::Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Specialty
// ---------------------------------------------------------------------------

/// A clinical department ("poli") a patient can register under.
///
/// Each specialty owns one queue-number prefix and one counter. Free-text
/// specialty names that do not match a known department are routed to
/// [`Specialty::PoliUmum`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Specialty {
    /// General practice. Prefix `A`, counter `1`.
    PoliUmum,
    /// Dentistry. Prefix `B`, counter `2`.
    PoliGigi,
    /// Paediatrics. Prefix `C`, counter `3`.
    PoliAnak,
    /// Obstetrics. Prefix `D`, counter `4`.
    PoliKandungan,
}

impl Specialty {
    /// Every known specialty, in counter order.
    pub const ALL: [Self; 4] = [
        Self::PoliUmum,
        Self::PoliGigi,
        Self::PoliAnak,
        Self::PoliKandungan,
    ];

    /// Classify a submitted specialty name, falling back to the default
    /// department for anything unrecognised.
    pub fn classify(name: &str) -> Self {
        match name.trim() {
            "Poli Gigi" => Self::PoliGigi,
            "Poli Anak" => Self::PoliAnak,
            "Poli Kandungan" => Self::PoliKandungan,
            _ => Self::PoliUmum,
        }
    }

    /// Display name as submitted by the registration form.
    pub const fn name(self) -> &'static str {
        match self {
            Self::PoliUmum => "Poli Umum",
            Self::PoliGigi => "Poli Gigi",
            Self::PoliAnak => "Poli Anak",
            Self::PoliKandungan => "Poli Kandungan",
        }
    }

    /// Queue-number prefix for this specialty.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::PoliUmum => "A",
            Self::PoliGigi => "B",
            Self::PoliAnak => "C",
            Self::PoliKandungan => "D",
        }
    }

    /// Counter number as a static string.
    pub const fn counter_str(self) -> &'static str {
        match self {
            Self::PoliUmum => "1",
            Self::PoliGigi => "2",
            Self::PoliAnak => "3",
            Self::PoliKandungan => "4",
        }
    }

    /// The counter serving this specialty.
    pub fn loket(self) -> Loket {
        Loket::from(self.counter_str())
    }

    /// Format a queue number such as `B-007` for the given sequence.
    pub fn queue_number(self, sequence: u32) -> String {
        format!("{}-{sequence:03}", self.prefix())
    }

    /// Recover the sequence from a queue number issued under this prefix.
    ///
    /// Returns `None` for numbers carrying a different prefix or a
    /// non-numeric suffix.
    pub fn parse_sequence(self, queue_number: &str) -> Option<u32> {
        let (prefix, digits) = queue_number.split_once('-')?;
        if prefix != self.prefix() {
            return None;
        }
        digits.parse().ok()
    }
}

impl core::fmt::Display for Specialty {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
