//! Type-safe identifier wrappers.
//!
//! Patient IDs and counter (loket) numbers are both plain strings on the
//! wire. Wrapping them prevents passing a counter number where a patient
//! ID is expected. Patient IDs are generated from UUID v7 so they sort by
//! creation time.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub String);

        impl $name {
            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Return the inner [`String`] value.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

define_id! {
    /// Unique identifier for a patient record.
    PatientId
}

define_id! {
    /// A service counter ("loket") number, e.g. `"1"`.
    Loket
}

impl PatientId {
    /// Mint a fresh identifier using UUID v7 (time-ordered).
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_ordered() {
        let first = PatientId::generate();
        let second = PatientId::generate();
        assert_ne!(first, second);
        assert!(first < second);
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let loket = Loket::from("2");
        let json = serde_json::to_string(&loket).unwrap();
        assert_eq!(json, "\"2\"");

        let id: PatientId = serde_json::from_str("\"P1700000000\"").unwrap();
        assert_eq!(id.as_str(), "P1700000000");
    }
}
