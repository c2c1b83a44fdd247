//! Messages pushed to counter displays over the live subscription.
//!
//! Every message is addressed to exactly one counter. The JSON shape is
//! tagged by `type`:
//!
//! ```json
//! {"type": "initial", "loket": "2", "patients": [...]}
//! {"type": "update",  "loket": "2", "patients": [...]}
//! {"type": "recall",  "loket": "2", "patient": {...}}
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::Loket;
use crate::structs::Patient;

/// A push message for one counter's displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum DisplayMessage {
    /// Full counter list sent once when a display subscribes.
    Initial {
        /// Counter the list belongs to.
        loket: Loket,
        /// Every record at the counter, in creation order.
        patients: Vec<Patient>,
    },
    /// Full counter list sent after a mutation touching the counter.
    Update {
        /// Counter the list belongs to.
        loket: Loket,
        /// Every record at the counter, in creation order.
        patients: Vec<Patient>,
    },
    /// Re-announce an already-called patient.
    Recall {
        /// Counter the patient is called to.
        loket: Loket,
        /// The recalled record.
        patient: Patient,
    },
}

impl DisplayMessage {
    /// The counter this message is addressed to.
    pub const fn loket(&self) -> &Loket {
        match self {
            Self::Initial { loket, .. } | Self::Update { loket, .. } | Self::Recall { loket, .. } => {
                loket
            }
        }
    }

    /// The wire `type` tag.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Initial { .. } => "initial",
            Self::Update { .. } => "update",
            Self::Recall { .. } => "recall",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn update_message_is_tagged_by_type() {
        let msg = DisplayMessage::Update {
            loket: Loket::from("1"),
            patients: Vec::new(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "update");
        assert_eq!(json["loket"], "1");
        assert!(json["patients"].as_array().unwrap().is_empty());
        assert_eq!(msg.kind(), "update");
    }

    #[test]
    fn initial_message_round_trips_through_json() {
        let text = r#"{"type":"initial","loket":"3","patients":[]}"#;
        let msg: DisplayMessage = serde_json::from_str(text).unwrap();
        assert_eq!(msg.loket(), &Loket::from("3"));
        assert_eq!(msg.kind(), "initial");
    }
}
