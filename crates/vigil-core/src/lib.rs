// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Vigil monitoring client.
//!
//! This crate provides the shared error type, link/alarm/retention types,
//! and the adapter traits implemented by the SMTP and storage collaborators.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::VigilError;
pub use traits::{EventStore, NotificationSink};
pub use types::{
    AlarmCondition, AlarmKind, EventRecord, LinkState, LinkTransition, RecordClass,
    RetentionPolicy, SensorAlertRecord, TransitionCause, UpdateOutcome,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_cover_the_failure_table() {
        let _config = VigilError::Config("test".into());
        let _conn = VigilError::Connection {
            message: "test".into(),
            source: None,
        };
        let _auth = VigilError::Auth {
            message: "test".into(),
        };
        let _notify = VigilError::Notification {
            message: "test".into(),
            source: None,
        };
        let _update = VigilError::UpdateCheck {
            message: "test".into(),
            source: None,
        };
        let _storage = VigilError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _timeout = VigilError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = VigilError::Internal("test".into());
    }

    #[test]
    fn trait_objects_are_constructible() {
        // Both adapter seams must stay object-safe: the agent holds
        // `Arc<dyn NotificationSink>` and `Arc<dyn EventStore>`.
        fn _assert_sink(_: &dyn NotificationSink) {}
        fn _assert_store(_: &dyn EventStore) {}
    }

    #[test]
    fn link_state_serializes() {
        let json = serde_json::to_string(&LinkState::Connected).unwrap();
        let parsed: LinkState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, LinkState::Connected);
    }
}
