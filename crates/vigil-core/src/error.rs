// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Vigil monitoring client.

use thiserror::Error;

/// The primary error type used across all Vigil components.
///
/// Everything past startup is recoverable: connection errors are retried
/// with backoff, notification and update-check errors are logged and
/// retried on the next occasion. Only configuration errors are fatal.
#[derive(Debug, Error)]
pub enum VigilError {
    /// Configuration errors (missing files, invalid values). Startup-fatal.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level failure while connecting or connected.
    #[error("connection error: {message}")]
    Connection {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Handshake or credential rejection by the alerting server.
    ///
    /// Distinct from [`Connection`](Self::Connection): auth failures likely
    /// indicate misconfiguration and are retried on a fixed cooldown, not
    /// the normal backoff schedule.
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// SMTP delivery failure. Logged only, never propagated to callers
    /// above the notification worker.
    #[error("notification error: {message}")]
    Notification {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Update manifest fetch, TLS validation, or parse failure.
    #[error("update check failed: {message}")]
    UpdateCheck {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Backing-store errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Operation timed out (handshake, heartbeat deadline, manifest fetch).
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VigilError {
    /// Build a [`Connection`](Self::Connection) error from a message and source.
    pub fn connection(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Build an [`UpdateCheck`](Self::UpdateCheck) error from a message and source.
    pub fn update_check(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::UpdateCheck {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
