// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification sink trait wrapping the SMTP collaborator.

use async_trait::async_trait;

use crate::error::VigilError;

/// Uniform "notify a human" contract in front of the SMTP relay.
///
/// Delivery is best-effort: implementations return
/// [`VigilError::Notification`] on failure, and callers log it without
/// propagating -- a broken relay must never crash the Alarm Dispatcher or
/// the Connection Supervisor.
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    /// Deliver a notification with the given subject and body.
    async fn notify(&self, subject: &str, body: &str) -> Result<(), VigilError>;
}
