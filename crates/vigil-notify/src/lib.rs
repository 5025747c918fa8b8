// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMTP notification sink for the Vigil monitoring client.
//!
//! Implements [`NotificationSink`] over a plain SMTP relay, the way a
//! host-local MTA on port 25 is typically reached. Delivery is best
//! effort: errors are surfaced to the caller, which logs and drops them.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use vigil_config::model::SmtpConfig;
use vigil_core::{NotificationSink, VigilError};

/// Sends alarm notifications through an SMTP relay.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpNotifier {
    /// Build the notifier from the `[smtp]` configuration section.
    ///
    /// Addresses are parsed eagerly; a malformed address is a
    /// configuration error at startup, not a delivery-time surprise.
    pub fn new(config: &SmtpConfig) -> Result<Self, VigilError> {
        let from: Mailbox = config.from_addr.parse().map_err(|e| {
            VigilError::Config(format!("smtp.from_addr `{}` is invalid: {e}", config.from_addr))
        })?;
        let to: Mailbox = config.to_addr.parse().map_err(|e| {
            VigilError::Config(format!("smtp.to_addr `{}` is invalid: {e}", config.to_addr))
        })?;

        // Local relays speak unencrypted SMTP; TLS to the wider world is
        // the relay's job.
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .build();

        Ok(Self {
            transport,
            from,
            to,
        })
    }
}

#[async_trait]
impl NotificationSink for SmtpNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), VigilError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| VigilError::Notification {
                message: "building mail failed".to_string(),
                source: Some(Box::new(e)),
            })?;

        self.transport
            .send(message)
            .await
            .map_err(|e| VigilError::Notification {
                message: "smtp delivery failed".to_string(),
                source: Some(Box::new(e)),
            })?;

        debug!(subject, "notification delivered");
        Ok(())
    }
}

/// Sink used when notifications are deactivated; accepts and drops.
pub struct NoopNotifier;

#[async_trait]
impl NotificationSink for NoopNotifier {
    async fn notify(&self, subject: &str, _body: &str) -> Result<(), VigilError> {
        debug!(subject, "notifications deactivated, dropping");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp_config(from: &str, to: &str) -> SmtpConfig {
        SmtpConfig {
            activated: true,
            from_addr: from.to_string(),
            to_addr: to.to_string(),
            host: "127.0.0.1".to_string(),
            port: 25,
        }
    }

    #[test]
    fn valid_addresses_build_a_notifier() {
        let config = smtp_config("vigil@host.example", "ops@example.org");
        assert!(SmtpNotifier::new(&config).is_ok());
    }

    #[test]
    fn malformed_addresses_fail_at_startup() {
        let config = smtp_config("not-an-address", "ops@example.org");
        assert!(matches!(
            SmtpNotifier::new(&config),
            Err(VigilError::Config(_))
        ));

        let config = smtp_config("vigil@host.example", "also bad");
        assert!(matches!(
            SmtpNotifier::new(&config),
            Err(VigilError::Config(_))
        ));
    }

    #[tokio::test]
    async fn delivery_to_an_unreachable_relay_is_an_error() {
        // Port 1 is never a listening SMTP relay.
        let mut config = smtp_config("vigil@host.example", "ops@example.org");
        config.port = 1;
        let notifier = SmtpNotifier::new(&config).unwrap();

        let result = notifier.notify("subject", "body").await;
        assert!(matches!(result, Err(VigilError::Notification { .. })));
    }

    #[tokio::test]
    async fn noop_sink_always_succeeds() {
        assert!(NoopNotifier.notify("s", "b").await.is_ok());
    }
}
