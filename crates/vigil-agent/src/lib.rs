// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection supervision and alarm propagation for the Vigil monitoring
//! client.
//!
//! - [`channel`]: TLS session transport speaking newline-delimited JSON,
//!   behind the [`SessionTransport`]/[`SessionLink`] seam.
//! - [`supervisor`]: the [`ConnectionSupervisor`] state machine — connect,
//!   authenticate, heartbeat, reconnect with capped backoff.
//! - [`alarm`]: the [`AlarmDispatcher`] that deduplicates fault conditions
//!   and queues notifications for delivery.
//! - [`shutdown`]: signal handling and teardown coordination.

pub mod alarm;
pub mod channel;
pub mod shutdown;
pub mod supervisor;

pub use alarm::{notification_worker, AlarmDispatcher, Notification};
pub use channel::{Frame, SessionLink, SessionTransport, TlsTransport};
pub use shutdown::{install_signal_handler, wait_for_teardown};
pub use supervisor::{Backoff, ConnectionSupervisor};
