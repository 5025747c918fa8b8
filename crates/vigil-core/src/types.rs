// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Vigil workspace.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// State of the link to the alerting server.
///
/// Owned exclusively by the Connection Supervisor: its control loop is the
/// only writer, everyone else observes through a `watch` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkState {
    /// No transport open; waiting for the next connect attempt.
    Disconnected,
    /// TCP + TLS handshake in progress.
    Connecting,
    /// Transport established, credential exchange in progress.
    Authenticating,
    /// Fully established; heartbeats flowing.
    Connected,
    /// Authentication was rejected; dwelling in the auth cooldown.
    Failed,
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkState::Disconnected => write!(f, "disconnected"),
            LinkState::Connecting => write!(f, "connecting"),
            LinkState::Authenticating => write!(f, "authenticating"),
            LinkState::Connected => write!(f, "connected"),
            LinkState::Failed => write!(f, "failed"),
        }
    }
}

/// What caused a link-state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum TransitionCause {
    Startup,
    HandshakeComplete,
    AuthAccepted,
    AuthRejected,
    CooldownElapsed,
    ConnectionError,
    HeartbeatTimeout,
    Shutdown,
}

/// A single link-state transition, published by the Connection Supervisor
/// to the Alarm Dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTransition {
    pub from: LinkState,
    pub to: LinkState,
    pub cause: TransitionCause,
    pub at: DateTime<Utc>,
}

impl LinkTransition {
    pub fn now(from: LinkState, to: LinkState, cause: TransitionCause) -> Self {
        Self {
            from,
            to,
            cause,
            at: Utc::now(),
        }
    }
}

/// Kinds of fault conditions that can reach a human.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AlarmKind {
    ConnectionLost,
    AuthFailure,
    UpdateCheckFailure,
}

/// A detected fault condition.
///
/// At most one condition of a given [`AlarmKind`] is active at a time;
/// re-occurrence updates `last_observed_at` instead of creating a duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmCondition {
    pub kind: AlarmKind,
    pub first_observed_at: DateTime<Utc>,
    pub last_observed_at: DateTime<Utc>,
    pub acknowledged: bool,
}

impl AlarmCondition {
    /// Create a condition first observed at `at`.
    pub fn observed(kind: AlarmKind, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            first_observed_at: at,
            last_observed_at: at,
            acknowledged: false,
        }
    }

    /// Record a repeated occurrence of the same fault.
    pub fn observe_again(&mut self, at: DateTime<Utc>) {
        self.last_observed_at = at;
    }

    /// Mark the condition as acknowledged by an operator.
    pub fn acknowledge(&mut self) {
        self.acknowledged = true;
    }
}

/// Outcome of one update check, as reported to the alarm dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The check completed, whatever it concluded about versions.
    Succeeded,
    /// The check could not be completed.
    Failed,
}

/// The two independently-purgeable record classes in the backing store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
pub enum RecordClass {
    SensorAlert,
    Event,
}

/// Time-based retention policy for one record class.
///
/// `lifespan_days == 0` means the class is never retained: writers must
/// honor this at insert time, before a purge cycle could ever run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub record_class: RecordClass,
    pub lifespan_days: u32,
}

impl RetentionPolicy {
    pub fn new(record_class: RecordClass, lifespan_days: u32) -> Self {
        Self {
            record_class,
            lifespan_days,
        }
    }

    /// True if records of this class must never be persisted.
    pub fn retains_nothing(&self) -> bool {
        self.lifespan_days == 0
    }

    /// The cutoff timestamp for a purge cycle running at `now`: records
    /// created strictly before the cutoff are purge-eligible.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.lifespan_days))
    }
}

/// A sensor-alert row in the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorAlertRecord {
    pub id: String,
    /// Identifier of the sensor that raised the alert.
    pub sensor_id: i64,
    /// Sensor state at the time of the alert (0 = normal, 1 = triggered).
    pub state: i64,
    pub description: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// An event row in the backing store (state changes, option updates, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    /// Event discriminator, e.g. `stateChange` or `connectionLost`.
    pub kind: String,
    /// Optional JSON payload.
    pub data: Option<String>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}
