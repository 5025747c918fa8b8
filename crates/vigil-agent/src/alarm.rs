// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Alarm dispatcher: turns link transitions into human-facing alarms.
//!
//! Consumes the supervisor's transition stream, maintains at most one
//! active [`AlarmCondition`] per [`AlarmKind`], and hands notifications to
//! the delivery worker through a bounded queue so a slow SMTP relay can
//! never stall the control loop.
//!
//! Policy:
//! - `ConnectionLost` raises a notification only for persistent clients,
//!   whose absence the platform treats as an incident;
//! - `AuthFailure` always notifies, persistent or not;
//! - `UpdateCheckFailure` is tracked for operators but never notifies;
//! - a repeat of an active condition refreshes its timestamp silently,
//!   and recovery sends a follow-up only if the loss itself was notified.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vigil_core::types::{
    AlarmCondition, AlarmKind, LinkState, LinkTransition, TransitionCause, UpdateOutcome,
};

/// A notification on its way to the delivery worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

struct ActiveCondition {
    condition: AlarmCondition,
    /// Whether a notification went out when the condition was first raised.
    notified: bool,
}

/// Deduplicating alarm state machine.
pub struct AlarmDispatcher {
    persistent: bool,
    notifications_enabled: bool,
    server_host: String,
    active: HashMap<AlarmKind, ActiveCondition>,
    outbox: mpsc::Sender<Notification>,
}

impl AlarmDispatcher {
    pub fn new(
        persistent: bool,
        notifications_enabled: bool,
        server_host: String,
        outbox: mpsc::Sender<Notification>,
    ) -> Self {
        Self {
            persistent,
            notifications_enabled,
            server_host,
            active: HashMap::new(),
            outbox,
        }
    }

    /// Apply one link transition to the alarm state.
    pub fn on_transition(&mut self, transition: &LinkTransition) {
        match (transition.to, transition.cause) {
            (LinkState::Connected, _) => {
                self.resolve_connection_alarms(transition.at);
            }
            (_, TransitionCause::AuthRejected) => {
                self.raise(AlarmKind::AuthFailure, transition.at, true);
            }
            (
                LinkState::Disconnected,
                TransitionCause::ConnectionError | TransitionCause::HeartbeatTimeout,
            ) => {
                self.raise(AlarmKind::ConnectionLost, transition.at, self.persistent);
            }
            _ => {}
        }
    }

    /// Record a failed update check. Tracked, never notified.
    pub fn record_update_failure(&mut self, at: DateTime<Utc>) {
        self.raise(AlarmKind::UpdateCheckFailure, at, false);
    }

    /// Clear the update-check condition after a successful check.
    pub fn clear_update_failure(&mut self) {
        if self.active.remove(&AlarmKind::UpdateCheckFailure).is_some() {
            debug!("update-check condition cleared");
        }
    }

    /// Snapshot of the currently active conditions.
    pub fn active_conditions(&self) -> Vec<AlarmCondition> {
        self.active.values().map(|a| a.condition.clone()).collect()
    }

    /// Mark an active condition as acknowledged. Returns `false` if no
    /// such condition is active.
    pub fn acknowledge(&mut self, kind: AlarmKind) -> bool {
        match self.active.get_mut(&kind) {
            Some(active) => {
                active.condition.acknowledge();
                true
            }
            None => false,
        }
    }

    /// Consume the transition and update-outcome streams until the
    /// transition stream closes or `cancel` fires.
    pub async fn run(
        mut self,
        mut transitions: mpsc::UnboundedReceiver<LinkTransition>,
        mut updates: mpsc::UnboundedReceiver<UpdateOutcome>,
        cancel: CancellationToken,
    ) {
        let mut updates_open = true;
        loop {
            tokio::select! {
                maybe = transitions.recv() => match maybe {
                    Some(transition) => self.on_transition(&transition),
                    None => break,
                },
                maybe = updates.recv(), if updates_open => match maybe {
                    Some(UpdateOutcome::Failed) => self.record_update_failure(Utc::now()),
                    Some(UpdateOutcome::Succeeded) => self.clear_update_failure(),
                    // Update checks are deactivated or the scheduler is
                    // gone; stop polling this branch.
                    None => updates_open = false,
                },
                _ = cancel.cancelled() => break,
            }
        }
        debug!("alarm dispatcher stopped");
    }

    fn raise(&mut self, kind: AlarmKind, at: DateTime<Utc>, notify: bool) {
        if let Some(active) = self.active.get_mut(&kind) {
            active.condition.observe_again(at);
            debug!(%kind, "condition repeated, suppressing duplicate alarm");
            return;
        }
        info!(%kind, "alarm condition raised");
        let notified = if notify {
            let (subject, body) = self.render(kind);
            self.enqueue(Notification { subject, body })
        } else {
            false
        };
        self.active.insert(
            kind,
            ActiveCondition {
                condition: AlarmCondition::observed(kind, at),
                notified,
            },
        );
    }

    fn resolve_connection_alarms(&mut self, at: DateTime<Utc>) {
        // Auth trouble is over once the server accepts us.
        self.active.remove(&AlarmKind::AuthFailure);

        if let Some(active) = self.active.remove(&AlarmKind::ConnectionLost) {
            info!(
                since = %active.condition.first_observed_at,
                "connection restored, alarm condition resolved"
            );
            if active.notified {
                let outage = at - active.condition.first_observed_at;
                self.enqueue(Notification {
                    subject: format!("vigil: connection to {} restored", self.server_host),
                    body: format!(
                        "The connection to the alerting server {} has been restored.\n\
                         The client was out of contact for roughly {} seconds.",
                        self.server_host,
                        outage.num_seconds().max(0)
                    ),
                });
            }
        }
    }

    fn render(&self, kind: AlarmKind) -> (String, String) {
        match kind {
            AlarmKind::ConnectionLost => (
                format!("vigil: connection to {} lost", self.server_host),
                format!(
                    "The connection to the alerting server {} was lost and could not\n\
                     be re-established yet. The client keeps retrying with backoff.",
                    self.server_host
                ),
            ),
            AlarmKind::AuthFailure => (
                format!("vigil: authentication rejected by {}", self.server_host),
                format!(
                    "The alerting server {} rejected this client's credentials.\n\
                     Check the configured username and password; the client retries\n\
                     after a cooldown.",
                    self.server_host
                ),
            ),
            AlarmKind::UpdateCheckFailure => (
                String::from("vigil: update check failing"),
                String::from("The periodic update check is failing."),
            ),
        }
    }

    /// Best-effort, non-blocking hand-off to the delivery worker.
    fn enqueue(&self, notification: Notification) -> bool {
        if !self.notifications_enabled {
            return false;
        }
        match self.outbox.try_send(notification) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "notification queue unavailable, alarm not delivered");
                false
            }
        }
    }
}

/// Delivers queued notifications through the sink, best effort.
///
/// Runs until the queue's senders are gone. Delivery failures are logged
/// and dropped; alarms never feed back into the connection machinery.
pub async fn notification_worker(
    mut inbox: mpsc::Receiver<Notification>,
    sink: std::sync::Arc<dyn vigil_core::NotificationSink>,
) {
    while let Some(notification) = inbox.recv().await {
        if let Err(e) = sink.notify(&notification.subject, &notification.body).await {
            warn!(
                subject = %notification.subject,
                error = %e,
                "notification delivery failed"
            );
        }
    }
    debug!("notification worker stopped");
}
