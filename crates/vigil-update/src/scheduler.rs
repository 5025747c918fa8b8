// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic driver for the update checker.
//!
//! Runs a check immediately on start and then on the configured cadence,
//! reporting each outcome to the alarm dispatcher. A deactivated
//! scheduler is inert: `run` returns without ever touching the network.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vigil_core::types::UpdateOutcome;

use crate::checker::{UpdateChecker, UpdateStatus};

/// Drives update checks on a fixed cadence.
pub struct UpdateScheduler {
    checker: Option<UpdateChecker>,
    interval: Duration,
    outcomes: mpsc::UnboundedSender<UpdateOutcome>,
}

impl UpdateScheduler {
    /// `checker == None` means update checks are deactivated.
    pub fn new(
        checker: Option<UpdateChecker>,
        interval: Duration,
        outcomes: mpsc::UnboundedSender<UpdateOutcome>,
    ) -> Self {
        Self {
            checker,
            interval,
            outcomes,
        }
    }

    /// Run checks until cancelled. The first check fires immediately.
    pub async fn run(&self, cancel: CancellationToken) {
        let Some(checker) = &self.checker else {
            debug!("update checks deactivated");
            return;
        };

        let mut ticker = tokio::time::interval(self.interval);
        info!(
            interval_secs = self.interval.as_secs(),
            current = %checker.current_version(),
            "update scheduler running"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = match checker.check().await {
                        Ok(UpdateStatus::Available { latest }) => {
                            info!(%latest, current = %checker.current_version(),
                                "a newer version is available");
                            UpdateOutcome::Succeeded
                        }
                        Ok(UpdateStatus::UpToDate) => {
                            debug!("client is up to date");
                            UpdateOutcome::Succeeded
                        }
                        Ok(UpdateStatus::AheadOfManifest { latest }) => {
                            debug!(%latest, current = %checker.current_version(),
                                "running ahead of the manifest");
                            UpdateOutcome::Succeeded
                        }
                        Err(e) => {
                            warn!(error = %e, "update check failed");
                            UpdateOutcome::Failed
                        }
                    };
                    // Dispatcher gone means we are shutting down anyway.
                    let _ = self.outcomes.send(outcome);
                }
                _ = cancel.cancelled() => {
                    debug!("update scheduler stopped");
                    break;
                }
            }
        }
    }
}
