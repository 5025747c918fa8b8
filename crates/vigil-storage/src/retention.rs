// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Time-based retention enforcement for the two record classes.
//!
//! The [`RetentionManager`] runs a purge cycle on a fixed cadence and, for
//! each policy with a non-zero lifespan, deletes records older than
//! `now - lifespan_days`. The zero-lifespan case is a write-time concern
//! handled by the store itself and is skipped here.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vigil_core::types::{RecordClass, RetentionPolicy};
use vigil_core::EventStore;

/// Outcome of one purge cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Rows removed per record class this cycle.
    pub purged: Vec<(RecordClass, u64)>,
    /// Classes whose purge failed; they will be retried next cycle.
    pub failed: Vec<RecordClass>,
}

/// Periodically purges aged records from the backing store.
pub struct RetentionManager {
    store: Arc<dyn EventStore>,
    policies: Vec<RetentionPolicy>,
    cycle_interval: Duration,
}

impl RetentionManager {
    pub fn new(
        store: Arc<dyn EventStore>,
        policies: Vec<RetentionPolicy>,
        cycle_interval: Duration,
    ) -> Self {
        Self {
            store,
            policies,
            cycle_interval,
        }
    }

    /// Run one purge cycle at the given instant.
    ///
    /// Each record class is purged independently: a failure for one class
    /// is logged and does not block the other. Running a cycle twice with
    /// no new records is a no-op.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> CycleReport {
        let mut report = CycleReport::default();

        for policy in &self.policies {
            if policy.retains_nothing() {
                // Write-time hook: the store never persisted these.
                debug!(class = %policy.record_class, "skipping zero-lifespan class");
                continue;
            }

            let cutoff = policy.cutoff(now);
            match self
                .store
                .delete_older_than(policy.record_class, cutoff)
                .await
            {
                Ok(removed) => {
                    if removed > 0 {
                        info!(
                            class = %policy.record_class,
                            removed,
                            lifespan_days = policy.lifespan_days,
                            "purged aged records"
                        );
                    }
                    report.purged.push((policy.record_class, removed));
                }
                Err(e) => {
                    warn!(
                        class = %policy.record_class,
                        error = %e,
                        "purge failed, will retry next cycle"
                    );
                    report.failed.push(policy.record_class);
                }
            }
        }

        report
    }

    /// Run purge cycles on the configured cadence until cancelled.
    ///
    /// The first cycle runs immediately on start, matching the crash
    /// recovery expectation that a long-down client purges its backlog.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.cycle_interval);
        info!(
            interval_secs = self.cycle_interval.as_secs(),
            "retention manager running"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle(Utc::now()).await;
                }
                _ = cancel.cancelled() => {
                    info!("retention manager stopped");
                    break;
                }
            }
        }
    }
}
