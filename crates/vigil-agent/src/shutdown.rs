// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] that the supervisor and workers monitor. The
//! session is closed by the supervisor before the store is flushed.

use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vigil_core::types::LinkState;

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
/// The signal handler task runs in the background until the token is cancelled.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Waits up to `timeout` for the supervisor to land in `Disconnected`.
///
/// Called after cancellation so the session gets a chance to close its
/// transport cleanly before the store is flushed and the process exits.
pub async fn wait_for_teardown(state: &mut watch::Receiver<LinkState>, timeout: Duration) {
    if *state.borrow() == LinkState::Disconnected {
        debug!("link already down");
        return;
    }

    let settled = tokio::time::timeout(timeout, async {
        let _ = state.wait_for(|s| *s == LinkState::Disconnected).await;
    })
    .await;

    match settled {
        Ok(()) => info!("session closed cleanly"),
        Err(_) => warn!(
            timeout_ms = timeout.as_millis() as u64,
            "session did not close in time, exiting anyway"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn install_signal_handler_returns_token() {
        let token = install_signal_handler();
        // Token should not be cancelled yet.
        assert!(!token.is_cancelled());
        // Cancel it manually to clean up the background task.
        token.cancel();
    }

    #[tokio::test]
    async fn teardown_returns_immediately_when_already_down() {
        let (_tx, mut rx) = watch::channel(LinkState::Disconnected);
        wait_for_teardown(&mut rx, Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_waits_for_disconnected() {
        let (tx, mut rx) = watch::channel(LinkState::Connected);
        let waiter = tokio::spawn(async move {
            wait_for_teardown(&mut rx, Duration::from_secs(5)).await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send_replace(LinkState::Disconnected);
        waiter.await.unwrap();
    }
}
