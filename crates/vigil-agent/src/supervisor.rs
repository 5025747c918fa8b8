// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection supervisor: owns the session lifecycle end to end.
//!
//! Drives the [`LinkState`] machine — connect, authenticate, heartbeat,
//! reconnect with capped exponential backoff — and is the sole writer of
//! the published state. Observers get a `watch` channel for the current
//! state and an `mpsc` stream of [`LinkTransition`] events for the alarm
//! dispatcher.
//!
//! Reconnect policy:
//! - transport and handshake failures back off exponentially between
//!   `backoff_min_secs` and `backoff_max_secs`, resetting once a session
//!   reaches `Connected`;
//! - credential rejections park the machine in `Failed` for a fixed
//!   `auth_cooldown_secs` before retrying, without touching the backoff;
//! - heartbeat silence longer than `heartbeat_timeout_secs` tears the
//!   session down as `HeartbeatTimeout`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vigil_config::model::ConnectionConfig;
use vigil_core::types::{LinkState, LinkTransition, TransitionCause};
use vigil_core::VigilError;

use crate::channel::{SessionLink, SessionTransport};

/// Capped exponential backoff for reconnect attempts.
#[derive(Debug)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    next: Duration,
}

impl Backoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max, next: min }
    }

    /// The delay to wait before the next attempt; doubles up to the cap.
    pub fn delay(&mut self) -> Duration {
        let current = self.next;
        // Saturate: a huge configured ceiling must not overflow the doubling.
        self.next = self.next.saturating_mul(2).min(self.max);
        current
    }

    /// Return to the minimum delay after a healthy session.
    pub fn reset(&mut self) {
        self.next = self.min;
    }
}

/// Supervises the session to the alerting server.
pub struct ConnectionSupervisor {
    transport: Arc<dyn SessionTransport>,
    config: ConnectionConfig,
    state_tx: watch::Sender<LinkState>,
    transition_tx: mpsc::UnboundedSender<LinkTransition>,
}

impl ConnectionSupervisor {
    /// Create the supervisor along with its observation channels.
    ///
    /// The `watch` receiver always reflects the latest state; the
    /// transition receiver sees every state change in order.
    pub fn new(
        transport: Arc<dyn SessionTransport>,
        config: ConnectionConfig,
    ) -> (
        Self,
        watch::Receiver<LinkState>,
        mpsc::UnboundedReceiver<LinkTransition>,
    ) {
        let (state_tx, state_rx) = watch::channel(LinkState::Disconnected);
        let (transition_tx, transition_rx) = mpsc::unbounded_channel();
        (
            Self {
                transport,
                config,
                state_tx,
                transition_tx,
            },
            state_rx,
            transition_rx,
        )
    }

    /// Publish a state change. Only the supervisor calls this.
    fn transition(&self, to: LinkState, cause: TransitionCause) {
        let from = *self.state_tx.borrow();
        if from == to {
            return;
        }
        info!(%from, %to, ?cause, "link state changed");
        self.state_tx.send_replace(to);
        // Receiver dropping just means nobody watches transitions anymore.
        let _ = self.transition_tx.send(LinkTransition::now(from, to, cause));
    }

    /// Run the connect/authenticate/heartbeat loop until cancelled.
    ///
    /// On cancellation the machine always lands in `Disconnected` with a
    /// `Shutdown` cause before returning.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut backoff = Backoff::new(
            Duration::from_secs(self.config.backoff_min_secs),
            Duration::from_secs(self.config.backoff_max_secs),
        );

        loop {
            if cancel.is_cancelled() {
                self.transition(LinkState::Disconnected, TransitionCause::Shutdown);
                return;
            }

            self.transition(LinkState::Connecting, TransitionCause::Startup);

            let mut link = match self.establish(&cancel).await {
                Ok(Some(link)) => link,
                Ok(None) => {
                    // Cancelled mid-attempt.
                    self.transition(LinkState::Disconnected, TransitionCause::Shutdown);
                    return;
                }
                Err(VigilError::Auth { message }) => {
                    // Client certificate rejected during the handshake;
                    // same cooldown treatment as a credential rejection.
                    warn!(reason = %message, "handshake rejected");
                    if self.auth_cooldown(&cancel).await {
                        return;
                    }
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "connection attempt failed");
                    self.transition(LinkState::Disconnected, TransitionCause::ConnectionError);
                    if self.wait(backoff.delay(), &cancel).await {
                        self.transition(LinkState::Disconnected, TransitionCause::Shutdown);
                        return;
                    }
                    continue;
                }
            };

            self.transition(LinkState::Authenticating, TransitionCause::HandshakeComplete);

            match link.authenticate().await {
                Ok(()) => {}
                Err(VigilError::Auth { message }) => {
                    warn!(reason = %message, "authentication rejected");
                    link.close().await;
                    if self.auth_cooldown(&cancel).await {
                        return;
                    }
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "authentication exchange failed");
                    link.close().await;
                    self.transition(LinkState::Disconnected, TransitionCause::ConnectionError);
                    if self.wait(backoff.delay(), &cancel).await {
                        self.transition(LinkState::Disconnected, TransitionCause::Shutdown);
                        return;
                    }
                    continue;
                }
            }

            self.transition(LinkState::Connected, TransitionCause::AuthAccepted);
            backoff.reset();

            let cause = self.connected_loop(link.as_mut(), &cancel).await;
            link.close().await;
            self.transition(LinkState::Disconnected, cause);

            if cause == TransitionCause::Shutdown {
                return;
            }

            if self.wait(backoff.delay(), &cancel).await {
                self.transition(LinkState::Disconnected, TransitionCause::Shutdown);
                return;
            }
        }
    }

    /// Dwell in `Failed` for the fixed auth cooldown, then return to
    /// `Disconnected` ready to retry. The backoff state is untouched.
    ///
    /// Returns `true` if cancelled during the dwell.
    async fn auth_cooldown(&self, cancel: &CancellationToken) -> bool {
        self.transition(LinkState::Failed, TransitionCause::AuthRejected);
        if self
            .wait(Duration::from_secs(self.config.auth_cooldown_secs), cancel)
            .await
        {
            self.transition(LinkState::Disconnected, TransitionCause::Shutdown);
            return true;
        }
        self.transition(LinkState::Disconnected, TransitionCause::CooldownElapsed);
        false
    }

    /// Establish the transport, aborting early on cancellation.
    async fn establish(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<Box<dyn SessionLink>>, VigilError> {
        tokio::select! {
            result = self.transport.establish() => result.map(Some),
            _ = cancel.cancelled() => Ok(None),
        }
    }

    /// Heartbeat loop for an authenticated session.
    ///
    /// Any inbound frame counts as liveness. After `heartbeat_interval`
    /// of silence a ping goes out; if the server stays silent past
    /// `heartbeat_timeout` the session is declared dead.
    async fn connected_loop(
        &self,
        link: &mut dyn SessionLink,
        cancel: &CancellationToken,
    ) -> TransitionCause {
        let interval = Duration::from_secs(self.config.heartbeat_interval_secs);
        let timeout = Duration::from_secs(self.config.heartbeat_timeout_secs);
        // Remaining patience once a ping is in flight.
        let pong_window = timeout.saturating_sub(interval).max(Duration::from_secs(1));

        loop {
            let frame = tokio::select! {
                frame = link.read_frame(interval) => frame,
                _ = cancel.cancelled() => return TransitionCause::Shutdown,
            };

            match frame {
                Ok(frame) => {
                    debug!(?frame, "inbound frame");
                }
                Err(VigilError::Timeout { .. }) => {
                    if let Err(e) = link.ping().await {
                        warn!(error = %e, "ping failed");
                        return TransitionCause::ConnectionError;
                    }
                    let reply = tokio::select! {
                        frame = link.read_frame(pong_window) => frame,
                        _ = cancel.cancelled() => return TransitionCause::Shutdown,
                    };
                    match reply {
                        Ok(frame) => {
                            debug!(?frame, "inbound frame");
                        }
                        Err(VigilError::Timeout { .. }) => {
                            warn!(
                                timeout_secs = self.config.heartbeat_timeout_secs,
                                "heartbeat timed out"
                            );
                            return TransitionCause::HeartbeatTimeout;
                        }
                        Err(e) => {
                            warn!(error = %e, "session read failed");
                            return TransitionCause::ConnectionError;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "session read failed");
                    return TransitionCause::ConnectionError;
                }
            }
        }
    }

    /// Sleep `delay`, returning `true` if cancelled during the wait.
    async fn wait(&self, delay: Duration, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = cancel.cancelled() => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Frame;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn test_config() -> ConnectionConfig {
        ConnectionConfig {
            persistent: true,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            handshake_timeout_secs: 20,
            auth_cooldown_secs: 60,
            backoff_min_secs: 1,
            backoff_max_secs: 300,
        }
    }

    /// What a scripted link does once established.
    #[derive(Debug, Clone, Copy)]
    enum LinkScript {
        /// Reject the credential exchange.
        RejectAuth,
        /// Authenticate, then go silent forever (heartbeat timeout).
        Silent,
        /// Authenticate, then fail the first read.
        DropAfterConnect,
    }

    struct ScriptedLink {
        script: LinkScript,
    }

    #[async_trait]
    impl SessionLink for ScriptedLink {
        async fn authenticate(&mut self) -> Result<(), VigilError> {
            match self.script {
                LinkScript::RejectAuth => Err(VigilError::Auth {
                    message: "bad password".to_string(),
                }),
                _ => Ok(()),
            }
        }

        async fn ping(&mut self) -> Result<(), VigilError> {
            Ok(())
        }

        async fn read_frame(&mut self, deadline: Duration) -> Result<Frame, VigilError> {
            match self.script {
                LinkScript::DropAfterConnect => Err(VigilError::Connection {
                    message: "reset by peer".to_string(),
                    source: None,
                }),
                _ => {
                    tokio::time::sleep(deadline).await;
                    Err(VigilError::Timeout { duration: deadline })
                }
            }
        }

        async fn close(&mut self) {}
    }

    /// Transport that plays a fixed sequence of outcomes and records when
    /// each attempt happened.
    struct ScriptedTransport {
        script: Mutex<Vec<Option<LinkScript>>>,
        attempt: AtomicUsize,
        attempt_times: Mutex<Vec<Instant>>,
    }

    impl ScriptedTransport {
        /// `None` entries fail the connection attempt; the last entry
        /// repeats forever.
        fn new(script: Vec<Option<LinkScript>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                attempt: AtomicUsize::new(0),
                attempt_times: Mutex::new(Vec::new()),
            })
        }

        fn attempts(&self) -> usize {
            self.attempt.load(Ordering::SeqCst)
        }

        fn attempt_gaps(&self) -> Vec<Duration> {
            let times = self.attempt_times.lock().unwrap();
            times.windows(2).map(|w| w[1] - w[0]).collect()
        }
    }

    #[async_trait]
    impl SessionTransport for ScriptedTransport {
        async fn establish(&self) -> Result<Box<dyn SessionLink>, VigilError> {
            let n = self.attempt.fetch_add(1, Ordering::SeqCst);
            self.attempt_times.lock().unwrap().push(Instant::now());
            let script = self.script.lock().unwrap();
            let step = script.get(n).or_else(|| script.last());
            match step {
                Some(Some(link)) => Ok(Box::new(ScriptedLink { script: *link })),
                _ => Err(VigilError::Connection {
                    message: "refused".to_string(),
                    source: None,
                }),
            }
        }
    }

    async fn drain_transitions(
        rx: &mut mpsc::UnboundedReceiver<LinkTransition>,
    ) -> Vec<(LinkState, LinkState, TransitionCause)> {
        let mut out = Vec::new();
        while let Ok(t) = rx.try_recv() {
            out.push((t.from, t.to, t.cause));
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn happy_path_publishes_ordered_transitions() {
        let transport = ScriptedTransport::new(vec![Some(LinkScript::Silent)]);
        let (supervisor, state_rx, mut transition_rx) =
            ConnectionSupervisor::new(transport, test_config());
        let cancel = CancellationToken::new();

        let run_cancel = cancel.clone();
        let handle = tokio::spawn(async move { supervisor.run(run_cancel).await });

        // Let the machine reach Connected.
        let mut state_rx = state_rx;
        tokio::time::timeout(Duration::from_secs(5), async {
            state_rx
                .wait_for(|s| *s == LinkState::Connected)
                .await
                .unwrap();
        })
        .await
        .unwrap();

        cancel.cancel();
        handle.await.unwrap();

        let transitions = drain_transitions(&mut transition_rx).await;
        let states: Vec<LinkState> = transitions.iter().map(|(_, to, _)| *to).collect();
        assert_eq!(
            &states[..3],
            &[
                LinkState::Connecting,
                LinkState::Authenticating,
                LinkState::Connected
            ]
        );
        assert_eq!(*state_rx.borrow(), LinkState::Disconnected);
        assert_eq!(
            transitions.last().unwrap().2,
            TransitionCause::Shutdown,
            "cancellation must land in Disconnected via Shutdown"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn connect_failures_back_off_exponentially() {
        let transport = ScriptedTransport::new(vec![None]);
        let (supervisor, _state_rx, _transition_rx) =
            ConnectionSupervisor::new(transport.clone(), test_config());
        let cancel = CancellationToken::new();

        let run_cancel = cancel.clone();
        let handle = tokio::spawn(async move { supervisor.run(run_cancel).await });

        // 1 + 2 + 4 + 8 seconds of backoff covers five attempts.
        tokio::time::sleep(Duration::from_secs(16)).await;
        cancel.cancel();
        handle.await.unwrap();

        let gaps = transport.attempt_gaps();
        assert!(gaps.len() >= 4, "expected several retries, got {gaps:?}");
        assert_eq!(gaps[0], Duration::from_secs(1));
        assert_eq!(gaps[1], Duration::from_secs(2));
        assert_eq!(gaps[2], Duration::from_secs(4));
        assert_eq!(gaps[3], Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_is_capped_at_configured_max() {
        let transport = ScriptedTransport::new(vec![None]);
        let mut config = test_config();
        config.backoff_min_secs = 1;
        config.backoff_max_secs = 4;
        let (supervisor, _state_rx, _transition_rx) =
            ConnectionSupervisor::new(transport.clone(), config);
        let cancel = CancellationToken::new();

        let run_cancel = cancel.clone();
        let handle = tokio::spawn(async move { supervisor.run(run_cancel).await });

        tokio::time::sleep(Duration::from_secs(30)).await;
        cancel.cancel();
        handle.await.unwrap();

        let gaps = transport.attempt_gaps();
        assert!(gaps.len() >= 5);
        assert!(
            gaps.iter().all(|g| *g <= Duration::from_secs(4)),
            "gap exceeded cap: {gaps:?}"
        );
        // Steady state sits at the cap.
        assert_eq!(*gaps.last().unwrap(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn successful_session_resets_backoff() {
        // Two failures, one good-but-dropped session, then failures again.
        let transport = ScriptedTransport::new(vec![
            None,
            None,
            Some(LinkScript::DropAfterConnect),
            None,
            None,
        ]);
        let (supervisor, _state_rx, _transition_rx) =
            ConnectionSupervisor::new(transport.clone(), test_config());
        let cancel = CancellationToken::new();

        let run_cancel = cancel.clone();
        let handle = tokio::spawn(async move { supervisor.run(run_cancel).await });

        tokio::time::sleep(Duration::from_secs(12)).await;
        cancel.cancel();
        handle.await.unwrap();

        let gaps = transport.attempt_gaps();
        // Attempts: fail(+1s) fail(+2s) connected-drop(reset, +1s) fail(+2s).
        assert!(gaps.len() >= 4, "expected several attempts, got {gaps:?}");
        assert_eq!(gaps[0], Duration::from_secs(1));
        assert_eq!(gaps[1], Duration::from_secs(2));
        assert_eq!(
            gaps[2],
            Duration::from_secs(1),
            "backoff must reset after a Connected session"
        );
        assert_eq!(gaps[3], Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn auth_rejection_parks_in_failed_for_cooldown() {
        let transport = ScriptedTransport::new(vec![Some(LinkScript::RejectAuth)]);
        let (supervisor, state_rx, mut transition_rx) =
            ConnectionSupervisor::new(transport.clone(), test_config());
        let cancel = CancellationToken::new();

        let run_cancel = cancel.clone();
        let handle = tokio::spawn(async move { supervisor.run(run_cancel).await });

        let mut state_rx = state_rx;
        tokio::time::timeout(Duration::from_secs(5), async {
            state_rx
                .wait_for(|s| *s == LinkState::Failed)
                .await
                .unwrap();
        })
        .await
        .unwrap();
        let after_first = transport.attempts();

        // Half the cooldown: still parked, no new attempt.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.attempts(), after_first);
        assert_eq!(*state_rx.borrow(), LinkState::Failed);

        // Past the cooldown: a retry happened.
        tokio::time::sleep(Duration::from_secs(35)).await;
        assert!(transport.attempts() > after_first);

        cancel.cancel();
        handle.await.unwrap();

        let transitions = drain_transitions(&mut transition_rx).await;
        assert!(transitions
            .iter()
            .any(|(_, to, cause)| *to == LinkState::Failed
                && *cause == TransitionCause::AuthRejected));
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_silence_tears_the_session_down() {
        let transport = ScriptedTransport::new(vec![Some(LinkScript::Silent), None]);
        let (supervisor, _state_rx, mut transition_rx) =
            ConnectionSupervisor::new(transport, test_config());
        let cancel = CancellationToken::new();

        let run_cancel = cancel.clone();
        let handle = tokio::spawn(async move { supervisor.run(run_cancel).await });

        // interval (30s) of silence, ping, then the rest of the 90s window.
        tokio::time::sleep(Duration::from_secs(95)).await;
        cancel.cancel();
        handle.await.unwrap();

        let transitions = drain_transitions(&mut transition_rx).await;
        assert!(
            transitions
                .iter()
                .any(|(from, to, cause)| *from == LinkState::Connected
                    && *to == LinkState::Disconnected
                    && *cause == TransitionCause::HeartbeatTimeout),
            "expected a heartbeat-timeout teardown, got {transitions:?}"
        );
    }

    #[test]
    fn backoff_doubles_and_resets() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(300));
        assert_eq!(backoff.delay(), Duration::from_secs(1));
        assert_eq!(backoff.delay(), Duration::from_secs(2));
        assert_eq!(backoff.delay(), Duration::from_secs(4));
        backoff.reset();
        assert_eq!(backoff.delay(), Duration::from_secs(1));
    }

    #[test]
    fn backoff_survives_an_absurd_ceiling() {
        // Doubling toward a near-u64::MAX ceiling must saturate, not panic.
        let max = Duration::from_secs(u64::MAX);
        let mut backoff = Backoff::new(max, max);
        assert_eq!(backoff.delay(), max);
        assert_eq!(backoff.delay(), max);
    }
}
