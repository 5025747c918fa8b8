// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `vigil serve` command implementation.
//!
//! Wires the full client: SQLite store with retention, the TLS connection
//! supervisor, the alarm dispatcher with its SMTP delivery worker, and the
//! periodic update scheduler. Supports graceful shutdown via signal
//! handlers: cancel, let the supervisor close the session, flush the store.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use vigil_agent::{
    install_signal_handler, notification_worker, wait_for_teardown, AlarmDispatcher,
    ConnectionSupervisor, TlsTransport,
};
use vigil_config::model::VigilConfig;
use vigil_core::types::RecordClass;
use vigil_core::{EventStore, NotificationSink, VigilError};
use vigil_storage::{RetentionManager, SqliteStore};
use vigil_update::{UpdateChecker, UpdateScheduler};

/// How often the retention manager looks for aged records.
const RETENTION_CYCLE: Duration = Duration::from_secs(3600);

/// How long shutdown waits for the session to close cleanly.
const TEARDOWN_GRACE: Duration = Duration::from_secs(5);

/// Runs the `vigil serve` command.
pub async fn run_serve(config: VigilConfig) -> Result<(), VigilError> {
    init_tracing(&config.log);

    info!(version = env!("CARGO_PKG_VERSION"), "starting vigil serve");

    // Storage first; nothing else is worth starting without it.
    ensure_parent_dir(&config.storage.database_path)?;
    let store = Arc::new(SqliteStore::new(
        config.storage.clone(),
        &config.retention,
    ));
    store.initialize().await?;

    let retention = RetentionManager::new(
        store.clone(),
        vec![
            store.policy(RecordClass::SensorAlert),
            store.policy(RecordClass::Event),
        ],
        RETENTION_CYCLE,
    );

    // Notification sink and its delivery worker.
    let sink: Arc<dyn NotificationSink> = if config.smtp.activated {
        info!(host = %config.smtp.host, port = config.smtp.port, "smtp notifications enabled");
        Arc::new(vigil_notify::SmtpNotifier::new(&config.smtp)?)
    } else {
        debug!("smtp notifications deactivated");
        Arc::new(vigil_notify::NoopNotifier)
    };
    let (notify_tx, notify_rx) = tokio::sync::mpsc::channel(32);

    // Connection supervisor over the TLS transport.
    let transport = Arc::new(TlsTransport::new(
        &config.server,
        &config.client,
        &config.credentials,
        &config.connection,
    )?);
    let (supervisor, mut state_rx, transition_rx) =
        ConnectionSupervisor::new(transport, config.connection.clone());

    // Alarm dispatcher fed by transitions and update outcomes.
    let dispatcher = AlarmDispatcher::new(
        config.connection.persistent,
        config.smtp.activated,
        config.server.host.clone(),
        notify_tx,
    );
    let (update_tx, update_rx) = tokio::sync::mpsc::unbounded_channel();

    // Update scheduler; inert when deactivated.
    let checker = if config.update.activated {
        Some(UpdateChecker::new(
            &config.update,
            env!("CARGO_PKG_VERSION"),
        )?)
    } else {
        None
    };
    let scheduler = UpdateScheduler::new(
        checker,
        Duration::from_secs(config.update.interval_secs),
        update_tx,
    );

    if config.local_server.activated {
        info!(
            socket = %config.local_server.unix_socket_file,
            "local server socket path reserved"
        );
    }

    let cancel = install_signal_handler();

    let mut tasks = tokio::task::JoinSet::new();
    {
        let cancel = cancel.clone();
        tasks.spawn(async move { supervisor.run(cancel).await });
    }
    {
        let cancel = cancel.clone();
        tasks.spawn(dispatcher.run(transition_rx, update_rx, cancel));
    }
    tasks.spawn(notification_worker(notify_rx, sink));
    {
        let cancel = cancel.clone();
        tasks.spawn(async move { retention.run(cancel).await });
    }
    {
        let cancel = cancel.clone();
        tasks.spawn(async move { scheduler.run(cancel).await });
    }

    info!(
        server = %config.server.host,
        port = config.server.port,
        persistent = config.connection.persistent,
        "vigil client running"
    );

    cancel.cancelled().await;

    // Ordered teardown: session closes, workers drain, store flushes.
    wait_for_teardown(&mut state_rx, TEARDOWN_GRACE).await;
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "worker task ended abnormally");
        }
    }
    store.close().await?;

    info!("vigil serve shutdown complete");
    Ok(())
}

/// Create the database's parent directory if it does not exist yet.
fn ensure_parent_dir(database_path: &str) -> Result<(), VigilError> {
    if let Some(parent) = Path::new(database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                VigilError::Config(format!(
                    "cannot create data directory `{}`: {e}",
                    parent.display()
                ))
            })?;
        }
    }
    Ok(())
}

/// Initializes the tracing subscriber from the `[log]` section.
fn init_tracing(log: &vigil_config::model::LogConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vigil={},warn", log.level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false);

    match &log.file {
        Some(path) => match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.with_ansi(false).with_writer(Arc::new(file)).init();
            }
            Err(e) => {
                builder.with_writer(std::io::stderr).init();
                warn!(path = %path, error = %e, "cannot open log file, logging to stderr");
            }
        },
        None => builder.with_writer(std::io::stderr).init(),
    }
}
