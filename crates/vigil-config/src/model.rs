// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Vigil monitoring client.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages. The loaded
//! [`VigilConfig`] is the process-wide client context: constructed once at
//! startup, handed to every component by reference, never mutated.

use secrecy::SecretString;
use serde::{Deserialize, Serialize, Serializer};

/// Top-level Vigil configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to values
/// that pass validation (a default config cannot connect anywhere, but it
/// starts).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VigilConfig {
    /// Log destination and verbosity.
    #[serde(default)]
    pub log: LogConfig,

    /// Alerting server endpoint and trust anchor.
    #[serde(default)]
    pub server: ServerConfig,

    /// Client certificate presentation.
    #[serde(default)]
    pub client: ClientCertConfig,

    /// Username/password credentials for the alerting server.
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Link supervision behavior (persistence, heartbeat, backoff).
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// SMTP notification settings.
    #[serde(default)]
    pub smtp: SmtpConfig,

    /// Periodic update check settings.
    #[serde(default)]
    pub update: UpdateConfig,

    /// Backing store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Local inter-process socket server (external UI integration).
    #[serde(default)]
    pub local_server: LocalServerConfig,

    /// Retention lifespans for the two record classes.
    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Log destination and verbosity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Path of the log file. `None` logs to stderr.
    #[serde(default)]
    pub file: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Alerting server endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Hostname of the alerting server.
    #[serde(default)]
    pub host: String,

    /// TLS port of the alerting server.
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// PEM file holding the CA that signed the server certificate.
    /// `None` falls back to the webpki root store.
    #[serde(default)]
    pub ca_file: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_server_port(),
            ca_file: None,
        }
    }
}

fn default_server_port() -> u16 {
    44556
}

/// Client certificate configuration.
///
/// When `certificate_required` is set the server demands mutual TLS;
/// a missing or rejected client certificate is an authentication failure,
/// not a transient connection error.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientCertConfig {
    /// Whether the server requires a client certificate.
    #[serde(default)]
    pub certificate_required: bool,

    /// PEM file holding the client certificate chain.
    #[serde(default)]
    pub cert_file: Option<String>,

    /// PEM file holding the client private key.
    #[serde(default)]
    pub key_file: Option<String>,
}

/// Username/password credentials.
///
/// The password is an opaque secret handle: it never appears in `Debug`
/// output, and serialization redacts it (the loaded value only flows into
/// the authentication exchange).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub username: String,

    #[serde(default = "default_password", serialize_with = "redact_secret")]
    pub password: SecretString,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: default_password(),
        }
    }
}

fn default_password() -> SecretString {
    SecretString::from(String::new())
}

fn redact_secret<S: Serializer>(_secret: &SecretString, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str("")
}

/// Link supervision configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Whether this client is persistent: a persistent client treats
    /// disconnection from the server as a failure condition to alarm on.
    #[serde(default)]
    pub persistent: bool,

    /// Seconds between heartbeat pings while connected.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Seconds without any server traffic before the link is declared dead.
    #[serde(default = "default_heartbeat_timeout_secs")]
    pub heartbeat_timeout_secs: u64,

    /// Seconds allowed for the TCP + TLS handshake and auth exchange.
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,

    /// Fixed cooldown after an authentication rejection.
    #[serde(default = "default_auth_cooldown_secs")]
    pub auth_cooldown_secs: u64,

    /// Reconnect backoff floor.
    #[serde(default = "default_backoff_min_secs")]
    pub backoff_min_secs: u64,

    /// Reconnect backoff ceiling.
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            persistent: false,
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            heartbeat_timeout_secs: default_heartbeat_timeout_secs(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
            auth_cooldown_secs: default_auth_cooldown_secs(),
            backoff_min_secs: default_backoff_min_secs(),
            backoff_max_secs: default_backoff_max_secs(),
        }
    }
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

fn default_heartbeat_timeout_secs() -> u64 {
    90
}

fn default_handshake_timeout_secs() -> u64 {
    20
}

fn default_auth_cooldown_secs() -> u64 {
    60
}

fn default_backoff_min_secs() -> u64 {
    1
}

fn default_backoff_max_secs() -> u64 {
    300
}

/// SMTP notification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmtpConfig {
    /// Whether alarm notifications are sent at all.
    #[serde(default)]
    pub activated: bool,

    /// Envelope sender address.
    #[serde(default)]
    pub from_addr: String,

    /// Recipient address.
    #[serde(default)]
    pub to_addr: String,

    /// SMTP relay host. The reference deployment is a local relay.
    #[serde(default = "default_smtp_host")]
    pub host: String,

    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub port: u16,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            activated: false,
            from_addr: String::new(),
            to_addr: String::new(),
            host: default_smtp_host(),
            port: default_smtp_port(),
        }
    }
}

fn default_smtp_host() -> String {
    "127.0.0.1".to_string()
}

fn default_smtp_port() -> u16 {
    25
}

/// Periodic update check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateConfig {
    /// Whether the update scheduler performs checks. When false the
    /// scheduler is inert.
    #[serde(default)]
    pub activated: bool,

    /// Seconds between update checks.
    #[serde(default = "default_update_interval_secs")]
    pub interval_secs: u64,

    /// Hostname serving the version manifest.
    #[serde(default)]
    pub host: String,

    /// HTTPS port of the manifest host.
    #[serde(default = "default_update_port")]
    pub port: u16,

    /// Path of the version manifest on the host.
    #[serde(default = "default_update_location")]
    pub location: String,

    /// PEM file holding the CA to validate the manifest host against.
    /// `None` falls back to the webpki root store.
    #[serde(default)]
    pub ca_file: Option<String>,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            activated: false,
            interval_secs: default_update_interval_secs(),
            host: String::new(),
            port: default_update_port(),
            location: default_update_location(),
            ca_file: None,
        }
    }
}

fn default_update_interval_secs() -> u64 {
    86400
}

fn default_update_port() -> u16 {
    443
}

fn default_update_location() -> String {
    "/manifest.json".to_string()
}

/// Backing store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("vigil").join("vigil.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("vigil.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Local inter-process socket server configuration.
///
/// The wire protocol is owned by the external UI integration; only the
/// activation flag and socket path matter to the core.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LocalServerConfig {
    #[serde(default)]
    pub activated: bool,

    /// Filesystem path of the unix domain socket.
    #[serde(default = "default_unix_socket_file")]
    pub unix_socket_file: String,
}

impl Default for LocalServerConfig {
    fn default() -> Self {
        Self {
            activated: false,
            unix_socket_file: default_unix_socket_file(),
        }
    }
}

fn default_unix_socket_file() -> String {
    "/run/vigil/local.sock".to_string()
}

/// Retention lifespans, in days, for the two record classes.
///
/// `0` means the class is never retained: writers delete (refuse to
/// persist) at insert time rather than waiting for a purge cycle.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    #[serde(default = "default_lifespan_days")]
    pub sensor_alert_lifespan_days: u32,

    #[serde(default = "default_lifespan_days")]
    pub events_lifespan_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            sensor_alert_lifespan_days: default_lifespan_days(),
            events_lifespan_days: default_lifespan_days(),
        }
    }
}

fn default_lifespan_days() -> u32 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn default_config_has_sane_values() {
        let config = VigilConfig::default();
        assert_eq!(config.log.level, "info");
        assert_eq!(config.server.port, 44556);
        assert!(!config.connection.persistent);
        assert_eq!(config.smtp.host, "127.0.0.1");
        assert_eq!(config.smtp.port, 25);
        assert_eq!(config.update.interval_secs, 86400);
        assert_eq!(config.retention.sensor_alert_lifespan_days, 100);
        assert_eq!(config.retention.events_lifespan_days, 100);
    }

    #[test]
    fn toml_sections_deserialize() {
        let toml_str = r#"
[server]
host = "alerts.example.org"
port = 44557
ca_file = "/etc/vigil/server.crt"

[client]
certificate_required = true
cert_file = "/etc/vigil/client.crt"
key_file = "/etc/vigil/client.key"

[credentials]
username = "manager-1"
password = "hunter2"

[connection]
persistent = true

[retention]
sensor_alert_lifespan_days = 1
events_lifespan_days = 100
"#;
        let config: VigilConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.host, "alerts.example.org");
        assert_eq!(config.server.port, 44557);
        assert!(config.client.certificate_required);
        assert_eq!(config.credentials.username, "manager-1");
        assert_eq!(config.credentials.password.expose_secret(), "hunter2");
        assert!(config.connection.persistent);
        assert_eq!(config.retention.sensor_alert_lifespan_days, 1);
        assert_eq!(config.retention.events_lifespan_days, 100);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml_str = r#"
[connection]
persistant = true
"#;
        assert!(toml::from_str::<VigilConfig>(toml_str).is_err());
    }

    #[test]
    fn password_never_leaks_through_debug_or_serialize() {
        let toml_str = r#"
[credentials]
username = "manager-1"
password = "hunter2"
"#;
        let config: VigilConfig = toml::from_str(toml_str).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));

        let serialized = toml::to_string(&config).unwrap();
        assert!(!serialized.contains("hunter2"));
    }

    #[test]
    fn booleans_are_native_not_strings() {
        // "True"/"False" string flags are a config-format concern; by the
        // time a VigilConfig exists they must already be native bools.
        let toml_str = r#"
[connection]
persistent = "True"
"#;
        assert!(toml::from_str::<VigilConfig>(toml_str).is_err());
    }
}
