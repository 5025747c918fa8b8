// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./vigil.toml` > `~/.config/vigil/vigil.toml` > `/etc/vigil/vigil.toml`
//! with environment variable overrides via `VIGIL_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::VigilConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/vigil/vigil.toml` (system-wide)
/// 3. `~/.config/vigil/vigil.toml` (user XDG config)
/// 4. `./vigil.toml` (local directory)
/// 5. `VIGIL_*` environment variables
pub fn load_config() -> Result<VigilConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a specific TOML string only (no XDG lookup).
///
/// Used for testing and for loading an explicit config string.
pub fn load_config_from_str(toml_content: &str) -> Result<VigilConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VigilConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<VigilConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VigilConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(VigilConfig::default()))
        .merge(Toml::file("/etc/vigil/vigil.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("vigil/vigil.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("vigil.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// CRITICAL: Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `VIGIL_SMTP_FROM_ADDR` must
/// map to `smtp.from_addr`, not `smtp.from.addr`. The `local_server` prefix
/// must be mapped before `server` or it would be split mid-name.
fn env_provider() -> Env {
    Env::prefixed("VIGIL_").map(|key| {
        // `key` is the env var name with prefix stripped; figment hands it
        // over before lowercasing, so normalize case here for the matches.
        // Example: VIGIL_SERVER_CA_FILE -> "server_ca_file"
        let key_str = key.as_str().to_ascii_lowercase();
        let mapped = key_str
            .replacen("local_server_", "local_server.", 1)
            .replacen("log_", "log.", 1)
            .replacen("server_", "server.", 1)
            .replacen("client_", "client.", 1)
            .replacen("credentials_", "credentials.", 1)
            .replacen("connection_", "connection.", 1)
            .replacen("smtp_", "smtp.", 1)
            .replacen("update_", "update.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("retention_", "retention.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[server]
host = "alerts.example.org"

[connection]
persistent = true
"#,
        )
        .unwrap();
        assert_eq!(config.server.host, "alerts.example.org");
        assert!(config.connection.persistent);
        // Untouched sections keep their defaults.
        assert_eq!(config.smtp.port, 25);
    }

    #[test]
    fn empty_input_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.log.level, "info");
        assert_eq!(config.update.interval_secs, 86400);
    }

    #[test]
    fn env_vars_override_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "vigil.toml",
                r#"
[server]
host = "from-file.example.org"
port = 44556
"#,
            )?;
            jail.set_env("VIGIL_SERVER_HOST", "from-env.example.org");
            jail.set_env("VIGIL_SMTP_FROM_ADDR", "vigil@host.example");

            let config: VigilConfig = build_figment().extract()?;
            assert_eq!(config.server.host, "from-env.example.org");
            assert_eq!(config.server.port, 44556);
            // Underscored key names survive the section mapping.
            assert_eq!(config.smtp.from_addr, "vigil@host.example");
            Ok(())
        });
    }

    #[test]
    fn local_server_prefix_is_not_split_mid_name() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("VIGIL_LOCAL_SERVER_ACTIVATED", "true");
            jail.set_env("VIGIL_LOCAL_SERVER_UNIX_SOCKET_FILE", "/tmp/vigil.sock");

            let config: VigilConfig = build_figment().extract()?;
            assert!(config.local_server.activated);
            assert_eq!(config.local_server.unix_socket_file, "/tmp/vigil.sock");
            Ok(())
        });
    }
}
