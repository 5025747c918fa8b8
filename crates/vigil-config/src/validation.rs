// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates the semantic constraints that cannot be expressed via serde
//! attributes. These are the only fatal conditions in the system: a config
//! that fails here makes startup impossible (unreadable certificate files,
//! contradictory flags); everything past startup is recoverable.

use std::path::Path;

use crate::diagnostic::ConfigError;
use crate::model::VigilConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &VigilConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Log level must be one the subscriber understands.
    let level = config.log.level.to_ascii_lowercase();
    if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(validation(format!(
            "log.level `{}` is not one of trace, debug, info, warn, error",
            config.log.level
        )));
    }

    if config.server.port == 0 {
        errors.push(validation("server.port must not be 0".to_string()));
    }

    // Referenced PEM files must be readable at startup.
    check_readable(&mut errors, "server.ca_file", config.server.ca_file.as_deref());

    if config.client.certificate_required {
        match (&config.client.cert_file, &config.client.key_file) {
            (Some(cert), Some(key)) => {
                check_readable(&mut errors, "client.cert_file", Some(cert));
                check_readable(&mut errors, "client.key_file", Some(key));
            }
            _ => errors.push(validation(
                "client.certificate_required is set but client.cert_file or \
                 client.key_file is missing"
                    .to_string(),
            )),
        }
    }

    if config.smtp.activated {
        for (key, addr) in [
            ("smtp.from_addr", &config.smtp.from_addr),
            ("smtp.to_addr", &config.smtp.to_addr),
        ] {
            if !addr.contains('@') {
                errors.push(validation(format!(
                    "{key} `{addr}` is not a valid email address"
                )));
            }
        }
        if config.smtp.host.trim().is_empty() {
            errors.push(validation("smtp.host must not be empty".to_string()));
        }
    }

    if config.update.activated {
        if config.update.host.trim().is_empty() {
            errors.push(validation(
                "update.activated is set but update.host is empty".to_string(),
            ));
        }
        if config.update.interval_secs == 0 {
            errors.push(validation(
                "update.interval_secs must be at least 1".to_string(),
            ));
        }
        if !config.update.location.starts_with('/') {
            errors.push(validation(format!(
                "update.location `{}` must be an absolute path on the update host",
                config.update.location
            )));
        }
        check_readable(&mut errors, "update.ca_file", config.update.ca_file.as_deref());
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(validation(
            "storage.database_path must not be empty".to_string(),
        ));
    }

    if config.local_server.activated && config.local_server.unix_socket_file.trim().is_empty() {
        errors.push(validation(
            "local_server.activated is set but local_server.unix_socket_file is empty"
                .to_string(),
        ));
    }

    if config.connection.backoff_min_secs > config.connection.backoff_max_secs {
        errors.push(validation(format!(
            "connection.backoff_min_secs ({}) exceeds connection.backoff_max_secs ({})",
            config.connection.backoff_min_secs, config.connection.backoff_max_secs
        )));
    }

    if config.connection.heartbeat_timeout_secs <= config.connection.heartbeat_interval_secs {
        errors.push(validation(format!(
            "connection.heartbeat_timeout_secs ({}) must exceed \
             connection.heartbeat_interval_secs ({})",
            config.connection.heartbeat_timeout_secs, config.connection.heartbeat_interval_secs
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validation(message: String) -> ConfigError {
    ConfigError::Validation { message }
}

/// Push an error if a configured file path is set but not readable.
fn check_readable(errors: &mut Vec<ConfigError>, key: &str, path: Option<&str>) {
    let Some(path) = path else { return };
    if path.trim().is_empty() {
        errors.push(validation(format!("{key} must not be empty when set")));
        return;
    }
    if !Path::new(path).is_file() {
        errors.push(validation(format!(
            "{key} `{path}` does not exist or is not a regular file"
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_validates() {
        let config = VigilConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn bad_log_level_fails_validation() {
        let mut config = VigilConfig::default();
        config.log.level = "verbose".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("log.level"))));
    }

    #[test]
    fn missing_ca_file_fails_validation() {
        let mut config = VigilConfig::default();
        config.server.ca_file = Some("/nonexistent/ca.pem".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("server.ca_file"))));
    }

    #[test]
    fn readable_ca_file_passes_validation() {
        let dir = tempfile::tempdir().unwrap();
        let ca_path = dir.path().join("ca.pem");
        let mut f = std::fs::File::create(&ca_path).unwrap();
        writeln!(f, "-----BEGIN CERTIFICATE-----").unwrap();

        let mut config = VigilConfig::default();
        config.server.ca_file = Some(ca_path.to_string_lossy().into_owned());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn cert_required_without_files_fails_validation() {
        let mut config = VigilConfig::default();
        config.client.certificate_required = true;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("certificate_required"))));
    }

    #[test]
    fn activated_smtp_requires_addresses() {
        let mut config = VigilConfig::default();
        config.smtp.activated = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, ConfigError::Validation { message } if message.contains("addr")))
                .count(),
            2
        );
    }

    #[test]
    fn activated_update_requires_host_and_interval() {
        let mut config = VigilConfig::default();
        config.update.activated = true;
        config.update.interval_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("update.host"))));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("interval_secs"))));
    }

    #[test]
    fn inverted_backoff_bounds_fail_validation() {
        let mut config = VigilConfig::default();
        config.connection.backoff_min_secs = 600;
        config.connection.backoff_max_secs = 300;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("backoff_min_secs"))));
    }

    #[test]
    fn heartbeat_timeout_must_exceed_interval() {
        let mut config = VigilConfig::default();
        config.connection.heartbeat_interval_secs = 90;
        config.connection.heartbeat_timeout_secs = 90;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("heartbeat_timeout_secs"))));
    }
}
