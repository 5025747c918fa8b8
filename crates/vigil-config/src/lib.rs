// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Vigil monitoring client.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, environment variable
//! overrides, and Elm-style diagnostic error rendering with typo
//! suggestions. The loaded [`VigilConfig`] is the immutable client context
//! the rest of the workspace consumes.
//!
//! # Usage
//!
//! ```no_run
//! use vigil_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("server: {}:{}", config.server.host, config.server.port);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::VigilConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// This is the high-level entry point that:
/// 1. Loads config from TOML files + env vars via Figment
/// 2. On success: runs post-deserialization validation
/// 3. On Figment error: converts to rich miette diagnostics with typo suggestions
///
/// Returns either a valid `VigilConfig` or a list of diagnostic errors.
pub fn load_and_validate() -> Result<VigilConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            // Read TOML source files for error source span information.
            let toml_sources = collect_toml_sources();
            Err(diagnostic::figment_to_config_errors(err, &toml_sources))
        }
    }
}

/// Load configuration from a specific TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<VigilConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Collect TOML source file contents for error span resolution.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut sources = Vec::new();

    // Local config
    if let Ok(content) = std::fs::read_to_string("vigil.toml") {
        let path = std::env::current_dir()
            .map(|d| d.join("vigil.toml").display().to_string())
            .unwrap_or_else(|_| "vigil.toml".to_string());
        sources.push((path, content));
    }

    // XDG user config
    if let Some(config_dir) = dirs::config_dir() {
        let path = config_dir.join("vigil/vigil.toml");
        if let Ok(content) = std::fs::read_to_string(&path) {
            sources.push((path.display().to_string(), content));
        }
    }

    // System config
    let system_path = std::path::Path::new("/etc/vigil/vigil.toml");
    if let Ok(content) = std::fs::read_to_string(system_path) {
        sources.push((system_path.display().to_string(), content));
    }

    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_and_validate_str_accepts_good_config() {
        let config = load_and_validate_str(
            r#"
[server]
host = "alerts.example.org"

[connection]
persistent = true
"#,
        )
        .unwrap();
        assert!(config.connection.persistent);
    }

    #[test]
    fn load_and_validate_str_reports_unknown_key() {
        let errors = load_and_validate_str(
            r#"
[connection]
persistant = true
"#,
        )
        .unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::UnknownKey { key, .. } if key == "persistant")));
    }

    #[test]
    fn load_and_validate_str_reports_semantic_errors() {
        let errors = load_and_validate_str(
            r#"
[smtp]
activated = true
"#,
        )
        .unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { .. })));
    }
}
