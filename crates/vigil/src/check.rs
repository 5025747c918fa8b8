// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `vigil check` command implementation.
//!
//! Runs one update check against the configured manifest endpoint and
//! prints the verdict. Useful for verifying the endpoint and CA setup
//! before enabling the periodic scheduler.

use vigil_config::model::VigilConfig;
use vigil_core::VigilError;
use vigil_update::{UpdateChecker, UpdateStatus};

/// Runs the `vigil check` command.
pub async fn run_check(config: &VigilConfig) -> Result<(), VigilError> {
    if !config.update.activated {
        println!("update checks are deactivated ([update] activated = false)");
        return Ok(());
    }

    let checker = UpdateChecker::new(&config.update, env!("CARGO_PKG_VERSION"))?;
    match checker.check().await? {
        UpdateStatus::UpToDate => {
            println!("up to date (running {})", checker.current_version());
        }
        UpdateStatus::Available { latest } => {
            println!(
                "update available: {} (running {})",
                latest,
                checker.current_version()
            );
        }
        UpdateStatus::AheadOfManifest { latest } => {
            println!(
                "running {} which is ahead of the manifest ({})",
                checker.current_version(),
                latest
            );
        }
    }
    Ok(())
}
