// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vigil - monitoring client for the alerting platform.
//!
//! This is the binary entry point for the Vigil client daemon.

use clap::{Parser, Subcommand};

mod check;
mod serve;

/// Vigil - monitoring client for the alerting platform.
#[derive(Parser, Debug)]
#[command(name = "vigil", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the client daemon: connect, store, alarm, retain.
    Serve,
    /// Run a single update check and print the result.
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match vigil_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            vigil_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Check) => check::run_check(&config).await,
        None => {
            println!("vigil: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
