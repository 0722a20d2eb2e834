// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vigil - a malware-scanning queue worker for skylinks.
//!
//! This is the binary entry point for the Vigil service.

use clap::{Parser, Subcommand};

mod serve;

/// Vigil - a malware-scanning queue worker for skylinks.
#[derive(Parser, Debug)]
#[command(name = "vigil", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the scanning service: HTTP ingress plus background workers.
    Serve,
    /// Load and validate the configuration, then exit.
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            let config = match vigil_config::load_config() {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("error: failed to load configuration: {e}");
                    std::process::exit(1);
                }
            };
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Commands::CheckConfig => {
            let result = vigil_config::load_config()
                .map_err(|e| vigil_core::VigilError::Config(e.to_string()))
                .and_then(|config| config.validate());
            match result {
                Ok(()) => println!("configuration ok"),
                Err(e) => {
                    eprintln!("error: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
