// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! smsgate - multi-tenant SMS dispatch service.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod app;
mod commands;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use smsgate_config::SmsgateConfig;

use crate::commands::NewClient;

/// smsgate - multi-tenant SMS dispatch service.
#[derive(Parser, Debug)]
#[command(name = "smsgate", version, about, long_about = None)]
struct Cli {
    /// Explicit config file instead of the standard search path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API.
    Serve,
    /// Run one campaign dispatch iteration and print the JSON summary.
    Dispatch,
    /// Manage tenant accounts.
    Client {
        #[command(subcommand)]
        action: ClientCommand,
    },
    /// Manage API keys.
    ApiKey {
        #[command(subcommand)]
        action: ApiKeyCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ClientCommand {
    /// Create a tenant.
    Add {
        /// Client id used in every tenant-scoped table.
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "starter")]
        plan: String,
        /// Number of messages the tenant may send.
        #[arg(long, default_value_t = 0)]
        allowance: i64,
    },
}

#[derive(Subcommand, Debug)]
enum ApiKeyCommand {
    /// Issue a key for a client. The raw key is printed once.
    Create {
        client_id: String,
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => smsgate_config::load_and_validate_path(path),
        None => smsgate_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            smsgate_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.app.log_level);

    if let Err(e) = run(cli.command, config).await {
        tracing::error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: SmsgateConfig) -> Result<(), smsgate_core::SmsError> {
    match command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Dispatch => commands::run_dispatch(&config).await,
        Commands::Client {
            action:
                ClientCommand::Add {
                    id,
                    name,
                    plan,
                    allowance,
                },
        } => {
            commands::run_client_add(
                &config,
                NewClient {
                    id,
                    name,
                    plan,
                    allowance,
                },
            )
            .await
        }
        Commands::ApiKey {
            action: ApiKeyCommand::Create { client_id, name },
        } => commands::run_api_key_create(&config, &client_id, name).await,
    }
}

/// Logs go to stderr so `dispatch` output on stdout stays machine-readable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("smsgate={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_bootstrap_commands() {
        let cli = Cli::parse_from([
            "smsgate", "client", "add", "acme", "--name", "Acme", "--allowance", "500",
        ]);
        match cli.command {
            Commands::Client {
                action:
                    ClientCommand::Add {
                        id,
                        plan,
                        allowance,
                        ..
                    },
            } => {
                assert_eq!(id, "acme");
                assert_eq!(plan, "starter");
                assert_eq!(allowance, 500);
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::parse_from(["smsgate", "api-key", "create", "acme", "--config", "x.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(
            cli.command,
            Commands::ApiKey {
                action: ApiKeyCommand::Create { .. }
            }
        ));
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = smsgate_config::load_config_from_str("").expect("defaults should load");
        assert_eq!(config.app.name, "smsgate");
        assert_eq!(config.dispatch.batch_size, 100);
    }
}
