// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # BAZAAR Marketplace CLI
//!
//! The `bazaar` binary runs the marketplace daemon and issues operations
//! against it.
//!
//! ## Commands
//!
//! - `bazaar serve` - Run the marketplace daemon (HTTP API + SSE rooms)
//! - `bazaar project create|list|show|cancel|delete|status` - Project operations
//! - `bazaar bid submit|accept|reject|counter` - Bid operations
//! - `bazaar watch <project-id>` - Stream a project's room events

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod serve;

use commands::{BidCommand, ProjectCommand};

/// BAZAAR marketplace - project/bid lifecycle engine
#[derive(Parser)]
#[command(name = "bazaar")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Daemon base URL for client commands
    #[arg(
        long,
        global = true,
        env = "BAZAAR_SERVER_URL",
        default_value = "http://127.0.0.1:8000"
    )]
    server_url: String,

    /// Bearer credential resolved by the daemon's auth gate
    #[arg(long, global = true, env = "BAZAAR_CREDENTIAL")]
    credential: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "BAZAAR_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the marketplace daemon
    #[command(name = "serve")]
    Serve(serve::ServeArgs),

    /// Project operations
    #[command(name = "project")]
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },

    /// Bid operations
    #[command(name = "bid")]
    Bid {
        #[command(subcommand)]
        command: BidCommand,
    },

    /// Stream a project's room events until interrupted
    #[command(name = "watch")]
    Watch {
        /// Project id
        project_id: uuid::Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone())),
        )
        .init();

    let mut client = bazaar_marketplace_sdk::MarketplaceClient::new(cli.server_url);
    if let Some(credential) = cli.credential {
        client = client.with_credential(credential);
    }

    match cli.command {
        Commands::Serve(args) => serve::run(args).await,
        Commands::Project { command } => commands::project::run(command, client).await,
        Commands::Bid { command } => commands::bid::run(command, client).await,
        Commands::Watch { project_id } => commands::watch(project_id, client).await,
    }
}
