// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Marketplace daemon startup and wiring.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use bazaar_marketplace_core::application::lifecycle::LifecycleController;
use bazaar_marketplace_core::domain::auth::{AuthGate, Identity};
use bazaar_marketplace_core::domain::ledger::EarningsLedger;
use bazaar_marketplace_core::domain::project::UserId;
use bazaar_marketplace_core::domain::repository::ProjectRepository;
use bazaar_marketplace_core::infrastructure::auth::{HttpAuthGate, StaticAuthGate};
use bazaar_marketplace_core::infrastructure::db::Database;
use bazaar_marketplace_core::infrastructure::earnings::{
    HttpEarningsLedger, InMemoryEarningsLedger,
};
use bazaar_marketplace_core::infrastructure::repositories::postgres_project::PostgresProjectRepository;
use bazaar_marketplace_core::infrastructure::repositories::InMemoryProjectRepository;
use bazaar_marketplace_core::infrastructure::rooms::RoomBroadcaster;
use bazaar_marketplace_core::presentation::api;

#[derive(Args)]
pub struct ServeArgs {
    /// Bind address for the HTTP API
    #[arg(long, env = "BAZAAR_BIND", default_value = "127.0.0.1:8000")]
    pub bind: String,

    /// Postgres connection string; omit to run on the in-memory store
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Postgres connection pool size
    #[arg(long, env = "BAZAAR_DB_MAX_CONNECTIONS", default_value = "5")]
    pub db_max_connections: u32,

    /// External auth service base URL; omit to issue static dev credentials
    #[arg(long, env = "BAZAAR_AUTH_URL")]
    pub auth_url: Option<String>,

    /// External earnings service base URL; omit to record credits in memory
    #[arg(long, env = "BAZAAR_LEDGER_URL")]
    pub ledger_url: Option<String>,

    /// Prometheus scrape endpoint port; omit to disable the exporter
    #[arg(long, env = "BAZAAR_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Per-project room buffer capacity (events retained per subscriber)
    #[arg(long, env = "BAZAAR_ROOM_CAPACITY", default_value = "256")]
    pub room_capacity: usize,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    info!("BAZAAR marketplace daemon starting");

    if let Some(port) = args.metrics_port {
        PrometheusBuilder::new()
            .with_http_listener(([127, 0, 0, 1], port))
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(port, "Prometheus exporter listening");
    }

    let store: Arc<dyn ProjectRepository> = match &args.database_url {
        Some(url) => {
            let db = Database::with_max_connections(url, args.db_max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            let repo = PostgresProjectRepository::new(db.get_pool().clone());
            repo.ensure_schema()
                .await
                .context("Failed to apply projects schema")?;
            info!("Using Postgres project store");
            Arc::new(repo)
        }
        None => {
            warn!("DATABASE_URL not set, projects are held in memory and lost on exit");
            Arc::new(InMemoryProjectRepository::new())
        }
    };

    let auth: Arc<dyn AuthGate> = match &args.auth_url {
        Some(url) => {
            info!(url, "Resolving credentials against external auth service");
            Arc::new(HttpAuthGate::new(url.clone()))
        }
        None => {
            let gate = StaticAuthGate::new();
            let client = Identity::client(UserId::new());
            let freelancer = Identity::freelancer(UserId::new());
            gate.issue("dev-client", client);
            gate.issue("dev-freelancer", freelancer);
            info!(
                client_id = %client.user_id,
                freelancer_id = %freelancer.user_id,
                "Issued static dev credentials: dev-client, dev-freelancer"
            );
            Arc::new(gate)
        }
    };

    let ledger: Arc<dyn EarningsLedger> = match &args.ledger_url {
        Some(url) => {
            info!(url, "Crediting earnings against external ledger service");
            Arc::new(HttpEarningsLedger::new(url.clone()))
        }
        None => Arc::new(InMemoryEarningsLedger::new()),
    };

    let rooms = RoomBroadcaster::new(args.room_capacity);
    let lifecycle = Arc::new(LifecycleController::new(store, rooms, ledger));
    let app = api::app(lifecycle, auth);

    let listener = TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", args.bind))?;
    info!("Daemon listening on {}", args.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Daemon shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
