//! Boxoffice Server
//!
//! Ticket ordering over HTTP: events with limited ticket classes, buyer
//! balances, and a journal of every purchase attempt.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use boxoffice_core::catalog::{
    EventCatalog, memory::InMemoryEventCatalog, postgres::PgEventCatalog,
};
use boxoffice_core::config::ConfigStore;
use boxoffice_core::engine::OrderEngine;
use boxoffice_core::events::compensation_channel;
use boxoffice_core::framework::DatabaseProcessor;
use boxoffice_core::journal::{
    OrderJournal, memory::InMemoryOrderJournal, postgres::PgOrderJournal,
};
use boxoffice_core::ledger::{
    AccountLedger, memory::InMemoryAccountLedger, postgres::PgAccountLedger,
};
use boxoffice_core::processors::ReconciliationWorker;
use clap::Parser;
use config::file::StorageBackend;
use config::{ConfigLoader, LoadedConfig, Seed, get_database_url};
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Boxoffice - ticket ordering server
#[derive(Parser, Debug)]
#[command(name = "boxoffice-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./boxoffice-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup (postgres backend only)
    #[arg(long, default_value = "false")]
    migrate: bool,
}

/// The three stores behind the engine, plus the pool when they share one.
struct Backends {
    catalog: Arc<dyn EventCatalog>,
    ledger: Arc<dyn AccountLedger>,
    journal: Arc<dyn OrderJournal>,
    pool: Option<PgPool>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting boxoffice-server v{}", env!("CARGO_PKG_VERSION"));

    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let LoadedConfig {
        listen,
        storage,
        settings,
        seed,
    } = loaded_config;

    let backends = match storage.backend {
        StorageBackend::Memory => memory_backends(seed).await,
        StorageBackend::Postgres => {
            postgres_backends(storage.max_connections, args.migrate, seed).await?
        }
    };

    let settings = ConfigStore::new(settings);
    let (compensation_tx, compensation_rx) = compensation_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = ReconciliationWorker::new(
        backends.ledger.clone(),
        settings.clone(),
        compensation_rx,
        shutdown_rx,
    );
    let worker_handle = tokio::spawn(worker.run());

    let engine = OrderEngine::new(
        backends.catalog,
        backends.ledger,
        backends.journal,
        settings.clone(),
    )
    .with_reconciliation(compensation_tx);
    let state = AppState::new(engine, storage.backend);

    // Spawn config reload handler (listens for SIGHUP)
    let reload_notify = spawn_config_reload_handler(settings, config_loader);

    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", listen);
    let result = run_server(router, listen).await;

    // Stop background tasks
    reload_notify.notify_one();
    let _ = shutdown_tx.send(true);
    if let Err(e) = worker_handle.await {
        tracing::error!("ReconciliationWorker task failed: {}", e);
    }

    if let Some(pool) = backends.pool {
        tracing::info!("Closing database connections...");
        pool.close().await;
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

async fn memory_backends(seed: Seed) -> Backends {
    let catalog = InMemoryEventCatalog::new();
    let ledger = InMemoryAccountLedger::new();

    for event in seed.events {
        let event = catalog.insert(event).await;
        tracing::info!(event_id = %event.id, name = %event.name, "Seeded event");
    }
    for account in seed.accounts {
        let account = ledger.insert(account).await;
        tracing::info!(user_id = %account.id, name = %account.name, "Seeded account");
    }

    Backends {
        catalog: Arc::new(catalog),
        ledger: Arc::new(ledger),
        journal: Arc::new(InMemoryOrderJournal::new()),
        pool: None,
    }
}

async fn postgres_backends(
    max_connections: u32,
    migrate: bool,
    seed: Seed,
) -> anyhow::Result<Backends> {
    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    if migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    if !seed.events.is_empty() || !seed.accounts.is_empty() {
        tracing::warn!("Seed data is only loaded by the memory backend; ignoring it");
    }

    let db = DatabaseProcessor::new(pool.clone());
    Ok(Backends {
        catalog: Arc::new(PgEventCatalog::new(db.clone())),
        ledger: Arc::new(PgAccountLedger::new(db.clone())),
        journal: Arc::new(PgOrderJournal::new(db)),
        pool: Some(pool),
    })
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
