//! # tribune-server
//!
//! REST front end for the Tribune message pipeline.
//!
//! This binary provides:
//! - **Template catalog** CRUD, search, and `{variable}` rendering
//! - **Moderation queue** with approve / reject / edit resolutions and
//!   bounded-parallel bulk actions
//! - **Delivery ledger** with the forward-only status lifecycle and
//!   reaction toggles
//! - **Typing presence** per conversation, reaped on a TTL

mod api;
mod config;
mod dto;
mod error;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use tribune_core::{
    BulkCoordinator, DeliveryLedger, PresenceTracker, TemplateCatalog, ValidationWorkflow,
};
use tribune_store::{AuditStore, LedgerStore, MemoryStore, PendingStore, SqliteStore, TemplateStore};

use crate::api::AppState;
use crate::config::ServerConfig;

/// Trait-object handles onto one storage backend.
struct Stores {
    templates: Arc<dyn TemplateStore>,
    pending: Arc<dyn PendingStore>,
    ledger: Arc<dyn LedgerStore>,
    audit: Arc<dyn AuditStore>,
}

fn open_stores(config: &ServerConfig) -> anyhow::Result<Stores> {
    if config.in_memory() {
        let store = Arc::new(MemoryStore::new());
        info!("Using in-memory storage backend");
        Ok(Stores {
            templates: store.clone(),
            pending: store.clone(),
            ledger: store.clone(),
            audit: store,
        })
    } else {
        let store = Arc::new(match &config.database_path {
            Some(path) => SqliteStore::open_at(path)?,
            None => SqliteStore::new()?,
        });
        Ok(Stores {
            templates: store.clone(),
            pending: store.clone(),
            ledger: store.clone(),
            audit: store,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tribune_server=debug")),
        )
        .init();

    info!("Starting Tribune server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let stores = open_stores(&config)?;

    let catalog = Arc::new(TemplateCatalog::new(stores.templates));
    let workflow = Arc::new(ValidationWorkflow::new(
        stores.pending,
        stores.ledger.clone(),
        stores.audit,
        catalog.clone(),
    ));
    let bulk = Arc::new(BulkCoordinator::new(
        workflow.clone(),
        config.bulk_concurrency,
    ));
    let ledger = Arc::new(DeliveryLedger::new(stores.ledger));
    let presence = Arc::new(PresenceTracker::new(std::time::Duration::from_secs(
        config.typing_ttl_secs,
    )));

    let app_state = AppState {
        catalog: catalog.clone(),
        workflow: workflow.clone(),
        bulk,
        ledger: ledger.clone(),
        presence: presence.clone(),
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic reaping: stale typing signals and idle per-entity locks.
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            presence.purge_stale().await;
            catalog.purge_idle_locks().await;
            workflow.purge_idle_locks().await;
            ledger.purge_idle_locks().await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    // tokio::select! ensures that if either the HTTP server or a shutdown
    // signal arrives, we exit cleanly.
    let http_addr = config.http_addr;
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
