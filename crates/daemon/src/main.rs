//! CampusQ Daemon - Main Entry Point
//! Composition root: config, directory, registry, JSON-RPC server

mod config;
mod logging;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use campusq_api_rpc::RpcServer;
use campusq_core::application::{
    shutdown_channel, AdminService, LedgerEvent, QueueRegistry, ShutdownToken,
};
use campusq_core::port::id_provider::UuidProvider;
use campusq_core::port::time_provider::SystemTimeProvider;
use campusq_core::port::StaticDepartmentDirectory;

use crate::config::DaemonConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging
    let _log_guard = logging::init().context("Failed to initialize logging")?;

    info!("CampusQ daemon v{} starting...", VERSION);

    // 2. Load configuration
    let config = DaemonConfig::load().context("Failed to load configuration")?;
    info!(
        institution_name = %config.admin.institution_name,
        departments = config.departments.len(),
        "Configuration loaded"
    );

    // 3. Setup dependencies (DI wiring)
    let directory = Arc::new(
        StaticDepartmentDirectory::new(config.departments.clone())
            .context("Invalid department configuration")?,
    );
    let registry = Arc::new(QueueRegistry::new(
        directory,
        Arc::new(UuidProvider),
        Arc::new(SystemTimeProvider),
    ));
    let admin = Arc::new(AdminService::new(registry.clone(), config.admin.clone()));

    // 4. Start JSON-RPC server
    let rpc_server = RpcServer::new(config.rpc_server_config(), registry.clone(), admin);
    let (addr, rpc_handle) = rpc_server
        .start()
        .await
        .context("RPC server start failed")?;

    // 5. Ledger change audit trail
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let audit_handle = tokio::spawn(log_ledger_events(registry.subscribe(), shutdown_rx));

    info!(addr = %addr, "System ready. Waiting for students...");
    info!("Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Graceful shutdown
    shutdown_tx.shutdown();
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    if tokio::time::timeout(SHUTDOWN_GRACE, rpc_handle.stopped())
        .await
        .is_err()
    {
        warn!("RPC server did not stop within grace period");
    }
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, audit_handle).await;

    info!("Shutdown complete.");

    Ok(())
}

async fn log_ledger_events(
    mut events: broadcast::Receiver<LedgerEvent>,
    mut shutdown: ShutdownToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            event = events.recv() => match event {
                Ok(event) => debug!(
                    department_id = %event.department_id,
                    kind = ?event.kind,
                    entry_id = ?event.entry_id,
                    at = event.at,
                    "Ledger event"
                ),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed = missed, "Audit trail lagged behind ledger events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}
