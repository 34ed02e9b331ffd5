//! inkgate service entry point.
//!
//! Startup order: logging → config → metrics → chain client → stores →
//! background tasks → listeners. Snapshots are written again on the way out.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inkgate::admin::setup_admin_router;
use inkgate::blockchain::ChainClient;
use inkgate::config::loader::load_config;
use inkgate::config::watcher::ConfigWatcher;
use inkgate::config::GateConfig;
use inkgate::http::{build_router, build_state, AppState, GateServer};
use inkgate::lifecycle::Shutdown;
use inkgate::net::tls::load_tls_config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkgate=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("inkgate v{} starting", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = match &config_path {
        Some(path) => load_config(path)?,
        None => {
            tracing::warn!("No config file given, using defaults");
            GateConfig::default()
        }
    };
    let config = Arc::new(config);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        credits_enabled = config.credits.enabled,
        chain_id = config.blockchain.chain_id,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            inkgate::observability::metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let chain = if config.credits.enabled {
        Some(ChainClient::new(config.blockchain.clone()).await?)
    } else {
        None
    };

    let state = build_state(config.clone(), chain)?;

    let shutdown = Arc::new(Shutdown::new());
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
                shutdown.trigger();
            }
        });
    }

    spawn_background_tasks(&state, &shutdown);

    // Pricing hot reload; the watcher must stay alive for the process
    let _watcher = match &config_path {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let pricing = state.pricing.clone();
            tokio::spawn(async move {
                while let Some(new_config) = updates.recv().await {
                    tracing::info!("Applying reloaded pricing table");
                    pricing.store(Arc::new(new_config.pricing));
                }
            });
            Some(watcher.run()?)
        }
        None => None,
    };

    if config.admin.enabled {
        let admin_router = setup_admin_router(state.clone());
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let mut admin_shutdown = shutdown.subscribe();
        tracing::info!(address = %config.admin.bind_address, "Admin API listening");
        tokio::spawn(async move {
            let result = axum::serve(listener, admin_router.into_make_service())
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin server error");
            }
        });
    }

    match &config.listener.tls {
        Some(tls) => {
            let rustls =
                load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?;
            let addr: SocketAddr = config.listener.bind_address.parse()?;
            let app = build_router(state.clone())
                .into_make_service_with_connect_info::<SocketAddr>();
            tracing::info!(address = %addr, "HTTPS server starting");
            axum_server::bind_rustls(addr, rustls).serve(app).await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            let server = GateServer::new(config.clone(), state.clone());
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    persist_snapshots(&state);
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Spawn the expiry sweep, ledger reconciliation, and snapshot loops.
fn spawn_background_tasks(state: &AppState, shutdown: &Arc<Shutdown>) {
    {
        let nonces = state.nonces.clone();
        let sessions = state.sessions.clone();
        let mut shutdown = shutdown.subscribe();
        let interval = Duration::from_secs(state.config.storage.sweep_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = ticker.tick() => {
                        let purged = nonces.purge_expired() + sessions.purge_expired();
                        if purged > 0 {
                            tracing::debug!(purged = purged, "Swept expired nonces and sessions");
                        }
                    }
                }
            }
        });
    }

    {
        let ledger = state.ledger.clone();
        let mut shutdown = shutdown.subscribe();
        let interval = Duration::from_secs(state.config.storage.reconcile_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // interval fires immediately; skip the startup tick
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = ticker.tick() => {
                        let drifts = ledger.reconcile();
                        if drifts.is_empty() {
                            tracing::info!("Ledger reconciliation clean");
                        } else {
                            tracing::error!(
                                drifts = drifts.len(),
                                "Ledger reconciliation repaired drift"
                            );
                        }
                    }
                }
            }
        });
    }

    if state.config.storage.snapshot_dir.is_some() {
        let state = state.clone();
        let mut shutdown = shutdown.subscribe();
        let interval = Duration::from_secs(state.config.storage.snapshot_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = ticker.tick() => persist_snapshots(&state),
                }
            }
        });
    }
}

/// Write every store's snapshot, logging failures without aborting.
fn persist_snapshots(state: &AppState) {
    if state.config.storage.snapshot_dir.is_none() {
        return;
    }
    for (store, result) in [
        ("accounts", state.accounts.save_to_file()),
        ("ledger", state.ledger.save_to_file()),
        ("entitlements", state.entitlements.save_to_file()),
    ] {
        if let Err(e) = result {
            tracing::error!(store = store, error = %e, "Snapshot write failed");
        }
    }
}
