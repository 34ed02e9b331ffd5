//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Resolve bearer tokens into account contexts
//! - Bind server to listener with graceful shutdown

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::Address;
use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{header, Request},
    middleware,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::accounts::AccountStore;
use crate::auth::{AccountContext, NonceRegistry, SessionStore, WalletAuthenticator};
use crate::blockchain::ChainClient;
use crate::config::{GateConfig, PricingConfig};
use crate::credits::{PackageTable, PurchaseVerifier};
use crate::entitlements::{EntitlementStore, UnlockCoordinator};
use crate::http::error::ApiError;
use crate::http::handlers;
use crate::ledger::LedgerStore;
use crate::observability::metrics;
use crate::security::{rate_limit_middleware, RateLimiterState};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GateConfig>,
    pub accounts: Arc<AccountStore>,
    pub nonces: Arc<NonceRegistry>,
    pub sessions: Arc<SessionStore>,
    pub authenticator: Arc<WalletAuthenticator>,
    pub ledger: Arc<LedgerStore>,
    pub entitlements: Arc<EntitlementStore>,
    pub unlocks: Arc<UnlockCoordinator>,
    pub verifier: Option<Arc<PurchaseVerifier>>,
    pub chain: Option<ChainClient>,
    /// Hot-swapped on config reload.
    pub pricing: Arc<ArcSwap<PricingConfig>>,
    pub rate_limiter: Arc<RateLimiterState>,
}

/// Construct all stores and wire the subsystems together.
///
/// Snapshots are loaded when a snapshot directory is configured; the same
/// construction path serves production and tests.
pub fn build_state(
    config: Arc<GateConfig>,
    chain: Option<ChainClient>,
) -> std::io::Result<AppState> {
    let (accounts, ledger, entitlements) = match &config.storage.snapshot_dir {
        Some(dir) => {
            let dir = PathBuf::from(dir);
            std::fs::create_dir_all(&dir)?;
            (
                Arc::new(AccountStore::load_from_file(&dir.join("accounts.json"))?),
                Arc::new(LedgerStore::load_from_file(&dir.join("ledger.json"))?),
                Arc::new(EntitlementStore::load_from_file(
                    &dir.join("entitlements.json"),
                )?),
            )
        }
        None => (
            Arc::new(AccountStore::new(None)),
            Arc::new(LedgerStore::new(None)),
            Arc::new(EntitlementStore::new(None)),
        ),
    };

    let nonces = Arc::new(NonceRegistry::new(config.auth.nonce_ttl_secs));
    let sessions = Arc::new(SessionStore::new(config.auth.session_ttl_secs));
    let authenticator = Arc::new(WalletAuthenticator::new(
        config.auth.domain.clone(),
        nonces.clone(),
        accounts.clone(),
        sessions.clone(),
    ));
    let unlocks = Arc::new(UnlockCoordinator::new(ledger.clone(), entitlements.clone()));

    let verifier = if config.credits.enabled {
        match (&chain, config.credits.contract_address.parse::<Address>()) {
            (Some(client), Ok(contract)) => Some(Arc::new(PurchaseVerifier::new(
                client.clone(),
                ledger.clone(),
                contract,
                PackageTable::from_config(&config.credits.packages),
            ))),
            (None, _) => {
                tracing::warn!("Credits enabled but no chain client; crediting disabled");
                None
            }
            (_, Err(_)) => {
                tracing::warn!("Credits enabled but contract address invalid; crediting disabled");
                None
            }
        }
    } else {
        None
    };

    let pricing = Arc::new(ArcSwap::from_pointee(config.pricing.clone()));
    let rate_limiter = Arc::new(RateLimiterState::new(&config.rate_limit));

    Ok(AppState {
        config,
        accounts,
        nonces,
        sessions,
        authenticator,
        ledger,
        entitlements,
        unlocks,
        verifier,
        chain,
        pricing,
        rate_limiter,
    })
}

/// Build the public router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/nonce", post(handlers::request_nonce))
        .route("/auth/verify", post(handlers::verify_auth))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .with_state(state.clone());

    let session_routes = Router::new()
        .route("/credits/balance", get(handlers::get_balance))
        .route("/credits/verify", post(handlers::verify_purchase))
        .route("/content/{chapter_id}/unlock", post(handlers::unlock_chapter))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_auth_middleware,
        ))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(handlers::health))
        .with_state(state.clone())
        .merge(auth_routes)
        .merge(session_routes)
        .route_layer(middleware::from_fn(track_requests))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(
                    state.config.listener.max_body_size,
                ))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    state.config.timeouts.request_secs,
                ))),
        )
}

/// Resolve the bearer token into an [`AccountContext`] request extension.
pub async fn session_auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized("missing bearer token"))?;

    let token: Uuid = token
        .trim()
        .parse()
        .map_err(|_| ApiError::Unauthorized("invalid session token"))?;

    let session = state
        .sessions
        .get(&token)
        .ok_or(ApiError::Unauthorized("session expired or unknown"))?;

    request.extensions_mut().insert(AccountContext::from(&session));
    Ok(next.run(request).await)
}

/// Per-route request counter and latency histogram.
async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    metrics::record_request(&method, &route, response.status().as_u16(), start);
    response
}

/// HTTP server for the unlock gate.
pub struct GateServer {
    router: Router,
    config: Arc<GateConfig>,
}

impl GateServer {
    /// Create a new server over prepared application state.
    pub fn new(config: Arc<GateConfig>, state: AppState) -> Self {
        let router = build_router(state);
        Self { router, config }
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            request_timeout_secs = self.config.timeouts.request_secs,
            "HTTP server starting"
        );

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
