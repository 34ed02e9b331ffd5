//! Admin API, served on its own bind address behind a bearer key.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/accounts/{address}/ledger", get(get_account_ledger))
        .route(
            "/admin/accounts/{address}/entitlements",
            get(get_account_entitlements),
        )
        .route("/admin/adjust", post(post_adjust))
        .route("/admin/reconcile", post(post_reconcile))
        .route("/admin/role", post(post_role))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}
