//! Fatoora core: team-scoped invoicing API.

use axum::{extract::State, http::StatusCode, middleware, response::Json, routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod invoice;
pub mod models;
pub mod render;
pub mod store;

use auth::JwtVerifier;
use invoice::InvoiceService;
use store::IdentityStore;

/// Application state shared by every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub invoices: InvoiceService,

    /// Resolves verified identities into users and teams
    pub identity: Arc<dyn IdentityStore>,

    pub auth: JwtVerifier,
}

/// Health check endpoint.
///
/// Returns a simple JSON response indicating the server is running.
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "fatoora-core",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Database health check endpoint.
async fn db_health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    state.invoices.ping().await.map_err(|e| {
        tracing::error!("Database health check failed: {}", e);
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    Ok(Json(serde_json::json!({
        "status": "ok",
        "database": "connected"
    })))
}

/// Creates the main application router.
///
/// Invoice routes live under `/api/invoices` behind token verification and
/// caller resolution; health checks are public.
///
/// # Arguments
///
/// * `state` - Services and stores shared by the handlers
///
/// # Returns
///
/// Returns a configured Axum Router.
pub fn create_router(state: AppState) -> Router {
    // Layers run outermost-last: the token is verified before the caller
    // is resolved.
    let invoices = invoice::handlers::router()
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            context::caller_context_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::jwt_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/health/db", get(db_health_check))
        .nest("/api/invoices", invoices)
        .layer(TraceLayer::new_for_http())
        // Bearer tokens only, no cookies: any origin may call the API.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
