//! Batchboard REST API
//!
//! HTTP API layer for Batchboard, built with Axum.
//!
//! # Endpoints
//!
//! ## Public
//! - `GET /api/v1/batch` - Live entry demand panel
//! - `GET /api/v1/details` - Investment details panel
//! - `GET /api/v1/documents` - Active documents
//! - `GET /api/v1/payment` - Payment instructions with a fresh reference
//!
//! ## Admin
//! - `POST /api/v1/admin/login` - Open a session
//! - `POST /api/v1/admin/logout` - Close the session
//! - `GET /api/v1/admin/session` - Session status
//! - `GET /api/v1/admin/batch` - Batch status
//! - `PUT /api/v1/admin/batch/secured-applicants` - Set the applicant count
//! - `POST /api/v1/admin/documents` - Add a document
//! - `DELETE /api/v1/admin/documents/:id` - Soft delete a document
//! - `POST /api/v1/admin/documents/:id/move` - Reorder a document
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! ## WebSocket
//! - `GET /api/v1/ws` - Change feed
//!
//! # Example
//!
//! ```rust,ignore
//! use batchboard::api::{serve, AppState};
//! use batchboard::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let api = config.api.clone();
//!     let state = AppState::from_config(config)?;
//!     serve(state, &api).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ApiConfig;
use crate::feed::websocket_handler;
use crate::session::SWEEP_INTERVAL;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.api.cors_origins);
    let shared_state = Arc::new(state);

    let admin_routes = Router::new()
        .route("/logout", post(routes::admin::logout))
        .route("/session", get(routes::admin::get_session))
        .route("/batch", get(routes::admin::get_batch))
        .route(
            "/batch/secured-applicants",
            put(routes::admin::update_secured_applicants),
        )
        .route("/documents", post(routes::admin::create_document))
        .route("/documents/:id", delete(routes::admin::delete_document))
        .route("/documents/:id/move", post(routes::admin::move_document))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&shared_state),
            auth::require_admin,
        ))
        .route("/login", post(routes::admin::login));

    let api_routes = Router::new()
        .route("/batch", get(routes::public::get_batch))
        .route("/details", get(routes::public::get_details))
        .route("/documents", get(routes::public::list_documents))
        .route("/payment", get(routes::payment::get_payment))
        .nest("/admin", admin_routes)
        .route("/ws", get(websocket_handler));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// Allow the configured origins, or any origin when none are configured
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let sweeper = Arc::clone(&state.sessions).start_sweeper(state.clock.clone(), SWEEP_INTERVAL);
    let router = build_router(state);

    tracing::info!("Batchboard API listening on {}", addr);

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)));
    sweeper.abort();
    result?;

    tracing::info!("Batchboard API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
