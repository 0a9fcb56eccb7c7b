//! Admin session middleware
//!
//! Admin routes require `Authorization: Bearer <token>` naming an open,
//! unexpired session. The session is handed to handlers through request
//! extensions.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::session::SessionToken;

/// Authenticated admin session, available to handlers via request extensions
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub id: String,
    pub token: SessionToken,
}

/// Bearer token from the `Authorization` header
pub fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let id = bearer_token(&req)
        .ok_or_else(|| {
            ApiError::Unauthorized("Missing session. Provide Authorization: Bearer <token>".to_string())
        })?
        .to_string();

    let token = state
        .sessions
        .check(&id, state.now_ms())
        .await
        .ok_or_else(|| ApiError::Unauthorized("Session expired or unknown".to_string()))?;

    tracing::debug!(issued_at_ms = token.issued_at_ms, "Authenticated admin request");
    req.extensions_mut().insert(AdminSession { id, token });
    Ok(next.run(req).await)
}
