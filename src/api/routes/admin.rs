//! Admin Routes
//!
//! Session endpoints and the admin mutators. Everything except login sits
//! behind [`require_admin`](crate::api::auth::require_admin).
//!
//! - POST /api/v1/admin/login - Open a session
//! - POST /api/v1/admin/logout - Close the current session
//! - GET /api/v1/admin/session - Current session times
//! - GET /api/v1/admin/batch - Batch status for the admin page
//! - PUT /api/v1/admin/batch/secured-applicants - Set the applicant count
//! - POST /api/v1/admin/documents - Add a document
//! - DELETE /api/v1/admin/documents/:id - Soft delete a document
//! - POST /api/v1/admin/documents/:id/move - Move a document up or down

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;

use crate::admin::{CounterEditor, DocumentManager};
use crate::api::auth::AdminSession;
use crate::api::dto::{
    ms_to_datetime, AdminBatchResponse, CreateDocumentRequest, DocumentListResponse,
    LoginRequest, LoginResponse, MoveDocumentRequest, SessionResponse, UpdateCountRequest,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::pricing::format_gbp;

/// POST /api/v1/admin/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    if !state.credentials.validate(&req.username, &req.password) {
        tracing::warn!(username = %req.username, "Admin login rejected");
        return Err(ApiError::Unauthorized("Invalid username or password".to_string()));
    }

    let (token, session) = state.sessions.open(state.now_ms()).await;
    Ok(Json(LoginResponse {
        token,
        expires_at: ms_to_datetime(session.expires_at_ms()),
    }))
}

/// POST /api/v1/admin/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AdminSession>,
) -> StatusCode {
    state.sessions.close(&session.id).await;
    StatusCode::NO_CONTENT
}

/// GET /api/v1/admin/session
pub async fn get_session(Extension(session): Extension<AdminSession>) -> Json<SessionResponse> {
    Json(SessionResponse::from(session.token))
}

fn counter_editor(state: &AppState) -> CounterEditor {
    CounterEditor::new(Arc::clone(&state.store), Arc::clone(&state.clock))
}

fn document_manager(state: &AppState) -> DocumentManager {
    DocumentManager::with_mode(
        Arc::clone(&state.store),
        Arc::clone(&state.clock),
        state.config.admin.reorder_mode,
    )
}

fn batch_response(state: &AppState, editor: &CounterEditor) -> ApiResult<AdminBatchResponse> {
    let batch = editor
        .batch()
        .cloned()
        .ok_or_else(|| ApiError::Internal("batch not loaded".to_string()))?;
    let live_price = state.config.pricing.admin.resolve(Some(&batch));

    Ok(AdminBatchResponse {
        remaining: batch.remaining(),
        progress_percentage: batch.progress_percentage(),
        live_price,
        live_price_label: format_gbp(live_price),
        flash: editor.current_flash().cloned(),
        batch,
    })
}

/// GET /api/v1/admin/batch
pub async fn get_batch(State(state): State<Arc<AppState>>) -> ApiResult<Json<AdminBatchResponse>> {
    let mut editor = counter_editor(&state);
    editor.load().await?;
    Ok(Json(batch_response(&state, &editor)?))
}

/// PUT /api/v1/admin/batch/secured-applicants
///
/// Rejects counts outside `0..=total_positions` with 400 before writing.
pub async fn update_secured_applicants(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateCountRequest>,
) -> ApiResult<Json<AdminBatchResponse>> {
    let mut editor = counter_editor(&state);
    editor.load().await?;
    editor.set_pending(req.count);
    editor.submit().await?;
    Ok(Json(batch_response(&state, &editor)?))
}

/// POST /api/v1/admin/documents
pub async fn create_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDocumentRequest>,
) -> ApiResult<(StatusCode, Json<DocumentListResponse>)> {
    let mut manager = document_manager(&state);
    manager.refresh().await?;
    manager
        .add(&req.title, req.description.as_deref(), &req.file_url)
        .await?;

    Ok((StatusCode::CREATED, Json(list_response(&manager, true))))
}

/// DELETE /api/v1/admin/documents/:id
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DocumentListResponse>> {
    let mut manager = document_manager(&state);
    manager.delete(id).await?;
    Ok(Json(list_response(&manager, true)))
}

/// POST /api/v1/admin/documents/:id/move
///
/// Moving the first document up, the last one down, or an inactive/unknown
/// id is a no-op reported as `changed: false`.
pub async fn move_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<MoveDocumentRequest>,
) -> ApiResult<Json<DocumentListResponse>> {
    let mut manager = document_manager(&state);
    manager.refresh().await?;
    let changed = manager.move_document(id, req.direction).await?;
    Ok(Json(list_response(&manager, changed)))
}

fn list_response(manager: &DocumentManager, changed: bool) -> DocumentListResponse {
    DocumentListResponse {
        changed,
        documents: manager.documents().to_vec(),
        flash: manager.current_flash().cloned(),
    }
}
