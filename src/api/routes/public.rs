//! Public Routes
//!
//! Read-only panels for the marketing site.
//!
//! - GET /api/v1/batch - Live entry demand
//! - GET /api/v1/details - Investment and sponsorship details
//! - GET /api/v1/documents - Downloadable documents

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::pricing::PriceSource;
use crate::view::{DemandPanel, DetailsPanel, DocumentsPanel};

/// GET /api/v1/batch
pub async fn get_batch(State(state): State<Arc<AppState>>) -> ApiResult<Json<DemandPanel>> {
    let batch = state.store.active_batch().await?;
    Ok(Json(DemandPanel::new(&batch, state.config.pricing.public)))
}

/// GET /api/v1/details
///
/// The batch is only read when the public price comes from the store.
pub async fn get_details(State(state): State<Arc<AppState>>) -> ApiResult<Json<DetailsPanel>> {
    let price = state.config.pricing.public;
    let details = state.store.active_details().await?;

    let batch = match price {
        PriceSource::Stored => match state.store.active_batch().await {
            Ok(batch) => Some(batch),
            Err(e) => {
                tracing::warn!(error = %e, "No batch for stored price, using default");
                None
            }
        },
        PriceSource::Static { .. } => None,
    };

    Ok(Json(DetailsPanel::new(&details, price, batch.as_ref())))
}

/// GET /api/v1/documents
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<DocumentsPanel>> {
    let documents = state.store.active_documents().await?;
    Ok(Json(DocumentsPanel::new(documents)))
}
