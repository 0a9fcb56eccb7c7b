//! Payment Routes
//!
//! - GET /api/v1/payment - Bank details and a fresh payment reference

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::state::AppState;
use crate::payment::PaymentInstructions;

/// GET /api/v1/payment
///
/// A new reference is generated on every call and never stored.
pub async fn get_payment(State(state): State<Arc<AppState>>) -> Json<PaymentInstructions> {
    let instructions = PaymentInstructions::new(&state.config.payment, state.now_ms());
    tracing::debug!(reference = %instructions.reference, "Issued payment reference");
    Json(instructions)
}
