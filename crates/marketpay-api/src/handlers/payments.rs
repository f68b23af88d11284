//! Payment status reads and the client-driven poll path

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::dto::PaymentStatusResponse;
use crate::error::ApiResult;
use crate::state::AppState;

/// Normalized payment status for a provider reference
pub async fn payment_status(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
) -> ApiResult<Json<PaymentStatusResponse>> {
    let status = state.reconciler.payment_status(&reference).await?;
    Ok(Json(PaymentStatusResponse { reference, status }))
}

/// Poll the provider until the payment reaches a terminal status.
///
/// Every observation is reconciled, so a completion seen here funds the
/// escrow exactly as a webhook would. Disconnecting cancels the poll by
/// dropping the future; an exhausted budget maps to `504`.
pub async fn poll_payment(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
) -> ApiResult<Json<PaymentStatusResponse>> {
    let status = state
        .reconciler
        .poll_until_terminal(state.provider.as_ref(), &reference, &state.poll)
        .await?;
    Ok(Json(PaymentStatusResponse { reference, status }))
}
