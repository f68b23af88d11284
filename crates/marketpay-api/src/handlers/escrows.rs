//! Escrow reads

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::ApiResult;
use crate::state::AppState;
use marketpay_types::{Escrow, EscrowId, SettleError};

/// `GET /escrows/{id}`
pub async fn get_escrow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Escrow>> {
    let id = EscrowId::parse(&id)
        .map_err(|_| SettleError::validation("id", "not a valid escrow id"))?;
    Ok(Json(state.store.escrow(id).await?))
}
