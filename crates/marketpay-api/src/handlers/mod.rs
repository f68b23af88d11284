//! Request handlers

pub mod disputes;
pub mod escrows;
pub mod health;
pub mod orders;
pub mod payments;
pub mod webhook;

use axum::http::HeaderMap;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;
use marketpay_types::SettleError;

/// Require the shared admin key, compared in constant time
fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let provided = headers
        .get("x-admin-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if provided.as_bytes().ct_eq(state.admin_key.as_bytes()).into() {
        Ok(())
    } else {
        warn!("admin endpoint rejected: invalid admin key");
        Err(SettleError::unauthorized("invalid admin key").into())
    }
}
