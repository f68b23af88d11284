//! Provider webhook ingestion
//!
//! The signature is verified against the raw body before anything is
//! parsed. A bad signature performs no state change and is logged as a
//! security event; a valid duplicate acknowledges with 200 so the provider
//! stops redelivering.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::HeaderMap, http::StatusCode, Json};
use tracing::warn;

use crate::dto::WebhookAck;
use crate::error::ApiResult;
use crate::state::AppState;
use marketpay_types::{ProviderWebhook, SettleError};

pub async fn receive(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    let signature = headers
        .get("x-payment-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if let Err(err) = state.verifier.verify(&body, signature) {
        warn!("webhook rejected: signature verification failed");
        return Err(err.into());
    }

    let webhook: ProviderWebhook = serde_json::from_slice(&body)
        .map_err(|err| SettleError::validation("body", err.to_string()))?;

    let outcome = state.reconciler.apply_notification(&webhook).await?;
    Ok(Json(WebhookAck::from(outcome)))
}

/// Provider-facing liveness probe on the webhook path
pub async fn probe() -> StatusCode {
    StatusCode::OK
}
