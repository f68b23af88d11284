//! Dispute endpoints
//!
//! Opening and evidence are party actions carrying the actor id; review and
//! resolution are admin actions gated by the shared `x-admin-key` header.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use super::require_admin;
use crate::dto::{
    AddEvidenceRequest, OpenDisputeRequest, ResolveDisputeRequest, ReviewDisputeRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;
use marketpay_types::{Dispute, DisputeId, Result, SettleError};

fn parse_dispute_id(raw: &str) -> Result<DisputeId> {
    DisputeId::parse(raw).map_err(|_| SettleError::validation("id", "not a valid dispute id"))
}

/// `POST /disputes` - open a dispute, freezing the escrow
pub async fn open_dispute(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OpenDisputeRequest>,
) -> ApiResult<(StatusCode, Json<Dispute>)> {
    let dispute = state
        .disputes
        .open_dispute(
            req.order_id,
            req.actor_id,
            req.reason,
            req.description,
            req.evidence,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(dispute)))
}

/// `GET /disputes/{id}`
pub async fn get_dispute(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Dispute>> {
    let id = parse_dispute_id(&id)?;
    Ok(Json(state.store.dispute(id).await?))
}

/// `POST /disputes/{id}/review` - admin takes the dispute for review
pub async fn mark_under_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ReviewDisputeRequest>,
) -> ApiResult<Json<Dispute>> {
    require_admin(&state, &headers)?;
    let id = parse_dispute_id(&id)?;
    Ok(Json(state.disputes.mark_under_review(id, req.admin_id).await?))
}

/// `POST /disputes/{id}/evidence` - a party attaches evidence
pub async fn add_evidence(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AddEvidenceRequest>,
) -> ApiResult<Json<Dispute>> {
    let id = parse_dispute_id(&id)?;
    Ok(Json(
        state
            .disputes
            .add_evidence(id, req.actor_id, req.content)
            .await?,
    ))
}

/// `POST /disputes/{id}/resolve` - admin forces the settlement
pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ResolveDisputeRequest>,
) -> ApiResult<Json<Dispute>> {
    require_admin(&state, &headers)?;
    let id = parse_dispute_id(&id)?;
    Ok(Json(
        state
            .disputes
            .resolve_dispute(id, req.admin_id, req.outcome, req.amount, req.resolution)
            .await?,
    ))
}
