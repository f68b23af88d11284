//! Order boundary actions
//!
//! Checkout registration plus the three direct user actions (delivery,
//! confirmation, pre-funding cancel). Direct actions surface a lost race as
//! `409 Conflict`; the actor check happens inside the same write unit as
//! the transition so authorization and state agree.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::info;

use crate::dto::{CreateOrderRequest, OrderActionRequest, OrderCreatedResponse};
use crate::error::ApiResult;
use crate::state::AppState;
use marketpay_escrow as ledger;
use marketpay_orders::{dispatch, mirror_escrow, settlement_notices};
use marketpay_types::{
    Escrow, Money, Order, OrderId, PaymentRecord, Result, SettleError,
};

fn parse_order_id(raw: &str) -> Result<OrderId> {
    OrderId::parse(raw).map_err(|_| SettleError::validation("order_id", "not a valid order id"))
}

/// `POST /orders` - register a checkout: order plus pending escrow
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<OrderCreatedResponse>)> {
    if !req.amount.is_positive() {
        return Err(SettleError::validation("amount", "must be positive").into());
    }
    if req.reference.trim().is_empty() {
        return Err(SettleError::validation("reference", "must not be empty").into());
    }
    if req.buyer_id == req.vendor_id {
        return Err(SettleError::validation("vendor_id", "buyer and vendor must differ").into());
    }
    let fee = req
        .transaction_fee
        .unwrap_or_else(|| Money::zero(req.amount.currency));
    req.amount.require_same_currency(fee)?;
    if fee.minor < 0 || fee.minor >= req.amount.minor {
        return Err(SettleError::validation(
            "transaction_fee",
            "must be non-negative and below the order amount",
        )
        .into());
    }

    let order = Order::new(
        req.buyer_id,
        req.vendor_id,
        PaymentRecord::initiate(req.provider, req.method, req.reference, req.amount),
    );
    let escrow = Escrow::new(
        order.id,
        order.buyer_id,
        order.vendor_id,
        req.amount,
        fee,
    );

    let (order, escrow) = state
        .store
        .write(move |txn| {
            txn.insert_order(order.clone())?;
            txn.insert_escrow(escrow.clone())?;
            Ok((order, escrow))
        })
        .await?;

    info!(
        order_id = %order.id,
        escrow_id = %escrow.id,
        amount = %escrow.amount,
        "order registered with pending escrow"
    );
    Ok((StatusCode::CREATED, Json(OrderCreatedResponse { order, escrow })))
}

/// `GET /orders/{order_id}/escrow`
pub async fn escrow_for_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> ApiResult<Json<Escrow>> {
    let order_id = parse_order_id(&order_id)?;
    Ok(Json(state.store.escrow_by_order(order_id).await?))
}

/// `POST /orders/{order_id}/delivered` - vendor marks delivery
pub async fn mark_delivered(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
    Json(req): Json<OrderActionRequest>,
) -> ApiResult<Json<Escrow>> {
    let order_id = parse_order_id(&order_id)?;
    let (escrow, notices) = state
        .store
        .write(move |txn| {
            let order = txn.order(order_id)?;
            if order.vendor_id != req.actor_id {
                return Err(SettleError::unauthorized(
                    "only the vendor may mark delivery",
                ));
            }
            let escrow = txn.escrow_by_order(order_id)?;
            let escrow = ledger::mark_delivered(txn, escrow.id, Utc::now())?
                .require_applied("delivery")?;
            mirror_escrow(txn, &escrow)?;
            let notices = settlement_notices(&escrow);
            Ok((escrow, notices))
        })
        .await?;

    dispatch(&state.notifier, notices).await;
    Ok(Json(escrow))
}

/// `POST /orders/{order_id}/confirm` - buyer confirms receipt
pub async fn confirm_receipt(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
    Json(req): Json<OrderActionRequest>,
) -> ApiResult<Json<Escrow>> {
    let order_id = parse_order_id(&order_id)?;
    let (escrow, notices) = state
        .store
        .write(move |txn| {
            let order = txn.order(order_id)?;
            if order.buyer_id != req.actor_id {
                return Err(SettleError::unauthorized(
                    "only the buyer may confirm receipt",
                ));
            }
            let escrow = txn.escrow_by_order(order_id)?;
            let escrow = ledger::confirm_receipt(txn, escrow.id, Utc::now())?
                .require_applied("buyer confirmation")?;
            mirror_escrow(txn, &escrow)?;
            let notices = settlement_notices(&escrow);
            Ok((escrow, notices))
        })
        .await?;

    dispatch(&state.notifier, notices).await;
    Ok(Json(escrow))
}

/// `POST /orders/{order_id}/cancel` - pre-funding cancel by either party
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
    Json(req): Json<OrderActionRequest>,
) -> ApiResult<Json<Escrow>> {
    let order_id = parse_order_id(&order_id)?;
    let escrow = state
        .store
        .write(move |txn| {
            let order = txn.order(order_id)?;
            if !order.is_party(req.actor_id) {
                return Err(SettleError::unauthorized(
                    "only the buyer or vendor may cancel the order",
                ));
            }
            let escrow = txn.escrow_by_order(order_id)?;
            let escrow = ledger::cancel(txn, escrow.id)?.require_applied("cancellation")?;
            mirror_escrow(txn, &escrow)?;
            Ok(escrow)
        })
        .await?;

    info!(order_id = %escrow.order_id, "order cancelled before funding");
    Ok(Json(escrow))
}
