//! Route definitions

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::state::AppState;

/// All settlement routes
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health))
        // Reconciler surface
        .route(
            "/webhooks/payments",
            post(handlers::webhook::receive).get(handlers::webhook::probe),
        )
        .route(
            "/payments/:reference/status",
            get(handlers::payments::payment_status),
        )
        .route(
            "/payments/:reference/poll",
            post(handlers::payments::poll_payment),
        )
        // Order boundary
        .route("/orders", post(handlers::orders::create_order))
        .route("/orders/:order_id/escrow", get(handlers::orders::escrow_for_order))
        .route("/orders/:order_id/delivered", post(handlers::orders::mark_delivered))
        .route("/orders/:order_id/confirm", post(handlers::orders::confirm_receipt))
        .route("/orders/:order_id/cancel", post(handlers::orders::cancel))
        // Escrow reads
        .route("/escrows/:id", get(handlers::escrows::get_escrow))
        // Disputes
        .route("/disputes", post(handlers::disputes::open_dispute))
        .route("/disputes/:id", get(handlers::disputes::get_dispute))
        .route("/disputes/:id/review", post(handlers::disputes::mark_under_review))
        .route("/disputes/:id/evidence", post(handlers::disputes::add_evidence))
        .route("/disputes/:id/resolve", post(handlers::disputes::resolve))
}
