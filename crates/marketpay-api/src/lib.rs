//! MarketPay REST surface
//!
//! HTTP boundary of the settlement core:
//!
//! ```text
//! /
//! ├── /webhooks/payments      - provider webhook (POST) + probe (GET)
//! ├── /payments/{ref}/status  - normalized payment status
//! ├── /payments/{ref}/poll    - bounded provider poll until terminal
//! ├── /orders                 - checkout registration
//! ├── /orders/{id}/...        - escrow read, delivered/confirm/cancel
//! ├── /escrows/{id}           - escrow read
//! ├── /disputes               - open, read, review, evidence, resolve
//! └── /health                 - liveness
//! ```
//!
//! Authentication sits outside this service: party ids come from the
//! trusted gateway in request bodies, the provider authenticates via the
//! webhook signature, and admin endpoints require the shared
//! `x-admin-key` header.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Create the main router with tracing and CORS middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Router without middleware, for tests
pub fn create_test_router(state: Arc<AppState>) -> Router {
    routes::routes().with_state(state)
}
