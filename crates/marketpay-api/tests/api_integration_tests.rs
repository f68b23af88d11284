//! API integration tests
//!
//! Exercise the full request/response cycle against an in-memory datastore:
//! webhook funding, the delivery/confirmation flow, cancellation and the
//! dispute path, including the authorization failures for each.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use marketpay_api::{create_test_router, AppState};
use marketpay_orders::TracingNotifier;
use marketpay_reconciler::{PollConfig, ProviderClient, WebhookVerifier};
use marketpay_store::Datastore;
use marketpay_types::{ProviderPaymentData, Result, SettleError, UserId};

const WEBHOOK_SECRET: &str = "whsec_test";
const ADMIN_KEY: &str = "admin_test_key";

/// Provider client scripted with a fixed sequence of poll responses
struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<ProviderPaymentData>>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<ProviderPaymentData>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    async fn payment_status(&self, _reference: &str) -> Result<ProviderPaymentData> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(SettleError::ExternalGateway {
                    reason: "no scripted response".to_string(),
                })
            })
    }
}

fn test_app() -> Router {
    test_app_with_provider(vec![])
}

fn test_app_with_provider(responses: Vec<Result<ProviderPaymentData>>) -> Router {
    let store = Datastore::new();
    let state = AppState::new(
        store,
        Arc::new(TracingNotifier),
        Arc::new(ScriptedProvider::new(responses)),
        PollConfig::default(),
        WEBHOOK_SECRET,
        ADMIN_KEY,
    );
    create_test_router(Arc::new(state))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let body = match body {
        Some(json_body) => Body::from(serde_json::to_vec(&json_body).unwrap()),
        None => Body::empty(),
    };
    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Register an order for 100,000 SLE; returns (order json, escrow json)
async fn create_order(app: &Router, buyer: UserId, vendor: UserId, reference: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/orders",
        Some(json!({
            "buyer_id": buyer.as_uuid(),
            "vendor_id": vendor.as_uuid(),
            "provider": "monipay",
            "method": "mobile_money",
            "reference": reference,
            "amount": { "minor": 10_000_000i64, "currency": "SLE" },
            "transaction_fee": { "minor": 250_000i64, "currency": "SLE" }
        })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "order creation failed: {body}");
    body
}

fn webhook_body(reference: &str, status: &str, amount_minor: i64) -> Vec<u8> {
    let event = match status {
        "completed" => "payment.completed",
        "failed" => "payment.failed",
        _ => "payment.updated",
    };
    serde_json::to_vec(&json!({
        "event": event,
        "data": {
            "payment_id": "pp_1",
            "reference": reference,
            "status": status,
            "amount": amount_minor,
            "currency": "SLE",
            "transaction_id": "txn_9"
        }
    }))
    .unwrap()
}

async fn post_webhook(app: &Router, body: Vec<u8>, signature: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/payments")
        .header("content-type", "application/json")
        .header("x-payment-signature", signature)
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Fund the order's escrow through a signed completed webhook
async fn fund(app: &Router, reference: &str) {
    let verifier = WebhookVerifier::new(WEBHOOK_SECRET);
    let body = webhook_body(reference, "completed", 10_000_000);
    let signature = verifier.sign(&body);
    let (status, ack) = post_webhook(app, body, &signature).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "applied");
}

#[tokio::test]
async fn health_is_ok() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/health", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (probe, _) = send(&app, "GET", "/webhooks/payments", None, &[]).await;
    assert_eq!(probe, StatusCode::OK);
}

#[tokio::test]
async fn signed_completed_webhook_funds_the_escrow() {
    let app = test_app();
    let created = create_order(&app, UserId::new(), UserId::new(), "ref-a").await;
    let order_id = created["order"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["escrow"]["status"], "pending");

    fund(&app, "ref-a").await;

    let (status, escrow) =
        send(&app, "GET", &format!("/orders/{order_id}/escrow"), None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(escrow["status"], "funded");
    assert!(escrow["funded_at"].is_string());

    let (status, payment) = send(&app, "GET", "/payments/ref-a/status", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payment["status"], "completed");
}

#[tokio::test]
async fn unsigned_webhook_changes_nothing() {
    let app = test_app();
    let created = create_order(&app, UserId::new(), UserId::new(), "ref-b").await;
    let order_id = created["order"]["id"].as_str().unwrap().to_string();

    let body = webhook_body("ref-b", "completed", 10_000_000);
    let (status, error) = post_webhook(&app, body, "deadbeef").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error["code"], "INVALID_SIGNATURE");

    let (_, escrow) = send(&app, "GET", &format!("/orders/{order_id}/escrow"), None, &[]).await;
    assert_eq!(escrow["status"], "pending");
}

#[tokio::test]
async fn duplicate_webhook_is_acknowledged_without_effect() {
    let app = test_app();
    let created = create_order(&app, UserId::new(), UserId::new(), "ref-c").await;
    let order_id = created["order"]["id"].as_str().unwrap().to_string();
    fund(&app, "ref-c").await;

    let (_, escrow) = send(&app, "GET", &format!("/orders/{order_id}/escrow"), None, &[]).await;
    let first_funded_at = escrow["funded_at"].clone();

    let verifier = WebhookVerifier::new(WEBHOOK_SECRET);
    let body = webhook_body("ref-c", "completed", 10_000_000);
    let signature = verifier.sign(&body);
    let (status, ack) = post_webhook(&app, body, &signature).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "already_completed");

    let (_, escrow) = send(&app, "GET", &format!("/orders/{order_id}/escrow"), None, &[]).await;
    assert_eq!(escrow["funded_at"], first_funded_at);
}

#[tokio::test]
async fn poll_path_funds_escrow_like_a_webhook() {
    let app = test_app_with_provider(vec![Ok(ProviderPaymentData {
        payment_id: "pp_1".to_string(),
        reference: "ref-poll".to_string(),
        status: marketpay_types::ProviderStatus::Completed,
        amount: 10_000_000,
        currency: marketpay_types::Currency::Sle,
        transaction_id: Some("txn_poll".to_string()),
        metadata: Default::default(),
    })]);
    let created = create_order(&app, UserId::new(), UserId::new(), "ref-poll").await;
    let order_id = created["order"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "POST", "/payments/ref-poll/poll", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");

    let (_, escrow) = send(&app, "GET", &format!("/orders/{order_id}/escrow"), None, &[]).await;
    assert_eq!(escrow["status"], "funded");
}

#[tokio::test]
async fn webhook_for_unknown_reference_is_not_found() {
    let app = test_app();
    let verifier = WebhookVerifier::new(WEBHOOK_SECRET);
    let body = webhook_body("ref-missing", "completed", 10_000_000);
    let signature = verifier.sign(&body);
    let (status, error) = post_webhook(&app, body, &signature).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["code"], "ORDER_NOT_FOUND");
}

#[tokio::test]
async fn delivery_then_confirmation_releases_funds() {
    let app = test_app();
    let buyer = UserId::new();
    let vendor = UserId::new();
    let created = create_order(&app, buyer, vendor, "ref-d").await;
    let order_id = created["order"]["id"].as_str().unwrap().to_string();
    fund(&app, "ref-d").await;

    // A stranger cannot mark delivery.
    let (status, error) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/delivered"),
        Some(json!({ "actor_id": UserId::new().as_uuid() })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error["code"], "UNAUTHORIZED");

    let (status, escrow) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/delivered"),
        Some(json!({ "actor_id": vendor.as_uuid() })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(escrow["status"], "pending_confirmation");
    assert!(escrow["confirmation_deadline"].is_string());

    let (status, escrow) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/confirm"),
        Some(json!({ "actor_id": buyer.as_uuid() })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(escrow["status"], "released_to_vendor");
    assert_eq!(escrow["release_reason"], "buyer_approval");

    // A second confirmation is a visible conflict.
    let (status, error) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/confirm"),
        Some(json!({ "actor_id": buyer.as_uuid() })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["code"], "CONFLICT");
}

#[tokio::test]
async fn delivery_before_funding_is_a_conflict() {
    let app = test_app();
    let vendor = UserId::new();
    let created = create_order(&app, UserId::new(), vendor, "ref-e").await;
    let order_id = created["order"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/delivered"),
        Some(json!({ "actor_id": vendor.as_uuid() })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn cancel_works_only_before_funding() {
    let app = test_app();
    let buyer = UserId::new();
    let created = create_order(&app, buyer, UserId::new(), "ref-f").await;
    let order_id = created["order"]["id"].as_str().unwrap().to_string();

    let (status, escrow) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/cancel"),
        Some(json!({ "actor_id": buyer.as_uuid() })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(escrow["status"], "cancelled");

    let created = create_order(&app, buyer, UserId::new(), "ref-g").await;
    let order_id = created["order"]["id"].as_str().unwrap().to_string();
    fund(&app, "ref-g").await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/cancel"),
        Some(json!({ "actor_id": buyer.as_uuid() })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn duplicate_payment_reference_is_rejected() {
    let app = test_app();
    create_order(&app, UserId::new(), UserId::new(), "ref-dup").await;

    let (status, error) = send(
        &app,
        "POST",
        "/orders",
        Some(json!({
            "buyer_id": UserId::new().as_uuid(),
            "vendor_id": UserId::new().as_uuid(),
            "provider": "monipay",
            "method": "card",
            "reference": "ref-dup",
            "amount": { "minor": 5_000i64, "currency": "SLE" }
        })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["code"], "CONFLICT");
}

#[tokio::test]
async fn dispute_freezes_and_admin_resolution_refunds() {
    let app = test_app();
    let buyer = UserId::new();
    let vendor = UserId::new();
    let created = create_order(&app, buyer, vendor, "ref-h").await;
    let order_id = created["order"]["id"].as_str().unwrap().to_string();
    let escrow_id = created["escrow"]["id"].as_str().unwrap().to_string();
    fund(&app, "ref-h").await;

    // A stranger cannot open a dispute.
    let (status, _) = send(
        &app,
        "POST",
        "/disputes",
        Some(json!({
            "order_id": order_id,
            "actor_id": UserId::new().as_uuid(),
            "reason": "item_not_received",
            "description": "never arrived"
        })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, dispute) = send(
        &app,
        "POST",
        "/disputes",
        Some(json!({
            "order_id": order_id,
            "actor_id": buyer.as_uuid(),
            "reason": "item_not_received",
            "description": "never arrived",
            "evidence": ["tracking shows no movement"]
        })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(dispute["status"], "open");
    let dispute_id = dispute["id"].as_str().unwrap().to_string();

    let (_, escrow) = send(&app, "GET", &format!("/escrows/{escrow_id}"), None, &[]).await;
    assert_eq!(escrow["status"], "disputed");

    // Only one active dispute per order.
    let (status, error) = send(
        &app,
        "POST",
        "/disputes",
        Some(json!({
            "order_id": order_id,
            "actor_id": vendor.as_uuid(),
            "reason": "other",
            "description": "counter"
        })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["code"], "DISPUTE_ALREADY_OPEN");

    // Evidence from the vendor.
    let (status, dispute) = send(
        &app,
        "POST",
        &format!("/disputes/{dispute_id}/evidence"),
        Some(json!({ "actor_id": vendor.as_uuid(), "content": "courier receipt" })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dispute["evidence"].as_array().unwrap().len(), 2);

    // Resolution requires the admin key.
    let resolve_body = json!({
        "admin_id": UserId::new().as_uuid(),
        "outcome": "favor_buyer",
        "amount": { "minor": 10_000_000i64, "currency": "SLE" },
        "resolution": "vendor failed to ship"
    });
    let (status, _) = send(
        &app,
        "POST",
        &format!("/disputes/{dispute_id}/resolve"),
        Some(resolve_body.clone()),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, resolved) = send(
        &app,
        "POST",
        &format!("/disputes/{dispute_id}/resolve"),
        Some(resolve_body),
        &[("x-admin-key", ADMIN_KEY)],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["status"], "resolved_buyer");
    assert_eq!(resolved["refund_amount"]["minor"], 10_000_000i64);

    let (_, escrow) = send(&app, "GET", &format!("/escrows/{escrow_id}"), None, &[]).await;
    assert_eq!(escrow["status"], "refunded_to_buyer");
    assert!(escrow["released_at"].is_null());
}

#[tokio::test]
async fn malformed_ids_are_bad_requests() {
    let app = test_app();
    let (status, error) = send(&app, "GET", "/escrows/not-an-id", None, &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "VALIDATION_ERROR");

    let (status, _) = send(&app, "GET", "/orders/not-an-id/escrow", None, &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
