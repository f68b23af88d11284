//! Request and response bodies
//!
//! Domain records (`Order`, `Escrow`, `Dispute`) serialize directly as
//! responses; only the inbound shapes live here.

use serde::{Deserialize, Serialize};

use marketpay_reconciler::ReconcileOutcome;
use marketpay_types::{
    DisputeOutcome, DisputeReason, Escrow, Money, Order, OrderId, PaymentMethod, PaymentStatus,
    UserId,
};

/// Checkout registration: creates the order and its pending escrow
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub buyer_id: UserId,
    pub vendor_id: UserId,
    pub provider: String,
    pub method: PaymentMethod,
    /// Provider payment reference; unique across all orders
    pub reference: String,
    pub amount: Money,
    #[serde(default)]
    pub transaction_fee: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedResponse {
    pub order: Order,
    pub escrow: Escrow,
}

/// Acknowledgement returned to the provider for a processed webhook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
    /// `applied`, `already_completed` or `unchanged`
    pub outcome: String,
}

impl From<ReconcileOutcome> for WebhookAck {
    fn from(outcome: ReconcileOutcome) -> Self {
        let outcome = match outcome {
            ReconcileOutcome::Applied { .. } => "applied",
            ReconcileOutcome::AlreadyCompleted => "already_completed",
            ReconcileOutcome::Unchanged { .. } => "unchanged",
        };
        Self {
            received: true,
            outcome: outcome.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusResponse {
    pub reference: String,
    pub status: PaymentStatus,
}

/// Direct user action on an order (delivery, confirmation, cancel)
#[derive(Debug, Clone, Deserialize)]
pub struct OrderActionRequest {
    pub actor_id: UserId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenDisputeRequest {
    pub order_id: OrderId,
    pub actor_id: UserId,
    pub reason: DisputeReason,
    pub description: String,
    #[serde(default)]
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewDisputeRequest {
    pub admin_id: UserId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddEvidenceRequest {
    pub actor_id: UserId,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolveDisputeRequest {
    pub admin_id: UserId,
    pub outcome: DisputeOutcome,
    /// Defaults to the full escrowed amount
    #[serde(default)]
    pub amount: Option<Money>,
    #[serde(default)]
    pub resolution: Option<String>,
}
