//! Payment-provider wire types
//!
//! Provider payloads are modeled as closed shapes and normalized at the
//! reconciler boundary the moment they arrive. Nothing downstream ever sees
//! a raw provider status string.

use crate::{Currency, Money, PaymentStatus};
use serde::{Deserialize, Serialize};

/// Event discriminator on an inbound provider notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderEvent {
    #[serde(rename = "payment.created")]
    PaymentCreated,
    #[serde(rename = "payment.updated")]
    PaymentUpdated,
    #[serde(rename = "payment.completed")]
    PaymentCompleted,
    #[serde(rename = "payment.failed")]
    PaymentFailed,
    #[serde(rename = "payment.cancelled")]
    PaymentCancelled,
}

/// Provider-side payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Pending,
    Processing,
    #[serde(alias = "success")]
    Completed,
    Failed,
    Cancelled,
}

impl From<ProviderStatus> for PaymentStatus {
    fn from(status: ProviderStatus) -> Self {
        match status {
            ProviderStatus::Pending => PaymentStatus::Pending,
            ProviderStatus::Processing => PaymentStatus::Processing,
            ProviderStatus::Completed => PaymentStatus::Completed,
            ProviderStatus::Failed => PaymentStatus::Failed,
            ProviderStatus::Cancelled => PaymentStatus::Cancelled,
        }
    }
}

/// Known metadata fields a provider may echo back
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

/// Payment data carried by webhooks and poll responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPaymentData {
    pub payment_id: String,
    /// The idempotency correlation key stored on the order
    pub reference: String,
    pub status: ProviderStatus,
    /// Amount in minor units
    pub amount: i64,
    pub currency: Currency,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub metadata: ProviderMetadata,
}

impl ProviderPaymentData {
    pub fn money(&self) -> Money {
        Money::new(self.amount, self.currency)
    }
}

/// Inbound webhook body: `{event, data: {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderWebhook {
    pub event: ProviderEvent,
    pub data: ProviderPaymentData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_body_parses() {
        let body = serde_json::json!({
            "event": "payment.completed",
            "data": {
                "payment_id": "pp_1",
                "reference": "ref-42",
                "status": "success",
                "amount": 10_000_000,
                "currency": "SLE",
                "transaction_id": "txn_9",
                "metadata": { "channel": "mobile_money" }
            }
        });
        let webhook: ProviderWebhook = serde_json::from_value(body).unwrap();
        assert_eq!(webhook.event, ProviderEvent::PaymentCompleted);
        assert_eq!(webhook.data.status, ProviderStatus::Completed);
        assert_eq!(webhook.data.reference, "ref-42");
        assert_eq!(webhook.data.metadata.channel.as_deref(), Some("mobile_money"));
    }

    #[test]
    fn missing_optional_fields_default() {
        let body = serde_json::json!({
            "event": "payment.updated",
            "data": {
                "payment_id": "pp_2",
                "reference": "ref-7",
                "status": "processing",
                "amount": 5_000,
                "currency": "USD"
            }
        });
        let webhook: ProviderWebhook = serde_json::from_value(body).unwrap();
        assert!(webhook.data.transaction_id.is_none());
        assert_eq!(webhook.data.metadata, ProviderMetadata::default());
    }

    #[test]
    fn provider_status_maps_to_payment_status() {
        assert_eq!(
            PaymentStatus::from(ProviderStatus::Completed),
            PaymentStatus::Completed
        );
        assert_eq!(
            PaymentStatus::from(ProviderStatus::Processing),
            PaymentStatus::Processing
        );
    }
}
