//! Payment provider client
//!
//! The poll path asks the provider for the current status of a reference.
//! The client sits behind a trait so tests can script provider behavior
//! without a network.

use async_trait::async_trait;
use tracing::debug;

use marketpay_types::{ProviderPaymentData, Result, SettleError};

/// Client-side view of the payment provider's status API
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Current status of payment reference `reference` at the provider
    async fn payment_status(&self, reference: &str) -> Result<ProviderPaymentData>;
}

/// HTTP implementation against the provider's REST API
pub struct HttpProviderClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpProviderClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn payment_status(&self, reference: &str) -> Result<ProviderPaymentData> {
        let url = format!("{}/v1/payments/{}", self.base_url, reference);
        debug!(%url, "polling provider for payment status");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|err| SettleError::ExternalGateway {
                reason: err.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(SettleError::ExternalGateway {
                reason: format!("provider returned {}", response.status()),
            });
        }

        response
            .json::<ProviderPaymentData>()
            .await
            .map_err(|err| SettleError::ExternalGateway {
                reason: format!("malformed provider response: {err}"),
            })
    }
}
