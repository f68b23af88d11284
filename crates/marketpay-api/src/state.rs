//! Application state shared across handlers

use std::sync::Arc;

use marketpay_disputes::DisputeController;
use marketpay_orders::Notifier;
use marketpay_reconciler::{PollConfig, ProviderClient, Reconciler, WebhookVerifier};
use marketpay_store::Datastore;

/// Shared application state
///
/// Identity is supplied by the surrounding platform: party ids arrive in
/// request bodies from the trusted gateway, and admin actions carry the
/// shared `x-admin-key` header.
#[derive(Clone)]
pub struct AppState {
    pub store: Datastore,
    pub notifier: Arc<dyn Notifier>,
    pub reconciler: Reconciler,
    pub disputes: DisputeController,
    pub provider: Arc<dyn ProviderClient>,
    pub poll: PollConfig,
    pub verifier: WebhookVerifier,
    pub admin_key: String,
}

impl AppState {
    pub fn new(
        store: Datastore,
        notifier: Arc<dyn Notifier>,
        provider: Arc<dyn ProviderClient>,
        poll: PollConfig,
        webhook_secret: impl Into<Vec<u8>>,
        admin_key: impl Into<String>,
    ) -> Self {
        let reconciler = Reconciler::new(store.clone(), notifier.clone());
        let disputes = DisputeController::new(store.clone(), notifier.clone());
        Self {
            store,
            notifier,
            reconciler,
            disputes,
            provider,
            poll,
            verifier: WebhookVerifier::new(webhook_secret),
            admin_key: admin_key.into(),
        }
    }
}
