//! MarketPay Reconciler - converging payment signals
//!
//! Two independent ingestion paths feed the same normalization logic: the
//! inbound provider webhook and the client-driven status poll. Both are
//! safe to invoke repeatedly for the same event (at-least-once delivery is
//! assumed) and both converge on [`Reconciler::reconcile`], which locates
//! the order by its payment reference - the idempotency key - and drives
//! the escrow ledger only on the transition to `completed`.

pub mod client;
pub mod signature;

pub use client::{HttpProviderClient, ProviderClient};
pub use signature::WebhookVerifier;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use marketpay_escrow as ledger;
use marketpay_orders::{dispatch, mirror_escrow, settlement_notices, Notifier};
use marketpay_store::Datastore;
use marketpay_types::{
    PaymentStatus, ProviderPaymentData, ProviderWebhook, Result, SettleError, Transition,
};

/// Observable result of feeding one payment signal through reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The payment sub-record moved to a new status
    Applied {
        payment_status: PaymentStatus,
        /// True if this signal also funded the escrow
        escrow_funded: bool,
    },
    /// The payment was already `completed`; duplicate delivery, nothing done
    AlreadyCompleted,
    /// Same status re-delivered before completion; nothing done
    Unchanged { payment_status: PaymentStatus },
}

/// Poll loop budget
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Wait between provider polls
    pub interval: Duration,
    /// Attempts before reporting a timeout (30 x 10s ~= 5 minutes)
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_attempts: 30,
        }
    }
}

/// Normalizes provider signals into ledger-understood events
#[derive(Clone)]
pub struct Reconciler {
    store: Datastore,
    notifier: Arc<dyn Notifier>,
}

impl Reconciler {
    pub fn new(store: Datastore, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Apply a verified inbound webhook. Signature verification happens
    /// before this point, against the raw body.
    pub async fn apply_notification(&self, webhook: &ProviderWebhook) -> Result<ReconcileOutcome> {
        debug!(event = ?webhook.event, reference = %webhook.data.reference, "webhook received");
        self.reconcile(&webhook.data).await
    }

    /// Converge one provider signal with the stored payment record.
    ///
    /// Repeated notifications for an already-completed payment are detected
    /// and short-circuited to a successful no-op; this is the idempotency
    /// contract that makes duplicate webhook delivery safe.
    pub async fn reconcile(&self, data: &ProviderPaymentData) -> Result<ReconcileOutcome> {
        let data = data.clone();
        let (outcome, notices) = self
            .store
            .write(move |txn| {
                let mut order = txn.order_by_reference(&data.reference)?;

                if order.payment.status == PaymentStatus::Completed {
                    debug!(
                        reference = %data.reference,
                        transaction_id = ?data.transaction_id,
                        "payment already completed, duplicate signal ignored"
                    );
                    return Ok((ReconcileOutcome::AlreadyCompleted, vec![]));
                }

                let new_status = PaymentStatus::from(data.status);
                if order.payment.status == new_status {
                    return Ok((
                        ReconcileOutcome::Unchanged {
                            payment_status: new_status,
                        },
                        vec![],
                    ));
                }

                let now = Utc::now();
                order.payment.status = new_status;
                if data.transaction_id.is_some() {
                    order.payment.external_transaction_id = data.transaction_id.clone();
                }
                order.payment.updated_at = now;

                let mut notices = vec![];
                let mut escrow_funded = false;

                if new_status == PaymentStatus::Completed {
                    if data.money() != order.payment.amount {
                        return Err(SettleError::validation(
                            "amount",
                            format!(
                                "provider reported {} but the order expects {}",
                                data.money(),
                                order.payment.amount
                            ),
                        ));
                    }
                    order.payment.completed_at = Some(now);
                    txn.update_order(order.clone())?;

                    let escrow = txn.escrow_by_order(order.id)?;
                    if let Transition::Applied(escrow) =
                        ledger::mark_funded(txn, escrow.id, now)?
                    {
                        mirror_escrow(txn, &escrow)?;
                        notices = settlement_notices(&escrow);
                        escrow_funded = true;
                    }
                } else {
                    txn.update_order(order)?;
                }

                Ok((
                    ReconcileOutcome::Applied {
                        payment_status: new_status,
                        escrow_funded,
                    },
                    notices,
                ))
            })
            .await?;

        if let ReconcileOutcome::Applied { payment_status, .. } = outcome {
            info!(payment_status = %payment_status, "payment record reconciled");
        }
        dispatch(&self.notifier, notices).await;
        Ok(outcome)
    }

    /// Normalized payment status for a reference, for the status endpoint
    pub async fn payment_status(&self, reference: &str) -> Result<PaymentStatus> {
        Ok(self.store.order_by_reference(reference).await?.payment.status)
    }

    /// Poll the provider at a bounded interval until a terminal status is
    /// observed, reconciling every observation along the way.
    ///
    /// Gateway errors consume an attempt and are retried; exhaustion of the
    /// budget reports [`SettleError::PollTimeout`], distinct from a payment
    /// that terminally `failed`. Callers cancel by dropping the future.
    pub async fn poll_until_terminal(
        &self,
        client: &dyn ProviderClient,
        reference: &str,
        config: &PollConfig,
    ) -> Result<PaymentStatus> {
        for attempt in 1..=config.max_attempts {
            match client.payment_status(reference).await {
                Ok(data) => {
                    let status = PaymentStatus::from(data.status);
                    self.reconcile(&data).await?;
                    if status.is_terminal() {
                        info!(%reference, %status, attempt, "poll observed terminal status");
                        return Ok(status);
                    }
                    debug!(%reference, %status, attempt, "payment not yet terminal");
                }
                Err(err) if err.is_retriable() => {
                    warn!(%reference, attempt, error = %err, "provider poll failed, will retry");
                }
                Err(err) => return Err(err),
            }

            if attempt < config.max_attempts {
                tokio::time::sleep(config.interval).await;
            }
        }

        Err(SettleError::PollTimeout {
            reference: reference.to_string(),
            attempts: config.max_attempts,
        })
    }
}
