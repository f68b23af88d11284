//! MarketPay Scheduler - deadline-driven auto release
//!
//! A periodic sweep over escrows sitting in `pending_confirmation` whose
//! buyer-confirmation window has lapsed. Each candidate is advanced through
//! the same conditional ledger transition every other actor uses, so a
//! buyer confirmation or dispute freeze that lands first simply wins the
//! race and the sweep moves on. Store errors on one candidate never stop
//! the sweep; the escrow stays due and is retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use marketpay_escrow as ledger;
use marketpay_orders::{dispatch, mirror_escrow, settlement_notices, Notifier};
use marketpay_store::Datastore;
use marketpay_types::Transition;

/// Background job that releases escrows past their confirmation deadline
pub struct AutoReleaseJob {
    store: Datastore,
    notifier: Arc<dyn Notifier>,
    period: Duration,
}

impl AutoReleaseJob {
    pub fn new(store: Datastore, notifier: Arc<dyn Notifier>, period: Duration) -> Self {
        Self {
            store,
            notifier,
            period,
        }
    }

    /// One sweep over all due escrows; returns how many were released.
    ///
    /// Each candidate gets its own write unit so one poisoned record cannot
    /// hold back the rest of the batch.
    pub async fn run_once(&self, now: DateTime<Utc>) -> usize {
        let due = self.store.due_for_auto_release(now).await;
        if due.is_empty() {
            return 0;
        }
        debug!(candidates = due.len(), "auto-release sweep started");

        let mut released = 0;
        for candidate in due {
            let outcome = self
                .store
                .write(|txn| match ledger::auto_release(txn, candidate.id, now)? {
                    Transition::Applied(escrow) => {
                        mirror_escrow(txn, &escrow)?;
                        Ok(Transition::Applied(escrow))
                    }
                    noop => Ok(noop),
                })
                .await;

            match outcome {
                Ok(Transition::Applied(escrow)) => {
                    released += 1;
                    info!(
                        escrow_id = %escrow.id,
                        order_id = %escrow.order_id,
                        amount = %escrow.amount,
                        "confirmation window lapsed, funds released to vendor"
                    );
                    dispatch(&self.notifier, settlement_notices(&escrow)).await;
                }
                Ok(Transition::NoOp { actual }) => {
                    // Another actor settled or froze the escrow between the
                    // scan and the write; the lost race is the correct outcome.
                    debug!(escrow_id = %candidate.id, status = %actual, "auto-release pre-empted");
                }
                Err(err) => {
                    warn!(
                        escrow_id = %candidate.id,
                        error = %err,
                        "auto-release failed, retrying on next sweep"
                    );
                }
            }
        }
        released
    }

    /// Run the sweep loop until the shutdown signal flips.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(period_secs = self.period.as_secs(), "auto-release scheduler running");
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once(Utc::now()).await;
                }
                _ = shutdown.changed() => {
                    info!("auto-release scheduler stopping");
                    return;
                }
            }
        }
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
