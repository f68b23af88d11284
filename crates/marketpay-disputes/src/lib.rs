//! MarketPay Disputes - the only actor allowed to force settlement
//!
//! Opening a dispute freezes the escrow; resolving one is the only path to
//! a release or refund outside the normal delivery-confirmation flow. Each
//! operation runs in a single write unit so the dispute and escrow records
//! never disagree about the outcome.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use marketpay_escrow as ledger;
use marketpay_orders::{dispatch, mirror_escrow, settlement_notices, Notifier};
use marketpay_store::Datastore;
use marketpay_types::{
    Dispute, DisputeEvidence, DisputeId, DisputeOutcome, DisputeReason, DisputeStatus, Money,
    OrderId, Result, SettleError, Transition, UserId,
};

/// Opens, triages and resolves disputes against escrows
#[derive(Clone)]
pub struct DisputeController {
    store: Datastore,
    notifier: Arc<dyn Notifier>,
}

impl DisputeController {
    pub fn new(store: Datastore, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Open a dispute for an order, freezing its escrow.
    ///
    /// The actor must be the order's buyer or vendor, no other dispute may
    /// be active for the order, and the escrow must currently hold funds
    /// (`funded` or `pending_confirmation`).
    pub async fn open_dispute(
        &self,
        order_id: OrderId,
        actor: UserId,
        reason: DisputeReason,
        description: String,
        evidence: Vec<String>,
    ) -> Result<Dispute> {
        let (dispute, notices) = self
            .store
            .write(move |txn| {
                let order = txn.order(order_id)?;
                if !order.is_party(actor) {
                    return Err(SettleError::unauthorized(
                        "only the buyer or vendor on the order may open a dispute",
                    ));
                }
                if txn.active_dispute_for_order(order_id).is_some() {
                    return Err(SettleError::DisputeAlreadyOpen {
                        order_id: order_id.to_string(),
                    });
                }

                let escrow = txn.escrow_by_order(order_id)?;
                let now = Utc::now();
                let dispute = Dispute::open(
                    order_id,
                    escrow.id,
                    order.buyer_id,
                    order.vendor_id,
                    actor,
                    reason,
                    description,
                    evidence
                        .into_iter()
                        .map(|content| DisputeEvidence {
                            submitted_by: actor,
                            content,
                            submitted_at: now,
                        })
                        .collect(),
                );

                let escrow = match ledger::freeze_for_dispute(txn, escrow.id, dispute.id)? {
                    Transition::Applied(escrow) => escrow,
                    Transition::NoOp { actual } => {
                        return Err(SettleError::conflict(format!(
                            "a dispute can only be opened while funds are held; escrow is {actual}"
                        )))
                    }
                };
                mirror_escrow(txn, &escrow)?;
                txn.insert_dispute(dispute.clone())?;

                Ok((dispute, settlement_notices(&escrow)))
            })
            .await?;

        info!(dispute_id = %dispute.id, order_id = %dispute.order_id, "dispute opened");
        dispatch(&self.notifier, notices).await;
        Ok(dispute)
    }

    /// Move an open dispute into admin review
    pub async fn mark_under_review(&self, dispute_id: DisputeId, admin_id: UserId) -> Result<Dispute> {
        self.store
            .write(move |txn| {
                let mut dispute = txn.dispute(dispute_id)?;
                if dispute.status != DisputeStatus::Open {
                    return Err(SettleError::conflict(format!(
                        "dispute cannot enter review from {:?}",
                        dispute.status
                    )));
                }
                dispute.status = DisputeStatus::UnderReview;
                dispute.admin_id = Some(admin_id);
                txn.update_dispute(dispute.clone())?;
                Ok(dispute)
            })
            .await
    }

    /// Attach evidence to an active dispute; the submitter must be a party
    pub async fn add_evidence(
        &self,
        dispute_id: DisputeId,
        actor: UserId,
        content: String,
    ) -> Result<Dispute> {
        self.store
            .write(move |txn| {
                let mut dispute = txn.dispute(dispute_id)?;
                if !dispute.is_party(actor) {
                    return Err(SettleError::unauthorized(
                        "only the buyer or vendor on the dispute may submit evidence",
                    ));
                }
                if !dispute.status.is_active() {
                    return Err(SettleError::conflict(
                        "evidence cannot be added to a resolved dispute",
                    ));
                }
                dispute.evidence.push(DisputeEvidence {
                    submitted_by: actor,
                    content,
                    submitted_at: Utc::now(),
                });
                txn.update_dispute(dispute.clone())?;
                Ok(dispute)
            })
            .await
    }

    /// Resolve a dispute, forcing the escrow to settle.
    ///
    /// `amount` defaults to the full escrowed amount; partial settlements
    /// are recorded on both the escrow and the dispute. The dispute and
    /// escrow update in the same write unit.
    pub async fn resolve_dispute(
        &self,
        dispute_id: DisputeId,
        admin_id: UserId,
        outcome: DisputeOutcome,
        amount: Option<Money>,
        resolution: Option<String>,
    ) -> Result<Dispute> {
        let (dispute, notices) = self
            .store
            .write(move |txn| {
                let mut dispute = txn.dispute(dispute_id)?;
                if dispute.is_party(admin_id) {
                    return Err(SettleError::unauthorized(
                        "a party to the dispute cannot resolve it",
                    ));
                }
                if !dispute.status.is_active() {
                    return Err(SettleError::conflict(format!(
                        "dispute is already {:?}",
                        dispute.status
                    )));
                }

                let now = Utc::now();
                let transition = match outcome {
                    DisputeOutcome::FavorVendor => ledger::resolve_release(
                        txn,
                        dispute.escrow_id,
                        amount,
                        resolution.clone(),
                        now,
                    )?,
                    DisputeOutcome::FavorBuyer => ledger::resolve_refund(
                        txn,
                        dispute.escrow_id,
                        amount,
                        resolution.clone(),
                        now,
                    )?,
                };
                let escrow = match transition {
                    Transition::Applied(escrow) => escrow,
                    Transition::NoOp { actual } => {
                        return Err(SettleError::conflict(format!(
                            "dispute resolution requires a disputed escrow; escrow is {actual}"
                        )))
                    }
                };
                mirror_escrow(txn, &escrow)?;

                dispute.status = match outcome {
                    DisputeOutcome::FavorVendor => DisputeStatus::ResolvedVendor,
                    DisputeOutcome::FavorBuyer => DisputeStatus::ResolvedBuyer,
                };
                dispute.admin_id = Some(admin_id);
                dispute.resolution = resolution;
                dispute.refund_amount = escrow.refunded_amount.or(escrow.released_amount);
                dispute.resolved_at = Some(now);
                txn.update_dispute(dispute.clone())?;

                Ok((dispute, settlement_notices(&escrow)))
            })
            .await?;

        info!(
            dispute_id = %dispute.id,
            status = ?dispute.status,
            "dispute resolved"
        );
        dispatch(&self.notifier, notices).await;
        Ok(dispute)
    }
}
