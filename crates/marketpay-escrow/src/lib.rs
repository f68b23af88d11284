//! MarketPay Escrow - the ledger state machine
//!
//! Owns the per-order escrow record. Every transition is a single atomic
//! conditional update: the new status is written only if the current status
//! matches the expected prior state. A mismatch is not an error - it means
//! the transition already happened or was pre-empted, and is reported as a
//! [`Transition::NoOp`] for the caller to interpret.
//!
//! Transition table:
//!
//! | From                   | Event                    | To                  |
//! |------------------------|--------------------------|---------------------|
//! | pending                | funds confirmed          | funded              |
//! | pending                | cancelled before funding | cancelled           |
//! | funded                 | delivery marked          | pending_confirmation|
//! | pending_confirmation   | buyer confirms           | released_to_vendor  |
//! | pending_confirmation   | deadline elapsed         | released_to_vendor  |
//! | funded, pending_conf.  | dispute opened           | disputed            |
//! | disputed               | admin favors vendor      | released_to_vendor  |
//! | disputed               | admin favors buyer       | refunded_to_buyer   |
//!
//! All functions take the explicit write-transaction context so a ledger
//! change and its paired order/dispute updates commit or roll back together.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use marketpay_store::WriteTxn;
use marketpay_types::{
    DisputeId, Escrow, EscrowId, EscrowStatus, Money, PaymentId, PayoutStatus, RefundReason,
    ReleaseReason, Result, SettleError, Transition,
};

/// `pending -> funded`: the reconciler confirmed incoming funds.
///
/// Sets `funded_at` and computes `auto_release_date` as a long-stop
/// fallback; the authoritative short-stop deadline is set at delivery.
pub fn mark_funded(txn: &mut WriteTxn, escrow_id: EscrowId, now: DateTime<Utc>) -> Result<Transition> {
    let outcome = txn.escrow_transition(escrow_id, &[EscrowStatus::Pending], |e| {
        e.status = EscrowStatus::Funded;
        e.funded_at = Some(now);
        e.auto_release_date = Some(now + Duration::days(e.auto_release_after_days));
    })?;
    if let Transition::Applied(e) = &outcome {
        info!(escrow_id = %e.id, amount = %e.amount, "escrow funded");
    }
    Ok(outcome)
}

/// `pending -> cancelled`: buyer or vendor cancels before funding.
pub fn cancel(txn: &mut WriteTxn, escrow_id: EscrowId) -> Result<Transition> {
    txn.escrow_transition(escrow_id, &[EscrowStatus::Pending], |e| {
        e.status = EscrowStatus::Cancelled;
    })
}

/// `funded -> pending_confirmation`: vendor marked delivery.
///
/// The confirmation deadline is derived deterministically as
/// `delivered_at + auto_release_after_days`.
pub fn mark_delivered(
    txn: &mut WriteTxn,
    escrow_id: EscrowId,
    now: DateTime<Utc>,
) -> Result<Transition> {
    let outcome = txn.escrow_transition(escrow_id, &[EscrowStatus::Funded], |e| {
        e.status = EscrowStatus::PendingConfirmation;
        e.delivered_at = Some(now);
        e.confirmation_deadline = Some(now + Duration::days(e.auto_release_after_days));
    })?;
    if let Transition::Applied(e) = &outcome {
        info!(
            escrow_id = %e.id,
            deadline = ?e.confirmation_deadline,
            "delivery marked, confirmation window open"
        );
    }
    Ok(outcome)
}

/// `pending_confirmation -> released_to_vendor` by explicit buyer approval.
pub fn confirm_receipt(
    txn: &mut WriteTxn,
    escrow_id: EscrowId,
    now: DateTime<Utc>,
) -> Result<Transition> {
    txn.escrow_transition(escrow_id, &[EscrowStatus::PendingConfirmation], |e| {
        e.buyer_confirmed_at = Some(now);
        let full = e.amount;
        settle_release(e, ReleaseReason::BuyerApproval, full, now);
    })
}

/// `pending_confirmation -> released_to_vendor` by the lapsed deadline.
///
/// Scheduler-driven; a `NoOp` here is an expected race loss against buyer
/// confirmation or a dispute freeze, never an error.
pub fn auto_release(
    txn: &mut WriteTxn,
    escrow_id: EscrowId,
    now: DateTime<Utc>,
) -> Result<Transition> {
    txn.escrow_transition(escrow_id, &[EscrowStatus::PendingConfirmation], |e| {
        let full = e.amount;
        settle_release(e, ReleaseReason::AutoRelease, full, now);
    })
}

/// `funded | pending_confirmation -> disputed`: freeze pending resolution.
pub fn freeze_for_dispute(
    txn: &mut WriteTxn,
    escrow_id: EscrowId,
    dispute_id: DisputeId,
) -> Result<Transition> {
    txn.escrow_transition(
        escrow_id,
        &[EscrowStatus::Funded, EscrowStatus::PendingConfirmation],
        |e| {
            e.status = EscrowStatus::Disputed;
            e.dispute_id = Some(dispute_id);
        },
    )
}

/// `disputed -> released_to_vendor`: admin resolution favoring the vendor.
///
/// `amount` defaults to the full escrowed amount; an explicit amount must
/// satisfy `0 < amount <= escrow.amount`.
pub fn resolve_release(
    txn: &mut WriteTxn,
    escrow_id: EscrowId,
    amount: Option<Money>,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<Transition> {
    let settled = validate_settlement_amount(&txn.escrow(escrow_id)?, amount)?;
    txn.escrow_transition(escrow_id, &[EscrowStatus::Disputed], |e| {
        settle_release(e, ReleaseReason::DisputeResolution, settled, now);
        e.admin_notes = notes;
    })
}

/// `disputed -> refunded_to_buyer`: admin resolution favoring the buyer.
pub fn resolve_refund(
    txn: &mut WriteTxn,
    escrow_id: EscrowId,
    amount: Option<Money>,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<Transition> {
    let settled = validate_settlement_amount(&txn.escrow(escrow_id)?, amount)?;
    txn.escrow_transition(escrow_id, &[EscrowStatus::Disputed], |e| {
        e.status = EscrowStatus::RefundedToBuyer;
        e.refunded_at = Some(now);
        e.refund_reason = Some(RefundReason::DisputeResolution);
        e.refunded_amount = Some(settled);
        e.admin_notes = notes;
    })
}

fn settle_release(e: &mut Escrow, reason: ReleaseReason, amount: Money, now: DateTime<Utc>) {
    e.status = EscrowStatus::ReleasedToVendor;
    e.released_at = Some(now);
    e.release_reason = Some(reason);
    e.released_amount = Some(amount);
    e.payout_id = Some(PaymentId::new());
    e.payout_status = PayoutStatus::Scheduled;
}

fn validate_settlement_amount(escrow: &Escrow, amount: Option<Money>) -> Result<Money> {
    let Some(amount) = amount else {
        return Ok(escrow.amount);
    };
    escrow.amount.require_same_currency(amount)?;
    if !amount.is_positive() || amount.minor > escrow.amount.minor {
        return Err(SettleError::AmountOutOfRange {
            requested: amount.to_string(),
            held: escrow.amount.to_string(),
        });
    }
    Ok(amount)
}
