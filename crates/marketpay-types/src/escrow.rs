//! Escrow record and its closed status domain
//!
//! One escrow exists per order (1:1, enforced by the datastore). The record
//! is mutated exclusively through the ledger's transition functions and is
//! never deleted - terminal states are retained for audit.

use crate::{DisputeId, EscrowId, Money, OrderId, PaymentId, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default buyer-confirmation window after delivery, in days
pub const DEFAULT_AUTO_RELEASE_DAYS: i64 = 3;

/// Status of an escrow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    /// Created at order placement, awaiting funds
    Pending,
    /// Funds confirmed by the payment reconciler
    Funded,
    /// Delivery marked; buyer-confirmation window running
    PendingConfirmation,
    /// Funds settled to the vendor
    ReleasedToVendor,
    /// Funds settled back to the buyer
    RefundedToBuyer,
    /// Frozen pending admin dispute resolution
    Disputed,
    /// Cancelled before funding
    Cancelled,
}

impl EscrowStatus {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ReleasedToVendor | Self::RefundedToBuyer | Self::Cancelled
        )
    }

    /// Check if a dispute may be opened in this state
    pub fn allows_dispute(&self) -> bool {
        matches!(self, Self::Funded | Self::PendingConfirmation)
    }
}

impl fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Funded => "funded",
            Self::PendingConfirmation => "pending_confirmation",
            Self::ReleasedToVendor => "released_to_vendor",
            Self::RefundedToBuyer => "refunded_to_buyer",
            Self::Disputed => "disputed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Why escrowed funds were released to the vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseReason {
    BuyerApproval,
    AutoRelease,
    AdminRelease,
    DisputeResolution,
}

/// Why escrowed funds were refunded to the buyer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    DisputeResolution,
    AdminRefund,
    OrderCancelled,
}

/// Status of the computed vendor payout.
///
/// Settlement only moves a payout to `Scheduled`; the external payout
/// system owns the transition to `Paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    NotDue,
    Scheduled,
    Paid,
}

/// The held-funds record tracking an order's payment through release or refund
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escrow {
    pub id: EscrowId,
    pub order_id: OrderId,
    pub buyer_id: UserId,
    pub vendor_id: UserId,

    /// Escrowed amount; immutable once status leaves `Pending`
    pub amount: Money,
    /// Platform fee withheld from the vendor payout
    pub transaction_fee: Money,
    /// Identifier of the vendor payout once scheduled
    pub payout_id: Option<PaymentId>,
    pub payout_status: PayoutStatus,

    pub status: EscrowStatus,

    /// Days after delivery before funds auto-release (short-stop deadline)
    pub auto_release_after_days: i64,
    pub requires_delivery_confirmation: bool,
    pub requires_buyer_approval: bool,

    pub funded_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    /// Authoritative deadline for auto-release, derived as
    /// `delivered_at + auto_release_after_days`
    pub confirmation_deadline: Option<DateTime<Utc>>,
    pub buyer_confirmed_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    /// Long-stop fallback computed at funding (`funded_at +
    /// auto_release_after_days`). Audit only - the scheduler is driven
    /// exclusively by `confirmation_deadline`.
    pub auto_release_date: Option<DateTime<Utc>>,

    pub release_reason: Option<ReleaseReason>,
    pub refund_reason: Option<RefundReason>,
    /// Amount actually released to the vendor (partial settlements allowed)
    pub released_amount: Option<Money>,
    /// Amount actually refunded to the buyer (partial settlements allowed)
    pub refunded_amount: Option<Money>,
    pub admin_notes: Option<String>,

    /// Linkage to the dispute that froze this escrow, if any
    pub dispute_id: Option<DisputeId>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Escrow {
    /// Create a new escrow in `Pending` for an order placement
    pub fn new(
        order_id: OrderId,
        buyer_id: UserId,
        vendor_id: UserId,
        amount: Money,
        transaction_fee: Money,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: EscrowId::new(),
            order_id,
            buyer_id,
            vendor_id,
            amount,
            transaction_fee,
            payout_id: None,
            payout_status: PayoutStatus::NotDue,
            status: EscrowStatus::Pending,
            auto_release_after_days: DEFAULT_AUTO_RELEASE_DAYS,
            requires_delivery_confirmation: true,
            requires_buyer_approval: true,
            funded_at: None,
            delivered_at: None,
            confirmation_deadline: None,
            buyer_confirmed_at: None,
            released_at: None,
            refunded_at: None,
            auto_release_date: None,
            release_reason: None,
            refund_reason: None,
            released_amount: None,
            refunded_amount: None,
            admin_notes: None,
            dispute_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The confirmation window as a chrono duration
    pub fn confirmation_window(&self) -> Duration {
        Duration::days(self.auto_release_after_days)
    }

    /// Amount due to the vendor after the platform fee
    pub fn vendor_payout(&self) -> Money {
        Money::new(
            self.amount.minor - self.transaction_fee.minor,
            self.amount.currency,
        )
    }

    /// Check whether funds have settled either way
    pub fn is_settled(&self) -> bool {
        self.released_at.is_some() || self.refunded_at.is_some()
    }
}

/// Outcome of a guarded escrow transition
///
/// A `NoOp` means the record's status did not match the expected prior
/// state at write time: the transition already happened or was pre-empted.
/// Callers decide whether that is expected (scheduler, duplicate webhook)
/// or a user-visible conflict (explicit buyer confirm).
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The conditional update applied; carries the updated record
    Applied(Escrow),
    /// The guard saw a different status; nothing was written
    NoOp { actual: EscrowStatus },
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// Unwrap an applied transition, mapping a lost race to a conflict
    pub fn require_applied(self, action: &str) -> crate::Result<Escrow> {
        match self {
            Self::Applied(escrow) => Ok(escrow),
            Self::NoOp { actual } => Err(crate::SettleError::conflict(format!(
                "{action} is not possible: escrow is {actual}"
            ))),
        }
    }
}
