//! Dispute records
//!
//! A dispute freezes its escrow and hands the outcome to an admin. At most
//! one dispute may be open per order at a time; resolved disputes are
//! retained permanently.

use crate::{DisputeId, EscrowId, Money, OrderId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a dispute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    UnderReview,
    ResolvedBuyer,
    ResolvedVendor,
    Closed,
}

impl DisputeStatus {
    /// Check whether the dispute still accepts evidence and resolution
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Open | Self::UnderReview)
    }
}

/// Why the dispute was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeReason {
    ItemNotReceived,
    ItemNotAsDescribed,
    DamagedItem,
    WrongItem,
    UnauthorizedCharge,
    Other,
}

/// Which party the admin resolution favors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeOutcome {
    /// Refund the escrowed funds to the buyer
    FavorBuyer,
    /// Release the escrowed funds to the vendor
    FavorVendor,
}

/// A single piece of evidence attached to a dispute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisputeEvidence {
    pub submitted_by: UserId,
    /// Free-form content or a reference to an uploaded artifact
    pub content: String,
    pub submitted_at: DateTime<Utc>,
}

/// A dispute against an order's escrow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispute {
    pub id: DisputeId,
    pub order_id: OrderId,
    pub escrow_id: EscrowId,
    pub buyer_id: UserId,
    pub vendor_id: UserId,
    /// The party who opened the dispute (buyer or vendor)
    pub opened_by: UserId,
    pub reason: DisputeReason,
    pub description: String,
    pub evidence: Vec<DisputeEvidence>,
    pub status: DisputeStatus,
    /// Admin who took or resolved the dispute
    pub admin_id: Option<UserId>,
    pub resolution: Option<String>,
    /// Amount settled by the resolution (full escrow amount by default)
    pub refund_amount: Option<Money>,
    pub opened_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Dispute {
    pub fn open(
        order_id: OrderId,
        escrow_id: EscrowId,
        buyer_id: UserId,
        vendor_id: UserId,
        opened_by: UserId,
        reason: DisputeReason,
        description: impl Into<String>,
        evidence: Vec<DisputeEvidence>,
    ) -> Self {
        Self {
            id: DisputeId::new(),
            order_id,
            escrow_id,
            buyer_id,
            vendor_id,
            opened_by,
            reason,
            description: description.into(),
            evidence,
            status: DisputeStatus::Open,
            admin_id: None,
            resolution: None,
            refund_amount: None,
            opened_at: Utc::now(),
            resolved_at: None,
        }
    }

    /// Check whether a user is a party (buyer or vendor) to this dispute
    pub fn is_party(&self, user: UserId) -> bool {
        self.buyer_id == user || self.vendor_id == user
    }
}
