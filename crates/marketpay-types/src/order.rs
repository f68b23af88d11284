//! Order boundary record
//!
//! The order is external to the settlement core's ownership, but the core
//! reads and writes its `payment` sub-record (the reconciliation surface)
//! and mirrors ledger outcomes into its visible status. No other fields are
//! touched here.

use crate::{Money, OrderId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Buyer-visible order status, mirrored from escrow outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Delivered,
    Completed,
    Refunded,
    Disputed,
    Cancelled,
}

/// Normalized payment status for the order's payment sub-record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    /// Terminal statuses stop the reconciler's poll loop
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// How the buyer paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    MobileMoney,
    Card,
    BankTransfer,
}

/// Denormalized payment sub-record held on the order
///
/// `reference` is the provider-supplied idempotency key; the datastore
/// enforces its uniqueness and indexes orders by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub provider: String,
    pub method: PaymentMethod,
    pub reference: String,
    pub external_transaction_id: Option<String>,
    pub status: PaymentStatus,
    /// Amount/currency snapshot taken at initiation
    pub amount: Money,
    pub initiated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Start a payment record at initiation time
    pub fn initiate(
        provider: impl Into<String>,
        method: PaymentMethod,
        reference: impl Into<String>,
        amount: Money,
    ) -> Self {
        let now = Utc::now();
        Self {
            provider: provider.into(),
            method,
            reference: reference.into(),
            external_transaction_id: None,
            status: PaymentStatus::Pending,
            amount,
            initiated_at: now,
            completed_at: None,
            updated_at: now,
        }
    }
}

/// A marketplace order, seen through the settlement core's boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: UserId,
    pub vendor_id: UserId,
    pub status: OrderStatus,
    pub payment: PaymentRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(buyer_id: UserId, vendor_id: UserId, payment: PaymentRecord) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            buyer_id,
            vendor_id,
            status: OrderStatus::Pending,
            payment,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether a user is a party (buyer or vendor) to this order
    pub fn is_party(&self, user: UserId) -> bool {
        self.buyer_id == user || self.vendor_id == user
    }
}
