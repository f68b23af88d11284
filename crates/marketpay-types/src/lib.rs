//! MarketPay Types - Canonical domain types for marketplace settlement
//!
//! This crate contains all foundational types for MarketPay with zero
//! dependencies on other marketpay crates. It defines:
//!
//! - Identity types (OrderId, EscrowId, DisputeId, UserId, PaymentId)
//! - Minor-unit money with currency-aware checked arithmetic
//! - The escrow record and its closed status domain
//! - The order boundary record with its denormalized payment sub-record
//! - Dispute records and their resolution outcomes
//! - Payment-provider wire types, normalized at the ingress boundary
//! - The settlement error taxonomy
//!
//! # Architectural Invariants
//!
//! These types back the core settlement invariants:
//!
//! 1. Escrow status only advances through the ledger's transition table
//! 2. `released_at` and `refunded_at` are mutually exclusive, set at most once
//! 3. The payment provider reference is the idempotency key for reconciliation
//! 4. Every status domain is a closed enum, never a loosely-validated string

pub mod identity;
pub mod money;
pub mod escrow;
pub mod order;
pub mod dispute;
pub mod provider;
pub mod error;

pub use identity::*;
pub use money::*;
pub use escrow::*;
pub use order::*;
pub use dispute::*;
pub use provider::*;
pub use error::*;
