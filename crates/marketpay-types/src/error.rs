//! Error taxonomy for MarketPay settlement
//!
//! Every failure mode a caller can observe is explicit here. Lost races on
//! the escrow state machine are NOT errors - the ledger reports those as
//! no-op transition outcomes and callers decide what they mean.

use thiserror::Error;

/// Result type for MarketPay operations
pub type Result<T> = std::result::Result<T, SettleError>;

/// MarketPay settlement error types
#[derive(Debug, Clone, Error)]
pub enum SettleError {
    // ========================================================================
    // Validation Errors
    // ========================================================================

    /// Bad input from a caller
    #[error("Invalid input: {field} - {reason}")]
    Validation { field: String, reason: String },

    /// Currency mismatch
    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch { expected: String, actual: String },

    /// Amount arithmetic overflowed
    #[error("Amount overflow during arithmetic operation")]
    AmountOverflow,

    /// Settlement amount outside the escrowed bounds
    #[error("Amount {requested} is outside the escrowed amount {held}")]
    AmountOutOfRange { requested: String, held: String },

    // ========================================================================
    // Not-Found Errors
    // ========================================================================

    /// No order correlates to a payment reference
    #[error("No order found for payment reference {reference}")]
    OrderNotFound { reference: String },

    /// Escrow not found
    #[error("Escrow {escrow_id} not found")]
    EscrowNotFound { escrow_id: String },

    /// Dispute not found
    #[error("Dispute {dispute_id} not found")]
    DisputeNotFound { dispute_id: String },

    // ========================================================================
    // Authorization Errors
    // ========================================================================

    /// Bad signature or insufficient role; always logged as a security event
    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// Webhook body did not match its signature header
    #[error("Invalid webhook signature")]
    InvalidSignature,

    // ========================================================================
    // Conflict Errors
    // ========================================================================

    /// Illegal state transition or a lost race surfaced to a direct actor
    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    /// An open dispute already exists for the order
    #[error("Order {order_id} already has an open dispute")]
    DisputeAlreadyOpen { order_id: String },

    // ========================================================================
    // External Provider Errors
    // ========================================================================

    /// Provider communication failure; retryable by the poller
    #[error("Payment provider error: {reason}")]
    ExternalGateway { reason: String },

    /// Poll budget exhausted without observing a terminal status
    #[error("Payment status poll timed out for reference {reference} after {attempts} attempts")]
    PollTimeout { reference: String, attempts: u32 },

    // ========================================================================
    // General Errors
    // ========================================================================

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SettleError {
    /// Create a validation error
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if a caller may retry this error
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::ExternalGateway { .. } | Self::Internal { .. }
        )
    }

    /// Get an error code for API responses and logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::AmountOutOfRange { .. } => "AMOUNT_OUT_OF_RANGE",
            Self::OrderNotFound { .. } => "ORDER_NOT_FOUND",
            Self::EscrowNotFound { .. } => "ESCROW_NOT_FOUND",
            Self::DisputeNotFound { .. } => "DISPUTE_NOT_FOUND",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::Conflict { .. } => "CONFLICT",
            Self::DisputeAlreadyOpen { .. } => "DISPUTE_ALREADY_OPEN",
            Self::ExternalGateway { .. } => "EXTERNAL_GATEWAY_ERROR",
            Self::PollTimeout { .. } => "POLL_TIMEOUT",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}
