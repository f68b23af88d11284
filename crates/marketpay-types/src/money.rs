//! Minor-unit money types
//!
//! MarketPay stores all amounts in minor units (cents) as `i64` to keep
//! escrow arithmetic exact. Mixed-currency arithmetic is an error, never a
//! silent coercion.

use crate::{Result, SettleError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported settlement currencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Sierra Leonean leone
    Sle,
    /// United States dollar
    Usd,
}

impl Currency {
    /// Minor units per major unit (both supported currencies use 2 decimals)
    pub const fn minor_per_major(&self) -> i64 {
        100
    }

    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Sle => "SLE",
            Self::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// An exact amount in minor units of a single currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Value in minor units (e.g. cents)
    pub minor: i64,
    /// The currency
    pub currency: Currency,
}

impl Money {
    /// Create an amount from minor units
    pub fn new(minor: i64, currency: Currency) -> Self {
        Self { minor, currency }
    }

    /// Create an amount from whole major units
    pub fn from_major(major: i64, currency: Currency) -> Self {
        Self {
            minor: major * currency.minor_per_major(),
            currency,
        }
    }

    /// A zero amount
    pub fn zero(currency: Currency) -> Self {
        Self { minor: 0, currency }
    }

    pub fn is_zero(&self) -> bool {
        self.minor == 0
    }

    pub fn is_positive(&self) -> bool {
        self.minor > 0
    }

    /// Checked addition, rejecting mixed currencies and overflow
    pub fn checked_add(&self, other: Money) -> Result<Money> {
        self.require_same_currency(other)?;
        let minor = self
            .minor
            .checked_add(other.minor)
            .ok_or(SettleError::AmountOverflow)?;
        Ok(Money::new(minor, self.currency))
    }

    /// Checked subtraction, rejecting mixed currencies and overflow
    pub fn checked_sub(&self, other: Money) -> Result<Money> {
        self.require_same_currency(other)?;
        let minor = self
            .minor
            .checked_sub(other.minor)
            .ok_or(SettleError::AmountOverflow)?;
        Ok(Money::new(minor, self.currency))
    }

    /// Fail unless `other` is in the same currency
    pub fn require_same_currency(&self, other: Money) -> Result<()> {
        if self.currency != other.currency {
            return Err(SettleError::CurrencyMismatch {
                expected: self.currency.code().to_string(),
                actual: other.currency.code().to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let per = self.currency.minor_per_major();
        write!(
            f,
            "{}.{:02} {}",
            self.minor / per,
            (self.minor % per).abs(),
            self.currency
        )
    }
}
