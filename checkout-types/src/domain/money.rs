//! Type-safe monetary values with embedded currency.

use exchange_rates::{Converter, Currency};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Type-safe money representation with embedded currency.
///
/// Amount is stored in the smallest unit of the currency (cents, paise)
/// to avoid floating-point precision issues. Order money is always a
/// positive amount; zero-value charges are rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value. Amount must be strictly positive.
    pub fn new(amount: i64, currency: Currency) -> Result<Self, DomainError> {
        if amount <= 0 {
            return Err(DomainError::NonPositiveAmount(amount));
        }
        Ok(Self { amount, currency })
    }

    /// Returns the amount in smallest currency unit.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Checked addition - returns error if currencies don't match.
    pub fn checked_add(&self, other: Money) -> Result<Money, DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency,
                got: other.currency,
            });
        }
        Ok(Money {
            amount: self.amount.saturating_add(other.amount),
            currency: self.currency,
        })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let per_major = self.currency.minor_units_per_major();
        let major = self.amount / per_major;
        let minor = (self.amount % per_major).abs();
        write!(f, "{}{}.{:02}", self.currency.symbol(), major, minor)
    }
}

/// Per-order amounts in every supported currency.
///
/// All three entries derive from one canonical amount: the caller's chosen
/// currency is stored verbatim, the other two go through the converter.
/// Invariant: every entry is positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CurrencyAmounts {
    pub usd: i64,
    pub eur: i64,
    pub inr: i64,
}

impl CurrencyAmounts {
    pub fn new(usd: i64, eur: i64, inr: i64) -> Result<Self, DomainError> {
        for amount in [usd, eur, inr] {
            if amount <= 0 {
                return Err(DomainError::NonPositiveAmount(amount));
            }
        }
        Ok(Self { usd, eur, inr })
    }

    /// Derives the triple from the caller's authoritative amount.
    ///
    /// The chosen currency is never re-derived; only the two others pass
    /// through the converter (which may degrade to identity on a rate
    /// outage - amounts stay positive either way).
    pub fn derive(
        total: i64,
        chosen: Currency,
        converter: &Converter,
    ) -> Result<Self, DomainError> {
        if total <= 0 {
            return Err(DomainError::NonPositiveAmount(total));
        }
        let amount_in = |target: Currency| {
            if target == chosen {
                total
            } else {
                converter.convert(total, chosen, target)
            }
        };
        Self::new(
            amount_in(Currency::USD),
            amount_in(Currency::EUR),
            amount_in(Currency::INR),
        )
    }

    pub fn get(&self, currency: Currency) -> i64 {
        match currency {
            Currency::USD => self.usd,
            Currency::EUR => self.eur,
            Currency::INR => self.inr,
        }
    }
}
