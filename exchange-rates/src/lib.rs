//! Currency support and amount conversion for the checkout pipeline.
//!
//! Conversion goes through a [`RateSource`], so rate lookup can be swapped
//! (fixed table, cache-backed feed, mock). The [`Converter`] wraps a source
//! with the policy the purchase flow requires: a rate-lookup outage must not
//! block a purchase, so [`Converter::convert`] falls back to returning the
//! amount unconverted and callers that need guaranteed accuracy check
//! [`Converter::healthy`] as a side channel.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use exchange_rates::{Converter, Currency, FixedRates};
//!
//! let converter = Converter::new(Arc::new(FixedRates::new()));
//! let rupees = converter.convert(10_000, Currency::USD, Currency::INR);
//! assert!(rupees > 10_000);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Currencies
// ─────────────────────────────────────────────────────────────────────────────

/// Currencies an order can be denominated in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    USD,
    EUR,
    INR,
}

impl Currency {
    /// ISO 4217 code.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::INR => "INR",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::INR => "₹",
        }
    }

    /// Minor units per major unit (cents, paise).
    pub fn minor_units_per_major(&self) -> i64 {
        match self {
            Currency::USD | Currency::EUR | Currency::INR => 100,
        }
    }

    pub fn all() -> &'static [Currency] {
        &[Currency::USD, Currency::EUR, Currency::INR]
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "INR" => Ok(Currency::INR),
            other => Err(RateError::UnsupportedCurrency(other.to_string())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rate source port
// ─────────────────────────────────────────────────────────────────────────────

/// Error type for rate lookups.
#[derive(Debug, thiserror::Error)]
pub enum RateError {
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Rate source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Rate not available for {0} -> {1}")]
    RateNotAvailable(Currency, Currency),
}

/// Port trait for exchange rate lookups.
///
/// Returns how many units of `to` one unit of `from` buys. Implementations
/// may hit a cache but must not block on network I/O from `rate` itself.
pub trait RateSource: Send + Sync {
    fn rate(&self, from: Currency, to: Currency) -> Result<f64, RateError>;

    /// Side-channel health signal; `false` means `rate` is expected to fail.
    fn healthy(&self) -> bool {
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fixed-table source
// ─────────────────────────────────────────────────────────────────────────────

/// Hardcoded USD-relative rate table.
///
/// The availability flag simulates a rate-feed outage in tests and doubles
/// as the health signal an operator can flip when the upstream feed is
/// known bad.
pub struct FixedRates {
    available: AtomicBool,
}

impl FixedRates {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    fn to_usd_rate(currency: Currency) -> f64 {
        match currency {
            Currency::USD => 1.0,
            Currency::EUR => 1.087,
            Currency::INR => 0.01203,
        }
    }
}

impl Default for FixedRates {
    fn default() -> Self {
        Self::new()
    }
}

impl RateSource for FixedRates {
    fn rate(&self, from: Currency, to: Currency) -> Result<f64, RateError> {
        if !self.healthy() {
            return Err(RateError::SourceUnavailable("rate table disabled".into()));
        }
        Ok(Self::to_usd_rate(from) / Self::to_usd_rate(to))
    }

    fn healthy(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Converter
// ─────────────────────────────────────────────────────────────────────────────

/// Amount converter with the purchase flow's degrade-gracefully policy.
#[derive(Clone)]
pub struct Converter {
    source: Arc<dyn RateSource>,
}

impl Converter {
    pub fn new(source: Arc<dyn RateSource>) -> Self {
        Self { source }
    }

    /// Converts `amount` (minor units) from one currency to another.
    ///
    /// `from == to` is an exact identity. A rate-source failure returns the
    /// amount unconverted; callers needing accuracy must check [`healthy`].
    ///
    /// [`healthy`]: Converter::healthy
    pub fn convert(&self, amount: i64, from: Currency, to: Currency) -> i64 {
        match self.convert_checked(amount, from, to) {
            Ok(converted) => converted,
            Err(err) => {
                tracing::warn!(%from, %to, error = %err, "rate lookup failed, returning amount unconverted");
                amount
            }
        }
    }

    /// Converting variant that surfaces rate-source failures to the caller.
    pub fn convert_checked(
        &self,
        amount: i64,
        from: Currency,
        to: Currency,
    ) -> Result<i64, RateError> {
        if from == to {
            return Ok(amount);
        }
        let rate = self.source.rate(from, to)?;
        Ok((amount as f64 * rate).round() as i64)
    }

    /// All rates relative to `base`, for diagnostics.
    pub fn all_rates(&self, base: Currency) -> HashMap<Currency, f64> {
        Currency::all()
            .iter()
            .filter_map(|&c| self.source.rate(base, c).ok().map(|r| (c, r)))
            .collect()
    }

    pub fn healthy(&self) -> bool {
        self.source.healthy()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
