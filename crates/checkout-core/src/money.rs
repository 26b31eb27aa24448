//! # Money Types
//!
//! Currency and monetary amounts for the checkout engine.
//! Amounts are held in minor units (cents) so that the equality checks the
//! capture flow depends on are exact; the provider wire format is a
//! two-decimal string ("50.00") produced by [`Money::format`].

use serde::{Deserialize, Serialize};

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    CHF,
    MXN,
}

impl Currency {
    /// Returns the uppercase ISO 4217 code the provider expects
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::CAD => "CAD",
            Currency::AUD => "AUD",
            Currency::CHF => "CHF",
            Currency::MXN => "MXN",
        }
    }

    /// Parse an ISO 4217 code, case-insensitively
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_uppercase().as_str() {
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "CAD" => Some(Currency::CAD),
            "AUD" => Some(Currency::AUD),
            "CHF" => Some(Currency::CHF),
            "MXN" => Some(Currency::MXN),
            _ => None,
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::USD
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A monetary amount in minor units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents
    pub cents: i64,
    /// Currency
    pub currency: Currency,
}

impl Money {
    /// Create from a decimal amount, rounding to 2 decimal places
    pub fn from_major(amount: f64, currency: Currency) -> Self {
        Self {
            cents: (amount * 100.0).round() as i64,
            currency,
        }
    }

    /// Create from minor units
    pub fn from_cents(cents: i64, currency: Currency) -> Self {
        Self { cents, currency }
    }

    /// Parse a provider amount string such as "50.00"
    pub fn parse(amount: &str, currency: Currency) -> Option<Self> {
        amount
            .trim()
            .parse::<f64>()
            .ok()
            .map(|a| Self::from_major(a, currency))
    }

    /// Get the decimal amount
    pub fn as_major(&self) -> f64 {
        self.cents as f64 / 100.0
    }

    /// Wire format with exactly two decimal places ("50.00")
    pub fn format(&self) -> String {
        format!("{:.2}", self.as_major())
    }

    /// True if the amount is zero (stale-revisit detection)
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Sum with another amount of the same currency
    pub fn plus(&self, other: Money) -> Money {
        debug_assert_eq!(self.currency, other.currency);
        Money {
            cents: self.cents + other.cents,
            currency: self.currency,
        }
    }

    /// Difference with another amount of the same currency
    pub fn minus(&self, other: Money) -> Money {
        debug_assert_eq!(self.currency, other.currency);
        Money {
            cents: self.cents - other.cents,
            currency: self.currency,
        }
    }

    /// True if `self` exceeds `other` by more than `tolerance`
    /// (e.g. 0.15 for the 15% reauthorization window)
    pub fn exceeds_by_ratio(&self, other: Money, tolerance: f64) -> bool {
        if other.cents <= 0 {
            return self.cents > 0;
        }
        self.cents as f64 > other.cents as f64 * (1.0 + tolerance)
    }
}
