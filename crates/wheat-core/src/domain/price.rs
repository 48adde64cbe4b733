//! Prices and price-source selection.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Price sources in priority order.
///
/// Market price first, then buylist and marketplace fallbacks, then the foil
/// variants of each, and finally the Card Kingdom retail price.
pub const PRICE_SOURCES: [&str; 7] = ["usd", "ck_buy", "ct", "usd_foil", "ck_foil", "ct_foil", "ck"];

/// Non-negative amount with two decimal places, kept as whole cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(i64);

impl Price {
    pub const ZERO: Price = Price(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Round a decimal amount to the nearest cent. Negative and non-finite
    /// amounts are rejected.
    pub fn from_decimal(amount: f64) -> Option<Self> {
        if !amount.is_finite() || amount < 0.0 {
            return None;
        }
        Some(Self((amount * 100.0).round() as i64))
    }

    /// Accepts JSON numbers and numeric strings (`1.23`, `"1.23"`).
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().and_then(Self::from_decimal),
            Value::String(s) => s.trim().parse::<f64>().ok().and_then(Self::from_decimal),
            _ => None,
        }
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

/// Pick the first usable price following `PRICE_SOURCES`.
///
/// A source that is present but not a number (e.g. `null`) is skipped.
/// Returns the source name together with its price.
pub fn select_price(prices: &BTreeMap<String, Value>) -> Option<(&'static str, Price)> {
    PRICE_SOURCES.iter().find_map(|source| {
        prices
            .get(*source)
            .and_then(Price::from_json)
            .map(|price| (*source, price))
    })
}
