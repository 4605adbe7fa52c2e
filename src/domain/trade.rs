//! Canonical trade record.

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One executed buy or sell, independent of the brokerage it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTrade {
    pub ticker: String,
    pub action: Action,
    pub quantity: f64,
    pub price: f64,
    pub date: NaiveDate,
    pub fees: f64,
}

/// Identity of a trade for deduplication: `(date, ticker, action, quantity, price)`.
///
/// Floats are keyed by bit pattern, so `10.0` and `10.00` collapse while
/// `10.0` and `10.0001` do not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    date: NaiveDate,
    ticker: String,
    action: Action,
    quantity_bits: u64,
    price_bits: u64,
}

impl CanonicalTrade {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            date: self.date,
            ticker: self.ticker.clone(),
            action: self.action,
            quantity_bits: self.quantity.to_bits(),
            price_bits: self.price.to_bits(),
        }
    }

    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }
}
