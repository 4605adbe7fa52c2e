//! Opaque current-price source.

use std::collections::HashMap;

pub trait PricePort {
    fn latest_price(&self, ticker: &str) -> Option<f64>;
}

impl PricePort for HashMap<String, f64> {
    fn latest_price(&self, ticker: &str) -> Option<f64> {
        self.get(ticker).copied()
    }
}
