//! Commission and slippage model.
//!
//! Deterministic and shared by the pre-trade validator and execution so a
//! preview always matches the fill.

use super::trade::Action;

#[derive(Debug, Clone, PartialEq)]
pub struct CostModel {
    /// Flat fee charged on every order.
    pub base_commission: f64,
    /// Shares included in the flat fee.
    pub breakpoint_shares: f64,
    /// Charged per share above `breakpoint_shares`.
    pub per_share_above: f64,
    /// Execution-price offset as a percentage of the quote.
    pub slippage_pct: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        CostModel {
            base_commission: 1.0,
            breakpoint_shares: 500.0,
            per_share_above: 0.005,
            slippage_pct: 0.05,
        }
    }
}

impl CostModel {
    /// commission = base + per_share_above * max(0, quantity - breakpoint)
    pub fn commission(&self, quantity: f64) -> f64 {
        let extra_shares = (quantity.abs() - self.breakpoint_shares).max(0.0);
        self.base_commission + extra_shares * self.per_share_above
    }

    /// Buy: quote * (1 + slippage_pct / 100). Sell: quote * (1 - slippage_pct / 100).
    pub fn slippage(&self, price: f64, side: Action) -> f64 {
        match side {
            Action::Buy => price * (1.0 + self.slippage_pct / 100.0),
            Action::Sell => price * (1.0 - self.slippage_pct / 100.0),
        }
    }
}
