//! Position tracking: open holdings with FIFO lots, and realized sells.

use chrono::NaiveDate;
use std::collections::VecDeque;

pub const UNKNOWN_SECTOR: &str = "Unknown";

/// Shares at or below this are treated as a closed position.
pub const SHARE_EPSILON: f64 = 1e-9;

/// Shares bought on one date and not yet sold.
#[derive(Debug, Clone, PartialEq)]
pub struct Lot {
    pub date: NaiveDate,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioPosition {
    pub ticker: String,
    pub shares: f64,
    pub avg_cost: f64,
    pub sector: String,
    pub current_price: Option<f64>,
    pub lots: VecDeque<Lot>,
}

impl PortfolioPosition {
    pub fn new(ticker: &str) -> Self {
        PortfolioPosition {
            ticker: ticker.to_string(),
            shares: 0.0,
            avg_cost: 0.0,
            sector: UNKNOWN_SECTOR.to_string(),
            current_price: None,
            lots: VecDeque::new(),
        }
    }

    /// Price used for valuation: the external quote, else average cost.
    pub fn mark_price(&self) -> f64 {
        self.current_price.unwrap_or(self.avg_cost)
    }

    pub fn market_value(&self) -> f64 {
        self.shares * self.mark_price()
    }

    pub fn cost_basis(&self) -> f64 {
        self.shares * self.avg_cost
    }

    pub fn unrealized_pnl(&self) -> f64 {
        self.shares * (self.mark_price() - self.avg_cost)
    }

    pub fn is_open(&self) -> bool {
        self.shares > SHARE_EPSILON
    }

    /// Quantity-weighted average cost update for a buy.
    pub fn add(&mut self, quantity: f64, price: f64, date: NaiveDate) {
        let total = self.shares + quantity;
        if total > SHARE_EPSILON {
            self.avg_cost = (self.shares * self.avg_cost + quantity * price) / total;
        }
        self.shares = total;
        self.lots.push_back(Lot { date, quantity });
    }

    /// Consume FIFO lots for a sell of `quantity`. Returns the earliest lot
    /// date touched and the quantity-weighted holding days of the shares
    /// actually matched.
    pub fn consume_lots(&mut self, quantity: f64, sell_date: NaiveDate) -> (Option<NaiveDate>, f64) {
        let mut remaining = quantity;
        let mut matched = 0.0;
        let mut weighted_days = 0.0;
        let mut entry_date = None;

        while remaining > SHARE_EPSILON {
            let Some(lot) = self.lots.front_mut() else {
                break;
            };
            entry_date.get_or_insert(lot.date);
            let take = lot.quantity.min(remaining);
            let days = (sell_date - lot.date).num_days().max(0) as f64;
            weighted_days += take * days;
            matched += take;
            remaining -= take;
            lot.quantity -= take;
            if lot.quantity <= SHARE_EPSILON {
                self.lots.pop_front();
            }
        }

        let holding_days = if matched > 0.0 {
            weighted_days / matched
        } else {
            0.0
        };
        (entry_date, holding_days)
    }
}

/// One realized sell.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub ticker: String,
    pub quantity: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub holding_days: f64,
    pub pnl: f64,
    pub fees: f64,
}

impl ClosedTrade {
    /// P&L as a fraction of the cost basis sold.
    pub fn return_pct(&self) -> f64 {
        let basis = self.entry_price * self.quantity;
        if basis > 0.0 { self.pnl / basis } else { 0.0 }
    }
}
