//! Order preview and fill.
//!
//! Both paths go through [`preview`] so the numbers shown before a trade are
//! exactly the numbers booked when it executes.

use chrono::NaiveDate;

use super::aggregator::Holdings;
use super::costs::CostModel;
use super::trade::{Action, CanonicalTrade};
use super::validator::ProposedTrade;

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub ticker: String,
    pub action: Action,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPreview {
    pub ticker: String,
    pub action: Action,
    pub quantity: f64,
    pub quote: f64,
    /// Quote after slippage.
    pub fill_price: f64,
    pub commission: f64,
    /// `quantity * fill_price`
    pub gross: f64,
    /// Signed cash change: negative for buys.
    pub net_cash: f64,
}

impl ExecutionPreview {
    /// The trade the validator should see: sized at the fill price.
    pub fn proposed_trade(&self, sector: Option<String>) -> ProposedTrade {
        ProposedTrade {
            ticker: self.ticker.clone(),
            action: self.action,
            quantity: self.quantity,
            price: self.fill_price,
            sector,
        }
    }

    pub fn to_trade(&self, date: NaiveDate) -> CanonicalTrade {
        CanonicalTrade {
            ticker: self.ticker.clone(),
            action: self.action,
            quantity: self.quantity,
            price: self.fill_price,
            date,
            fees: self.commission,
        }
    }
}

pub fn preview(order: &Order, quote: f64, model: &CostModel) -> ExecutionPreview {
    let fill_price = model.slippage(quote, order.action);
    let commission = model.commission(order.quantity);
    let gross = order.quantity * fill_price;
    let net_cash = match order.action {
        Action::Buy => -(gross + commission),
        Action::Sell => gross - commission,
    };

    ExecutionPreview {
        ticker: order.ticker.clone(),
        action: order.action,
        quantity: order.quantity,
        quote,
        fill_price,
        commission,
        gross,
        net_cash,
    }
}

/// Fill `order` at `quote` and fold the resulting trade into `holdings`.
pub fn execute(
    holdings: Holdings,
    order: &Order,
    quote: f64,
    date: NaiveDate,
    model: &CostModel,
) -> (CanonicalTrade, Holdings) {
    let trade = preview(order, quote, model).to_trade(date);
    let holdings = holdings.apply_trade(&trade);
    (trade, holdings)
}
