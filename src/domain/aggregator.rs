//! Portfolio aggregation: fold a trade history into holdings.
//!
//! Trades are applied in date order (stable for same-day trades). Buys move
//! the quantity-weighted average cost; sells realize
//! `(price - avg_cost) * min(qty, shares)` and leave average cost unchanged.
//! Overselling is a data-quality problem the validator is meant to prevent;
//! here it is logged and the position is closed.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use super::portfolio::Portfolio;
use super::position::{ClosedTrade, PortfolioPosition, UNKNOWN_SECTOR};
use super::trade::{Action, CanonicalTrade};
use crate::ports::price_port::PricePort;

pub type SectorMap = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Holdings {
    pub starting_capital: f64,
    pub cash: f64,
    /// Open positions only; fully sold tickers are removed.
    pub positions: BTreeMap<String, PortfolioPosition>,
    pub closed_trades: Vec<ClosedTrade>,
    /// Cash plus positions marked at their last traded price, one point per trade date.
    pub equity_curve: Vec<EquityPoint>,
    pub realized_pnl: f64,
    pub total_fees: f64,
    pub trades_applied: usize,
    pub traded_notional: f64,
    pub first_trade: Option<NaiveDate>,
    pub last_trade: Option<NaiveDate>,
    last_prices: BTreeMap<String, f64>,
}

pub struct PortfolioAggregator {
    starting_capital: f64,
}

impl PortfolioAggregator {
    pub fn new(starting_capital: f64) -> Self {
        Self { starting_capital }
    }

    pub fn fold(&self, trades: &[CanonicalTrade]) -> Holdings {
        let mut ordered: Vec<&CanonicalTrade> = trades.iter().collect();
        ordered.sort_by_key(|t| t.date);

        let mut holdings = Holdings::new(self.starting_capital);
        for trade in ordered {
            holdings.apply(trade);
        }
        holdings
    }
}

impl Holdings {
    pub fn new(starting_capital: f64) -> Self {
        Holdings {
            starting_capital,
            cash: starting_capital,
            positions: BTreeMap::new(),
            closed_trades: Vec::new(),
            equity_curve: Vec::new(),
            realized_pnl: 0.0,
            total_fees: 0.0,
            trades_applied: 0,
            traded_notional: 0.0,
            first_trade: None,
            last_trade: None,
            last_prices: BTreeMap::new(),
        }
    }

    /// Incremental fold of one trade.
    pub fn apply_trade(mut self, trade: &CanonicalTrade) -> Holdings {
        self.apply(trade);
        self
    }

    pub fn position(&self, ticker: &str) -> Option<&PortfolioPosition> {
        self.positions.get(ticker)
    }

    pub fn shares_held(&self, ticker: &str) -> f64 {
        self.position(ticker).map(|p| p.shares).unwrap_or(0.0)
    }

    fn apply(&mut self, trade: &CanonicalTrade) {
        let notional = trade.notional();
        match trade.action {
            Action::Buy => {
                self.positions
                    .entry(trade.ticker.clone())
                    .or_insert_with(|| PortfolioPosition::new(&trade.ticker))
                    .add(trade.quantity, trade.price, trade.date);
                self.cash -= notional + trade.fees;
            }
            Action::Sell => {
                self.cash += notional - trade.fees;
                self.realize(trade);
            }
        }

        self.total_fees += trade.fees;
        self.traded_notional += notional;
        self.trades_applied += 1;
        self.first_trade = Some(self.first_trade.map_or(trade.date, |d| d.min(trade.date)));
        self.last_trade = Some(self.last_trade.map_or(trade.date, |d| d.max(trade.date)));
        self.last_prices.insert(trade.ticker.clone(), trade.price);
        self.record_equity(trade.date);
    }

    fn realize(&mut self, trade: &CanonicalTrade) {
        let Some(position) = self.positions.get_mut(&trade.ticker) else {
            warn!(ticker = %trade.ticker, date = %trade.date, "sell with no open position");
            return;
        };

        let matched = trade.quantity.min(position.shares);
        let entry_price = position.avg_cost;
        let pnl = (trade.price - entry_price) * matched;
        let (entry_date, holding_days) = position.consume_lots(matched, trade.date);

        position.shares -= trade.quantity;
        if !position.is_open() {
            if position.shares < 0.0 {
                warn!(
                    ticker = %trade.ticker,
                    oversold = -position.shares,
                    "sold more shares than held"
                );
            }
            self.positions.remove(&trade.ticker);
        }

        self.realized_pnl += pnl;
        self.closed_trades.push(ClosedTrade {
            ticker: trade.ticker.clone(),
            quantity: matched,
            entry_price,
            exit_price: trade.price,
            entry_date: entry_date.unwrap_or(trade.date),
            exit_date: trade.date,
            holding_days,
            pnl,
            fees: trade.fees,
        });
    }

    fn record_equity(&mut self, date: NaiveDate) {
        let position_value: f64 = self
            .positions
            .values()
            .map(|p| p.shares * self.last_prices.get(&p.ticker).copied().unwrap_or(p.avg_cost))
            .sum();
        let equity = self.cash + position_value;

        match self.equity_curve.last_mut() {
            Some(last) if last.date == date => last.equity = equity,
            _ => self.equity_curve.push(EquityPoint { date, equity }),
        }
    }

    /// Highest equity seen, including the starting capital.
    pub fn peak_equity(&self) -> f64 {
        self.equity_curve
            .iter()
            .map(|p| p.equity)
            .fold(self.starting_capital, f64::max)
    }

    /// Validation-time snapshot marked at external prices.
    ///
    /// Tickers the price source does not know are valued at average cost.
    pub fn snapshot(
        &self,
        prices: &dyn PricePort,
        sectors: &SectorMap,
        peak_override: Option<f64>,
    ) -> Portfolio {
        let positions: Vec<PortfolioPosition> = self
            .positions
            .values()
            .map(|p| {
                let mut p = p.clone();
                p.current_price = prices.latest_price(&p.ticker);
                p.sector = sectors
                    .get(&p.ticker)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_SECTOR.to_string());
                p
            })
            .collect();

        let total_value = self.cash + positions.iter().map(|p| p.market_value()).sum::<f64>();
        let peak_value = self
            .peak_equity()
            .max(total_value)
            .max(peak_override.unwrap_or(0.0));

        Portfolio {
            cash_balance: self.cash,
            total_value,
            starting_capital: self.starting_capital,
            positions,
            peak_value,
        }
    }
}
