//! Validation-time portfolio snapshot.

use super::position::PortfolioPosition;

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash_balance: f64,
    pub total_value: f64,
    pub starting_capital: f64,
    pub positions: Vec<PortfolioPosition>,
    pub peak_value: f64,
}

impl Portfolio {
    pub fn new(starting_capital: f64) -> Self {
        Portfolio {
            cash_balance: starting_capital,
            total_value: starting_capital,
            starting_capital,
            positions: Vec::new(),
            peak_value: starting_capital,
        }
    }

    pub fn position(&self, ticker: &str) -> Option<&PortfolioPosition> {
        self.positions.iter().find(|p| p.ticker == ticker)
    }

    pub fn shares_held(&self, ticker: &str) -> f64 {
        self.position(ticker).map(|p| p.shares).unwrap_or(0.0)
    }

    /// Market value of every position in `sector`.
    pub fn sector_value(&self, sector: &str) -> f64 {
        self.positions
            .iter()
            .filter(|p| p.sector == sector)
            .map(|p| p.market_value())
            .sum()
    }

    pub fn drawdown(&self) -> f64 {
        if self.peak_value > 0.0 {
            ((self.peak_value - self.total_value) / self.peak_value).max(0.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn position(ticker: &str, sector: &str, shares: f64, price: f64) -> PortfolioPosition {
        let mut pos = PortfolioPosition::new(ticker);
        pos.add(shares, price, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        pos.sector = sector.to_string();
        pos
    }

    #[test]
    fn new_portfolio_is_all_cash() {
        let portfolio = Portfolio::new(100_000.0);
        assert!((portfolio.cash_balance - 100_000.0).abs() < f64::EPSILON);
        assert!((portfolio.total_value - 100_000.0).abs() < f64::EPSILON);
        assert!(portfolio.positions.is_empty());
        assert_eq!(portfolio.drawdown(), 0.0);
    }

    #[test]
    fn lookups() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.positions.push(position("AAPL", "Technology", 10.0, 150.0));
        portfolio.positions.push(position("MSFT", "Technology", 5.0, 300.0));
        portfolio.positions.push(position("XOM", "Energy", 20.0, 100.0));

        assert_eq!(portfolio.shares_held("AAPL"), 10.0);
        assert_eq!(portfolio.shares_held("TSLA"), 0.0);
        assert!((portfolio.sector_value("Technology") - 3000.0).abs() < 1e-9);
        assert!((portfolio.sector_value("Energy") - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn drawdown_from_peak() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.peak_value = 120_000.0;
        portfolio.total_value = 90_000.0;
        assert!((portfolio.drawdown() - 0.25).abs() < 1e-9);
    }
}
