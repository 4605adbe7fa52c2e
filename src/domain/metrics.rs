//! Trade statistics and behavioral trait scores derived from holdings.

use super::aggregator::{EquityPoint, Holdings};
use super::position::PortfolioPosition;

const DAYS_PER_MONTH: f64 = 30.0;
/// Average holding period that earns a full patience score.
const PATIENT_HOLD_DAYS: f64 = 90.0;
/// Trades per month that earn a full turnover score.
const ACTIVE_TRADES_PER_MONTH: f64 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TradeStats {
    pub trades: usize,
    pub closing_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub realized_pnl: f64,
    pub total_fees: f64,
    pub avg_holding_days: f64,
    pub sharpe_like: f64,
    pub max_drawdown: f64,
    pub total_return: f64,
    pub open_positions: usize,
}

impl TradeStats {
    pub fn compute(holdings: &Holdings) -> Self {
        let trades = &holdings.closed_trades;

        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut held_quantity = 0.0_f64;
        let mut weighted_days = 0.0_f64;

        for trade in trades {
            let pnl = trade.pnl;
            if pnl > 0.0 {
                wins += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                losses += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            } else {
                breakeven += 1;
            }
            held_quantity += trade.quantity;
            weighted_days += trade.quantity * trade.holding_days;
        }

        let closing_trades = trades.len();
        let win_rate = if closing_trades > 0 {
            wins as f64 / closing_trades as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if wins > 0 {
            total_wins / wins as f64
        } else {
            0.0
        };

        let avg_loss = if losses > 0 {
            total_losses / losses as f64
        } else {
            0.0
        };

        let avg_holding_days = if held_quantity > 0.0 {
            weighted_days / held_quantity
        } else {
            0.0
        };

        let returns: Vec<f64> = trades.iter().map(|t| t.return_pct()).collect();

        let final_equity = holdings
            .equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(holdings.starting_capital);
        let total_return = if holdings.starting_capital > 0.0 {
            (final_equity - holdings.starting_capital) / holdings.starting_capital
        } else {
            0.0
        };

        TradeStats {
            trades: holdings.trades_applied,
            closing_trades,
            wins,
            losses,
            breakeven,
            win_rate,
            profit_factor,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            realized_pnl: holdings.realized_pnl,
            total_fees: holdings.total_fees,
            avg_holding_days,
            sharpe_like: sharpe_like(&returns),
            max_drawdown: max_drawdown(holdings.starting_capital, &holdings.equity_curve),
            total_return,
            open_positions: holdings.positions.len(),
        }
    }
}

/// `mean / stddev * sqrt(n)` over per-trade returns, using sample stddev.
fn sharpe_like(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    if stddev > 0.0 {
        mean / stddev * n.sqrt()
    } else {
        0.0
    }
}

/// Largest peak-to-trough fall, as a fraction of the peak. The starting
/// capital is the initial peak.
fn max_drawdown(starting_capital: f64, equity_curve: &[EquityPoint]) -> f64 {
    let mut peak = starting_capital;
    let mut max_dd = 0.0_f64;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
        }
    }

    max_dd
}

/// Behavioral scores, each clamped to 0..=100.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitScores {
    /// Herfindahl index of open position values. 100 is a single holding.
    pub concentration: f64,
    /// Trading frequency relative to an active trader.
    pub turnover: f64,
    /// Average holding period relative to a quarter.
    pub patience: f64,
    /// Share of average win in average win plus average loss.
    pub discipline: f64,
}

impl TraitScores {
    pub fn compute(holdings: &Holdings, stats: &TradeStats) -> Self {
        let positions: Vec<&PortfolioPosition> = holdings.positions.values().collect();
        TraitScores {
            concentration: concentration_score(&positions),
            turnover: turnover_score(holdings),
            patience: clamp_score(stats.avg_holding_days / PATIENT_HOLD_DAYS * 100.0),
            discipline: discipline_score(stats),
        }
    }
}

fn clamp_score(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn concentration_score(positions: &[&PortfolioPosition]) -> f64 {
    let values: Vec<f64> = positions.iter().map(|p| p.market_value().max(0.0)).collect();
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let hhi: f64 = values.iter().map(|v| (v / total).powi(2)).sum();
    clamp_score(hhi * 100.0)
}

fn turnover_score(holdings: &Holdings) -> f64 {
    let (Some(first), Some(last)) = (holdings.first_trade, holdings.last_trade) else {
        return 0.0;
    };
    let span_days = ((last - first).num_days() + 1).max(1) as f64;
    let per_month = holdings.trades_applied as f64 / span_days * DAYS_PER_MONTH;
    clamp_score(per_month / ACTIVE_TRADES_PER_MONTH * 100.0)
}

fn discipline_score(stats: &TradeStats) -> f64 {
    match (stats.wins, stats.losses) {
        (0, _) => 0.0,
        (_, 0) => 100.0,
        _ => clamp_score(stats.avg_win / (stats.avg_win + stats.avg_loss) * 100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregator::PortfolioAggregator;
    use crate::domain::position::ClosedTrade;
    use crate::domain::trade::{Action, CanonicalTrade};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(n)
    }

    fn closed(pnl: f64, days: f64) -> ClosedTrade {
        ClosedTrade {
            ticker: "A".into(),
            quantity: 100.0,
            entry_price: 100.0,
            exit_price: 100.0 + pnl / 100.0,
            entry_date: day(0),
            exit_date: day(days as i64),
            holding_days: days,
            pnl,
            fees: 0.0,
        }
    }

    fn holdings_with(trades: Vec<ClosedTrade>) -> Holdings {
        let mut h = Holdings::new(100_000.0);
        h.realized_pnl = trades.iter().map(|t| t.pnl).sum();
        h.closed_trades = trades;
        h
    }

    fn trade(ticker: &str, action: Action, qty: f64, price: f64, d: i64) -> CanonicalTrade {
        CanonicalTrade {
            ticker: ticker.into(),
            action,
            quantity: qty,
            price,
            date: day(d),
            fees: 0.0,
        }
    }

    #[test]
    fn empty_holdings() {
        let h = Holdings::new(100_000.0);
        let stats = TradeStats::compute(&h);
        assert_eq!(stats.closing_trades, 0);
        assert_eq!(stats.win_rate, 0.0);
        assert_eq!(stats.profit_factor, 0.0);
        assert_eq!(stats.sharpe_like, 0.0);
        assert_eq!(stats.max_drawdown, 0.0);
        assert_eq!(stats.total_return, 0.0);

        let scores = TraitScores::compute(&h, &stats);
        assert_eq!(scores.concentration, 0.0);
        assert_eq!(scores.turnover, 0.0);
        assert_eq!(scores.patience, 0.0);
        assert_eq!(scores.discipline, 0.0);
    }

    #[test]
    fn wins_losses_and_breakeven() {
        let h = holdings_with(vec![
            closed(100.0, 5.0),
            closed(-50.0, 3.0),
            closed(200.0, 10.0),
            closed(0.0, 1.0),
        ]);
        let stats = TradeStats::compute(&h);
        assert_eq!(stats.wins, 2);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.breakeven, 1);
        assert_relative_eq!(stats.win_rate, 0.5);
        assert_relative_eq!(stats.profit_factor, 6.0);
        assert_relative_eq!(stats.avg_win, 150.0);
        assert_relative_eq!(stats.avg_loss, 50.0);
        assert_relative_eq!(stats.largest_win, 200.0);
        assert_relative_eq!(stats.largest_loss, 50.0);
        assert_relative_eq!(stats.realized_pnl, 250.0);
    }

    #[test]
    fn profit_factor_without_losses_is_infinite() {
        let stats = TradeStats::compute(&holdings_with(vec![closed(10.0, 1.0)]));
        assert!(stats.profit_factor.is_infinite());
    }

    #[test]
    fn holding_days_weighted_by_quantity() {
        let mut small = closed(10.0, 30.0);
        small.quantity = 10.0;
        let big = closed(10.0, 3.0);
        let stats = TradeStats::compute(&holdings_with(vec![small, big]));
        assert_relative_eq!(stats.avg_holding_days, (10.0 * 30.0 + 100.0 * 3.0) / 110.0);
    }

    #[test]
    fn sharpe_like_per_trade() {
        // returns 0.01, 0.03: mean 0.02, sample stddev sqrt(0.0002)
        let s = sharpe_like(&[0.01, 0.03]);
        assert_relative_eq!(s, 0.02 / 0.0002_f64.sqrt() * 2.0_f64.sqrt(), epsilon = 1e-9);
        assert_eq!(sharpe_like(&[0.05]), 0.0);
        assert_eq!(sharpe_like(&[0.5, 0.5, 0.5]), 0.0);
    }

    #[test]
    fn drawdown_from_equity_curve() {
        let curve: Vec<EquityPoint> = [110.0, 90.0, 95.0, 80.0, 100.0]
            .iter()
            .enumerate()
            .map(|(i, &equity)| EquityPoint {
                date: day(i as i64),
                equity,
            })
            .collect();
        assert_relative_eq!(max_drawdown(100.0, &curve), 30.0 / 110.0);
        assert_relative_eq!(max_drawdown(200.0, &curve), 120.0 / 200.0);
    }

    #[test]
    fn stats_from_folded_history() {
        let trades = vec![
            trade("AAPL", Action::Buy, 10.0, 100.0, 0),
            trade("AAPL", Action::Sell, 10.0, 110.0, 9),
            trade("MSFT", Action::Buy, 5.0, 200.0, 10),
            trade("MSFT", Action::Sell, 5.0, 180.0, 19),
        ];
        let h = PortfolioAggregator::new(10_000.0).fold(&trades);
        let stats = TradeStats::compute(&h);
        assert_eq!(stats.trades, 4);
        assert_eq!(stats.closing_trades, 2);
        assert_relative_eq!(stats.win_rate, 0.5);
        assert_relative_eq!(stats.profit_factor, 1.0);
        assert_relative_eq!(stats.avg_holding_days, 9.0);
        assert_relative_eq!(stats.total_return, 0.0);
        assert_eq!(stats.open_positions, 0);
        // peak 10100 after AAPL, trough 10000 after MSFT
        assert_relative_eq!(stats.max_drawdown, 100.0 / 10_100.0, epsilon = 1e-12);
    }

    #[test]
    fn concentration_single_holding_is_100() {
        let h = PortfolioAggregator::new(10_000.0)
            .fold(&[trade("AAPL", Action::Buy, 10.0, 100.0, 0)]);
        let stats = TradeStats::compute(&h);
        assert_relative_eq!(TraitScores::compute(&h, &stats).concentration, 100.0);
    }

    #[test]
    fn concentration_equal_holdings() {
        let h = PortfolioAggregator::new(10_000.0).fold(&[
            trade("A", Action::Buy, 10.0, 100.0, 0),
            trade("B", Action::Buy, 10.0, 100.0, 0),
            trade("C", Action::Buy, 10.0, 100.0, 0),
            trade("D", Action::Buy, 10.0, 100.0, 0),
        ]);
        let stats = TradeStats::compute(&h);
        assert_relative_eq!(TraitScores::compute(&h, &stats).concentration, 25.0);
    }

    #[test]
    fn turnover_scales_with_frequency() {
        // 10 trades over a 28 day span
        let trades: Vec<CanonicalTrade> = (0..10)
            .map(|i| trade("A", Action::Buy, 1.0, 10.0 + i as f64, i * 3))
            .collect();
        let h = PortfolioAggregator::new(10_000.0).fold(&trades);
        let stats = TradeStats::compute(&h);
        assert_relative_eq!(
            TraitScores::compute(&h, &stats).turnover,
            10.0 / 28.0 * 30.0 / 20.0 * 100.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn patience_and_discipline() {
        let h = holdings_with(vec![closed(300.0, 45.0), closed(-100.0, 45.0)]);
        let stats = TradeStats::compute(&h);
        let scores = TraitScores::compute(&h, &stats);
        assert_relative_eq!(scores.patience, 50.0);
        assert_relative_eq!(scores.discipline, 75.0);
    }

    #[test]
    fn scores_are_clamped() {
        let h = holdings_with(vec![closed(10.0, 400.0)]);
        let stats = TradeStats::compute(&h);
        let scores = TraitScores::compute(&h, &stats);
        assert_relative_eq!(scores.patience, 100.0);
        assert_relative_eq!(scores.discipline, 100.0);
    }
}
