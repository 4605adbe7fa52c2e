//! Pre-trade rule checks.
//!
//! [`validate`] evaluates one proposed trade against a portfolio snapshot and
//! always returns all five checks in a fixed order so a caller can render a
//! full checklist. It never mutates the snapshot and never fails.

use std::fmt;

use super::costs::CostModel;
use super::portfolio::Portfolio;
use super::position::UNKNOWN_SECTOR;
use super::trade::Action;

pub const RULE_CASH: &str = "cash_sufficiency";
pub const RULE_SHARES: &str = "sufficient_shares";
pub const RULE_POSITION: &str = "position_concentration";
pub const RULE_SECTOR: &str = "sector_concentration";
pub const RULE_DRAWDOWN: &str = "drawdown_circuit_breaker";

/// Concentration and drawdown thresholds, as fractions of total value.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskLimits {
    pub position_warn_pct: f64,
    pub position_max_pct: f64,
    pub sector_warn_pct: f64,
    pub sector_max_pct: f64,
    pub drawdown_halt_pct: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        RiskLimits {
            position_warn_pct: 0.12,
            position_max_pct: 0.15,
            sector_warn_pct: 0.30,
            sector_max_pct: 0.40,
            drawdown_halt_pct: 0.20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleCheck {
    pub rule: &'static str,
    pub passed: bool,
    pub severity: Severity,
    pub message: String,
}

impl RuleCheck {
    fn pass(rule: &'static str, message: String) -> Self {
        RuleCheck {
            rule,
            passed: true,
            severity: Severity::Error,
            message,
        }
    }

    fn fail(rule: &'static str, severity: Severity, message: String) -> Self {
        RuleCheck {
            rule,
            passed: false,
            severity,
            message,
        }
    }

    pub fn is_blocking(&self) -> bool {
        !self.passed && self.severity == Severity::Error
    }
}

/// A trade under consideration. `sector` overrides the sector of any
/// existing position in the same ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedTrade {
    pub ticker: String,
    pub action: Action,
    pub quantity: f64,
    pub price: f64,
    pub sector: Option<String>,
}

impl ProposedTrade {
    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }

    /// Signed change in exposure: positive for buys.
    fn exposure_delta(&self) -> f64 {
        match self.action {
            Action::Buy => self.notional(),
            Action::Sell => -self.notional(),
        }
    }
}

pub fn validate(
    trade: &ProposedTrade,
    portfolio: &Portfolio,
    limits: &RiskLimits,
    costs: &CostModel,
) -> Vec<RuleCheck> {
    vec![
        check_cash(trade, portfolio, costs),
        check_shares(trade, portfolio),
        check_position(trade, portfolio, limits),
        check_sector(trade, portfolio, limits),
        check_drawdown(trade, portfolio, limits),
    ]
}

/// True when every error-severity check passed. Warnings never block.
pub fn passable(checks: &[RuleCheck]) -> bool {
    checks.iter().all(|c| !c.is_blocking())
}

fn check_cash(trade: &ProposedTrade, portfolio: &Portfolio, costs: &CostModel) -> RuleCheck {
    if trade.action == Action::Sell {
        return RuleCheck::pass(RULE_CASH, "not applicable to sells".to_string());
    }

    let required = trade.notional() + costs.commission(trade.quantity);
    if required > portfolio.cash_balance {
        RuleCheck::fail(
            RULE_CASH,
            Severity::Error,
            format!(
                "requires ${:.2} but only ${:.2} cash available",
                required, portfolio.cash_balance
            ),
        )
    } else {
        RuleCheck::pass(
            RULE_CASH,
            format!(
                "${:.2} required, ${:.2} available",
                required, portfolio.cash_balance
            ),
        )
    }
}

fn check_shares(trade: &ProposedTrade, portfolio: &Portfolio) -> RuleCheck {
    if trade.action == Action::Buy {
        return RuleCheck::pass(RULE_SHARES, "not applicable to buys".to_string());
    }

    let held = portfolio.shares_held(&trade.ticker);
    if trade.quantity > held {
        RuleCheck::fail(
            RULE_SHARES,
            Severity::Error,
            format!(
                "selling {} {} but only {} held",
                trade.quantity, trade.ticker, held
            ),
        )
    } else {
        RuleCheck::pass(
            RULE_SHARES,
            format!("{} of {} {} held", trade.quantity, held, trade.ticker),
        )
    }
}

/// Shared warn/max banding for the two concentration rules. Comparisons are
/// strict: a fraction exactly at `max` is a warning.
fn concentration_check(
    rule: &'static str,
    label: &str,
    fraction: Option<f64>,
    warn: f64,
    max: f64,
) -> RuleCheck {
    let Some(fraction) = fraction else {
        return RuleCheck::fail(
            rule,
            Severity::Error,
            "portfolio total value is not positive".to_string(),
        );
    };

    let pct = fraction * 100.0;
    if fraction > max {
        RuleCheck::fail(
            rule,
            Severity::Error,
            format!("{label} would be {pct:.1}% of portfolio, above the {:.1}% limit", max * 100.0),
        )
    } else if fraction > warn {
        RuleCheck::fail(
            rule,
            Severity::Warning,
            format!("{label} would be {pct:.1}% of portfolio, above the {:.1}% guideline", warn * 100.0),
        )
    } else {
        RuleCheck::pass(rule, format!("{label} would be {pct:.1}% of portfolio"))
    }
}

fn fraction_of_total(value: f64, portfolio: &Portfolio) -> Option<f64> {
    if portfolio.total_value > 0.0 {
        Some(value.max(0.0) / portfolio.total_value)
    } else {
        None
    }
}

fn check_position(trade: &ProposedTrade, portfolio: &Portfolio, limits: &RiskLimits) -> RuleCheck {
    let existing = portfolio
        .position(&trade.ticker)
        .map(|p| p.market_value())
        .unwrap_or(0.0);
    let resulting = existing + trade.exposure_delta();

    concentration_check(
        RULE_POSITION,
        &trade.ticker,
        fraction_of_total(resulting, portfolio),
        limits.position_warn_pct,
        limits.position_max_pct,
    )
}

fn trade_sector<'a>(trade: &'a ProposedTrade, portfolio: &'a Portfolio) -> &'a str {
    trade
        .sector
        .as_deref()
        .or_else(|| portfolio.position(&trade.ticker).map(|p| p.sector.as_str()))
        .unwrap_or(UNKNOWN_SECTOR)
}

/// Positions without sector data are not one sector: when the trade's sector
/// is unknown only its own resulting position counts against the limits.
fn check_sector(trade: &ProposedTrade, portfolio: &Portfolio, limits: &RiskLimits) -> RuleCheck {
    let sector = trade_sector(trade, portfolio);

    if sector == UNKNOWN_SECTOR {
        let own = portfolio
            .position(&trade.ticker)
            .map(|p| p.market_value())
            .unwrap_or(0.0);
        return concentration_check(
            RULE_SECTOR,
            &format!("sector unknown; {} alone", trade.ticker),
            fraction_of_total(own + trade.exposure_delta(), portfolio),
            limits.sector_warn_pct,
            limits.sector_max_pct,
        );
    }

    // An override moves the existing position's value into the new sector.
    let moved = match portfolio.position(&trade.ticker) {
        Some(p) if p.sector != sector => p.market_value(),
        _ => 0.0,
    };
    let resulting = portfolio.sector_value(sector) + moved + trade.exposure_delta();

    concentration_check(
        RULE_SECTOR,
        &format!("{sector} sector"),
        fraction_of_total(resulting, portfolio),
        limits.sector_warn_pct,
        limits.sector_max_pct,
    )
}

fn check_drawdown(trade: &ProposedTrade, portfolio: &Portfolio, limits: &RiskLimits) -> RuleCheck {
    let floor = portfolio.peak_value * (1.0 - limits.drawdown_halt_pct);
    let halted = portfolio.total_value < floor;
    let drawdown_pct = portfolio.drawdown() * 100.0;

    match (halted, trade.action) {
        (true, Action::Buy) => RuleCheck::fail(
            RULE_DRAWDOWN,
            Severity::Error,
            format!(
                "portfolio is {drawdown_pct:.1}% below its peak; new buys are halted beyond {:.1}%",
                limits.drawdown_halt_pct * 100.0
            ),
        ),
        (true, Action::Sell) => RuleCheck::pass(
            RULE_DRAWDOWN,
            format!("portfolio is {drawdown_pct:.1}% below its peak; sells remain permitted"),
        ),
        (false, _) => RuleCheck::pass(
            RULE_DRAWDOWN,
            format!("portfolio is {drawdown_pct:.1}% below its peak"),
        ),
    }
}
