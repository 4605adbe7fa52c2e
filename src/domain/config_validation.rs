//! Configuration validation.
//!
//! Every key is optional; these checks only reject values that are present
//! and out of range.

use crate::domain::error::LedgerError;
use crate::ports::config_port::ConfigPort;

pub fn validate_ledger_config(config: &dyn ConfigPort) -> Result<(), LedgerError> {
    validate_import(config)?;
    validate_risk(config)?;
    validate_costs(config)?;
    validate_portfolio(config)?;
    validate_classifier(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> LedgerError {
    LedgerError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Rejects a value that is set but does not parse as a number.
fn numeric(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<f64>, LedgerError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| invalid(section, key, &format!("'{raw}' is not a number"))),
    }
}

fn validate_import(config: &dyn ConfigPort) -> Result<(), LedgerError> {
    for key in ["min_trades", "sample_rows"] {
        if let Some(value) = numeric(config, "import", key)? {
            if value < 1.0 || value.fract() != 0.0 {
                return Err(invalid("import", key, &format!("{key} must be a whole number of at least 1")));
            }
        }
    }
    if let Some(id) = config.get_string("import", "trader_id") {
        if id.trim().is_empty() {
            return Err(invalid("import", "trader_id", "trader_id must not be empty"));
        }
    }
    Ok(())
}

fn fraction(config: &dyn ConfigPort, key: &str, default: f64) -> Result<f64, LedgerError> {
    let value = numeric(config, "risk", key)?.unwrap_or(default);
    if value <= 0.0 || value > 1.0 {
        return Err(invalid("risk", key, &format!("{key} must be in (0, 1]")));
    }
    Ok(value)
}

fn validate_risk(config: &dyn ConfigPort) -> Result<(), LedgerError> {
    let position_warn = fraction(config, "position_warn_pct", 0.12)?;
    let position_max = fraction(config, "position_max_pct", 0.15)?;
    if position_warn > position_max {
        return Err(invalid(
            "risk",
            "position_warn_pct",
            "position_warn_pct must not exceed position_max_pct",
        ));
    }

    let sector_warn = fraction(config, "sector_warn_pct", 0.30)?;
    let sector_max = fraction(config, "sector_max_pct", 0.40)?;
    if sector_warn > sector_max {
        return Err(invalid(
            "risk",
            "sector_warn_pct",
            "sector_warn_pct must not exceed sector_max_pct",
        ));
    }

    fraction(config, "drawdown_halt_pct", 0.20)?;
    Ok(())
}

fn validate_costs(config: &dyn ConfigPort) -> Result<(), LedgerError> {
    for key in ["base_commission", "breakpoint_shares", "per_share_above", "slippage_pct"] {
        if let Some(value) = numeric(config, "costs", key)? {
            if value < 0.0 {
                return Err(invalid("costs", key, &format!("{key} must be non-negative")));
            }
        }
    }
    if let Some(value) = numeric(config, "costs", "slippage_pct")? {
        if value >= 100.0 {
            return Err(invalid("costs", "slippage_pct", "slippage_pct must be below 100"));
        }
    }
    Ok(())
}

fn validate_portfolio(config: &dyn ConfigPort) -> Result<(), LedgerError> {
    if let Some(value) = numeric(config, "portfolio", "starting_capital")? {
        if value <= 0.0 {
            return Err(invalid("portfolio", "starting_capital", "starting_capital must be positive"));
        }
    }
    if let Some(value) = numeric(config, "portfolio", "peak_value")? {
        if value < 0.0 {
            return Err(invalid("portfolio", "peak_value", "peak_value must be non-negative"));
        }
    }
    Ok(())
}

fn validate_classifier(config: &dyn ConfigPort) -> Result<(), LedgerError> {
    if let Some(endpoint) = config.get_string("classifier", "endpoint") {
        let endpoint = endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(invalid("classifier", "endpoint", "endpoint must be an http(s) URL"));
        }
    }
    if let Some(value) = numeric(config, "classifier", "timeout_secs")? {
        if value < 1.0 || value.fract() != 0.0 {
            return Err(invalid(
                "classifier",
                "timeout_secs",
                "timeout_secs must be a whole number of seconds, at least 1",
            ));
        }
    }
    Ok(())
}
