//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::{read_canonical, read_csv_file, write_canonical};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::quote_file_adapter::QuoteBook;
use crate::domain::aggregator::{Holdings, PortfolioAggregator};
use crate::domain::column_mapping::{ColumnMapping, Field, PartialMapping};
use crate::domain::config_validation::validate_ledger_config;
use crate::domain::costs::CostModel;
use crate::domain::error::LedgerError;
use crate::domain::execution::{preview, Order};
use crate::domain::format::{detect_format, generic_guess, Detection};
use crate::domain::ingest::{
    apply_manual_mapping, ingest, IngestOutcome, IngestPolicy, IngestReport, ManualMappingRequest,
    DEFAULT_MIN_TRADES, DEFAULT_SAMPLE_ROWS,
};
use crate::domain::metrics::{TradeStats, TraitScores};
use crate::domain::parsers::{parse_action, parse_ticker};
use crate::domain::raw_table::RawTable;
use crate::domain::trade::Action;
use crate::domain::validator::{passable, validate, RiskLimits, Severity};
use crate::ports::classifier_port::ClassifierPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;

pub const DEFAULT_TRADER_ID: &str = "local";
pub const DEFAULT_STARTING_CAPITAL: f64 = 100_000.0;

#[derive(Parser, Debug)]
#[command(
    name = "tradeledger",
    about = "Import brokerage trade history, check proposed trades, and summarize portfolios"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show which brokerage format an export matches
    Detect { file: PathBuf },
    /// Normalize a brokerage export into canonical CSV
    Import {
        file: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Column assignment `field=header`, repeatable. Skips automatic
        /// detection; unassigned fields fall back to the generic guess.
        #[arg(long = "map", value_name = "FIELD=HEADER")]
        map: Vec<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        trader_id: Option<String>,
        /// Do not consult the classification service
        #[arg(long)]
        no_classifier: bool,
    },
    /// Run pre-trade rule checks for a proposed order
    Check {
        /// Canonical trade history
        #[arg(short, long)]
        trades: PathBuf,
        /// `ticker,price[,sector]` quotes file
        #[arg(short, long)]
        quotes: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        ticker: String,
        #[arg(long, value_parser = parse_side)]
        action: Action,
        #[arg(long)]
        quantity: f64,
        /// Quote to use instead of the quotes file
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        sector: Option<String>,
    },
    /// Summarize a canonical trade history
    Stats {
        #[arg(short, long)]
        trades: PathBuf,
        #[arg(short, long)]
        quotes: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn parse_side(raw: &str) -> Result<Action, String> {
    parse_action(raw).ok_or_else(|| format!("'{raw}' is neither buy nor sell"))
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Detect { file } => run_detect(&file),
        Command::Import {
            file,
            config,
            map,
            output,
            trader_id,
            no_classifier,
        } => run_import(
            &file,
            config.as_deref(),
            &map,
            output.as_deref(),
            trader_id.as_deref(),
            no_classifier,
        ),
        Command::Check {
            trades,
            quotes,
            config,
            ticker,
            action,
            quantity,
            price,
            sector,
        } => run_check(
            &trades,
            quotes.as_deref(),
            config.as_deref(),
            &ticker,
            action,
            quantity,
            price,
            sector,
        ),
        Command::Stats {
            trades,
            quotes,
            config,
        } => run_stats(&trades, quotes.as_deref(), config.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Load and validate a config file; no path means all defaults.
pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, LedgerError> {
    let adapter = match path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            FileConfigAdapter::from_file(path)?
        }
        None => FileConfigAdapter::empty(),
    };
    validate_ledger_config(&adapter)?;
    Ok(adapter)
}

pub fn build_ingest_policy(config: &dyn ConfigPort) -> IngestPolicy {
    IngestPolicy {
        min_trades: config.get_count("import", "min_trades", DEFAULT_MIN_TRADES),
        sample_rows: config.get_count("import", "sample_rows", DEFAULT_SAMPLE_ROWS),
    }
}

pub fn build_risk_limits(config: &dyn ConfigPort) -> RiskLimits {
    let defaults = RiskLimits::default();
    RiskLimits {
        position_warn_pct: config.get_double("risk", "position_warn_pct", defaults.position_warn_pct),
        position_max_pct: config.get_double("risk", "position_max_pct", defaults.position_max_pct),
        sector_warn_pct: config.get_double("risk", "sector_warn_pct", defaults.sector_warn_pct),
        sector_max_pct: config.get_double("risk", "sector_max_pct", defaults.sector_max_pct),
        drawdown_halt_pct: config.get_double("risk", "drawdown_halt_pct", defaults.drawdown_halt_pct),
    }
}

pub fn build_cost_model(config: &dyn ConfigPort) -> CostModel {
    let defaults = CostModel::default();
    CostModel {
        base_commission: config.get_double("costs", "base_commission", defaults.base_commission),
        breakpoint_shares: config.get_double("costs", "breakpoint_shares", defaults.breakpoint_shares),
        per_share_above: config.get_double("costs", "per_share_above", defaults.per_share_above),
        slippage_pct: config.get_double("costs", "slippage_pct", defaults.slippage_pct),
    }
}

pub fn build_starting_capital(config: &dyn ConfigPort) -> f64 {
    config.get_double("portfolio", "starting_capital", DEFAULT_STARTING_CAPITAL)
}

pub fn build_peak_override(config: &dyn ConfigPort) -> Option<f64> {
    Some(config.get_double("portfolio", "peak_value", 0.0)).filter(|v| *v > 0.0)
}

/// The configured classification service, if any and enabled.
pub fn build_classifier(
    config: &dyn ConfigPort,
) -> Result<Option<Box<dyn ClassifierPort>>, LedgerError> {
    if !config.get_bool("classifier", "enabled", true) {
        return Ok(None);
    }
    let Some(endpoint) = config.get_string("classifier", "endpoint") else {
        return Ok(None);
    };

    #[cfg(feature = "http-classifier")]
    {
        use crate::adapters::http_classifier_adapter::{HttpClassifier, DEFAULT_TIMEOUT_SECS};
        use std::time::Duration;

        let timeout = config.get_count("classifier", "timeout_secs", DEFAULT_TIMEOUT_SECS as usize);
        let classifier = HttpClassifier::new(endpoint.trim(), Duration::from_secs(timeout as u64))?;
        Ok(Some(Box::new(classifier)))
    }

    #[cfg(not(feature = "http-classifier"))]
    {
        warn!(%endpoint, "built without http-classifier; ignoring classifier endpoint");
        Ok(None)
    }
}

fn print_mapping(mapping: &ColumnMapping) {
    for field in Field::ALL {
        if let Some(header) = mapping.header(field) {
            eprintln!("  {:<9} <- {}", field.as_str(), header);
        }
    }
}

pub fn run_detect(file: &Path) -> Result<(), LedgerError> {
    let table = read_csv_file(file)?;
    eprintln!("{} columns, {} rows", table.headers.len(), table.row_count());

    match detect_format(&table.headers) {
        Some(detection) => {
            let kind = match detection {
                Detection::Known(_) => "known format",
                Detection::Generic(_) => "generic pattern match",
            };
            println!("{}", detection.name());
            eprintln!("Detected {} ({kind})", detection.name());
            print_mapping(&detection.mapping());
            Ok(())
        }
        None => {
            let guess = generic_guess(&table.headers);
            eprintln!("No format detected. Partial guess:");
            for field in Field::ALL {
                eprintln!("  {:<9} <- {}", field.as_str(), guess.get(field).unwrap_or("?"));
            }
            Err(LedgerError::NoFormatDetected)
        }
    }
}

fn print_manual_request(request: &ManualMappingRequest) {
    eprintln!(
        "\nCould not map columns automatically (best attempt: {} trades).",
        request.best_trade_count
    );
    eprintln!("Headers: {}", request.headers.join(" | "));
    for row in &request.sample_rows {
        eprintln!("  {}", row.join(" | "));
    }
    eprintln!("Suggested mapping:");
    for field in Field::ALL {
        eprintln!(
            "  {:<9} <- {}",
            field.as_str(),
            request.suggestion.get(field).unwrap_or("?")
        );
    }
    eprintln!("Re-run with --map field=header for each required field.");
}

fn manual_mapping(table: &RawTable, assignments: &[String]) -> Result<ColumnMapping, LedgerError> {
    let explicit = PartialMapping::from_assignments(assignments)?;
    let mut merged = generic_guess(&table.headers).retain_valid(&table.headers);
    for field in Field::ALL {
        if let Some(header) = explicit.get(field) {
            merged.set(field, header);
        }
    }
    merged.complete()
}

fn print_import_summary(report: &IngestReport) {
    let outcome = &report.outcome;
    eprintln!("Format:   {} ({:?} layer)", report.format_name, report.layer);
    print_mapping(&report.mapping);
    eprintln!("Trades:   {}", outcome.trade_count());
    eprintln!(
        "Filtered: {} (non-trade {}, unparsable {}, unmapped action {}, duplicate {})",
        outcome.rows_filtered,
        outcome.breakdown.non_trade,
        outcome.breakdown.unparsable,
        outcome.breakdown.unmapped_action,
        outcome.breakdown.duplicate,
    );
    for error in &outcome.errors {
        eprintln!("  warning: {error}");
    }
}

pub fn run_import(
    file: &Path,
    config_path: Option<&Path>,
    assignments: &[String],
    output: Option<&Path>,
    trader_id: Option<&str>,
    no_classifier: bool,
) -> Result<(), LedgerError> {
    let config = load_config(config_path)?;
    let policy = build_ingest_policy(&config);
    let table = read_csv_file(file)?;
    info!(file = %file.display(), rows = table.row_count(), "read export");

    let report = if assignments.is_empty() {
        let classifier = if no_classifier {
            None
        } else {
            build_classifier(&config)?
        };
        match ingest(&table, classifier.as_deref(), &policy) {
            IngestOutcome::Resolved(report) => report,
            IngestOutcome::NeedsManualMapping(request) => {
                print_manual_request(&request);
                return Err(LedgerError::MappingRequired {
                    best: request.best_trade_count,
                });
            }
        }
    } else {
        let mapping = manual_mapping(&table, assignments)?;
        apply_manual_mapping(&table, &mapping, &policy)?
    };

    print_import_summary(&report);

    let trader_id = trader_id
        .map(str::to_string)
        .or_else(|| config.get_string("import", "trader_id"))
        .unwrap_or_else(|| DEFAULT_TRADER_ID.to_string());

    match output {
        Some(path) => {
            write_canonical(fs::File::create(path)?, &trader_id, &report.outcome.trades)?;
            eprintln!("Wrote {} trades to {}", report.outcome.trade_count(), path.display());
        }
        None => write_canonical(std::io::stdout().lock(), &trader_id, &report.outcome.trades)?,
    }
    Ok(())
}

fn load_holdings(trades_path: &Path, config: &dyn ConfigPort) -> Result<Holdings, LedgerError> {
    let trades = read_canonical(&fs::read_to_string(trades_path)?)?;
    info!(trades = trades.len(), "loaded trade history");
    Ok(PortfolioAggregator::new(build_starting_capital(config)).fold(&trades))
}

fn load_quotes(path: Option<&Path>) -> Result<QuoteBook, LedgerError> {
    match path {
        Some(path) => QuoteBook::from_file(path),
        None => Ok(QuoteBook::default()),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn run_check(
    trades_path: &Path,
    quotes_path: Option<&Path>,
    config_path: Option<&Path>,
    ticker: &str,
    action: Action,
    quantity: f64,
    price: Option<f64>,
    sector: Option<String>,
) -> Result<(), LedgerError> {
    let config = load_config(config_path)?;
    let holdings = load_holdings(trades_path, &config)?;
    let quotes = load_quotes(quotes_path)?;
    let costs = build_cost_model(&config);
    let limits = build_risk_limits(&config);

    let ticker = parse_ticker(ticker).ok_or_else(|| LedgerError::ConfigInvalid {
        section: "order".into(),
        key: "ticker".into(),
        reason: format!("'{ticker}' is not a ticker"),
    })?;
    let quote = price
        .or_else(|| quotes.latest_price(&ticker))
        .or_else(|| holdings.position(&ticker).map(|p| p.avg_cost))
        .filter(|q| *q > 0.0)
        .ok_or_else(|| LedgerError::ConfigInvalid {
            section: "order".into(),
            key: "price".into(),
            reason: format!("no quote for {ticker}; pass --price or a quotes file"),
        })?;

    let order = Order {
        ticker: ticker.clone(),
        action,
        quantity: quantity.abs(),
    };
    let fill = preview(&order, quote, &costs);
    let sector = sector.or_else(|| quotes.sector(&ticker).map(str::to_string));

    let portfolio = holdings.snapshot(&quotes, quotes.sectors(), build_peak_override(&config));
    let checks = validate(&fill.proposed_trade(sector), &portfolio, &limits, &costs);

    eprintln!(
        "{} {} {} @ {:.2} (quote {:.2}), commission {:.2}, cash impact {:.2}",
        fill.action, fill.quantity, fill.ticker, fill.fill_price, fill.quote, fill.commission, fill.net_cash
    );
    eprintln!(
        "Portfolio: value {:.2}, cash {:.2}, peak {:.2}",
        portfolio.total_value, portfolio.cash_balance, portfolio.peak_value
    );
    for check in &checks {
        let status = match (check.passed, check.severity) {
            (true, _) => "PASS",
            (false, Severity::Warning) => "WARN",
            (false, Severity::Error) => "FAIL",
        };
        println!("{status}  {:<26} {}", check.rule, check.message);
    }

    if passable(&checks) {
        eprintln!("Trade is permitted.");
        Ok(())
    } else {
        let failed = checks.iter().filter(|c| c.is_blocking()).count();
        Err(LedgerError::RulesFailed { failed })
    }
}

pub fn run_stats(
    trades_path: &Path,
    quotes_path: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<(), LedgerError> {
    let config = load_config(config_path)?;
    let mut holdings = load_holdings(trades_path, &config)?;
    let quotes = load_quotes(quotes_path)?;
    for position in holdings.positions.values_mut() {
        position.current_price = quotes.latest_price(&position.ticker);
    }

    let stats = TradeStats::compute(&holdings);
    let scores = TraitScores::compute(&holdings, &stats);

    println!("Trades:           {}", stats.trades);
    println!("Closing Trades:   {}", stats.closing_trades);
    println!("Win Rate:         {:.1}%", stats.win_rate * 100.0);
    println!("Profit Factor:    {:.2}", stats.profit_factor);
    println!("Avg Win:          {:.2}", stats.avg_win);
    println!("Avg Loss:         {:.2}", stats.avg_loss);
    println!("Largest Win:      {:.2}", stats.largest_win);
    println!("Largest Loss:     {:.2}", stats.largest_loss);
    println!("Realized P&L:     {:.2}", stats.realized_pnl);
    println!("Total Fees:       {:.2}", stats.total_fees);
    println!("Avg Holding Days: {:.1}", stats.avg_holding_days);
    println!("Sharpe-like:      {:.2}", stats.sharpe_like);
    println!("Max Drawdown:     -{:.1}%", stats.max_drawdown * 100.0);
    println!("Total Return:     {:.2}%", stats.total_return * 100.0);

    if !holdings.positions.is_empty() {
        println!("\nOpen Positions:");
        for p in holdings.positions.values() {
            println!(
                "  {:<8} {:>12.4} @ {:>10.2}  value {:>12.2}  unrealized {:>10.2}",
                p.ticker,
                p.shares,
                p.avg_cost,
                p.market_value(),
                p.unrealized_pnl()
            );
        }
    }

    println!("\nTraits (0-100):");
    println!("  Concentration:  {:.0}", scores.concentration);
    println!("  Turnover:       {:.0}", scores.turnover);
    println!("  Patience:       {:.0}", scores.patience);
    println!("  Discipline:     {:.0}", scores.discipline);

    if stats.closing_trades == 0 {
        warn!("no closing trades; win/loss statistics are empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn builders_use_defaults() {
        let empty = FileConfigAdapter::empty();
        assert_eq!(build_ingest_policy(&empty), IngestPolicy::default());
        assert_eq!(build_risk_limits(&empty), RiskLimits::default());
        assert_eq!(build_cost_model(&empty), CostModel::default());
        assert_eq!(build_starting_capital(&empty), DEFAULT_STARTING_CAPITAL);
        assert_eq!(build_peak_override(&empty), None);
        assert!(build_classifier(&empty).unwrap().is_none());
    }

    #[test]
    fn builders_read_config() {
        let c = config(
            "[import]\nmin_trades = 3\n[risk]\nposition_max_pct = 0.2\n[costs]\nbase_commission = 0\n[portfolio]\nstarting_capital = 50000\npeak_value = 60000\n",
        );
        assert_eq!(build_ingest_policy(&c).min_trades, 3);
        assert_eq!(build_risk_limits(&c).position_max_pct, 0.2);
        assert_eq!(build_cost_model(&c).base_commission, 0.0);
        assert_eq!(build_starting_capital(&c), 50_000.0);
        assert_eq!(build_peak_override(&c), Some(60_000.0));
    }

    #[test]
    fn disabled_classifier_is_none() {
        let c = config("[classifier]\nenabled = false\nendpoint = http://127.0.0.1:9/x\n");
        assert!(build_classifier(&c).unwrap().is_none());
    }

    #[test]
    fn parse_side_accepts_broker_spellings() {
        assert_eq!(parse_side("buy"), Ok(Action::Buy));
        assert_eq!(parse_side("SOLD"), Ok(Action::Sell));
        assert!(parse_side("hold").is_err());
    }

    #[test]
    fn manual_mapping_overlays_guess() {
        let table = RawTable::new(
            ["Date", "Symbol", "Side", "Units", "Price"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            vec![],
        );
        let mapping = manual_mapping(&table, &["quantity=Units".to_string()]).unwrap();
        assert_eq!(mapping.quantity, "Units");
        assert_eq!(mapping.date, "Date");
        assert_eq!(mapping.ticker, "Symbol");
    }
}
