//! Row normalization: raw rows plus an [`ImportPlan`] become canonical trades.
//!
//! Per row, in order: row filter, field extraction, quantity/price, ticker,
//! date, action, dedup. Filtered rows are counted; rows with an unparsable
//! date are reported as errors because everything else about them was valid.
//! Output is stable-sorted by date.

use std::collections::HashSet;

use tracing::debug;

use super::column_mapping::{find_header, ResolvedColumns};
use super::error::LedgerError;
use super::import_plan::ImportPlan;
use super::parsers::{parse_date, parse_number, parse_ticker};
use super::trade::CanonicalTrade;

/// Why rows were filtered, for callers that want more than the total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterBreakdown {
    /// Dividends, transfers, interest and other activity the plan excludes.
    pub non_trade: usize,
    /// Zero or unparsable quantity/price, or an empty ticker.
    pub unparsable: usize,
    /// Action value that neither the table nor the heuristic recognised.
    pub unmapped_action: usize,
    pub duplicate: usize,
}

impl FilterBreakdown {
    pub fn total(&self) -> usize {
        self.non_trade + self.unparsable + self.unmapped_action + self.duplicate
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeOutcome {
    pub trades: Vec<CanonicalTrade>,
    pub rows_filtered: usize,
    pub errors: Vec<String>,
    pub breakdown: FilterBreakdown,
}

impl NormalizeOutcome {
    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

/// Apply `plan` to every row. Fails only when the plan's columns do not
/// resolve against `headers`.
pub fn normalize(
    headers: &[String],
    rows: &[Vec<String>],
    plan: &ImportPlan,
) -> Result<NormalizeOutcome, LedgerError> {
    let columns: ResolvedColumns = plan.mapping.resolve(headers)?;
    let filter = plan
        .filter
        .as_ref()
        .and_then(|f| find_header(headers, &f.column).map(|idx| (idx, f)));

    let mut outcome = NormalizeOutcome::default();
    let mut seen = HashSet::new();
    let mut trades = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let row_number = i + 1;

        if let Some((idx, f)) = filter {
            if f.excludes(cell(row, idx)) {
                debug!(row = row_number, value = cell(row, idx), "non-trade row filtered");
                outcome.breakdown.non_trade += 1;
                continue;
            }
        }

        let raw_date = cell(row, columns.date);
        let raw_action = cell(row, columns.action);

        let quantity = parse_number(cell(row, columns.quantity)).abs();
        let price = parse_number(cell(row, columns.price)).abs();
        if quantity == 0.0 || price == 0.0 {
            debug!(row = row_number, "unparsable quantity or price");
            outcome.breakdown.unparsable += 1;
            continue;
        }

        let Some(ticker) = parse_ticker(cell(row, columns.ticker)) else {
            debug!(row = row_number, "empty ticker");
            outcome.breakdown.unparsable += 1;
            continue;
        };

        let Some(date) = parse_date(raw_date) else {
            outcome
                .errors
                .push(format!("row {row_number}: unparsable date '{}'", raw_date.trim()));
            continue;
        };

        let Some(action) = plan.actions.resolve(raw_action) else {
            debug!(row = row_number, value = raw_action, "unmapped action");
            outcome.breakdown.unmapped_action += 1;
            continue;
        };

        let fees = columns
            .fees
            .map(|idx| parse_number(cell(row, idx)).abs())
            .unwrap_or(0.0);

        let trade = CanonicalTrade {
            ticker,
            action,
            quantity,
            price,
            date,
            fees,
        };

        if !seen.insert(trade.dedup_key()) {
            debug!(row = row_number, "duplicate trade filtered");
            outcome.breakdown.duplicate += 1;
            continue;
        }

        trades.push(trade);
    }

    // sort_by_key is stable: same-day trades keep file order
    trades.sort_by_key(|t| t.date);
    outcome.trades = trades;
    outcome.rows_filtered = outcome.breakdown.total();
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::column_mapping::ColumnMapping;
    use crate::domain::format::detect_format;
    use crate::domain::import_plan::{ActionTable, PlanSource, RowFilter};
    use crate::domain::trade::Action;
    use chrono::NaiveDate;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn generic_headers() -> Vec<String> {
        strings(&["Date", "Symbol", "Action", "Quantity", "Price", "Fees"])
    }

    fn generic_plan() -> ImportPlan {
        ImportPlan {
            format_name: "test".into(),
            source: PlanSource::Manual,
            mapping: ColumnMapping {
                date: "Date".into(),
                ticker: "Symbol".into(),
                action: "Action".into(),
                quantity: "Quantity".into(),
                price: "Price".into(),
                fees: Some("Fees".into()),
            },
            actions: ActionTable::default(),
            filter: Some(RowFilter::new("Action", &["dividend"])),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn robinhood_row_normalizes() {
        let headers = strings(&["Activity Date", "Instrument", "Trans Code", "Quantity", "Price"]);
        let rows = vec![strings(&["01/02/2024", "AAPL", "Buy", "10", "150.00"])];
        let plan = detect_format(&headers).unwrap().plan();
        let outcome = normalize(&headers, &rows, &plan).unwrap();

        assert_eq!(outcome.trades.len(), 1);
        let trade = &outcome.trades[0];
        assert_eq!(trade.ticker, "AAPL");
        assert_eq!(trade.action, Action::Buy);
        assert_eq!(trade.quantity, 10.0);
        assert_eq!(trade.price, 150.0);
        assert_eq!(trade.date, date(2024, 1, 2));
        assert_eq!(trade.fees, 0.0);
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.rows_filtered, 0);
    }

    #[test]
    fn filters_non_trade_rows_and_counts_them() {
        let rows = vec![
            strings(&["2024-01-02", "AAPL", "Buy", "10", "150", "1"]),
            strings(&["2024-01-03", "AAPL", "Qualified Dividend", "", "", ""]),
        ];
        let outcome = normalize(&generic_headers(), &rows, &generic_plan()).unwrap();
        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.rows_filtered, 1);
        assert_eq!(outcome.breakdown.non_trade, 1);
    }

    #[test]
    fn zero_quantity_or_price_is_filtered_not_defaulted() {
        let rows = vec![
            strings(&["2024-01-02", "AAPL", "Buy", "abc", "150", ""]),
            strings(&["2024-01-02", "AAPL", "Buy", "10", "$0.00", ""]),
        ];
        let outcome = normalize(&generic_headers(), &rows, &generic_plan()).unwrap();
        assert!(outcome.trades.is_empty());
        assert_eq!(outcome.breakdown.unparsable, 2);
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn empty_ticker_is_filtered() {
        let rows = vec![strings(&["2024-01-02", "--", "Buy", "10", "150", ""])];
        let outcome = normalize(&generic_headers(), &rows, &generic_plan()).unwrap();
        assert!(outcome.trades.is_empty());
        assert_eq!(outcome.breakdown.unparsable, 1);
    }

    #[test]
    fn bad_date_is_an_error_with_row_number() {
        let rows = vec![
            strings(&["2024-01-02", "AAPL", "Buy", "10", "150", ""]),
            strings(&["someday", "MSFT", "Buy", "5", "300", ""]),
        ];
        let outcome = normalize(&generic_headers(), &rows, &generic_plan()).unwrap();
        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.errors, vec!["row 2: unparsable date 'someday'".to_string()]);
        assert_eq!(outcome.rows_filtered, 0);
    }

    #[test]
    fn unmapped_action_counted_separately() {
        let rows = vec![strings(&["2024-01-02", "AAPL", "Exchange", "10", "150", ""])];
        let outcome = normalize(&generic_headers(), &rows, &generic_plan()).unwrap();
        assert!(outcome.trades.is_empty());
        assert_eq!(outcome.breakdown.unmapped_action, 1);
        assert_eq!(outcome.rows_filtered, 1);
    }

    #[test]
    fn duplicates_collapse_to_one() {
        let rows = vec![
            strings(&["2024-01-02", "AAPL", "Buy", "10", "150", "1"]),
            strings(&["01/02/2024", "aapl", "BUY", "10.00", "$150.00", "2"]),
        ];
        let outcome = normalize(&generic_headers(), &rows, &generic_plan()).unwrap();
        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].fees, 1.0);
        assert_eq!(outcome.breakdown.duplicate, 1);
    }

    #[test]
    fn output_sorted_by_date_stable() {
        let rows = vec![
            strings(&["2024-03-01", "MSFT", "Buy", "1", "300", ""]),
            strings(&["2024-01-05", "AAPL", "Buy", "1", "150", ""]),
            strings(&["2024-01-05", "TSLA", "Buy", "1", "200", ""]),
            strings(&["2024-02-01", "NVDA", "Sell", "1", "500", ""]),
        ];
        let outcome = normalize(&generic_headers(), &rows, &generic_plan()).unwrap();
        let tickers: Vec<&str> = outcome.trades.iter().map(|t| t.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAPL", "TSLA", "NVDA", "MSFT"]);
    }

    #[test]
    fn negative_quantities_and_fees_are_absolute() {
        let rows = vec![strings(&["2024-01-02", "AAPL", "Sell", "-10", "150", "(1.25)"])];
        let outcome = normalize(&generic_headers(), &rows, &generic_plan()).unwrap();
        assert_eq!(outcome.trades[0].quantity, 10.0);
        assert_eq!(outcome.trades[0].fees, 1.25);
        assert_eq!(outcome.trades[0].action, Action::Sell);
    }

    #[test]
    fn short_rows_read_as_empty() {
        let rows = vec![strings(&["2024-01-02", "AAPL", "Buy"])];
        let outcome = normalize(&generic_headers(), &rows, &generic_plan()).unwrap();
        assert!(outcome.trades.is_empty());
        assert_eq!(outcome.breakdown.unparsable, 1);
    }

    #[test]
    fn unresolvable_mapping_is_an_error() {
        let headers = strings(&["When", "What"]);
        let err = normalize(&headers, &[], &generic_plan()).unwrap_err();
        assert!(matches!(err, LedgerError::MissingColumn { .. }));
    }

    #[test]
    fn filter_on_missing_column_is_ignored() {
        let mut plan = generic_plan();
        plan.filter = Some(RowFilter::new("Status", &["Cancelled"]));
        let rows = vec![strings(&["2024-01-02", "AAPL", "Buy", "10", "150", ""])];
        let outcome = normalize(&generic_headers(), &rows, &plan).unwrap();
        assert_eq!(outcome.trades.len(), 1);
    }
}
