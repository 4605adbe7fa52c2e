//! CSV input and canonical CSV output.
//!
//! Input is whatever a brokerage exported: comma or tab delimited, possibly
//! with a UTF-8 BOM, blank lines, and ragged rows. Output is the fixed
//! canonical schema in [`CANONICAL_HEADERS`].

use crate::domain::error::LedgerError;
use crate::domain::raw_table::RawTable;
use crate::domain::trade::{Action, CanonicalTrade};
use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::Path;

pub const CANONICAL_HEADERS: [&str; 7] = [
    "trader_id", "ticker", "action", "quantity", "price", "date", "fees",
];

const BOM: char = '\u{feff}';

/// Tab when the header line has more tabs than commas.
fn detect_delimiter(text: &str) -> u8 {
    let header = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let tabs = header.matches('\t').count();
    let commas = header.matches(',').count();
    if tabs > commas { b'\t' } else { b',' }
}

pub fn parse_csv_text(text: &str) -> Result<RawTable, LedgerError> {
    let text = text.strip_prefix(BOM).unwrap_or(text);

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(text))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(LedgerError::Csv {
            reason: "no header row".to_string(),
        });
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable::new(headers, rows))
}

pub fn read_csv_file<P: AsRef<Path>>(path: P) -> Result<RawTable, LedgerError> {
    let text = fs::read_to_string(path)?;
    parse_csv_text(&text)
}

/// Quantity to 4 decimal places, price and fees to 2.
pub fn write_canonical<W: io::Write>(
    writer: W,
    trader_id: &str,
    trades: &[CanonicalTrade],
) -> Result<(), LedgerError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CANONICAL_HEADERS)?;
    for trade in trades {
        wtr.write_record([
            trader_id.to_string(),
            trade.ticker.clone(),
            trade.action.to_string(),
            format!("{:.4}", trade.quantity),
            format!("{:.2}", trade.price),
            trade.date.format("%Y-%m-%d").to_string(),
            format!("{:.2}", trade.fees),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn canonical_csv(trader_id: &str, trades: &[CanonicalTrade]) -> Result<String, LedgerError> {
    let mut buf = Vec::new();
    write_canonical(&mut buf, trader_id, trades)?;
    String::from_utf8(buf).map_err(|e| LedgerError::Csv {
        reason: e.to_string(),
    })
}

fn row_error(row: usize, column: &str, value: &str) -> LedgerError {
    LedgerError::Csv {
        reason: format!("row {row}: invalid {column} '{value}'"),
    }
}

fn field<'r>(record: &'r csv::StringRecord, idx: usize) -> &'r str {
    record.get(idx).unwrap_or("")
}

/// A finite number accepted by `valid`, else a row error naming the column.
fn number(
    record: &csv::StringRecord,
    idx: usize,
    row: usize,
    valid: impl Fn(f64) -> bool,
) -> Result<f64, LedgerError> {
    let raw = field(record, idx);
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && valid(v) => Ok(v),
        _ => Err(row_error(row, CANONICAL_HEADERS[idx], raw)),
    }
}

/// Parse canonical CSV back into trades. Strict: any bad cell is an error,
/// including a trade no import could have produced (empty ticker,
/// non-positive quantity or price, negative fees).
pub fn read_canonical(text: &str) -> Result<Vec<CanonicalTrade>, LedgerError> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if headers != CANONICAL_HEADERS {
        return Err(LedgerError::Csv {
            reason: format!(
                "expected header {}, found {}",
                CANONICAL_HEADERS.join(","),
                headers.join(",")
            ),
        });
    }

    let mut trades = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let row = i + 1;

        let action = match field(&record, 2) {
            "BUY" => Action::Buy,
            "SELL" => Action::Sell,
            other => return Err(row_error(row, "action", other)),
        };
        let ticker = field(&record, 1);
        if ticker.is_empty() {
            return Err(row_error(row, "ticker", ticker));
        }
        let raw_date = field(&record, 5);
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
            .map_err(|_| row_error(row, "date", raw_date))?;

        trades.push(CanonicalTrade {
            ticker: ticker.to_string(),
            action,
            quantity: number(&record, 3, row, |q| q > 0.0)?,
            price: number(&record, 4, row, |p| p > 0.0)?,
            date,
            fees: number(&record, 6, row, |f| f >= 0.0)?,
        });
    }
    Ok(trades)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn trade(ticker: &str, action: Action, qty: f64, price: f64, day: u32) -> CanonicalTrade {
        CanonicalTrade {
            ticker: ticker.into(),
            action,
            quantity: qty,
            price,
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            fees: 0.0,
        }
    }

    #[test]
    fn parses_quoted_commas() {
        let table = parse_csv_text("Date,Symbol,Amount\n01/02/2024,AAPL,\"$1,500.00\"\n").unwrap();
        assert_eq!(table.headers, vec!["Date", "Symbol", "Amount"]);
        assert_eq!(table.rows, vec![vec!["01/02/2024", "AAPL", "$1,500.00"]]);
    }

    #[test]
    fn unescapes_doubled_quotes() {
        let table =
            parse_csv_text("Date,Symbol,Note\n2024-01-02,AAPL,\"He said \"\"hi\"\"\"\n").unwrap();
        assert_eq!(table.rows[0][2], "He said \"hi\"");
    }

    #[test]
    fn strips_bom_and_trims_headers() {
        let table = parse_csv_text("\u{feff} Date , Symbol\n2024-01-02,AAPL\n").unwrap();
        assert_eq!(table.headers, vec!["Date", "Symbol"]);
    }

    #[test]
    fn detects_tab_delimiter() {
        let table = parse_csv_text("Date\tSymbol\tNote\n2024-01-02\tAAPL\ta,b\n").unwrap();
        assert_eq!(table.headers.len(), 3);
        assert_eq!(table.rows[0][2], "a,b");
    }

    #[test]
    fn skips_blank_rows_and_accepts_ragged() {
        let table = parse_csv_text("a,b,c\n1,2,3\n\n,,\n4,5\n6,7,8,9\n").unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.rows[1], vec!["4", "5"]);
        assert_eq!(table.rows[2].len(), 4);
    }

    #[test]
    fn empty_input_is_error() {
        assert!(parse_csv_text("").is_err());
    }

    #[test]
    fn canonical_output_format() {
        let mut t = trade("AAPL", Action::Buy, 10.0, 150.256, 2);
        t.fees = 0.5;
        let out = canonical_csv("u1", &[t]).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "trader_id,ticker,action,quantity,price,date,fees");
        assert_eq!(lines[1], "u1,AAPL,BUY,10.0000,150.26,2024-01-02,0.50");
    }

    #[test]
    fn canonical_round_trip() {
        let trades = vec![
            trade("AAPL", Action::Buy, 10.0, 150.25, 2),
            trade("MSFT", Action::Sell, 0.5, 300.0, 3),
        ];
        let out = canonical_csv("u1", &trades).unwrap();
        assert_eq!(read_canonical(&out).unwrap(), trades);
    }

    #[test]
    fn read_canonical_rejects_bad_rows() {
        let bad_action = "trader_id,ticker,action,quantity,price,date,fees\nu,AAPL,HOLD,1,1,2024-01-02,0\n";
        assert!(matches!(
            read_canonical(bad_action),
            Err(LedgerError::Csv { reason }) if reason.contains("row 1") && reason.contains("HOLD")
        ));

        let wrong_header = "ticker,action\nAAPL,BUY\n";
        assert!(read_canonical(wrong_header).is_err());
    }

    fn canonical_row_error(row: &str) -> String {
        let text = format!("trader_id,ticker,action,quantity,price,date,fees\n{row}\n");
        match read_canonical(&text) {
            Err(LedgerError::Csv { reason }) => reason,
            other => panic!("expected csv error for {row}, got {other:?}"),
        }
    }

    #[test]
    fn read_canonical_rejects_non_finite_numbers() {
        assert!(canonical_row_error("u,AAPL,BUY,NaN,5,2024-01-02,0").contains("quantity 'NaN'"));
        assert!(canonical_row_error("u,AAPL,SELL,1,inf,2024-01-02,0").contains("price 'inf'"));
        assert!(canonical_row_error("u,AAPL,BUY,1,5,2024-01-02,-inf").contains("fees '-inf'"));
    }

    #[test]
    fn read_canonical_rejects_non_positive_quantity() {
        assert!(canonical_row_error("u,AAPL,BUY,0,5,2024-01-02,0").contains("quantity '0'"));
        assert!(canonical_row_error("u,AAPL,BUY,-3,5,2024-01-02,0").contains("quantity '-3'"));
    }

    #[test]
    fn read_canonical_rejects_non_positive_price() {
        assert!(canonical_row_error("u,AAPL,BUY,1,0,2024-01-02,0").contains("price '0'"));
        assert!(canonical_row_error("u,AAPL,BUY,1,-5,2024-01-02,0").contains("price '-5'"));
    }

    #[test]
    fn read_canonical_rejects_negative_fees() {
        assert!(canonical_row_error("u,AAPL,BUY,1,5,2024-01-02,-1").contains("fees '-1'"));
    }

    #[test]
    fn read_canonical_rejects_empty_ticker() {
        assert!(canonical_row_error("u,,SELL,1,5,2024-01-02,0").contains("ticker ''"));
    }

    #[test]
    fn read_csv_file_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("export.csv");
        fs::write(&path, "Date,Symbol\n2024-01-02,AAPL\n").unwrap();
        let table = read_csv_file(&path).unwrap();
        assert_eq!(table.row_count(), 1);

        assert!(matches!(
            read_csv_file(dir.path().join("missing.csv")),
            Err(LedgerError::Io(_))
        ));
    }
}
