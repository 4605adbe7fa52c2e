#![allow(dead_code)]

use chrono::NaiveDate;
use std::cell::{Cell, RefCell};
use std::io::Write;
use tradeledger::adapters::csv_adapter::parse_csv_text;
use tradeledger::domain::classification::{Classification, ClassificationRequest, Confidence};
use tradeledger::domain::column_mapping::{Field, PartialMapping};
use tradeledger::domain::error::LedgerError;
use tradeledger::domain::raw_table::RawTable;
use tradeledger::domain::trade::{Action, CanonicalTrade};
use tradeledger::ports::classifier_port::ClassifierPort;

/// Classifier double: canned response, records every request it sees.
pub struct MockClassifier {
    response: Result<Classification, String>,
    pub calls: Cell<usize>,
    pub requests: RefCell<Vec<ClassificationRequest>>,
}

impl MockClassifier {
    pub fn returning(classification: Classification) -> Self {
        Self {
            response: Ok(classification),
            calls: Cell::new(0),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            response: Err(reason.to_string()),
            calls: Cell::new(0),
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl ClassifierPort for MockClassifier {
    fn propose(&self, request: &ClassificationRequest) -> Result<Classification, LedgerError> {
        self.calls.set(self.calls.get() + 1);
        self.requests.borrow_mut().push(request.clone());
        self.response
            .clone()
            .map_err(|reason| LedgerError::Classifier { reason })
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn make_trade(ticker: &str, action: Action, qty: f64, price: f64, day: &str) -> CanonicalTrade {
    CanonicalTrade {
        ticker: ticker.to_string(),
        action,
        quantity: qty,
        price,
        date: date(day),
        fees: 0.0,
    }
}

pub fn table(text: &str) -> RawTable {
    parse_csv_text(text).unwrap()
}

pub fn write_temp(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Robinhood activity export: six trades, one dividend, one deposit.
pub const ROBINHOOD_CSV: &str = "\
Activity Date,Process Date,Settle Date,Instrument,Description,Trans Code,Quantity,Price,Amount
01/02/2024,01/02/2024,01/04/2024,AAPL,Apple,Buy,10,$150.00,($1500.00)
01/03/2024,01/03/2024,01/05/2024,MSFT,Microsoft,Buy,5,$370.00,($1850.00)
01/10/2024,01/10/2024,01/12/2024,AAPL,Apple,Sell,4,$160.00,$640.00
01/11/2024,01/11/2024,01/11/2024,AAPL,Apple Dividend,CDIV,,,$2.40
01/12/2024,01/12/2024,01/12/2024,,ACH Deposit,ACH,,,$5000.00
01/15/2024,01/15/2024,01/17/2024,NVDA,NVIDIA,Buy,2,$550.00,($1100.00)
01/20/2024,01/20/2024,01/23/2024,MSFT,Microsoft,Sell,5,$390.00,$1950.00
01/22/2024,01/22/2024,01/24/2024,AAPL,Apple,Buy,3,$155.00,($465.00)
";

/// Headers no registered format or generic pattern understands.
pub const ODD_HEADERS: &str = "When,Sym,B/S,Units,Px";

pub fn odd_csv(rows: usize) -> String {
    let mut text = format!("{ODD_HEADERS}\n");
    for i in 0..rows {
        let side = if i % 2 == 0 { "B" } else { "S" };
        text.push_str(&format!("2024-02-{:02},AAPL,{side},1,{}\n", i + 1, 100 + i));
    }
    text.push_str("2024-02-28,AAPL,DIV,0,0\n");
    text
}

pub fn odd_classification(confidence: Confidence) -> Classification {
    let mut mapping = PartialMapping::default();
    mapping.set(Field::Date, "When");
    mapping.set(Field::Ticker, "Sym");
    mapping.set(Field::Action, "B/S");
    mapping.set(Field::Quantity, "Units");
    mapping.set(Field::Price, "Px");
    Classification {
        mapping,
        filter_out: vec!["DIV".to_string()],
        buy_values: vec!["B".to_string()],
        sell_values: vec!["S".to_string()],
        confidence,
    }
}
