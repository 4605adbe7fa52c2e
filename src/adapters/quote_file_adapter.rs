//! Current prices and sectors from a `ticker,price[,sector]` CSV file.

use crate::domain::aggregator::SectorMap;
use crate::domain::error::LedgerError;
use crate::domain::parsers::{parse_number, parse_ticker};
use crate::ports::price_port::PricePort;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteBook {
    prices: HashMap<String, f64>,
    sectors: SectorMap,
}

impl QuoteBook {
    pub fn from_csv_text(text: &str) -> Result<Self, LedgerError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_lowercase()).collect();
        let column = |name: &str| headers.iter().position(|h| h == name);
        let (Some(ticker_idx), Some(price_idx)) = (column("ticker"), column("price")) else {
            return Err(LedgerError::Csv {
                reason: "quotes file needs ticker and price columns".to_string(),
            });
        };
        let sector_idx = column("sector");

        let mut book = QuoteBook::default();
        for (i, result) in rdr.records().enumerate() {
            let record = result?;
            let Some(ticker) = record.get(ticker_idx).and_then(parse_ticker) else {
                continue;
            };
            let price = parse_number(record.get(price_idx).unwrap_or(""));
            if price <= 0.0 {
                return Err(LedgerError::Csv {
                    reason: format!("row {}: invalid price for {ticker}", i + 1),
                });
            }
            if let Some(sector) = sector_idx
                .and_then(|idx| record.get(idx))
                .filter(|s| !s.is_empty())
            {
                book.sectors.insert(ticker.clone(), sector.to_string());
            }
            book.prices.insert(ticker, price);
        }
        Ok(book)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        Self::from_csv_text(&fs::read_to_string(path)?)
    }

    pub fn sectors(&self) -> &SectorMap {
        &self.sectors
    }

    pub fn sector(&self, ticker: &str) -> Option<&str> {
        self.sectors.get(ticker).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl PricePort for QuoteBook {
    fn latest_price(&self, ticker: &str) -> Option<f64> {
        self.prices.get(ticker).copied()
    }
}
