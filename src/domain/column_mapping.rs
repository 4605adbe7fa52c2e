//! Column mapping: which source header feeds each canonical field.
//!
//! A [`ColumnMapping`] names headers; [`ColumnMapping::resolve`] turns it into
//! [`ResolvedColumns`] (indices) once per import so the normalizer never looks
//! fields up by name.

use std::fmt;
use std::str::FromStr;

use super::error::LedgerError;
use super::parsers::normalize_header;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Date,
    Ticker,
    Action,
    Quantity,
    Price,
    Fees,
}

impl Field {
    pub const REQUIRED: [Field; 5] = [
        Field::Date,
        Field::Ticker,
        Field::Action,
        Field::Quantity,
        Field::Price,
    ];

    pub const ALL: [Field; 6] = [
        Field::Date,
        Field::Ticker,
        Field::Action,
        Field::Quantity,
        Field::Price,
        Field::Fees,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Date => "date",
            Field::Ticker => "ticker",
            Field::Action => "action",
            Field::Quantity => "quantity",
            Field::Price => "price",
            Field::Fees => "fees",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "date" => Ok(Field::Date),
            "ticker" | "symbol" => Ok(Field::Ticker),
            "action" | "side" => Ok(Field::Action),
            "quantity" | "qty" => Ok(Field::Quantity),
            "price" => Ok(Field::Price),
            "fees" | "fee" | "commission" => Ok(Field::Fees),
            other => Err(format!("unknown field '{other}'")),
        }
    }
}

/// Find a header by exact name, then by fuzzy-normalized name.
pub fn find_header(headers: &[String], name: &str) -> Option<usize> {
    if let Some(idx) = headers.iter().position(|h| h == name) {
        return Some(idx);
    }
    let wanted = normalize_header(name);
    if wanted.is_empty() {
        return None;
    }
    headers.iter().position(|h| normalize_header(h) == wanted)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub date: String,
    pub ticker: String,
    pub action: String,
    pub quantity: String,
    pub price: String,
    pub fees: Option<String>,
}

impl ColumnMapping {
    pub fn header(&self, field: Field) -> Option<&str> {
        match field {
            Field::Date => Some(&self.date),
            Field::Ticker => Some(&self.ticker),
            Field::Action => Some(&self.action),
            Field::Quantity => Some(&self.quantity),
            Field::Price => Some(&self.price),
            Field::Fees => self.fees.as_deref(),
        }
    }

    /// Resolve every required header to a column index.
    ///
    /// A fees header that does not exist is dropped rather than rejected.
    pub fn resolve(&self, headers: &[String]) -> Result<ResolvedColumns, LedgerError> {
        let required = |field: Field, name: &str| {
            find_header(headers, name).ok_or_else(|| LedgerError::MissingColumn {
                field,
                header: name.to_string(),
            })
        };

        Ok(ResolvedColumns {
            date: required(Field::Date, &self.date)?,
            ticker: required(Field::Ticker, &self.ticker)?,
            action: required(Field::Action, &self.action)?,
            quantity: required(Field::Quantity, &self.quantity)?,
            price: required(Field::Price, &self.price)?,
            fees: self.fees.as_deref().and_then(|f| find_header(headers, f)),
        })
    }
}

/// Column indices for one import, produced by [`ColumnMapping::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub date: usize,
    pub ticker: usize,
    pub action: usize,
    pub quantity: usize,
    pub price: usize,
    pub fees: Option<usize>,
}

/// A mapping that may still be missing fields: classifier suggestions and
/// manual-mapping pre-fill.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialMapping {
    pub date: Option<String>,
    pub ticker: Option<String>,
    pub action: Option<String>,
    pub quantity: Option<String>,
    pub price: Option<String>,
    pub fees: Option<String>,
}

impl PartialMapping {
    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Date => self.date.as_deref(),
            Field::Ticker => self.ticker.as_deref(),
            Field::Action => self.action.as_deref(),
            Field::Quantity => self.quantity.as_deref(),
            Field::Price => self.price.as_deref(),
            Field::Fees => self.fees.as_deref(),
        }
    }

    pub fn set(&mut self, field: Field, header: impl Into<String>) {
        let slot = match field {
            Field::Date => &mut self.date,
            Field::Ticker => &mut self.ticker,
            Field::Action => &mut self.action,
            Field::Quantity => &mut self.quantity,
            Field::Price => &mut self.price,
            Field::Fees => &mut self.fees,
        };
        *slot = Some(header.into());
    }

    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|f| self.get(*f).is_none())
    }

    pub fn missing(&self) -> Vec<Field> {
        Field::REQUIRED
            .iter()
            .copied()
            .filter(|f| self.get(*f).is_none_or(|h| h.trim().is_empty()))
            .collect()
    }

    pub fn complete(&self) -> Result<ColumnMapping, LedgerError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(LedgerError::IncompleteMapping { missing });
        }
        let take = |field: Field| self.get(field).unwrap_or_default().to_string();
        Ok(ColumnMapping {
            date: take(Field::Date),
            ticker: take(Field::Ticker),
            action: take(Field::Action),
            quantity: take(Field::Quantity),
            price: take(Field::Price),
            fees: self.fees.clone(),
        })
    }

    /// Keep only fields whose header exists, rewritten to the header's exact spelling.
    pub fn retain_valid(&self, headers: &[String]) -> PartialMapping {
        let mut out = PartialMapping::default();
        for field in Field::ALL {
            if let Some(idx) = self.get(field).and_then(|name| find_header(headers, name)) {
                out.set(field, headers[idx].clone());
            }
        }
        out
    }

    /// Build from `field=header` assignments, e.g. `date=Activity Date`.
    pub fn from_assignments<S: AsRef<str>>(assignments: &[S]) -> Result<Self, LedgerError> {
        let mut mapping = PartialMapping::default();
        for assignment in assignments {
            let assignment = assignment.as_ref();
            let (field, header) =
                assignment
                    .split_once('=')
                    .ok_or_else(|| LedgerError::ConfigInvalid {
                        section: "mapping".into(),
                        key: assignment.to_string(),
                        reason: "expected field=header".into(),
                    })?;
            let field = field
                .parse::<Field>()
                .map_err(|reason| LedgerError::ConfigInvalid {
                    section: "mapping".into(),
                    key: assignment.to_string(),
                    reason,
                })?;
            mapping.set(field, header.trim());
        }
        Ok(mapping)
    }
}

impl From<&ColumnMapping> for PartialMapping {
    fn from(mapping: &ColumnMapping) -> Self {
        PartialMapping {
            date: Some(mapping.date.clone()),
            ticker: Some(mapping.ticker.clone()),
            action: Some(mapping.action.clone()),
            quantity: Some(mapping.quantity.clone()),
            price: Some(mapping.price.clone()),
            fees: mapping.fees.clone(),
        }
    }
}
