//! Brokerage format registry and header-based detection.
//!
//! Known formats are a compile-time ordered table; the first spec whose
//! required headers all appear wins. Specs requiring more distinctive column
//! combinations must come first. When nothing matches, the generic pattern
//! table tries to assemble a mapping from common header spellings.

use super::column_mapping::{find_header, ColumnMapping, Field, PartialMapping};
use super::import_plan::{ActionTable, ImportPlan, MatchMode, PlanSource, RowFilter};
use super::parsers::normalize_header;

#[derive(Debug)]
pub struct StaticMapping {
    pub date: &'static str,
    pub ticker: &'static str,
    pub action: &'static str,
    pub quantity: &'static str,
    pub price: &'static str,
    pub fees: Option<&'static str>,
}

#[derive(Debug)]
pub struct StaticFilter {
    pub column: &'static str,
    pub exclude: &'static [&'static str],
    pub mode: MatchMode,
}

#[derive(Debug)]
pub struct BrokerageFormatSpec {
    pub name: &'static str,
    /// Detector: every header listed here must be present.
    pub required_headers: &'static [&'static str],
    pub mapping: StaticMapping,
    pub buy_values: &'static [&'static str],
    pub sell_values: &'static [&'static str],
    pub filter: Option<StaticFilter>,
}

impl BrokerageFormatSpec {
    pub fn matches(&self, headers: &[String]) -> bool {
        self.required_headers
            .iter()
            .all(|h| find_header(headers, h).is_some())
    }

    pub fn column_mapping(&self) -> ColumnMapping {
        ColumnMapping {
            date: self.mapping.date.to_string(),
            ticker: self.mapping.ticker.to_string(),
            action: self.mapping.action.to_string(),
            quantity: self.mapping.quantity.to_string(),
            price: self.mapping.price.to_string(),
            fees: self.mapping.fees.map(str::to_string),
        }
    }

    pub fn plan(&self) -> ImportPlan {
        ImportPlan {
            format_name: self.name.to_string(),
            source: PlanSource::Known,
            mapping: self.column_mapping(),
            actions: ActionTable::new(self.buy_values, self.sell_values),
            filter: self
                .filter
                .as_ref()
                .map(|f| RowFilter::with_mode(f.column, f.exclude, f.mode)),
        }
    }
}

pub static BROKERAGE_FORMATS: &[BrokerageFormatSpec] = &[
    BrokerageFormatSpec {
        name: "Robinhood",
        required_headers: &["Activity Date", "Instrument", "Trans Code"],
        mapping: StaticMapping {
            date: "Activity Date",
            ticker: "Instrument",
            action: "Trans Code",
            quantity: "Quantity",
            price: "Price",
            fees: None,
        },
        buy_values: &["Buy"],
        sell_values: &["Sell"],
        filter: Some(StaticFilter {
            column: "Trans Code",
            exclude: &[
                "CDIV", "MDIV", "ACH", "INT", "GOLD", "SLIP", "DTAX", "JNLC", "JNLS", "DCF",
                "AFEE", "DFEE", "REC", "SPL", "SPR", "GDBP",
            ],
            mode: MatchMode::Contains,
        }),
    },
    BrokerageFormatSpec {
        name: "Charles Schwab",
        required_headers: &["Action", "Symbol", "Fees & Comm"],
        mapping: StaticMapping {
            date: "Date",
            ticker: "Symbol",
            action: "Action",
            quantity: "Quantity",
            price: "Price",
            fees: Some("Fees & Comm"),
        },
        buy_values: &["Buy", "Buy to Open", "Buy to Close", "Reinvest Shares"],
        sell_values: &["Sell", "Sell to Open", "Sell to Close", "Sell Short"],
        filter: Some(StaticFilter {
            column: "Action",
            exclude: &[
                "Dividend",
                "Qual Div",
                "Interest",
                "Journal",
                "MoneyLink",
                "Transfer",
                "Wire",
                "Cash In Lieu",
                "Tax",
                "Adjustment",
            ],
            mode: MatchMode::Contains,
        }),
    },
    BrokerageFormatSpec {
        name: "Fidelity",
        required_headers: &["Run Date", "Action", "Symbol"],
        mapping: StaticMapping {
            date: "Run Date",
            ticker: "Symbol",
            action: "Action",
            quantity: "Quantity",
            price: "Price ($)",
            fees: Some("Commission ($)"),
        },
        buy_values: &[],
        sell_values: &[],
        filter: Some(StaticFilter {
            column: "Action",
            // Action text embeds the security name, so only the leading
            // activity phrase is matched.
            exclude: &[
                "DIVIDEND RECEIVED",
                "REINVESTMENT",
                "INTEREST EARNED",
                "TRANSFER",
                "ELECTRONIC FUNDS",
                "DIRECT DEPOSIT",
                "FEE CHARGED",
                "CASH CONTRIBUTION",
                "JOURNALED",
            ],
            mode: MatchMode::Prefix,
        }),
    },
    BrokerageFormatSpec {
        name: "E*TRADE",
        required_headers: &["TransactionDate", "TransactionType", "SecurityType"],
        mapping: StaticMapping {
            date: "TransactionDate",
            ticker: "Symbol",
            action: "TransactionType",
            quantity: "Quantity",
            price: "Price",
            fees: Some("Commission"),
        },
        buy_values: &["Bought", "Buy"],
        sell_values: &["Sold", "Sell"],
        filter: Some(StaticFilter {
            column: "TransactionType",
            exclude: &[
                "Dividend",
                "Interest",
                "Transfer",
                "Fee",
                "Adjustment",
                "Deposit",
                "Withdrawal",
            ],
            mode: MatchMode::Contains,
        }),
    },
    BrokerageFormatSpec {
        name: "TD Ameritrade",
        required_headers: &["TRANSACTION ID", "DESCRIPTION", "SYMBOL"],
        mapping: StaticMapping {
            date: "DATE",
            ticker: "SYMBOL",
            action: "DESCRIPTION",
            quantity: "QUANTITY",
            price: "PRICE",
            fees: Some("COMMISSION"),
        },
        buy_values: &[],
        sell_values: &[],
        filter: Some(StaticFilter {
            column: "DESCRIPTION",
            exclude: &[
                "ORDINARY DIVIDEND",
                "QUALIFIED DIVIDEND",
                "NON-TAXABLE DIVIDEND",
                "FREE BALANCE INTEREST",
                "MARGIN INTEREST",
                "OFF-CYCLE INTEREST",
                "CLIENT REQUESTED ELECTRONIC FUNDING",
                "INTERNAL TRANSFER",
                "TRANSFER",
                "REBATE",
                "JOURNAL",
            ],
            mode: MatchMode::Prefix,
        }),
    },
    BrokerageFormatSpec {
        name: "Webull",
        required_headers: &["Side", "Filled Time", "Avg Price"],
        mapping: StaticMapping {
            date: "Filled Time",
            ticker: "Symbol",
            action: "Side",
            quantity: "Filled",
            price: "Avg Price",
            fees: None,
        },
        buy_values: &["Buy"],
        sell_values: &["Sell", "Short"],
        filter: Some(StaticFilter {
            column: "Status",
            exclude: &["Cancelled", "Canceled", "Failed", "Pending", "Rejected"],
            mode: MatchMode::Contains,
        }),
    },
    BrokerageFormatSpec {
        name: "Interactive Brokers",
        required_headers: &["TradeDate", "Buy/Sell", "TradePrice"],
        mapping: StaticMapping {
            date: "TradeDate",
            ticker: "Symbol",
            action: "Buy/Sell",
            quantity: "Quantity",
            price: "TradePrice",
            fees: Some("IBCommission"),
        },
        buy_values: &["BUY"],
        sell_values: &["SELL"],
        filter: None,
    },
];

/// Accepted header spellings per field, most likely first.
const GENERIC_PATTERNS: &[(Field, &[&str])] = &[
    (
        Field::Date,
        &[
            "date",
            "trade date",
            "activity date",
            "transaction date",
            "run date",
            "execution date",
            "exec date",
            "filled time",
            "time",
            "settlement date",
            "settle date",
        ],
    ),
    (
        Field::Ticker,
        &[
            "symbol",
            "ticker",
            "instrument",
            "stock",
            "security",
            "underlying",
            "code",
        ],
    ),
    (
        Field::Action,
        &[
            "action",
            "side",
            "type",
            "transaction type",
            "trans code",
            "buy/sell",
            "b/s",
            "direction",
            "activity",
            "order type",
            "transaction",
        ],
    ),
    (
        Field::Quantity,
        &[
            "quantity",
            "qty",
            "shares",
            "units",
            "filled",
            "size",
            "volume",
        ],
    ),
    (
        Field::Price,
        &[
            "price",
            "trade price",
            "execution price",
            "fill price",
            "avg price",
            "average price",
            "unit price",
            "share price",
            "cost per share",
        ],
    ),
    (
        Field::Fees,
        &[
            "fees",
            "fee",
            "commission",
            "commissions",
            "fees & comm",
            "comm",
        ],
    ),
];

/// Values in the action column that mark non-trade activity for generic
/// and assisted imports.
pub const GENERIC_NON_TRADE: &[&str] = &[
    "dividend",
    "interest",
    "transfer",
    "deposit",
    "withdrawal",
    "journal",
    "split",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Known(&'static BrokerageFormatSpec),
    Generic(ColumnMapping),
}

impl Detection {
    pub fn name(&self) -> &str {
        match self {
            Detection::Known(spec) => spec.name,
            Detection::Generic(_) => "Generic",
        }
    }

    pub fn mapping(&self) -> ColumnMapping {
        match self {
            Detection::Known(spec) => spec.column_mapping(),
            Detection::Generic(mapping) => mapping.clone(),
        }
    }

    pub fn plan(&self) -> ImportPlan {
        match self {
            Detection::Known(spec) => spec.plan(),
            Detection::Generic(mapping) => ImportPlan {
                format_name: "Generic".to_string(),
                source: PlanSource::Generic,
                mapping: mapping.clone(),
                actions: ActionTable::default(),
                filter: Some(RowFilter::new(&mapping.action, GENERIC_NON_TRADE)),
            },
        }
    }
}

impl PartialEq for BrokerageFormatSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Known format first, generic mapping second, `None` when neither resolves.
pub fn detect_format(headers: &[String]) -> Option<Detection> {
    if let Some(spec) = BROKERAGE_FORMATS.iter().find(|spec| spec.matches(headers)) {
        return Some(Detection::Known(spec));
    }
    generic_mapping(headers).map(Detection::Generic)
}

pub fn generic_mapping(headers: &[String]) -> Option<ColumnMapping> {
    generic_guess(headers).complete().ok()
}

/// Best-effort field assignment from the generic pattern table.
///
/// Exact (normalized) matches across all variants are preferred over
/// containment matches; a header is never assigned to two fields.
pub fn generic_guess(headers: &[String]) -> PartialMapping {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let mut used = vec![false; headers.len()];
    let mut guess = PartialMapping::default();

    for (field, variants) in GENERIC_PATTERNS {
        let variants: Vec<String> = variants.iter().map(|v| normalize_header(v)).collect();

        let exact = variants.iter().find_map(|v| {
            normalized
                .iter()
                .enumerate()
                .position(|(i, h)| !used[i] && h == v)
        });
        let found = exact.or_else(|| {
            variants.iter().find_map(|v| {
                normalized
                    .iter()
                    .enumerate()
                    .position(|(i, h)| !used[i] && h.contains(v.as_str()))
            })
        });

        if let Some(idx) = found {
            used[idx] = true;
            guess.set(*field, headers[idx].clone());
        }
    }
    guess
}
