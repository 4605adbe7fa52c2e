//! Everything the normalizer needs to interpret one import: the column
//! mapping, how action values translate to buy/sell, and which rows are
//! non-trade activity.

use super::column_mapping::ColumnMapping;
use super::parsers::parse_action;
use super::trade::Action;

/// Explicit action value table, consulted before the generic heuristic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionTable {
    pub buy_values: Vec<String>,
    pub sell_values: Vec<String>,
}

impl ActionTable {
    pub fn new<S: AsRef<str>>(buy_values: &[S], sell_values: &[S]) -> Self {
        Self {
            buy_values: buy_values.iter().map(|s| s.as_ref().to_string()).collect(),
            sell_values: sell_values.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    /// Exact match, then case-insensitive match, then [`parse_action`].
    pub fn resolve(&self, raw: &str) -> Option<Action> {
        let value = raw.trim();
        if self.buy_values.iter().any(|v| v == value) {
            return Some(Action::Buy);
        }
        if self.sell_values.iter().any(|v| v == value) {
            return Some(Action::Sell);
        }
        if self.buy_values.iter().any(|v| v.eq_ignore_ascii_case(value)) {
            return Some(Action::Buy);
        }
        if self.sell_values.iter().any(|v| v.eq_ignore_ascii_case(value)) {
            return Some(Action::Sell);
        }
        parse_action(value)
    }
}

/// How a [`RowFilter`] pattern is compared with a cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// Pattern anywhere in the cell. For short code columns.
    #[default]
    Contains,
    /// Cell starts with the pattern. For free-text columns that also carry
    /// the security name, e.g. "YOU BOUGHT SCHWAB US DIVIDEND EQUITY ETF".
    Prefix,
}

/// Rows whose value in `column` matches any of `exclude` (case-insensitive)
/// are non-trade activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter {
    pub column: String,
    pub exclude: Vec<String>,
    pub mode: MatchMode,
}

impl RowFilter {
    pub fn new<S: AsRef<str>>(column: &str, exclude: &[S]) -> Self {
        Self::with_mode(column, exclude, MatchMode::Contains)
    }

    pub fn with_mode<S: AsRef<str>>(column: &str, exclude: &[S], mode: MatchMode) -> Self {
        Self {
            column: column.to_string(),
            exclude: exclude
                .iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            mode,
        }
    }

    pub fn excludes(&self, value: &str) -> bool {
        let value = value.trim().to_lowercase();
        if value.is_empty() {
            return false;
        }
        self.exclude.iter().any(|pattern| match self.mode {
            MatchMode::Contains => value.contains(pattern.as_str()),
            MatchMode::Prefix => value.starts_with(pattern.as_str()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSource {
    /// A registered brokerage format.
    Known,
    /// The generic header pattern table.
    Generic,
    /// The external classification collaborator.
    Assisted,
    /// A mapping supplied by the caller.
    Manual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportPlan {
    pub format_name: String,
    pub source: PlanSource,
    pub mapping: ColumnMapping,
    pub actions: ActionTable,
    pub filter: Option<RowFilter>,
}

impl ImportPlan {
    /// A plan with no value table or filter, as used for manual mappings.
    pub fn from_mapping(format_name: &str, source: PlanSource, mapping: ColumnMapping) -> Self {
        Self {
            format_name: format_name.to_string(),
            source,
            mapping,
            actions: ActionTable::default(),
            filter: None,
        }
    }
}
