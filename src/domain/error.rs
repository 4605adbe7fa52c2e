//! Domain error types.

use super::column_mapping::Field;

/// Top-level error type for tradeledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("csv error: {reason}")]
    Csv { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("mapped column '{header}' for {field} not found in headers")]
    MissingColumn { field: Field, header: String },

    #[error("incomplete column mapping, missing: {}", fields_list(.missing))]
    IncompleteMapping { missing: Vec<Field> },

    #[error("no known brokerage format matches the headers")]
    NoFormatDetected,

    #[error("automatic mapping found only {best} trades; supply a column mapping")]
    MappingRequired { best: usize },

    #[error("only {found} trades parsed, need at least {minimum}")]
    InsufficientTrades { found: usize, minimum: usize },

    #[error("classifier error: {reason}")]
    Classifier { reason: String },

    #[error("proposed trade failed {failed} rule check(s)")]
    RulesFailed { failed: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn fields_list(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<csv::Error> for LedgerError {
    fn from(err: csv::Error) -> Self {
        LedgerError::Csv {
            reason: err.to_string(),
        }
    }
}

impl From<&LedgerError> for std::process::ExitCode {
    fn from(err: &LedgerError) -> Self {
        let code: u8 = match err {
            LedgerError::Io(_) | LedgerError::Csv { .. } => 1,
            LedgerError::ConfigParse { .. } | LedgerError::ConfigInvalid { .. } => 2,
            LedgerError::MissingColumn { .. }
            | LedgerError::IncompleteMapping { .. }
            | LedgerError::NoFormatDetected
            | LedgerError::MappingRequired { .. } => 3,
            LedgerError::InsufficientTrades { .. } => 4,
            LedgerError::Classifier { .. } => 5,
            LedgerError::RulesFailed { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
