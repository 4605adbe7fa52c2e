//! Layered import resolution: pattern, then assisted, then manual.
//!
//! Each layer runs only when the previous one produced fewer than
//! `min_trades` trades, and its result replaces the previous one. When both
//! automatic layers fall short the caller gets a [`ManualMappingRequest`]
//! and finishes with [`apply_manual_mapping`].

use tracing::{info, warn};

use super::classification::ClassificationRequest;
use super::column_mapping::{ColumnMapping, Field, PartialMapping};
use super::error::LedgerError;
use super::format::{detect_format, generic_guess, GENERIC_NON_TRADE};
use super::import_plan::{ImportPlan, PlanSource, RowFilter};
use super::normalizer::{normalize, NormalizeOutcome};
use super::raw_table::RawTable;
use crate::ports::classifier_port::ClassifierPort;

pub const DEFAULT_MIN_TRADES: usize = 5;
pub const DEFAULT_SAMPLE_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestPolicy {
    pub min_trades: usize,
    pub sample_rows: usize,
}

impl Default for IngestPolicy {
    fn default() -> Self {
        IngestPolicy {
            min_trades: DEFAULT_MIN_TRADES,
            sample_rows: DEFAULT_SAMPLE_ROWS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionLayer {
    Pattern,
    Assisted,
    Manual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub layer: ResolutionLayer,
    pub format_name: String,
    pub mapping: ColumnMapping,
    pub outcome: NormalizeOutcome,
}

/// What the caller needs to ask a person for an explicit mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualMappingRequest {
    pub headers: Vec<String>,
    pub sample_rows: Vec<Vec<String>>,
    /// Pre-fill; every header named here exists in `headers`.
    pub suggestion: PartialMapping,
    /// Most trades any automatic layer managed, for the prompt.
    pub best_trade_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Resolved(IngestReport),
    NeedsManualMapping(ManualMappingRequest),
}

fn run_plan(table: &RawTable, plan: &ImportPlan) -> Option<NormalizeOutcome> {
    match normalize(&table.headers, &table.rows, plan) {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            warn!(format = %plan.format_name, error = %e, "plan does not fit headers");
            None
        }
    }
}

/// Run the automatic layers over one parsed export.
pub fn ingest(
    table: &RawTable,
    classifier: Option<&dyn ClassifierPort>,
    policy: &IngestPolicy,
) -> IngestOutcome {
    let mut best_trade_count = 0;

    // Layer 1: registered formats and the generic pattern table.
    let detection = detect_format(&table.headers);
    let pattern_guess = match &detection {
        Some(d) => PartialMapping::from(&d.mapping()),
        None => generic_guess(&table.headers),
    };
    if let Some(detection) = &detection {
        let plan = detection.plan();
        if let Some(outcome) = run_plan(table, &plan) {
            info!(
                format = %plan.format_name,
                trades = outcome.trade_count(),
                filtered = outcome.rows_filtered,
                "pattern layer"
            );
            if outcome.trade_count() >= policy.min_trades {
                return IngestOutcome::Resolved(IngestReport {
                    layer: ResolutionLayer::Pattern,
                    format_name: plan.format_name,
                    mapping: plan.mapping,
                    outcome,
                });
            }
            best_trade_count = outcome.trade_count();
        }
    } else {
        info!(headers = table.headers.len(), "no format detected");
    }

    // Layer 2: external classifier.
    let mut assisted_guess = PartialMapping::default();
    if let Some(classifier) = classifier {
        let request = ClassificationRequest {
            headers: table.headers.clone(),
            sample_rows: table.sample(policy.sample_rows),
        };
        match classifier.propose(&request) {
            Ok(classification) => {
                assisted_guess = classification.mapping.retain_valid(&table.headers);
                match classification.plan(&table.headers) {
                    Some(plan) => {
                        if let Some(outcome) = run_plan(table, &plan) {
                            info!(
                                confidence = %classification.confidence,
                                trades = outcome.trade_count(),
                                "assisted layer"
                            );
                            if outcome.trade_count() >= policy.min_trades {
                                return IngestOutcome::Resolved(IngestReport {
                                    layer: ResolutionLayer::Assisted,
                                    format_name: plan.format_name,
                                    mapping: plan.mapping,
                                    outcome,
                                });
                            }
                            best_trade_count = best_trade_count.max(outcome.trade_count());
                        }
                    }
                    None => info!(
                        confidence = %classification.confidence,
                        "classifier suggestion not applicable, keeping as pre-fill"
                    ),
                }
            }
            Err(e) => warn!(error = %e, "classifier unavailable, falling through"),
        }
    }

    // Layer 3: hand back to the caller. Pattern guesses only fill gaps, and
    // never with a header the classifier already placed elsewhere.
    let mut suggestion = assisted_guess;
    let pattern_guess = pattern_guess.retain_valid(&table.headers);
    for field in Field::ALL {
        if suggestion.get(field).is_some() {
            continue;
        }
        if let Some(header) = pattern_guess.get(field) {
            let taken = Field::ALL.iter().any(|f| suggestion.get(*f) == Some(header));
            if !taken {
                suggestion.set(field, header);
            }
        }
    }

    IngestOutcome::NeedsManualMapping(ManualMappingRequest {
        headers: table.headers.clone(),
        sample_rows: table.sample(policy.sample_rows),
        suggestion,
        best_trade_count,
    })
}

/// Normalize with a caller-supplied mapping. Falling short of the threshold
/// is a hard error.
pub fn apply_manual_mapping(
    table: &RawTable,
    mapping: &ColumnMapping,
    policy: &IngestPolicy,
) -> Result<IngestReport, LedgerError> {
    let mut plan = ImportPlan::from_mapping("Manual", PlanSource::Manual, mapping.clone());
    plan.filter = Some(RowFilter::new(&mapping.action, GENERIC_NON_TRADE));

    let outcome = normalize(&table.headers, &table.rows, &plan)?;
    info!(trades = outcome.trade_count(), "manual layer");
    if outcome.trade_count() < policy.min_trades {
        return Err(LedgerError::InsufficientTrades {
            found: outcome.trade_count(),
            minimum: policy.min_trades,
        });
    }

    Ok(IngestReport {
        layer: ResolutionLayer::Manual,
        format_name: plan.format_name,
        mapping: plan.mapping,
        outcome,
    })
}
