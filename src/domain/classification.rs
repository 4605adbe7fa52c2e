//! Suggestions from the external classification collaborator.
//!
//! A suggestion may be absent, low-confidence, or wrong. Only `high` and
//! `medium` suggestions with a complete, resolvable mapping become an
//! [`ImportPlan`]; everything else is at most a pre-fill hint.

use std::fmt;
use std::str::FromStr;

use super::column_mapping::PartialMapping;
use super::format::GENERIC_NON_TRADE;
use super::import_plan::{ActionTable, ImportPlan, PlanSource, RowFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        })
    }
}

impl FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Confidence::Low),
            "medium" => Ok(Confidence::Medium),
            "high" => Ok(Confidence::High),
            other => Err(format!("unknown confidence '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRequest {
    pub headers: Vec<String>,
    pub sample_rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub mapping: PartialMapping,
    pub filter_out: Vec<String>,
    pub buy_values: Vec<String>,
    pub sell_values: Vec<String>,
    pub confidence: Confidence,
}

impl Classification {
    pub fn is_auto_applicable(&self) -> bool {
        self.confidence > Confidence::Low
    }

    /// Build a plan when confidence allows and every required header exists.
    pub fn plan(&self, headers: &[String]) -> Option<ImportPlan> {
        if !self.is_auto_applicable() {
            return None;
        }
        let mapping = self.mapping.complete().ok()?;
        mapping.resolve(headers).ok()?;

        let exclude: Vec<&str> = if self.filter_out.is_empty() {
            GENERIC_NON_TRADE.to_vec()
        } else {
            self.filter_out.iter().map(String::as_str).collect()
        };

        Some(ImportPlan {
            format_name: format!("Assisted ({} confidence)", self.confidence),
            source: PlanSource::Assisted,
            filter: Some(RowFilter::new(&mapping.action, &exclude)),
            mapping,
            actions: ActionTable::new(&self.buy_values, &self.sell_values),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::column_mapping::Field;

    fn headers() -> Vec<String> {
        ["When", "Sym", "B/S", "Units", "Px"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn classification(confidence: Confidence) -> Classification {
        let mut mapping = PartialMapping::default();
        mapping.set(Field::Date, "When");
        mapping.set(Field::Ticker, "Sym");
        mapping.set(Field::Action, "B/S");
        mapping.set(Field::Quantity, "Units");
        mapping.set(Field::Price, "Px");
        Classification {
            mapping,
            filter_out: vec!["DIV".into()],
            buy_values: vec!["B".into(), "BOT".into()],
            sell_values: vec!["S".into()],
            confidence,
        }
    }

    #[test]
    fn confidence_ordering_and_parse() {
        assert!(Confidence::High > Confidence::Medium);
        assert!(Confidence::Medium > Confidence::Low);
        assert_eq!("HIGH".parse::<Confidence>().unwrap(), Confidence::High);
        assert!("certain".parse::<Confidence>().is_err());
    }

    #[test]
    fn medium_confidence_builds_plan() {
        let plan = classification(Confidence::Medium).plan(&headers()).unwrap();
        assert_eq!(plan.source, PlanSource::Assisted);
        assert_eq!(plan.mapping.action, "B/S");
        assert_eq!(plan.actions.buy_values, vec!["B", "BOT"]);
        assert!(plan.filter.unwrap().excludes("div"));
    }

    #[test]
    fn low_confidence_is_never_applied() {
        assert!(classification(Confidence::Low).plan(&headers()).is_none());
    }

    #[test]
    fn mapping_to_unknown_header_is_rejected() {
        let mut c = classification(Confidence::High);
        c.mapping.set(Field::Price, "Price");
        assert!(c.plan(&headers()).is_none());
    }

    #[test]
    fn incomplete_mapping_is_rejected() {
        let mut c = classification(Confidence::High);
        c.mapping.quantity = None;
        assert!(c.plan(&headers()).is_none());
    }
}
