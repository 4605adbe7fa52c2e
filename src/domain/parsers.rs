//! Primitive field parsers shared by every import path.
//!
//! All functions are total: they never panic and signal failure with `0.0`
//! or `None` so the normalizer can decide whether a row is filtered or
//! reported as an error.

use chrono::{NaiveDate, NaiveDateTime};

use super::trade::Action;

/// Date formats tried after ISO and `M/D/YYYY`, in order.
const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%m/%d/%y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%Y%m%d",
    "%d-%b-%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%d.%m.%Y",
];

const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
];

/// Parse a currency-formatted number.
///
/// Strips `$`, `,` and whitespace; `(12.50)` and `-12.50` are negative.
/// Returns `0.0` for anything unparsable, including NaN and infinities.
pub fn parse_number(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }

    let (negative, body) = match cleaned
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, cleaned.as_str()),
    };

    match body.parse::<f64>() {
        Ok(v) if v.is_finite() => {
            if negative {
                -v
            } else {
                v
            }
        }
        _ => 0.0,
    }
}

/// Keep letters, digits and `.`, uppercased. `None` when nothing survives.
pub fn parse_ticker(raw: &str) -> Option<String> {
    let ticker: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if ticker.is_empty() { None } else { Some(ticker) }
}

/// Parse a calendar date: ISO first, then `M/D/YYYY`, then common broker formats.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    // Schwab: "01/02/2024 as of 01/01/2024" settles on the first date.
    let trimmed = match raw.find(" as of ") {
        Some(idx) => &raw[..idx],
        None => raw,
    }
    .trim()
    .trim_matches('"');
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(d);
    }
    // %Y accepts short years, so "01/02/24" must fall through to %y.
    if has_four_digit_year(trimmed) {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%m/%d/%Y") {
            return Some(d);
        }
    }
    for fmt in FALLBACK_DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(d);
        }
    }
    for fmt in FALLBACK_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }
    // Webull style "01/02/2024 09:31:07 EST": drop the trailing zone token.
    if let Some((head, tail)) = trimmed.rsplit_once(' ') {
        if tail.chars().all(|c| c.is_ascii_alphabetic()) {
            return parse_date(head);
        }
    }
    None
}

fn has_four_digit_year(value: &str) -> bool {
    value
        .rsplit('/')
        .next()
        .is_some_and(|y| y.len() == 4 && y.chars().all(|c| c.is_ascii_digit()))
}

/// Generic action heuristic used when no value table matches.
///
/// Buy markers are checked first so "Buy to Close" resolves to a buy.
pub fn parse_action(raw: &str) -> Option<Action> {
    let value = raw.trim().to_lowercase();
    if value.is_empty() {
        return None;
    }
    if value == "b" || ["buy", "bot", "bought"].iter().any(|m| value.contains(m)) {
        return Some(Action::Buy);
    }
    if value == "s" || ["sell", "sld", "sold"].iter().any(|m| value.contains(m)) {
        return Some(Action::Sell);
    }
    None
}

/// Lowercase and keep only ASCII letters and digits, for fuzzy header matching.
pub fn normalize_header(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
