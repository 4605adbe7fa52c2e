//! HTTP classification service client.
//!
//! POSTs `{headers, sampleRows}` as JSON and expects
//! `{mapping, filter_out, action_mapping: {buy_values, sell_values}, confidence}`
//! back. Any transport, status, or decode failure is a
//! [`LedgerError::Classifier`], which the ingest pipeline logs and skips.

use crate::domain::classification::{Classification, ClassificationRequest, Confidence};
use crate::domain::column_mapping::{Field, PartialMapping};
use crate::domain::error::LedgerError;
use crate::ports::classifier_port::ClassifierPort;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    headers: &'a [String],
    sample_rows: &'a [Vec<String>],
}

#[derive(Debug, Default, Deserialize)]
struct WireMapping {
    date: Option<String>,
    ticker: Option<String>,
    action: Option<String>,
    quantity: Option<String>,
    price: Option<String>,
    fees: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireActionMapping {
    #[serde(default)]
    buy_values: Vec<String>,
    #[serde(default)]
    sell_values: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    mapping: WireMapping,
    #[serde(default)]
    filter_out: Vec<String>,
    #[serde(default)]
    action_mapping: WireActionMapping,
    confidence: Option<String>,
}

fn classifier_error(reason: impl ToString) -> LedgerError {
    LedgerError::Classifier {
        reason: reason.to_string(),
    }
}

/// Decode a response body. Unknown or missing confidence is treated as low.
pub fn parse_response(body: &str) -> Result<Classification, LedgerError> {
    let wire: WireResponse = serde_json::from_str(body).map_err(classifier_error)?;

    let mut mapping = PartialMapping::default();
    let fields = [
        (Field::Date, wire.mapping.date),
        (Field::Ticker, wire.mapping.ticker),
        (Field::Action, wire.mapping.action),
        (Field::Quantity, wire.mapping.quantity),
        (Field::Price, wire.mapping.price),
        (Field::Fees, wire.mapping.fees),
    ];
    for (field, header) in fields {
        if let Some(header) = header.filter(|h| !h.trim().is_empty()) {
            mapping.set(field, header);
        }
    }

    let confidence = match wire.confidence.as_deref().map(str::parse::<Confidence>) {
        Some(Ok(c)) => c,
        Some(Err(e)) => {
            warn!(error = %e, "treating classifier confidence as low");
            Confidence::Low
        }
        None => Confidence::Low,
    };

    Ok(Classification {
        mapping,
        filter_out: wire.filter_out,
        buy_values: wire.action_mapping.buy_values,
        sell_values: wire.action_mapping.sell_values,
        confidence,
    })
}

pub struct HttpClassifier {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpClassifier {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, LedgerError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(classifier_error)?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

impl ClassifierPort for HttpClassifier {
    fn propose(&self, request: &ClassificationRequest) -> Result<Classification, LedgerError> {
        let body = WireRequest {
            headers: &request.headers,
            sample_rows: &request.sample_rows,
        };
        debug!(endpoint = %self.endpoint, headers = request.headers.len(), "requesting classification");

        let text = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .map_err(classifier_error)?;

        parse_response(&text)
    }
}
