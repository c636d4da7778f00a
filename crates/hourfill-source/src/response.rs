//! Upstream response records and their normalization into observations

use crate::request::DataRequest;
use chrono::NaiveDateTime;
use hourfill_core::error::{HourfillError, Result};
use hourfill_core::models::{Observation, TimeUnit};
use serde::Serialize;
use serde_json::Value;

/// One raw upstream row
pub type Record = serde_json::Map<String, Value>;

pub const PERIOD: &str = "period";
pub const VALUE: &str = "value";
pub const VALUE_UNITS: &str = "value-units";

/// Rows returned by one call, with the request that produced them
#[derive(Debug, Clone)]
pub struct DataResponse {
    pub records: Vec<Record>,
    /// Total rows matching the query, when the upstream reports it
    pub total: Option<usize>,
    /// Request URL, without the credential
    pub url: String,
    pub request: DataRequest,
}

/// Overall coverage of a dataset route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coverage {
    pub start_period: NaiveDateTime,
    pub end_period: NaiveDateTime,
}

/// Extract rows and the reported total from a data response body
pub fn parse_data_envelope(body: Value) -> Result<(Vec<Record>, Option<usize>)> {
    let response = unwrap_response(body)?;

    let total = response.get("total").and_then(parse_count);

    let records = match response.get("data") {
        Some(Value::Array(rows)) => rows
            .iter()
            .filter_map(|row| row.as_object().cloned())
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            return Err(HourfillError::Upstream {
                reason: format!("'data' is not an array: {}", other),
            })
        }
    };

    Ok((records, total))
}

/// Extract the available start/end coverage from a metadata response body
pub fn parse_coverage(body: Value) -> Result<Coverage> {
    let response = unwrap_response(body)?;

    let period = |key: &str| -> Result<NaiveDateTime> {
        let raw = response
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| HourfillError::Schema {
                column: key.to_string(),
            })?;
        TimeUnit::parse_period(raw)
    };

    Ok(Coverage {
        start_period: period("startPeriod")?,
        end_period: period("endPeriod")?,
    })
}

fn unwrap_response(body: Value) -> Result<serde_json::Map<String, Value>> {
    if let Some(error) = body.get("error") {
        return Err(HourfillError::Upstream {
            reason: match error {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        });
    }

    match body {
        Value::Object(mut map) => match map.remove("response") {
            Some(Value::Object(response)) => Ok(response),
            _ => Err(HourfillError::Upstream {
                reason: "response body has no 'response' object".to_string(),
            }),
        },
        _ => Err(HourfillError::Upstream {
            reason: "response body is not a JSON object".to_string(),
        }),
    }
}

fn parse_count(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Coerce a value cell to a number; anything non-numeric is missing
pub fn coerce_numeric(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Validate and normalize one page of records.
///
/// Fails with `Schema` when no record carries the `period` or `value`
/// column. Non-numeric values become missing; records whose period cannot
/// be read are dropped. The result is sorted by period.
pub fn normalize(records: &[Record]) -> Result<Vec<Observation>> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    for column in [PERIOD, VALUE] {
        if !records.iter().any(|r| r.contains_key(column)) {
            return Err(HourfillError::Schema {
                column: column.to_string(),
            });
        }
    }

    let mut unreadable = 0usize;
    let mut observations: Vec<Observation> = records
        .iter()
        .filter_map(|record| {
            let period = record
                .get(PERIOD)
                .and_then(Value::as_str)
                .and_then(|p| TimeUnit::parse_period(p).ok());
            let Some(period) = period else {
                unreadable += 1;
                return None;
            };
            Some(Observation {
                period,
                value: coerce_numeric(record.get(VALUE)),
                units: record.get(VALUE_UNITS).and_then(Value::as_str).map(str::to_string),
            })
        })
        .collect();

    if unreadable > 0 {
        tracing::warn!(dropped = unreadable, "Dropped records with an unreadable period");
    }

    observations.sort_by_key(|o| o.period);
    Ok(observations)
}
