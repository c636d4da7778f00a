//! Scripted upstream used by the pipeline tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use hourfill_core::error::{HourfillError, Result};
use hourfill_core::models::{SeriesCatalog, SeriesDef, SeriesId, TimeUnit};
use hourfill_source::response::Record;
use hourfill_source::{Coverage, DataRequest, DataResponse, UpstreamSource};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const API_PATH: &str = "electricity/rto/region-sub-ba-data/";

pub fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap().and_hms_opt(hour, 0, 0).unwrap()
}

pub fn series(subba: &str) -> SeriesId {
    SeriesId::new([("parent", "CISO"), ("subba", subba)])
}

pub fn catalog(subbas: &[&str]) -> SeriesCatalog {
    SeriesCatalog {
        api_path: API_PATH.to_string(),
        frequency: TimeUnit::Hour,
        series: subbas
            .iter()
            .map(|s| SeriesDef {
                name: Some(s.to_string()),
                facets: series(s),
            })
            .collect(),
    }
}

/// How a request for a chunk starting at a given hour misbehaves
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// Transport error on every attempt
    Always,
    /// Transport error on the first `n` attempts
    Times(usize),
    /// Rows without a `value` column
    BadSchema,
}

#[derive(Clone, Default)]
pub struct FakeUpstream {
    data: Arc<Mutex<HashMap<SeriesId, BTreeMap<NaiveDateTime, Option<f64>>>>>,
    faults: Arc<Mutex<HashMap<NaiveDateTime, (Fault, usize)>>>,
    end: Arc<Mutex<Option<NaiveDateTime>>>,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<DataRequest>>>,
}

impl FakeUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `value` for every hour in `[from, to]`
    pub fn fill(&self, id: &SeriesId, from: NaiveDateTime, to: NaiveDateTime) {
        let mut data = self.data.lock().unwrap();
        let rows = data.entry(id.clone()).or_default();
        let mut t = from;
        while t <= to {
            rows.insert(t, Some(100.0 + (t.and_utc().timestamp() / 3600 % 50) as f64));
            t += TimeUnit::Hour.step(1);
        }
        let mut end = self.end.lock().unwrap();
        *end = Some(end.map_or(to, |e| e.max(to)));
    }

    pub fn fault(&self, chunk_start: NaiveDateTime, fault: Fault) {
        self.faults.lock().unwrap().insert(chunk_start, (fault, 0));
    }

    pub fn set_end(&self, end: NaiveDateTime) {
        *self.end.lock().unwrap() = Some(end);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<DataRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpstreamSource for FakeUpstream {
    async fn fetch(&self, request: &DataRequest) -> Result<DataResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let start = request.start.unwrap();
        let end = request.end.unwrap();

        if let Some((fault, seen)) = self.faults.lock().unwrap().get_mut(&start) {
            *seen += 1;
            match *fault {
                Fault::Always => {
                    return Err(HourfillError::Upstream {
                        reason: "connection reset".to_string(),
                    })
                }
                Fault::Times(n) if *seen <= n => {
                    return Err(HourfillError::Upstream {
                        reason: "timed out".to_string(),
                    })
                }
                Fault::BadSchema => {
                    let record = json!({ "period": TimeUnit::Hour.format(start), "demand": 1 });
                    return Ok(DataResponse {
                        records: vec![record.as_object().unwrap().clone()],
                        total: Some(1),
                        url: String::new(),
                        request: request.clone(),
                    });
                }
                Fault::Times(_) => {}
            }
        }

        let data = self.data.lock().unwrap();
        let matching: Vec<Record> = data
            .get(&request.facets)
            .map(|rows| {
                rows.range(start..=end)
                    .map(|(period, value)| {
                        let mut record = json!({
                            "period": TimeUnit::Hour.format(*period),
                            "value": value.map(|v| v.to_string()),
                            "value-units": "megawatthours",
                        });
                        for (k, v) in request.facets.facets() {
                            record[k] = json!(v);
                        }
                        record.as_object().unwrap().clone()
                    })
                    .collect()
            })
            .unwrap_or_default();

        let total = matching.len();
        let offset = request.offset.unwrap_or(0);
        let length = request.length.unwrap_or(usize::MAX);
        let page = matching.into_iter().skip(offset).take(length).collect();

        Ok(DataResponse {
            records: page,
            total: Some(total),
            url: String::new(),
            request: request.clone(),
        })
    }

    async fn coverage(&self, _api_path: &str) -> Result<Coverage> {
        let end = self.end.lock().unwrap().ok_or_else(|| HourfillError::Upstream {
            reason: "no data".to_string(),
        })?;
        Ok(Coverage {
            start_period: at(1, 0),
            end_period: end,
        })
    }
}
