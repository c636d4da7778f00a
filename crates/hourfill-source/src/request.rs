use chrono::NaiveDateTime;
use hourfill_core::error::{HourfillError, Result};
use hourfill_core::models::{SeriesId, TimeUnit};
use reqwest::Url;
use serde::Serialize;

/// Parameters of one upstream data query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataRequest {
    /// Data route, e.g. `electricity/rto/region-sub-ba-data/data`
    pub api_path: String,

    /// Data field to select
    pub data: String,

    /// Facet filters
    pub facets: SeriesId,

    /// Inclusive bounds, formatted at `unit` granularity
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub unit: TimeUnit,

    /// Row cap for this call
    pub length: Option<usize>,

    /// Rows to skip
    pub offset: Option<usize>,

    /// Frequency tag sent upstream
    pub frequency: Option<TimeUnit>,
}

impl DataRequest {
    /// Request for `value` of a series at its own frequency
    pub fn new(api_path: impl Into<String>, facets: SeriesId, unit: TimeUnit) -> Self {
        Self {
            api_path: api_path.into(),
            data: "value".to_string(),
            facets,
            start: None,
            end: None,
            unit,
            length: None,
            offset: None,
            frequency: Some(unit),
        }
    }

    pub fn with_range(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn with_page(mut self, length: usize, offset: usize) -> Self {
        self.length = Some(length);
        self.offset = Some(offset);
        self
    }

    /// Query URL under `base_url`, without the credential
    pub fn url(&self, base_url: &str) -> Result<Url> {
        let mut url = route_url(base_url, &self.api_path)?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("data[]", &self.data);
            for (key, value) in self.facets.facets() {
                query.append_pair(&format!("facets[{}][]", key), value);
            }
            if let Some(start) = self.start {
                query.append_pair("start", &self.unit.format(start));
            }
            if let Some(end) = self.end {
                query.append_pair("end", &self.unit.format(end));
            }
            if let Some(length) = self.length {
                query.append_pair("length", &length.to_string());
            }
            if let Some(offset) = self.offset {
                query.append_pair("offset", &offset.to_string());
            }
            if let Some(frequency) = self.frequency {
                query.append_pair("frequency", frequency.frequency());
            }
        }

        Ok(url)
    }
}

/// Join an API route onto the base URL, making sure the route ends with `/`
pub fn route_url(base_url: &str, api_path: &str) -> Result<Url> {
    let mut base = base_url.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    let mut path = api_path.trim_start_matches('/').to_string();
    if !path.ends_with('/') {
        path.push('/');
    }

    Url::parse(&base)
        .and_then(|b| b.join(&path))
        .map_err(|e| HourfillError::ConfigInvalid {
            key: "base_url".to_string(),
            reason: format!("Cannot build URL from '{}' and '{}': {}", base_url, api_path, e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn pairs(url: &Url) -> HashMap<String, String> {
        url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect()
    }

    fn request() -> DataRequest {
        DataRequest::new(
            "electricity/rto/region-sub-ba-data/data",
            SeriesId::new([("parent", "CISO"), ("subba", "PGAE")]),
            TimeUnit::Hour,
        )
    }

    #[test]
    fn test_route_gets_trailing_slash() {
        let url = request().url("https://api.eia.gov/v2").unwrap();
        assert_eq!(url.path(), "/v2/electricity/rto/region-sub-ba-data/data/");
    }

    #[test]
    fn test_query_parameters() {
        let start = NaiveDate::from_ymd_opt(2018, 7, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
        let end = NaiveDate::from_ymd_opt(2018, 10, 3).unwrap().and_hms_opt(1, 0, 0).unwrap();
        let url = request()
            .with_range(start, end)
            .with_page(5000, 10000)
            .url("https://api.eia.gov/v2/")
            .unwrap();

        let q = pairs(&url);
        assert_eq!(q["data[]"], "value");
        assert_eq!(q["facets[parent][]"], "CISO");
        assert_eq!(q["facets[subba][]"], "PGAE");
        assert_eq!(q["start"], "2018-07-01T08");
        assert_eq!(q["end"], "2018-10-03T01");
        assert_eq!(q["length"], "5000");
        assert_eq!(q["offset"], "10000");
        assert_eq!(q["frequency"], "hourly");
        assert!(!q.contains_key("api_key"));
    }

    #[test]
    fn test_daily_bounds_use_date_format() {
        let day = NaiveDate::from_ymd_opt(2023, 3, 9).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let mut req = request();
        req.unit = TimeUnit::Day;
        let url = req.with_range(day, day).url("https://api.eia.gov/v2/").unwrap();
        assert_eq!(pairs(&url)["start"], "2023-03-09");
    }

    #[test]
    fn test_optional_parameters_are_omitted() {
        let mut req = request();
        req.frequency = None;
        let q = pairs(&req.url("https://api.eia.gov/v2/").unwrap());
        assert!(!q.contains_key("start"));
        assert!(!q.contains_key("length"));
        assert!(!q.contains_key("frequency"));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(request().url("not a url").is_err());
    }
}
