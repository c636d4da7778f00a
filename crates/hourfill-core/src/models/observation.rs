use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::series::SeriesId;
use crate::error::{HourfillError, Result};

/// A single normalized upstream record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Hour-aligned timestamp
    pub period: NaiveDateTime,

    /// Numeric value; `None` when the upstream cell was missing or not numeric
    pub value: Option<f64>,

    /// Unit reported alongside the value (e.g. "megawatthours")
    pub units: Option<String>,
}

/// A persisted observation together with its series identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub series: SeriesId,
    pub period: NaiveDateTime,
    pub value: Option<f64>,
    pub units: Option<String>,
}

impl DatasetRow {
    pub fn is_missing(&self) -> bool {
        self.value.is_none()
    }
}

/// The table of all observations across all series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub rows: Vec<DatasetRow>,
}

impl Dataset {
    pub fn new(rows: Vec<DatasetRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append contract of the dataset table.
    ///
    /// With `init` the table is created from `new_rows` alone and any
    /// existing table is discarded. Otherwise `new_rows` is concatenated onto
    /// the existing table as-is; no deduplication happens here, callers keep
    /// their request windows disjoint.
    pub fn append(existing: Option<Dataset>, new_rows: Vec<DatasetRow>, init: bool) -> Result<Dataset> {
        if init {
            return Ok(Dataset::new(new_rows));
        }

        let Some(mut dataset) = existing else {
            return Err(HourfillError::invalid_argument(
                "cannot append to a dataset that has not been initialized",
            ));
        };
        dataset.rows.extend(new_rows);
        Ok(dataset)
    }

    /// Rows belonging to one series, in stored order
    pub fn series_rows<'a>(&'a self, series: &'a SeriesId) -> impl Iterator<Item = &'a DatasetRow> + 'a {
        self.rows.iter().filter(move |r| &r.series == series)
    }

    /// Facet keys used by any row, sorted
    pub fn facet_keys(&self) -> Vec<String> {
        let mut keys: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
        for row in &self.rows {
            keys.extend(row.series.keys().map(str::to_string));
        }
        keys.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(subba: &str, hour: u32, value: Option<f64>) -> DatasetRow {
        DatasetRow {
            series: SeriesId::new([("parent", "CISO"), ("subba", subba)]),
            period: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(hour, 0, 0).unwrap(),
            value,
            units: Some("megawatthours".to_string()),
        }
    }

    #[test]
    fn test_init_equals_new_rows() {
        let rows = vec![row("PGAE", 0, Some(1.0)), row("PGAE", 1, None), row("SCE", 0, Some(3.5))];
        let dataset = Dataset::append(None, rows.clone(), true).unwrap();
        assert_eq!(dataset.rows, rows);
    }

    #[test]
    fn test_init_replaces_existing() {
        let existing = Dataset::new(vec![row("PGAE", 0, Some(1.0))]);
        let dataset = Dataset::append(Some(existing), vec![row("SCE", 3, None)], true).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.rows[0].series.get("subba"), Some("SCE"));
    }

    #[test]
    fn test_append_concatenates_without_dedup() {
        let existing = Dataset::new(vec![row("PGAE", 0, Some(1.0))]);
        let dataset =
            Dataset::append(Some(existing), vec![row("PGAE", 0, Some(1.0)), row("PGAE", 1, Some(2.0))], false)
                .unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.rows[0], dataset.rows[1]);
    }

    #[test]
    fn test_append_without_existing_fails() {
        assert!(Dataset::append(None, vec![row("PGAE", 0, None)], false).is_err());
    }

    #[test]
    fn test_facet_keys() {
        let dataset = Dataset::new(vec![row("PGAE", 0, None)]);
        assert_eq!(dataset.facet_keys(), vec!["parent".to_string(), "subba".to_string()]);
    }
}
