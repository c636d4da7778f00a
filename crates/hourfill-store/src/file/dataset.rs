use async_trait::async_trait;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use hourfill_core::error::{HourfillError, Result};
use hourfill_core::models::{Dataset, DatasetRow};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::atomic::{append_synced, read_if_exists, write_atomic};
use super::table::{check_facet_columns, facet_cells, format_period, Header, TableError};
use crate::ports::DatasetStore;

const TABLE: &str = "dataset";
const PERIOD: &str = "period";
const VALUE: &str = "value";
const VALUE_UNITS: &str = "value-units";
const FIXED: [&str; 3] = [PERIOD, VALUE, VALUE_UNITS];

/// Observation table kept as one CSV file.
///
/// Columns are `period`, one column per facet key, `value` and
/// `value-units`. Initialization rewrites the file atomically; appends add
/// rows in place under the existing header.
#[derive(Debug, Clone)]
pub struct CsvDatasetStore {
    path: PathBuf,
}

impl CsvDatasetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_header(&self) -> Result<Option<Vec<String>>> {
        let file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut line = String::new();
        BufReader::new(file).read_line(&mut line).await?;

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .from_reader(line.as_bytes());
        let record = match reader.records().next() {
            Some(record) => record.map_err(TableError::from)?,
            None => StringRecord::new(),
        };
        let header = Header::new(TABLE, &record, &FIXED)?;
        Ok(Some(header.facet_names()))
    }
}

fn encode(rows: &[DatasetRow], facets: &[String], with_header: bool) -> Result<Vec<u8>> {
    check_facet_columns(TABLE, facets, &FIXED)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());

    if with_header {
        let mut header = vec![PERIOD.to_string()];
        header.extend(facets.iter().cloned());
        header.push(VALUE.to_string());
        header.push(VALUE_UNITS.to_string());
        writer.write_record(&header).map_err(TableError::from)?;
    }

    for row in rows {
        let mut record = vec![format_period(row.period)];
        record.extend(facet_cells(TABLE, &row.series, facets)?);
        record.push(row.value.map(|v| v.to_string()).unwrap_or_default());
        record.push(row.units.clone().unwrap_or_default());
        writer.write_record(&record).map_err(TableError::from)?;
    }

    writer
        .into_inner()
        .map_err(|e| HourfillError::Serialization(format!("Failed to flush dataset rows: {}", e)))
}

fn decode(bytes: &[u8]) -> Result<Dataset> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(bytes);
    let header_record = reader.headers().map_err(TableError::from)?.clone();
    let header = Header::new(TABLE, &header_record, &FIXED)?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(TableError::from)?;
        let row = i + 1;

        let raw_value = header.cell(&record, VALUE).trim();
        let value = if raw_value.is_empty() {
            None
        } else {
            Some(header.parse::<f64>(&record, row, VALUE)?)
        };
        let units = Some(header.cell(&record, VALUE_UNITS))
            .filter(|u| !u.is_empty())
            .map(str::to_string);

        rows.push(DatasetRow {
            series: header.series(&record),
            period: header.period(&record, row, PERIOD)?,
            value,
            units,
        });
    }

    Ok(Dataset::new(rows))
}

fn facet_union(rows: &[DatasetRow]) -> Vec<String> {
    let keys: BTreeSet<&str> = rows.iter().flat_map(|r| r.series.keys()).collect();
    keys.into_iter().map(str::to_string).collect()
}

#[async_trait]
impl DatasetStore for CsvDatasetStore {
    async fn load(&self) -> Result<Option<Dataset>> {
        match read_if_exists(&self.path).await? {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    async fn append(&self, rows: &[DatasetRow], init: bool) -> Result<usize> {
        if init {
            let facets = facet_union(rows);
            write_atomic(&self.path, &encode(rows, &facets, true)?).await?;
            tracing::debug!(path = %self.path.display(), rows = rows.len(), "Initialized dataset");
            return Ok(rows.len());
        }

        let Some(facets) = self.read_header().await? else {
            return Err(HourfillError::invalid_argument(format!(
                "Dataset {} has not been initialized",
                self.path.display()
            )));
        };

        if rows.is_empty() {
            return Ok(0);
        }

        let incoming = facet_union(rows);
        if incoming.iter().any(|k| !facets.contains(k)) {
            // New facet keys: rewrite under a widened header
            let mut all_rows = self.load().await?.map(|d| d.rows).unwrap_or_default();
            all_rows.extend_from_slice(rows);
            let widened: BTreeSet<String> = facets.into_iter().chain(incoming).collect();
            let widened: Vec<String> = widened.into_iter().collect();
            write_atomic(&self.path, &encode(&all_rows, &widened, true)?).await?;
            tracing::info!(path = %self.path.display(), facets = ?widened, "Widened dataset header");
            return Ok(rows.len());
        }

        append_synced(&self.path, &encode(rows, &facets, false)?).await?;
        tracing::debug!(path = %self.path.display(), rows = rows.len(), "Appended dataset rows");
        Ok(rows.len())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use hourfill_core::models::SeriesId;
    use tempfile::TempDir;

    fn hour(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    fn row(subba: &str, h: u32, value: Option<f64>) -> DatasetRow {
        DatasetRow {
            series: SeriesId::new([("parent", "CISO"), ("subba", subba)]),
            period: hour(h),
            value,
            units: value.map(|_| "megawatthours".to_string()),
        }
    }

    #[tokio::test]
    async fn test_init_append_load() {
        let dir = TempDir::new().unwrap();
        let store = CsvDatasetStore::new(dir.path().join("csv/data.csv"));
        assert!(store.load().await.unwrap().is_none());

        store
            .append(&[row("PGAE", 0, Some(10.0)), row("PGAE", 1, None)], true)
            .await
            .unwrap();
        store.append(&[row("SCE", 0, Some(7.25))], false).await.unwrap();

        let dataset = store.load().await.unwrap().unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.rows[0], row("PGAE", 0, Some(10.0)));
        assert!(dataset.rows[1].is_missing());
        assert_eq!(dataset.rows[2].value, Some(7.25));

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("period,parent,subba,value,value-units\n"));
        assert_eq!(text.lines().count(), 4);
    }

    #[tokio::test]
    async fn test_append_before_init_fails() {
        let dir = TempDir::new().unwrap();
        let store = CsvDatasetStore::new(dir.path().join("data.csv"));
        let result = store.append(&[row("PGAE", 0, Some(1.0))], false).await;
        assert!(matches!(result, Err(HourfillError::InvalidArgument { .. })));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_append_with_new_facet_widens_header() {
        let dir = TempDir::new().unwrap();
        let store = CsvDatasetStore::new(dir.path().join("data.csv"));
        store.append(&[row("PGAE", 0, Some(1.0))], true).await.unwrap();

        let extra = DatasetRow {
            series: SeriesId::new([("parent", "CISO"), ("subba", "SCE"), ("timezone", "Pacific")]),
            period: hour(1),
            value: Some(2.0),
            units: None,
        };
        store.append(&[extra.clone()], false).await.unwrap();

        let dataset = store.load().await.unwrap().unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.rows[0], row("PGAE", 0, Some(1.0)));
        assert_eq!(dataset.rows[1], extra);

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("period,parent,subba,timezone,value,value-units\n"));
    }

    #[tokio::test]
    async fn test_reinit_replaces_file() {
        let dir = TempDir::new().unwrap();
        let store = CsvDatasetStore::new(dir.path().join("data.csv"));
        store.append(&[row("PGAE", 0, Some(1.0)), row("PGAE", 1, Some(2.0))], true).await.unwrap();
        store.append(&[row("SCE", 3, Some(3.0))], true).await.unwrap();

        let dataset = store.load().await.unwrap().unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.rows[0].series.get("subba"), Some("SCE"));
    }

    #[tokio::test]
    async fn test_fixed_column_facet_rejected() {
        let dir = TempDir::new().unwrap();
        let store = CsvDatasetStore::new(dir.path().join("data.csv"));
        store.append(&[row("PGAE", 0, Some(1.0))], true).await.unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let clash = DatasetRow {
            series: SeriesId::new([("parent", "CISO"), ("value", "x")]),
            period: hour(1),
            value: Some(2.0),
            units: None,
        };
        let result = store.append(&[clash.clone()], false).await;
        assert!(matches!(result, Err(HourfillError::Serialization(_))));
        assert_eq!(std::fs::read(store.path()).unwrap(), before);

        let fresh = CsvDatasetStore::new(dir.path().join("fresh.csv"));
        assert!(fresh.append(&[clash], true).await.is_err());
        assert!(!fresh.path().exists());
    }

    #[tokio::test]
    async fn test_duplicate_header_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "period,type,type,value,value-units
2024-01-01T00:00:00,D,NG,1,MWh
").unwrap();
        assert!(CsvDatasetStore::new(&path).load().await.is_err());
    }

    #[tokio::test]
    async fn test_empty_append_is_noop() {
        let dir = TempDir::new().unwrap();
        let store = CsvDatasetStore::new(dir.path().join("data.csv"));
        store.append(&[], true).await.unwrap();
        assert_eq!(store.append(&[], false).await.unwrap(), 0);
        assert!(store.load().await.unwrap().unwrap().is_empty());
    }
}
