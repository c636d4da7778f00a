use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use hourfill_core::error::{HourfillError, Result};
use hourfill_core::models::{Ledger, LedgerEntry, RunType};
use std::path::{Path, PathBuf};

use super::atomic::{read_if_exists, write_atomic};
use super::table::{check_facet_columns, facet_cells, format_period, Header, TableError};
use crate::ports::LedgerStore;

const TABLE: &str = "ledger";

const INDEX: &str = "index";
const RUN_AT: &str = "time";
const START: &str = "start";
const END: &str = "end";
const START_ACT: &str = "start_act";
const END_ACT: &str = "end_act";
const START_MATCH: &str = "start_match";
const END_MATCH: &str = "end_match";
const N_OBS: &str = "n_obs";
const NA: &str = "na";
const RUN_TYPE: &str = "run_type";
const UPDATE: &str = "update";
const SUCCESS: &str = "success";
const COMMENTS: &str = "comments";

const LEADING: [&str; 1] = [INDEX];
const TRAILING: [&str; 13] = [
    RUN_AT, START, END, START_ACT, END_ACT, START_MATCH, END_MATCH, N_OBS, NA, RUN_TYPE, UPDATE,
    SUCCESS, COMMENTS,
];

/// Run ledger kept as one CSV file, rewritten atomically on every append
#[derive(Debug, Clone)]
pub struct CsvLedgerStore {
    path: PathBuf,
}

impl CsvLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn fixed_columns() -> Vec<&'static str> {
    LEADING.iter().chain(TRAILING.iter()).copied().collect()
}

fn encode(ledger: &Ledger) -> Result<Vec<u8>> {
    let facets = ledger.facet_keys();
    check_facet_columns(TABLE, &facets, &fixed_columns())?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());

    let mut header: Vec<String> = LEADING.iter().map(|c| c.to_string()).collect();
    header.extend(facets.iter().cloned());
    header.extend(TRAILING.iter().map(|c| c.to_string()));
    writer.write_record(&header).map_err(TableError::from)?;

    for entry in &ledger.entries {
        let mut record = vec![entry.index.to_string()];
        record.extend(facet_cells(TABLE, &entry.series, &facets)?);
        record.extend([
            entry.run_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            format_period(entry.start),
            format_period(entry.end),
            format_period(entry.start_act),
            format_period(entry.end_act),
            entry.start_match.to_string(),
            entry.end_match.to_string(),
            entry.n_obs.to_string(),
            entry.na.to_string(),
            entry.run_type.to_string(),
            entry.update.to_string(),
            entry.success.to_string(),
            entry.comments.clone(),
        ]);
        writer.write_record(&record).map_err(TableError::from)?;
    }

    writer
        .into_inner()
        .map_err(|e| HourfillError::Serialization(format!("Failed to flush ledger: {}", e)))
}

fn decode(bytes: &[u8]) -> Result<Ledger> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(bytes);
    let header_record = reader.headers().map_err(TableError::from)?.clone();
    let header = Header::new(TABLE, &header_record, &fixed_columns())?;

    let mut entries = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(TableError::from)?;
        let row = i + 1;

        let raw_run_at = header.cell(&record, RUN_AT);
        let run_at = DateTime::parse_from_rfc3339(raw_run_at.trim())
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| header.invalid(row, RUN_AT, raw_run_at))?;

        let raw_type = header.cell(&record, RUN_TYPE);
        let run_type = RunType::parse(raw_type).map_err(|_| header.invalid(row, RUN_TYPE, raw_type))?;

        entries.push(LedgerEntry {
            index: header.parse(&record, row, INDEX)?,
            series: header.series(&record),
            run_at,
            start: header.period(&record, row, START)?,
            end: header.period(&record, row, END)?,
            start_act: header.period(&record, row, START_ACT)?,
            end_act: header.period(&record, row, END_ACT)?,
            start_match: header.flag(&record, row, START_MATCH)?,
            end_match: header.flag(&record, row, END_MATCH)?,
            n_obs: header.parse(&record, row, N_OBS)?,
            na: header.parse(&record, row, NA)?,
            run_type,
            update: header.flag(&record, row, UPDATE)?,
            success: header.flag(&record, row, SUCCESS)?,
            comments: header.cell(&record, COMMENTS).to_string(),
        });
    }

    Ok(Ledger::new(entries))
}

#[async_trait]
impl LedgerStore for CsvLedgerStore {
    async fn load(&self) -> Result<Option<Ledger>> {
        match read_if_exists(&self.path).await? {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    async fn append(&self, entries: Vec<LedgerEntry>, init: bool, overwrite: bool) -> Result<Ledger> {
        let existing = self.load().await?;
        let ledger = Ledger::append(existing, entries, init, overwrite, &self.location())?;

        write_atomic(&self.path, &encode(&ledger)?).await?;
        tracing::debug!(path = %self.path.display(), entries = ledger.len(), "Wrote ledger");
        Ok(ledger)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, TimeZone};
    use hourfill_core::models::SeriesId;
    use tempfile::TempDir;

    fn ts(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    fn entry(subba: &str, index: u64, run_type: RunType) -> LedgerEntry {
        let mut entry = LedgerEntry {
            index,
            series: SeriesId::new([("parent", "CISO"), ("subba", subba)]),
            run_at: Utc.with_ymd_and_hms(2024, 2, 20, 9, 30, 0).unwrap() + chrono::Duration::milliseconds(123),
            start: ts(1, 0),
            end: ts(18, 1),
            start_act: ts(1, 0),
            end_act: ts(17, 23),
            start_match: true,
            end_match: false,
            n_obs: 410,
            na: 2,
            run_type,
            update: true,
            success: false,
            comments: String::new(),
        };
        entry.add_comment("Missing values were found");
        entry.add_comment("End period mismatch");
        entry
    }

    #[tokio::test]
    async fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = CsvLedgerStore::new(dir.path().join("metadata/log.csv"));
        assert!(store.load().await.unwrap().is_none());

        let written = store
            .append(
                vec![entry("PGAE", 1, RunType::Backfill), entry("SCE", 1, RunType::Backfill)],
                true,
                false,
            )
            .await
            .unwrap();
        store
            .append(vec![entry("PGAE", 2, RunType::Refresh)], false, false)
            .await
            .unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.entries[..2], written.entries[..]);
        assert_eq!(loaded.entries[2].run_type, RunType::Refresh);
        assert_eq!(loaded.entries[2].comments, "Missing values were found; End period mismatch;");
        assert_eq!(loaded.entries[2].run_at, written.entries[0].run_at);

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("index,parent,subba,time,start,end,"));
        assert!(text.contains("2024-02-20T09:30:00.123Z"));
    }

    #[tokio::test]
    async fn test_type_facet_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = CsvLedgerStore::new(dir.path().join("log.csv"));
        let mut demand = entry("PGAE", 1, RunType::Backfill);
        demand.series = SeriesId::new([("respondent", "CISO"), ("type", "D")]);

        let written = store.append(vec![demand], true, false).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.entries, written.entries);
        assert_eq!(loaded.entries[0].series.get("type"), Some("D"));
        assert_eq!(loaded.entries[0].run_type, RunType::Backfill);
    }

    #[tokio::test]
    async fn test_fixed_column_facet_rejected() {
        let dir = TempDir::new().unwrap();
        let store = CsvLedgerStore::new(dir.path().join("log.csv"));
        store.append(vec![entry("PGAE", 1, RunType::Backfill)], true, false).await.unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let mut clash = entry("SCE", 2, RunType::Refresh);
        clash.series = SeriesId::new([("parent", "CISO"), ("start", "2024")]);
        let result = store.append(vec![clash], false, false).await;
        assert!(matches!(result, Err(HourfillError::Serialization(_))));
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_fixed_columns_are_reserved_facets() {
        for column in fixed_columns() {
            assert!(hourfill_core::models::RESERVED_FACET_KEYS.contains(&column), "{column}");
        }
    }

    #[tokio::test]
    async fn test_init_conflict_keeps_file() {
        let dir = TempDir::new().unwrap();
        let store = CsvLedgerStore::new(dir.path().join("log.csv"));
        store.append(vec![entry("PGAE", 1, RunType::Backfill)], true, false).await.unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let result = store.append(vec![entry("PGAE", 1, RunType::Backfill)], true, false).await;
        assert!(matches!(result, Err(HourfillError::LedgerWriteConflict { .. })));
        assert_eq!(std::fs::read(store.path()).unwrap(), before);

        let replaced = store
            .append(vec![entry("SCE", 1, RunType::Backfill)], true, true)
            .await
            .unwrap();
        assert_eq!(replaced.len(), 1);
        assert_eq!(replaced.entries[0].series.get("subba"), Some("SCE"));
    }

    #[tokio::test]
    async fn test_append_without_ledger_fails() {
        let dir = TempDir::new().unwrap();
        let store = CsvLedgerStore::new(dir.path().join("log.csv"));
        let result = store.append(vec![entry("PGAE", 1, RunType::Refresh)], false, false).await;
        assert!(matches!(result, Err(HourfillError::LedgerMissing { .. })));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_index_regression_rejected() {
        let dir = TempDir::new().unwrap();
        let store = CsvLedgerStore::new(dir.path().join("log.csv"));
        store.append(vec![entry("PGAE", 3, RunType::Backfill)], true, false).await.unwrap();

        let result = store.append(vec![entry("PGAE", 3, RunType::Refresh)], false, false).await;
        assert!(matches!(result, Err(HourfillError::RunIndexRegression { .. })));
        assert_eq!(store.load().await.unwrap().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_flag_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        std::fs::write(
            &path,
            "index,subba,time,start,end,start_act,end_act,start_match,end_match,n_obs,na,run_type,update,success,comments\n\
             1,PGAE,2024-02-20T09:30:00Z,2024-02-01T00:00:00,2024-02-01T05:00:00,2024-02-01T00:00:00,2024-02-01T05:00:00,yes,true,6,0,backfill,true,true,\n",
        )
        .unwrap();

        let err = CsvLedgerStore::new(&path).load().await.unwrap_err();
        assert!(err.to_string().contains("start_match"));
    }
}
