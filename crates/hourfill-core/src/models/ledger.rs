use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::series::SeriesId;
use crate::error::{HourfillError, Result};

/// Kind of run that produced a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    Backfill,
    Refresh,
}

impl RunType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunType::Backfill => "backfill",
            RunType::Refresh => "refresh",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "backfill" => Ok(RunType::Backfill),
            "refresh" => Ok(RunType::Refresh),
            other => Err(HourfillError::Serialization(format!("unknown run type '{}'", other))),
        }
    }
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one run for one series. Never mutated once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Run index, strictly increasing per series
    pub index: u64,

    /// Series the run covered
    pub series: SeriesId,

    /// When the entry was produced
    pub run_at: DateTime<Utc>,

    /// Requested start
    pub start: NaiveDateTime,

    /// Requested end
    pub end: NaiveDateTime,

    /// First non-missing timestamp, or the requested start when all missing
    pub start_act: NaiveDateTime,

    /// Last non-missing timestamp, or the requested end when all missing
    pub end_act: NaiveDateTime,

    pub start_match: bool,
    pub end_match: bool,

    /// Rows in the assembled series
    pub n_obs: usize,

    /// Rows with a missing value
    pub na: usize,

    pub run_type: RunType,

    /// Whether rows were appended to the dataset
    pub update: bool,

    pub success: bool,

    /// Semicolon-terminated notes
    pub comments: String,
}

impl LedgerEntry {
    /// Append a note to the comments field, space-separated from earlier notes
    pub fn add_comment(&mut self, note: &str) {
        if !self.comments.is_empty() {
            self.comments.push(' ');
        }
        self.comments.push_str(note.trim_end_matches(';'));
        self.comments.push(';');
    }
}

/// Append-only log of run outcomes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new(entries: Vec<LedgerEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Most recent entry for a series
    pub fn latest(&self, series: &SeriesId) -> Option<&LedgerEntry> {
        self.entries.iter().filter(|e| &e.series == series).max_by_key(|e| e.index)
    }

    /// Most recent successful entry for a series
    pub fn latest_success(&self, series: &SeriesId) -> Option<&LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| &e.series == series && e.success)
            .max_by_key(|e| e.index)
    }

    /// Index the next run of `series` must carry
    pub fn next_run_index(&self, series: &SeriesId) -> u64 {
        self.latest(series).map(|e| e.index + 1).unwrap_or(1)
    }

    /// Series with at least one entry, in first-seen order
    pub fn tracked_series(&self) -> Vec<SeriesId> {
        let mut seen = Vec::new();
        for entry in &self.entries {
            if !seen.contains(&entry.series) {
                seen.push(entry.series.clone());
            }
        }
        seen
    }

    /// Append contract of the ledger table.
    ///
    /// With `init` a new ledger is created from `new_entries`; an existing
    /// non-empty ledger is only replaced when `overwrite` is set, otherwise
    /// the call fails with `LedgerWriteConflict` and nothing changes. Without
    /// `init` the entries are appended after checking that every series'
    /// run index keeps increasing.
    pub fn append(
        existing: Option<Ledger>,
        new_entries: Vec<LedgerEntry>,
        init: bool,
        overwrite: bool,
        location: &str,
    ) -> Result<Ledger> {
        let base = match (existing, init) {
            (Some(ledger), true) if !ledger.is_empty() && !overwrite => {
                return Err(HourfillError::LedgerWriteConflict {
                    location: location.to_string(),
                });
            }
            (_, true) => Ledger::default(),
            (Some(ledger), false) => ledger,
            (None, false) => {
                return Err(HourfillError::LedgerMissing {
                    location: location.to_string(),
                })
            }
        };

        let mut last: HashMap<SeriesId, u64> = HashMap::new();
        for entry in &base.entries {
            let slot = last.entry(entry.series.clone()).or_insert(0);
            *slot = (*slot).max(entry.index);
        }

        for entry in &new_entries {
            let previous = last.get(&entry.series).copied().unwrap_or(0);
            if entry.index <= previous {
                return Err(HourfillError::RunIndexRegression {
                    series: entry.series.to_string(),
                    index: entry.index,
                    previous,
                });
            }
            last.insert(entry.series.clone(), entry.index);
        }

        let mut ledger = base;
        ledger.entries.extend(new_entries);
        Ok(ledger)
    }

    /// Facet keys used by any entry, sorted
    pub fn facet_keys(&self) -> Vec<String> {
        let mut keys = std::collections::BTreeSet::new();
        for entry in &self.entries {
            keys.extend(entry.series.keys().map(str::to_string));
        }
        keys.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    fn entry(subba: &str, index: u64, success: bool) -> LedgerEntry {
        LedgerEntry {
            index,
            series: SeriesId::new([("parent", "CISO"), ("subba", subba)]),
            run_at: Utc::now(),
            start: ts(1, 0),
            end: ts(18, index as u32),
            start_act: ts(1, 0),
            end_act: ts(18, index as u32),
            start_match: true,
            end_match: true,
            n_obs: 10,
            na: 0,
            run_type: if index == 1 { RunType::Backfill } else { RunType::Refresh },
            update: success,
            success,
            comments: String::new(),
        }
    }

    #[test]
    fn test_init_creates_ledger() {
        let ledger = Ledger::append(None, vec![entry("PGAE", 1, true)], true, false, "mem").unwrap();
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_init_conflict_preserves_existing() {
        let existing = Ledger::new(vec![entry("PGAE", 1, true)]);
        let err = Ledger::append(Some(existing.clone()), vec![entry("SCE", 1, true)], true, false, "mem")
            .unwrap_err();
        assert!(matches!(err, HourfillError::LedgerWriteConflict { .. }));
        assert_eq!(existing.len(), 1);
    }

    #[test]
    fn test_init_with_overwrite_replaces() {
        let existing = Ledger::new(vec![entry("PGAE", 1, true), entry("PGAE", 2, true)]);
        let ledger =
            Ledger::append(Some(existing), vec![entry("SCE", 1, true)], true, true, "mem").unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.entries[0].series.get("subba"), Some("SCE"));
    }

    #[test]
    fn test_append_requires_increasing_index() {
        let existing = Ledger::new(vec![entry("PGAE", 1, true), entry("PGAE", 2, true)]);
        let err = Ledger::append(Some(existing.clone()), vec![entry("PGAE", 2, true)], false, false, "mem")
            .unwrap_err();
        assert!(matches!(err, HourfillError::RunIndexRegression { previous: 2, .. }));

        let ledger = Ledger::append(Some(existing), vec![entry("PGAE", 3, true), entry("SCE", 1, true)], false, false, "mem")
            .unwrap();
        assert_eq!(ledger.len(), 4);
    }

    #[test]
    fn test_append_without_ledger_fails() {
        let err = Ledger::append(None, vec![entry("PGAE", 1, true)], false, false, "mem").unwrap_err();
        assert!(matches!(err, HourfillError::LedgerMissing { .. }));
    }

    #[test]
    fn test_latest_success_skips_failures() {
        let ledger = Ledger::new(vec![entry("PGAE", 1, true), entry("PGAE", 2, false)]);
        let series = SeriesId::new([("parent", "CISO"), ("subba", "PGAE")]);
        assert_eq!(ledger.latest(&series).unwrap().index, 2);
        assert_eq!(ledger.latest_success(&series).unwrap().index, 1);
        assert_eq!(ledger.next_run_index(&series), 3);
        assert_eq!(ledger.next_run_index(&SeriesId::new([("parent", "ERCO")])), 1);
    }

    #[test]
    fn test_tracked_series_order() {
        let ledger = Ledger::new(vec![entry("SCE", 1, true), entry("PGAE", 1, true), entry("SCE", 2, true)]);
        let tracked = ledger.tracked_series();
        assert_eq!(tracked.len(), 2);
        assert_eq!(tracked[0].get("subba"), Some("SCE"));
    }

    #[test]
    fn test_add_comment() {
        let mut e = entry("PGAE", 1, true);
        e.add_comment("Missing values were found;");
        e.add_comment("End period mismatch");
        assert_eq!(e.comments, "Missing values were found; End period mismatch;");
        assert!(!e.comments.ends_with(' '));
    }

    #[test]
    fn test_single_comment_has_no_trailing_space() {
        let mut e = entry("PGAE", 1, true);
        e.add_comment("No new data is available");
        assert_eq!(e.comments, "No new data is available;");
    }
}
