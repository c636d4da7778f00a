//! Shared CSV helpers for the file adapters
//!
//! Both tables carry one column per facet key next to their fixed columns.
//! Facet columns are whatever header names are not fixed columns, so a
//! file stays readable when the catalog grows new facet keys.

use chrono::NaiveDateTime;
use csv::StringRecord;
use hourfill_core::error::HourfillError;
use hourfill_core::models::{SeriesId, TimeUnit};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Timestamp layout used in stored tables
pub const PERIOD_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Error)]
pub enum TableError {
    #[error("{table} is missing column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("{table} row {row}: invalid {column} '{value}'")]
    InvalidCell {
        table: String,
        row: usize,
        column: String,
        value: String,
    },

    #[error("{table} has no column for facet '{facet}'")]
    UnknownFacet { table: String, facet: String },

    #[error("{table} has more than one column named '{column}'")]
    DuplicateColumn { table: String, column: String },

    #[error("{table} cannot store facet '{facet}': the name is taken by a fixed column")]
    ReservedFacet { table: String, facet: String },

    #[error("{table} cannot store an empty value for facet '{facet}'")]
    EmptyFacet { table: String, facet: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<TableError> for HourfillError {
    fn from(err: TableError) -> Self {
        HourfillError::Serialization(err.to_string())
    }
}

pub fn format_period(instant: NaiveDateTime) -> String {
    instant.format(PERIOD_FORMAT).to_string()
}

/// Column lookup for one parsed header
pub struct Header {
    table: String,
    index: HashMap<String, usize>,
    facets: Vec<(String, usize)>,
}

impl Header {
    pub fn new(table: &str, record: &StringRecord, fixed: &[&str]) -> Result<Self, TableError> {
        let mut index = HashMap::new();
        let mut facets = Vec::new();
        for (i, name) in record.iter().enumerate() {
            if index.insert(name.to_string(), i).is_some() {
                return Err(TableError::DuplicateColumn {
                    table: table.to_string(),
                    column: name.to_string(),
                });
            }
            if !fixed.contains(&name) {
                facets.push((name.to_string(), i));
            }
        }

        for column in fixed {
            if !index.contains_key(*column) {
                return Err(TableError::MissingColumn {
                    table: table.to_string(),
                    column: column.to_string(),
                });
            }
        }

        Ok(Self {
            table: table.to_string(),
            index,
            facets,
        })
    }

    pub fn facet_names(&self) -> Vec<String> {
        self.facets.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Raw cell text; fixed columns were checked in [`Header::new`]
    pub fn cell<'r>(&self, record: &'r StringRecord, column: &str) -> &'r str {
        self.index
            .get(column)
            .and_then(|i| record.get(*i))
            .unwrap_or("")
    }

    pub fn series(&self, record: &StringRecord) -> SeriesId {
        SeriesId::new(
            self.facets
                .iter()
                .filter_map(|(name, i)| record.get(*i).filter(|v| !v.is_empty()).map(|v| (name.as_str(), v))),
        )
    }

    pub fn period(&self, record: &StringRecord, row: usize, column: &str) -> Result<NaiveDateTime, TableError> {
        let raw = self.cell(record, column);
        TimeUnit::parse_period(raw).map_err(|_| self.invalid(row, column, raw))
    }

    pub fn parse<T: FromStr>(&self, record: &StringRecord, row: usize, column: &str) -> Result<T, TableError> {
        let raw = self.cell(record, column);
        raw.trim().parse().map_err(|_| self.invalid(row, column, raw))
    }

    pub fn flag(&self, record: &StringRecord, row: usize, column: &str) -> Result<bool, TableError> {
        let raw = self.cell(record, column);
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(self.invalid(row, column, raw)),
        }
    }

    pub fn invalid(&self, row: usize, column: &str, value: &str) -> TableError {
        TableError::InvalidCell {
            table: self.table.clone(),
            row,
            column: column.to_string(),
            value: value.to_string(),
        }
    }
}

/// Fail when a facet column would share its name with a fixed column
pub fn check_facet_columns(table: &str, facet_columns: &[String], fixed: &[&str]) -> Result<(), TableError> {
    match facet_columns.iter().find(|c| fixed.contains(&c.as_str())) {
        Some(clash) => Err(TableError::ReservedFacet {
            table: table.to_string(),
            facet: clash.clone(),
        }),
        None => Ok(()),
    }
}

/// Facet values of `series` laid out along `facet_columns`.
///
/// Fails when the series uses a facet the table has no column for, or
/// carries an empty value that would read back as an absent facet.
pub fn facet_cells(table: &str, series: &SeriesId, facet_columns: &[String]) -> Result<Vec<String>, TableError> {
    if let Some(unknown) = series.keys().find(|k| !facet_columns.iter().any(|c| c == k)) {
        return Err(TableError::UnknownFacet {
            table: table.to_string(),
            facet: unknown.to_string(),
        });
    }
    if let Some((facet, _)) = series.facets().iter().find(|(_, v)| v.is_empty()) {
        return Err(TableError::EmptyFacet {
            table: table.to_string(),
            facet: facet.clone(),
        });
    }
    Ok(facet_columns
        .iter()
        .map(|c| series.get(c).unwrap_or_default().to_string())
        .collect())
}
