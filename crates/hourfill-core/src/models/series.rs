use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use super::time::TimeUnit;
use crate::error::{HourfillError, Result};

/// Column names of the stored dataset and ledger tables. Facet keys share
/// the header with them, so a facet may not use one of these names.
pub const RESERVED_FACET_KEYS: [&str; 17] = [
    "period",
    "value",
    "value-units",
    "index",
    "time",
    "start",
    "end",
    "start_act",
    "end_act",
    "start_match",
    "end_match",
    "n_obs",
    "na",
    "run_type",
    "update",
    "success",
    "comments",
];

/// Identity of one logical series: facet key/value pairs ordered by key
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(BTreeMap<String, String>);

impl SeriesId {
    /// Build a series identity from facet pairs
    pub fn new<K, V>(facets: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(facets.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn facets(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Facet keys in column order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// One catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesDef {
    /// Optional display name
    #[serde(default)]
    pub name: Option<String>,

    /// Facet filters identifying the series upstream
    pub facets: SeriesId,
}

impl SeriesDef {
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.facets.to_string())
    }
}

/// Series catalog, loaded once per run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesCatalog {
    /// Route of the dataset on the upstream API (e.g. `electricity/rto/region-sub-ba-data`)
    pub api_path: String,

    /// Frequency of every series in the catalog
    #[serde(default = "default_frequency")]
    pub frequency: TimeUnit,

    /// Series in processing order
    pub series: Vec<SeriesDef>,
}

fn default_frequency() -> TimeUnit {
    TimeUnit::Hour
}

impl SeriesCatalog {
    /// Load a catalog from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(HourfillError::CatalogNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a catalog from JSON text and validate it
    pub fn from_json(content: &str) -> Result<Self> {
        let catalog: SeriesCatalog = serde_json::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        if self.api_path.trim().is_empty() {
            return Err(HourfillError::ConfigInvalid {
                key: "api_path".to_string(),
                reason: "catalog api_path is empty".to_string(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for def in &self.series {
            if def.facets.is_empty() {
                return Err(HourfillError::ConfigInvalid {
                    key: "series".to_string(),
                    reason: format!("series '{}' has no facets", def.label()),
                });
            }
            for (key, value) in def.facets.facets() {
                if key.trim().is_empty() || value.trim().is_empty() {
                    return Err(HourfillError::ConfigInvalid {
                        key: "series".to_string(),
                        reason: format!("series '{}' has an empty facet key or value", def.label()),
                    });
                }
                if RESERVED_FACET_KEYS.contains(&key.as_str()) {
                    return Err(HourfillError::ConfigInvalid {
                        key: "series".to_string(),
                        reason: format!("series '{}' uses reserved facet name '{}'", def.label(), key),
                    });
                }
            }
            if !seen.insert(&def.facets) {
                return Err(HourfillError::ConfigInvalid {
                    key: "series".to_string(),
                    reason: format!("duplicate series {}", def.facets),
                });
            }
        }
        Ok(())
    }

    /// Series identities in catalog order
    pub fn ids(&self) -> Vec<SeriesId> {
        self.series.iter().map(|s| s.facets.clone()).collect()
    }

    /// The data route (catalog path plus `data`)
    pub fn data_path(&self) -> String {
        format!("{}/data", self.api_path.trim_end_matches('/'))
    }
}
