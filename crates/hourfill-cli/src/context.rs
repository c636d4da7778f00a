//! Everything a command needs to talk to the upstream and the stores

use anyhow::Result;
use hourfill_core::config::{api_key_from_env, CliConfigOverrides, ConfigSource, LayeredConfig};
use hourfill_core::models::SeriesCatalog;
use hourfill_pipeline::{Pipeline, PipelineSettings};
use hourfill_source::{ApiKey, EiaClient};
use hourfill_store::{CsvDatasetStore, CsvLedgerStore};
use std::time::Duration;

use crate::cli::PathArgs;
use crate::config_loader::load_config_with_overrides;

pub type CsvPipeline = Pipeline<EiaClient, CsvDatasetStore, CsvLedgerStore>;

pub struct RunContext {
    pub config: LayeredConfig,
    pub catalog: SeriesCatalog,
}

impl RunContext {
    /// Resolve the configuration and load the catalog it points at
    pub fn load(paths: &PathArgs, overrides: CliConfigOverrides) -> Result<Self> {
        let config = load_config_with_overrides(paths.config.as_deref(), overrides)?;
        let mut catalog = SeriesCatalog::load(&config.catalog_path.value)?;

        // An explicitly configured frequency wins over the catalog's
        if config.frequency.source != ConfigSource::Default && config.frequency.value != catalog.frequency {
            tracing::warn!(
                catalog = catalog.frequency.frequency(),
                configured = config.frequency.value.frequency(),
                "Configured frequency overrides the catalog"
            );
            catalog.frequency = config.frequency.value;
        }

        Ok(Self { config, catalog })
    }

    pub fn settings(&self) -> Result<PipelineSettings> {
        Ok(PipelineSettings::from_config(&self.config)?)
    }

    pub fn dataset_store(&self) -> CsvDatasetStore {
        CsvDatasetStore::new(&self.config.data_path.value)
    }

    pub fn ledger_store(&self) -> CsvLedgerStore {
        CsvLedgerStore::new(&self.config.ledger_path.value)
    }

    /// Upstream client; the credential is read from the environment here
    pub fn client(&self) -> Result<EiaClient> {
        let key = ApiKey::parse(api_key_from_env()?.trim())?;
        let timeout = Duration::from_secs(self.config.request_timeout_secs.value);
        Ok(EiaClient::new(self.config.base_url.value.clone(), key, timeout)?)
    }

    pub fn pipeline(&self) -> Result<CsvPipeline> {
        Ok(Pipeline::new(
            self.client()?,
            self.dataset_store(),
            self.ledger_store(),
            self.settings()?,
        ))
    }
}
