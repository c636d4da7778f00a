//! Config command implementation

use crate::cli::PathArgs;
use crate::config_loader::load_config_with_overrides;
use crate::output::OutputWriter;
use crate::output_types::ConfigEntry;
use anyhow::Result;

pub fn execute(paths: &PathArgs, output: &OutputWriter) -> Result<()> {
    let config = load_config_with_overrides(paths.config.as_deref(), paths.overrides())?;

    let mut entries: Vec<ConfigEntry> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigEntry::new(key, value, source))
        .collect();
    entries.sort_by(|a, b| a.key.cmp(&b.key));

    output.section("Configuration");
    output.table(entries)?;
    output.info("Precedence: Cli > Environment > File > Default. The API key is read from the environment only.");
    Ok(())
}
