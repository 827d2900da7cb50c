use std::{fs, path::PathBuf};

use anyhow::{Context, Result};

pub mod cfg;
pub mod chain_client;
pub mod contracts;
pub mod correlator;
pub mod error;
pub mod events;
pub mod ledger;
pub mod node;
pub mod poller;
pub mod prover;
pub mod relay;
pub mod test_util;

pub fn read_config(config_file: &PathBuf) -> Result<cfg::Config> {
    let config_content = fs::read_to_string(config_file)
        .with_context(|| format!("cannot read config file {}", config_file.display()))?;

    Ok(toml::from_str(&config_content)?)
}
