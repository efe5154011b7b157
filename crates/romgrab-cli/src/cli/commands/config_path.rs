//! `romgrab config-path` – print where the default config lives.

use anyhow::Result;
use romgrab_core::config;

pub fn run_config_path() -> Result<()> {
    println!("{}", config::config_path()?.display());
    Ok(())
}
