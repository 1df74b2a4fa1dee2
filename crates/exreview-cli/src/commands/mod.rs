//! CLI command implementations.

pub mod run;
pub mod status;

use std::path::{Path, PathBuf};

use exreview::RunConfig;

/// Config file used when `--config` is not given, if it exists.
const DEFAULT_CONFIG_FILE: &str = "exreview.toml";

/// Load the run configuration from `path`, the default file, or defaults.
pub fn load_config(path: Option<&Path>) -> Result<RunConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(format!("Config file not found: {}", path.display()).into());
            }
            Ok(RunConfig::load(path)?)
        }
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
            if fallback.exists() {
                Ok(RunConfig::load(&fallback)?)
            } else {
                Ok(RunConfig::default())
            }
        }
    }
}

/// Single-threaded runtime: record futures are polled cooperatively from
/// one task.
pub fn runtime() -> Result<tokio::runtime::Runtime, Box<dyn std::error::Error>> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
