pub mod config;
pub mod demo;
pub mod funnel;
pub mod predict;

use std::io::Read;
use std::path::{Path, PathBuf};

use laborcast_core::error::Result;
use laborcast_core::{Config, ContractionRecord};

/// Read a JSON array of contraction records from a file, or stdin for "-".
pub fn read_records(input: &Path) -> Result<Vec<ContractionRecord>> {
    let content = if input == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input)?
    };
    let records: Vec<ContractionRecord> = serde_json::from_str(&content)?;
    tracing::debug!(records = records.len(), "loaded contraction records");
    Ok(records)
}

/// Config from an explicit file, or the user config (defaults on failure).
pub fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::load_from(path)?),
        None => Ok(Config::load_or_default()),
    }
}
