// ============================================================
// Layer 6 — Settings File
// ============================================================
// Reads the JSON run configuration:
//
//   {
//     "settings": { "categories": 4, "padding": 50, ... },
//     "info":     { "processed_train_file": "data/train.txt", ... }
//   }
//
// Relative dataset paths are kept as written; they resolve against
// the working directory of the process.

use anyhow::{Context, Result};
use std::{fs, path::Path};

use crate::domain::settings::RunConfig;

pub fn load_run_config(path: impl AsRef<Path>) -> Result<RunConfig> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read settings from '{}'", path.display()))?;

    let config: RunConfig = serde_json::from_str(&json)
        .with_context(|| format!("Invalid settings file '{}'", path.display()))?;
    config
        .settings
        .validate()
        .with_context(|| format!("Invalid settings in '{}'", path.display()))?;

    tracing::debug!("Loaded settings from '{}'", path.display());
    Ok(config)
}
