// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Read a job file and deserialize it, without semantic checks.
///
/// Use [`load_and_validate`] unless you really want the raw form.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;
    debug!(?path, jobs = config.job.len(), "job file parsed");

    Ok(config)
}

/// Read, deserialize and validate a job file.
///
/// Validation rejects:
/// - files without jobs,
/// - empty or duplicate job names,
/// - jobs without stages and stages without a command,
/// - stages setting both `stdout` and `stdout_append`,
/// - an absurd `max_procs`.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// `Procpipe.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Procpipe.toml")
}
