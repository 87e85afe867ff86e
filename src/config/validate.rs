// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, JobConfig, RawConfigFile};
use crate::errors::{ProcError, Result};

/// Upper bound for `[config].max_procs`.
pub const MAX_PROCS_LIMIT: usize = 1024;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ProcError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.job))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_jobs(cfg)?;
    validate_global_config(cfg)?;
    validate_job_names(cfg)?;
    for job in &cfg.job {
        validate_stages(job)?;
    }
    Ok(())
}

fn ensure_has_jobs(cfg: &RawConfigFile) -> Result<()> {
    if cfg.job.is_empty() {
        return Err(ProcError::Config(
            "job file must contain at least one [[job]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.max_procs > MAX_PROCS_LIMIT {
        return Err(ProcError::Config(format!(
            "[config].max_procs must be <= {MAX_PROCS_LIMIT} (got {})",
            cfg.config.max_procs
        )));
    }
    Ok(())
}

fn validate_job_names(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for job in &cfg.job {
        if job.name.trim().is_empty() {
            return Err(ProcError::Config("job name must not be empty".to_string()));
        }
        if !seen.insert(job.name.as_str()) {
            return Err(ProcError::Config(format!(
                "duplicate job name '{}'",
                job.name
            )));
        }
    }
    Ok(())
}

fn validate_stages(job: &JobConfig) -> Result<()> {
    if job.stage.is_empty() {
        return Err(ProcError::Config(format!(
            "job '{}' must contain at least one [[job.stage]]",
            job.name
        )));
    }

    for (i, stage) in job.stage.iter().enumerate() {
        if stage.cmd.is_empty() || stage.cmd[0].is_empty() {
            return Err(ProcError::Config(format!(
                "job '{}' stage {} has an empty cmd",
                job.name, i
            )));
        }
        if stage.stdout.is_some() && stage.stdout_append.is_some() {
            return Err(ProcError::Config(format!(
                "job '{}' stage {} sets both stdout and stdout_append",
                job.name, i
            )));
        }
    }
    Ok(())
}
