// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::cmd::{Cmd, Streams};
use crate::fd::Redirect;

/// Job file as read from TOML, before validation.
///
/// ```toml
/// [config]
/// max_procs = 4
/// echo = true
///
/// [[job]]
/// name = "count"
/// async = true
///
/// [[job.stage]]
/// cmd = ["printf", "a\nb\nc\n"]
///
/// [[job.stage]]
/// cmd = ["wc", "-l"]
/// stdout = "count.txt"
/// ```
///
/// All sections are optional at this level; [`ConfigFile`] is what the rest
/// of the crate consumes.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub job: Vec<JobConfig>,
}

/// Validated job file. Build one with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub job: Vec<JobConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection, job: Vec<JobConfig>) -> Self {
        Self { config, job }
    }

    pub fn job(&self, name: &str) -> Option<&JobConfig> {
        self.job.iter().find(|job| job.name == name)
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Cap on concurrently running async jobs' processes.
    ///
    /// 0 (the default) means "available CPUs + 1".
    #[serde(default)]
    pub max_procs: usize,

    /// Log every command line before launching it.
    #[serde(default = "default_echo")]
    pub echo: bool,
}

fn default_echo() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            max_procs: 0,
            echo: default_echo(),
        }
    }
}

/// `[[job]]` entry: one command, or several chained into a pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    pub name: String,

    /// Launch into the shared pool and move on instead of waiting.
    #[serde(rename = "async", default)]
    pub background: bool,

    #[serde(default)]
    pub stage: Vec<StageConfig>,
}

/// `[[job.stage]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    /// Program and arguments, passed verbatim (no shell involved).
    pub cmd: Vec<String>,

    #[serde(default)]
    pub stdin: Option<PathBuf>,

    /// Truncate and write.
    #[serde(default)]
    pub stdout: Option<PathBuf>,

    /// Append; mutually exclusive with `stdout`.
    #[serde(default)]
    pub stdout_append: Option<PathBuf>,

    #[serde(default)]
    pub stderr: Option<PathBuf>,
}

impl StageConfig {
    pub fn command(&self) -> Cmd {
        self.cmd.iter().cloned().collect()
    }

    /// Redirections named by this stage; anything unset is inherited (or
    /// piped, inside a pipeline).
    pub fn streams(&self) -> Streams {
        let stdout = match (&self.stdout, &self.stdout_append) {
            (Some(path), _) => Redirect::write(path),
            (None, Some(path)) => Redirect::append(path),
            (None, None) => Redirect::Inherit,
        };

        Streams {
            stdin: self.stdin.as_ref().map_or(Redirect::Inherit, Redirect::read),
            stdout,
            stderr: self.stderr.as_ref().map_or(Redirect::Inherit, Redirect::write),
        }
    }
}
