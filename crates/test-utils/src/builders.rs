#![allow(dead_code)]

use std::path::PathBuf;

use procpipe::config::{ConfigFile, ConfigSection, JobConfig, RawConfigFile, StageConfig};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                job: Vec::new(),
            },
        }
    }

    pub fn with_job(mut self, job: JobConfig) -> Self {
        self.config.job.push(job);
        self
    }

    pub fn max_procs(mut self, max_procs: usize) -> Self {
        self.config.config.max_procs = max_procs;
        self
    }

    pub fn echo(mut self, echo: bool) -> Self {
        self.config.config.echo = echo;
        self
    }

    /// The raw form, for tests that exercise validation.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `JobConfig`.
pub struct JobBuilder {
    job: JobConfig,
}

impl JobBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            job: JobConfig {
                name: name.to_string(),
                background: false,
                stage: Vec::new(),
            },
        }
    }

    pub fn background(mut self, background: bool) -> Self {
        self.job.background = background;
        self
    }

    pub fn stage(mut self, stage: StageConfig) -> Self {
        self.job.stage.push(stage);
        self
    }

    /// Shorthand for a stage with no redirections.
    pub fn cmd(self, argv: &[&str]) -> Self {
        self.stage(StageBuilder::new(argv).build())
    }

    pub fn build(self) -> JobConfig {
        self.job
    }
}

/// Builder for `StageConfig`.
pub struct StageBuilder {
    stage: StageConfig,
}

impl StageBuilder {
    pub fn new(argv: &[&str]) -> Self {
        Self {
            stage: StageConfig {
                cmd: argv.iter().map(|s| s.to_string()).collect(),
                stdin: None,
                stdout: None,
                stdout_append: None,
                stderr: None,
            },
        }
    }

    pub fn stdin(mut self, path: impl Into<PathBuf>) -> Self {
        self.stage.stdin = Some(path.into());
        self
    }

    pub fn stdout(mut self, path: impl Into<PathBuf>) -> Self {
        self.stage.stdout = Some(path.into());
        self
    }

    pub fn stdout_append(mut self, path: impl Into<PathBuf>) -> Self {
        self.stage.stdout_append = Some(path.into());
        self
    }

    pub fn stderr(mut self, path: impl Into<PathBuf>) -> Self {
        self.stage.stderr = Some(path.into());
        self
    }

    pub fn build(self) -> StageConfig {
        self.stage
    }
}
