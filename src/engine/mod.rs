// src/engine/mod.rs

//! Runs the jobs of a [`ConfigFile`].
//!
//! - A one-stage job goes straight through [`run`].
//! - A multi-stage job becomes a [`Pipeline`].
//! - Jobs marked `async` share one [`ProcPool`] capped at
//!   `[config].max_procs`; everything else blocks until it is done.
//!
//! Once every job has been started, the pool is flushed so no child
//! outlives the engine.

use tracing::{error, info};

use crate::cmd::{RunOptions, run};
use crate::config::{ConfigFile, JobConfig};
use crate::errors::{ProcError, Result};
use crate::pipeline::{Pipeline, PipelineOptions};
use crate::proc::ProcPool;

/// What happened during [`Engine::run`].
///
/// An async job counts as `ok` once it was launched; its exit status only
/// shows up in `drain_failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub ok: usize,
    pub failed: usize,
    /// Some async child failed when the pool was drained.
    pub drain_failed: bool,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && !self.drain_failed
    }
}

pub struct Engine<'c> {
    cfg: &'c ConfigFile,
}

impl<'c> Engine<'c> {
    pub fn new(cfg: &'c ConfigFile) -> Self {
        Self { cfg }
    }

    /// Run every job in file order, or only the job called `only`.
    ///
    /// Job failures are logged and counted, not propagated; the only error
    /// returned is an unknown `only` name.
    pub fn run(&self, only: Option<&str>) -> Result<RunReport> {
        let jobs: Vec<&JobConfig> = match only {
            Some(name) => {
                let job = self
                    .cfg
                    .job(name)
                    .ok_or_else(|| ProcError::Config(format!("unknown job '{name}'")))?;
                vec![job]
            }
            None => self.cfg.job.iter().collect(),
        };

        let mut pool = ProcPool::new();
        let mut report = RunReport::default();

        for job in jobs {
            info!(job = %job.name, stages = job.stage.len(), background = job.background, "starting job");
            match self.run_job(job, &mut pool) {
                Ok(()) => report.ok += 1,
                Err(e) => {
                    error!(job = %job.name, error = %e, "job failed");
                    report.failed += 1;
                }
            }
        }

        if let Err(e) = pool.flush() {
            error!(error = %e, "async job failed while draining the pool");
            report.drain_failed = true;
        }

        info!(ok = report.ok, failed = report.failed, drain_failed = report.drain_failed, "all jobs done");
        Ok(report)
    }

    fn run_job(&self, job: &JobConfig, pool: &mut ProcPool) -> Result<()> {
        let settings = &self.cfg.config;
        let pool = if job.background { Some(pool) } else { None };

        if let [stage] = job.stage.as_slice() {
            let opts = RunOptions {
                pool,
                max_procs: settings.max_procs,
                streams: stage.streams(),
                preserve: false,
                echo: settings.echo,
            };
            return run(&mut stage.command(), opts);
        }

        let opts = PipelineOptions {
            pool,
            max_procs: settings.max_procs,
            preserve: false,
            echo: settings.echo,
        };
        Pipeline::scope(opts, |p| {
            for stage in &job.stage {
                p.chain(&mut stage.command(), stage.streams())?;
            }
            Ok(())
        })
    }
}
