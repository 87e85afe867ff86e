// src/pipeline/mod.rs

//! Shell-style pipelines built one stage at a time.
//!
//! [`Pipeline::chain`] queues a stage and launches the one queued before it,
//! with that stage's stdout connected to a fresh pipe. The pipe's read end
//! is carried forward and becomes the stdin of the next launched stage.
//! [`Pipeline::end`] launches the last queued stage.
//!
//! ```text
//!   Empty --chain--> Staging --chain--> Staging --end--> Empty
//!                       |                  |          |
//!                       +--stage fails-----+----------+--> Errored (absorbing)
//! ```
//!
//! Stages always run concurrently, as in a shell: a stage is never waited
//! for before its reader is launched. Without a caller-supplied pool the
//! pipeline keeps a private one and [`Pipeline::end`] drains it, so `end`
//! returns once every stage has exited.
//!
//! A stream the caller redirected explicitly is never replaced by a pipe
//! end; automatic wiring only fills streams left at [`Redirect::Inherit`].
//! When that happens the unused pipe end is simply closed, so the
//! neighbouring stage sees end of file (or a broken pipe).

use std::os::fd::OwnedFd;

use tracing::{debug, error, warn};

use crate::cmd::{Cmd, RunOptions, Streams, run};
use crate::errors::{ProcError, Result};
use crate::fd::{Pipe, Redirect};
use crate::proc::ProcPool;

/// Settings shared by every stage of a pipeline.
///
/// With a `pool`, stages are admitted under `max_procs` and tracked there;
/// their exit statuses surface at the next admission or flush of that pool,
/// so `end` returns as soon as the last stage is launched. Without one, the
/// pipeline uses a private, uncapped pool and `end` waits for every stage.
#[derive(Debug)]
pub struct PipelineOptions<'a> {
    pub pool: Option<&'a mut ProcPool>,
    pub max_procs: usize,
    /// Keep the caller's command buffer after `chain`.
    pub preserve: bool,
    pub echo: bool,
}

impl Default for PipelineOptions<'_> {
    fn default() -> Self {
        Self {
            pool: None,
            max_procs: 0,
            preserve: false,
            echo: true,
        }
    }
}

impl<'a> PipelineOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool(mut self, pool: &'a mut ProcPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn max_procs(mut self, max_procs: usize) -> Self {
        self.max_procs = max_procs;
        self
    }

    pub fn preserve(mut self, preserve: bool) -> Self {
        self.preserve = preserve;
        self
    }

    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No stage queued.
    Empty,
    /// One stage queued, not launched yet.
    Staging,
    /// A stage failed; every further operation fails.
    Errored,
}

#[derive(Debug)]
struct Stage {
    cmd: Cmd,
    streams: Streams,
}

#[derive(Debug)]
pub struct Pipeline<'a> {
    opts: PipelineOptions<'a>,
    /// Stages launched while `opts.pool` is `None`.
    own: ProcPool,
    /// Read end of the last pipe, waiting for the next stage.
    carried: Option<OwnedFd>,
    pending: Option<Stage>,
    errored: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(opts: PipelineOptions<'a>) -> Self {
        Self {
            opts,
            own: ProcPool::new(),
            carried: None,
            pending: None,
            errored: false,
        }
    }

    /// Build a pipeline, hand it to `body`, then [`end`](Self::end) it no
    /// matter how `body` returned.
    ///
    /// The first error wins: an error from `body` is reported over one
    /// from `end`.
    pub fn scope<F>(opts: PipelineOptions<'a>, body: F) -> Result<()>
    where
        F: FnOnce(&mut Pipeline<'a>) -> Result<()>,
    {
        let mut pipeline = Pipeline::new(opts);
        let body_result = body(&mut pipeline);
        let end_result = pipeline.end();
        body_result.and(end_result)
    }

    pub fn state(&self) -> PipelineState {
        if self.errored {
            PipelineState::Errored
        } else if self.pending.is_some() {
            PipelineState::Staging
        } else {
            PipelineState::Empty
        }
    }

    pub fn is_errored(&self) -> bool {
        self.errored
    }

    /// Queue `cmd` as the next stage, launching the previously queued one.
    ///
    /// `cmd` is copied; the caller's buffer is cleared unless the pipeline
    /// preserves buffers.
    pub fn chain(&mut self, cmd: &mut Cmd, streams: Streams) -> Result<()> {
        if self.errored {
            return Err(ProcError::PipelineErrored);
        }

        if let Some(prev) = self.pending.take() {
            let Pipe { read, write } = match Pipe::open() {
                Ok(pipe) => pipe,
                Err(e) => {
                    self.fail();
                    return Err(e);
                }
            };

            let wired = Streams {
                stdin: wire(prev.streams.stdin, self.carried.take()),
                stdout: wire(prev.streams.stdout, Some(write)),
                stderr: prev.streams.stderr,
            };
            if let Err(e) = self.launch(prev.cmd, wired) {
                // `read` never reached a consumer.
                drop(read);
                self.fail();
                return Err(e);
            }
            self.carried = Some(read);
        }

        debug!(cmd = %cmd, "stage queued");
        self.pending = Some(Stage {
            cmd: cmd.clone(),
            streams,
        });
        if !self.opts.preserve {
            cmd.clear();
        }
        Ok(())
    }

    /// Launch the last queued stage, then wait for every stage unless the
    /// caller supplied a pool.
    ///
    /// The cursor is empty afterwards whatever happened. A failed launch or
    /// a failed stage is returned (the first one, in launch order) and
    /// latches the pipeline as errored. On an errored pipeline this fails
    /// without doing anything. Ending an empty pipeline is a no-op.
    pub fn end(&mut self) -> Result<()> {
        if self.errored {
            return Err(ProcError::PipelineErrored);
        }

        let carried = self.carried.take();
        let launched = match self.pending.take() {
            Some(last) => {
                let wired = Streams {
                    stdin: wire(last.streams.stdin, carried),
                    ..last.streams
                };
                self.launch(last.cmd, wired)
            }
            None => Ok(()),
        };
        let drained = self.own.flush();

        let outcome = launched.and(drained);
        if outcome.is_err() {
            self.fail();
        }
        outcome
    }

    fn launch(&mut self, mut cmd: Cmd, streams: Streams) -> Result<()> {
        let (pool, max_procs) = match self.opts.pool.as_deref_mut() {
            Some(pool) => (pool, self.opts.max_procs),
            // Every stage has to be alive at once; never make one wait.
            None => (&mut self.own, usize::MAX),
        };
        let opts = RunOptions {
            pool: Some(pool),
            max_procs,
            streams,
            preserve: false,
            echo: self.opts.echo,
        };
        run(&mut cmd, opts)
    }

    /// Latch the error and reap whatever was launched into the private
    /// pool. Dropping the carried read end first lets upstream writers exit.
    fn fail(&mut self) {
        error!("pipeline stage failed; pipeline is now errored");
        self.errored = true;
        self.pending = None;
        self.carried = None;
        if let Err(e) = self.own.flush() {
            debug!(error = %e, "stage failed while draining an errored pipeline");
        }
    }
}

impl Drop for Pipeline<'_> {
    fn drop(&mut self) {
        if self.own.is_empty() {
            return;
        }
        warn!(stages = self.own.len(), "pipeline dropped without end; waiting for its stages");
        self.pending = None;
        self.carried = None;
        if let Err(e) = self.own.flush() {
            warn!(error = %e, "stage of an unfinished pipeline failed");
        }
    }
}

/// The caller's redirect if there is one, otherwise the pipe end. An
/// unused pipe end is dropped (closed) here.
fn wire(explicit: Redirect, auto: Option<OwnedFd>) -> Redirect {
    if !explicit.is_inherit() {
        return explicit;
    }
    auto.map_or(Redirect::Inherit, Redirect::Fd)
}
