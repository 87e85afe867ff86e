// src/cmd/options.rs

use std::num::NonZeroUsize;
use std::thread;

use crate::fd::Redirect;
use crate::proc::ProcPool;

/// Overrides for the three standard streams of a child.
///
/// Every stream defaults to [`Redirect::Inherit`].
#[derive(Debug, Default)]
pub struct Streams {
    pub stdin: Redirect,
    pub stdout: Redirect,
    pub stderr: Redirect,
}

impl Streams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stdin(mut self, redirect: impl Into<Redirect>) -> Self {
        self.stdin = redirect.into();
        self
    }

    pub fn stdout(mut self, redirect: impl Into<Redirect>) -> Self {
        self.stdout = redirect.into();
        self
    }

    pub fn stderr(mut self, redirect: impl Into<Redirect>) -> Self {
        self.stderr = redirect.into();
        self
    }
}

/// How a single [`run`](super::run) call behaves.
///
/// - `pool`: when set, the run is asynchronous: the child is admitted into
///   and tracked by this pool, and the call returns right after launch.
/// - `max_procs`: cap on children alive in `pool`; 0 means
///   [`default_max_procs`].
/// - `preserve`: keep the command buffer instead of clearing it.
/// - `echo`: log the command line before launching.
#[derive(Debug)]
pub struct RunOptions<'a> {
    pub pool: Option<&'a mut ProcPool>,
    pub max_procs: usize,
    pub streams: Streams,
    pub preserve: bool,
    pub echo: bool,
}

impl Default for RunOptions<'_> {
    fn default() -> Self {
        Self {
            pool: None,
            max_procs: 0,
            streams: Streams::default(),
            preserve: false,
            echo: true,
        }
    }
}

impl<'a> RunOptions<'a> {
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

    pub fn streams(mut self, streams: Streams) -> Self {
        self.streams = streams;
        self
    }

    pub fn stdin(mut self, redirect: impl Into<Redirect>) -> Self {
        self.streams.stdin = redirect.into();
        self
    }

    pub fn stdout(mut self, redirect: impl Into<Redirect>) -> Self {
        self.streams.stdout = redirect.into();
        self
    }

    pub fn stderr(mut self, redirect: impl Into<Redirect>) -> Self {
        self.streams.stderr = redirect.into();
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

    /// The cap this run enforces: `max_procs`, or the default when 0.
    pub fn effective_max_procs(&self) -> usize {
        resolve_max_procs(self.max_procs)
    }
}

/// Available CPUs + 1, computed on every call.
pub fn default_max_procs() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        + 1
}

pub(crate) fn resolve_max_procs(max_procs: usize) -> usize {
    if max_procs == 0 {
        default_max_procs()
    } else {
        max_procs
    }
}
