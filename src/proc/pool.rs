// src/proc/pool.rs

//! Bounded pool of asynchronous children.
//!
//! The pool does not own any threads. It is a [`ProcSet`] plus two
//! operations:
//!
//! - [`ProcPool::admit`] blocks until fewer than `cap` children are alive,
//!   polling them with non-blocking waits and sleeping [`POLL_INTERVAL`]
//!   between fruitless sweeps. The first failed child aborts admission.
//! - [`ProcPool::flush`] blocks on every tracked child and empties the pool.
//!
//! Admission runs before every asynchronous launch, so `cap` bounds the
//! number of live children at all times, not only at flush points.
//!
//! There is no internal locking; `&mut self` makes the caller the single
//! writer.

use std::thread;
use std::time::Duration;

use nix::unistd::Pid;
use tracing::{debug, trace, warn};

use super::ProcSet;
use super::reaper::{self, Probe};
use crate::errors::Result;

/// Sleep between two sweeps that found every child still running.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Default)]
pub struct ProcPool {
    procs: ProcSet,
}

impl ProcPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a freshly launched child.
    pub fn track(&mut self, pid: Pid) {
        trace!(pid = pid.as_raw(), tracked = self.procs.len() + 1, "tracking child");
        self.procs.push(pid);
    }

    pub fn len(&self) -> usize {
        self.procs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procs.is_empty()
    }

    /// Block until fewer than `cap` children are tracked.
    ///
    /// Finished children are reaped and dropped from the pool as they are
    /// found. A child that failed (non-zero exit, signal, stop) is dropped
    /// too and its error is returned at once, without waiting on the others.
    /// A `cap` of 0 is treated as 1.
    pub fn admit(&mut self, cap: usize) -> Result<()> {
        let cap = cap.max(1);
        if self.procs.len() >= cap {
            debug!(tracked = self.procs.len(), cap, "pool at capacity; waiting for a child");
        }

        while self.procs.len() >= cap {
            let mut reaped = false;
            let mut i = 0;

            while i < self.procs.len() {
                let pid = self.procs[i];
                match reaper::try_wait(pid) {
                    Ok(Probe::Running) => i += 1,
                    Ok(Probe::Finished) => {
                        // The last pid now sits at `i`; look at it next.
                        self.procs.swap_remove(i);
                        reaped = true;
                        trace!(pid = pid.as_raw(), tracked = self.procs.len(), "reaped child");
                        if self.procs.len() < cap {
                            break;
                        }
                    }
                    Err(e) => {
                        // The pid is consumed either way; never wait on it again.
                        self.procs.swap_remove(i);
                        return Err(e);
                    }
                }
            }

            if !reaped {
                thread::sleep(POLL_INTERVAL);
            }
        }

        Ok(())
    }

    /// Wait for every tracked child, in tracked order.
    ///
    /// The pool is empty afterwards whatever happened. If any child failed,
    /// the first failure is returned.
    pub fn flush(&mut self) -> Result<()> {
        debug!(tracked = self.procs.len(), "flushing pool");

        let mut first_err = None;
        for pid in self.procs.drain() {
            if let Err(e) = reaper::wait(pid) {
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for ProcPool {
    fn drop(&mut self) {
        if !self.procs.is_empty() {
            warn!(
                tracked = self.procs.len(),
                "process pool dropped with children still tracked; they will not be reaped"
            );
        }
    }
}
