// src/proc/reaper.rs

//! Waiting on children and interpreting how they ended.
//!
//! | wait status          | outcome                 |
//! |----------------------|-------------------------|
//! | exited with 0        | success                 |
//! | exited with n != 0   | `ChildExit { code: n }` |
//! | killed by a signal   | `ChildSignaled`         |
//! | stopped by a signal  | `ChildStopped`          |
//!
//! A stopped child counts as finished: it is not resumed and not watched
//! any further.

use nix::errno::Errno;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use tracing::{error, trace};

use crate::errors::{ProcError, Result};

/// Result of a non-blocking probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Running,
    /// Exited with status 0. The pid has been reaped.
    Finished,
}

/// Block until `pid` exits, is killed or is stopped.
///
/// `EINTR` is retried transparently; any other wait failure is returned as
/// [`ProcError::Wait`].
pub fn wait(pid: Pid) -> Result<()> {
    loop {
        match waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
            Ok(status) => {
                if let Some(outcome) = settle(status) {
                    return outcome;
                }
            }
            Err(Errno::EINTR) => continue,
            Err(source) => return Err(wait_failed(pid, source)),
        }
    }
}

/// Check on `pid` without blocking.
///
/// An interrupted probe reports `Running`; the caller simply asks again.
pub fn try_wait(pid: Pid) -> Result<Probe> {
    match waitpid(pid, Some(WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED)) {
        Ok(WaitStatus::StillAlive) => Ok(Probe::Running),
        Ok(status) => match settle(status) {
            Some(outcome) => outcome.map(|()| Probe::Finished),
            None => Ok(Probe::Running),
        },
        Err(Errno::EINTR) => Ok(Probe::Running),
        Err(source) => Err(wait_failed(pid, source)),
    }
}

/// Map a terminal wait status to its outcome. Non-terminal statuses
/// (continued, ptrace stops) yield `None`.
fn settle(status: WaitStatus) -> Option<Result<()>> {
    let err = match status {
        WaitStatus::Exited(pid, 0) => {
            trace!(pid = pid.as_raw(), "child exited successfully");
            return Some(Ok(()));
        }
        WaitStatus::Exited(pid, code) => ProcError::ChildExit {
            pid: pid.as_raw(),
            code,
        },
        WaitStatus::Signaled(pid, signal, _core_dumped) => ProcError::ChildSignaled {
            pid: pid.as_raw(),
            signal: signal as i32,
        },
        WaitStatus::Stopped(pid, signal) => ProcError::ChildStopped {
            pid: pid.as_raw(),
            signal: signal as i32,
        },
        _ => return None,
    };

    error!("{err}");
    Some(Err(err))
}

fn wait_failed(pid: Pid, source: Errno) -> ProcError {
    let err = ProcError::Wait {
        pid: pid.as_raw(),
        source,
    };
    error!("{err}");
    err
}
