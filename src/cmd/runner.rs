// src/cmd/runner.rs

//! Run one command, synchronously or through a pool.

use std::ops::Deref;

use tracing::{debug, warn};

use super::Cmd;
use super::options::{RunOptions, Streams, resolve_max_procs};
use crate::errors::Result;
use crate::fd::{self, Pipe, Redirect};
use crate::proc::{ProcPool, StdioFds, launcher, reaper};

/// Run `cmd` with `opts`.
///
/// 1. With a pool attached, wait for admission under the effective cap.
/// 2. Open any path redirections.
/// 3. Launch.
/// 4. Async: hand the pid to the pool and return. Sync: wait for the child.
///
/// Whatever the outcome, descriptors owned by this call are closed (right
/// after launch, or on the early return) and `cmd` is cleared unless
/// `opts.preserve` is set.
pub fn run(cmd: &mut Cmd, opts: RunOptions<'_>) -> Result<()> {
    let RunOptions {
        mut pool,
        max_procs,
        streams,
        preserve,
        echo,
    } = opts;
    let cmd = ResetOnDrop { cmd, preserve };

    if let Some(pool) = pool.as_deref_mut() {
        pool.admit(resolve_max_procs(max_procs))?;
    }

    let stdin = streams.stdin.resolve()?;
    let stdout = streams.stdout.resolve()?;
    let stderr = streams.stderr.resolve()?;

    let stdio = StdioFds {
        stdin: stdin.raw(),
        stdout: stdout.raw(),
        stderr: stderr.raw(),
    };
    let pid = launcher::launch(&cmd, stdio, echo)?;

    // The child holds its own copies now. Closing ours is what lets a pipe
    // reader see end of file.
    drop((stdin, stdout, stderr));

    match pool {
        Some(pool) => {
            pool.track(pid);
            Ok(())
        }
        None => reaper::wait(pid),
    }
}

/// Run `cmd` and return everything it wrote to stdout.
///
/// Always synchronous from the caller's view: any pool in `opts` is
/// ignored. The child is reaped after its output is drained, so output
/// larger than a pipe buffer cannot stall it.
///
/// Stdout always goes to the capture pipe. A stdout redirect in `opts` is
/// discarded (and its descriptor closed, if it owned one); stdin and stderr
/// redirects apply as usual.
pub fn capture(cmd: &mut Cmd, opts: RunOptions<'_>) -> Result<String> {
    let RunOptions {
        streams,
        preserve,
        echo,
        ..
    } = opts;
    if !streams.stdout.is_inherit() {
        warn!(redirect = ?streams.stdout, "capture ignores the stdout redirect");
    }

    let Pipe { read, write } = Pipe::open()?;
    let mut pool = ProcPool::new();
    let opts = RunOptions {
        pool: Some(&mut pool),
        max_procs: 1,
        streams: Streams {
            stdout: Redirect::Fd(write),
            ..streams
        },
        preserve,
        echo,
    };
    run(cmd, opts)?;

    let output = fd::read_to_string(read);
    let status = pool.flush();
    debug!(bytes = output.as_ref().map_or(0, String::len), "captured command output");

    status?;
    output
}

/// Clears the command buffer when the run is over, on every exit path.
struct ResetOnDrop<'c> {
    cmd: &'c mut Cmd,
    preserve: bool,
}

impl Deref for ResetOnDrop<'_> {
    type Target = Cmd;

    fn deref(&self) -> &Cmd {
        self.cmd
    }
}

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        if !self.preserve {
            self.cmd.clear();
        }
    }
}
