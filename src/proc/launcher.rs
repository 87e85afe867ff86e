// src/proc/launcher.rs

//! Fork + exec of a single command.
//!
//! Everything the child needs (argv, diagnostic prefixes) is built in the
//! parent before `fork`. Between `fork` and `exec` the child only calls
//! async-signal-safe functions: `fcntl`, `dup2`, `write`, `execvp` and
//! `_exit`. It never returns into caller code.

use std::ffi::c_char;
use std::os::fd::RawFd;
use std::ptr;

use nix::errno::Errno;
use nix::unistd::{ForkResult, Pid, dup2, fork};
use tracing::{debug, error, info};

use crate::cmd::Cmd;
use crate::errors::{ProcError, Result};
use crate::fd;

/// Exit status of a child whose stream redirection failed.
pub const REDIRECT_FAILURE_CODE: i32 = 1;

/// Exit status of a child whose `exec` failed (program missing, not
/// executable, ...).
pub const EXEC_FAILURE_CODE: i32 = 127;

/// Descriptors to install on the child's standard streams. `None` leaves
/// the stream inherited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StdioFds {
    pub stdin: Option<RawFd>,
    pub stdout: Option<RawFd>,
    pub stderr: Option<RawFd>,
}

/// Launch `cmd` as a child process and return its pid.
///
/// The caller keeps ownership of every descriptor in `stdio`; the child
/// gets its own duplicates. With `echo` set, the command line is logged at
/// info level before forking.
pub fn launch(cmd: &Cmd, stdio: StdioFds, echo: bool) -> Result<Pid> {
    let Some(program) = cmd.program() else {
        error!("cannot launch an empty command");
        return Err(ProcError::EmptyCommand);
    };

    let argv = cmd.to_cstrings()?;
    let argv_ptrs: Vec<*const c_char> = argv
        .iter()
        .map(|arg| arg.as_ptr())
        .chain(std::iter::once(ptr::null()))
        .collect();

    let redirect_diag = format!("procpipe: could not redirect standard stream for {program}: ");
    let exec_diag = format!("procpipe: could not exec child process for {program}: ");

    if echo {
        info!(cmd = %cmd, "launching command");
    }

    // SAFETY: the child branch only touches memory prepared above and calls
    // async-signal-safe functions until it execs or exits.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            debug!(pid = child.as_raw(), program, ?stdio, "child launched");
            Ok(child)
        }
        Ok(ForkResult::Child) => exec_child(&argv_ptrs, stdio, &redirect_diag, &exec_diag),
        Err(e) => {
            error!(program, error = %e, "could not fork for child process");
            Err(ProcError::Fork(e))
        }
    }
}

fn exec_child(argv: &[*const c_char], stdio: StdioFds, redirect_diag: &str, exec_diag: &str) -> ! {
    // Private copy of the parent's stderr so diagnostics never land in a
    // redirected stream. Close-on-exec: it disappears once exec succeeds.
    let diag = unsafe { libc::fcntl(libc::STDERR_FILENO, libc::F_DUPFD_CLOEXEC, 3) };
    let diag = if diag < 0 { libc::STDERR_FILENO } else { diag };

    let mut wiring = [
        (stdio.stdin, libc::STDIN_FILENO),
        (stdio.stdout, libc::STDOUT_FILENO),
        (stdio.stderr, libc::STDERR_FILENO),
    ];

    // A source sitting on another standard slot would be clobbered by an
    // earlier install; move it above 2 first.
    for (fd, slot) in wiring.iter_mut() {
        let Some(src) = fd else { continue };
        if *src <= libc::STDERR_FILENO && *src != *slot {
            match fd::dup_above_stdio(*src) {
                Ok(moved) => *src = moved,
                Err(e) => {
                    report(diag, redirect_diag, e);
                    unsafe { libc::_exit(REDIRECT_FAILURE_CODE) };
                }
            }
        }
    }

    for (fd, slot) in wiring {
        let Some(fd) = fd else { continue };
        if let Err(e) = install(fd, slot) {
            report(diag, redirect_diag, e);
            unsafe { libc::_exit(REDIRECT_FAILURE_CODE) };
        }
    }

    unsafe { libc::execvp(argv[0], argv.as_ptr()) };

    report(diag, exec_diag, Errno::last());
    unsafe { libc::_exit(EXEC_FAILURE_CODE) }
}

/// Put `fd` on `slot`. Descriptors already on their slot only need the
/// close-on-exec flag cleared.
fn install(fd: RawFd, slot: RawFd) -> nix::Result<()> {
    if fd == slot {
        fd::clear_cloexec(slot)
    } else {
        dup2(fd, slot).map(drop)
    }
}

fn report(diag: RawFd, prefix: &str, errno: Errno) {
    for part in [prefix.as_bytes(), errno.desc().as_bytes(), &b"\n"[..]] {
        // Best effort; nothing useful to do if stderr is gone.
        unsafe { libc::write(diag, part.as_ptr().cast(), part.len()) };
    }
}
