// src/fd/mod.rs

//! Descriptor gateway.
//!
//! Opens files for redirection, creates anonymous pipes and describes how
//! each standard stream of a child should be wired ([`Redirect`]).
//!
//! Every descriptor produced here is close-on-exec, so it only reaches a
//! child through the launcher's explicit `dup2` onto slot 0, 1 or 2.
//! Ownership is tracked with [`OwnedFd`]: whoever holds the value closes it
//! exactly once when it is dropped.

use std::fs::File;
use std::io::Read;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::path::{Path, PathBuf};

use nix::fcntl::{self, FcntlArg, FdFlag, OFlag};
use nix::sys::stat::Mode;
use tracing::{debug, error, warn};

use crate::errors::{ProcError, Result};

/// How one standard stream of a child is wired.
///
/// `Inherit` leaves the stream untouched: the child sees whatever the
/// parent has on that slot.
#[derive(Debug, Default)]
pub enum Redirect {
    #[default]
    Inherit,
    /// An already-open descriptor. Ownership moves to the runner, which
    /// closes it once the child is launched.
    Fd(OwnedFd),
    /// A borrowed descriptor, passed through and never closed. It may name
    /// a standard stream of the parent (`Raw(1)` on stderr is `2>&1`).
    Raw(RawFd),
    /// Open the path read-only.
    Read(PathBuf),
    /// Create or truncate the path.
    Write(PathBuf),
    /// Create the path or append to it.
    Append(PathBuf),
}

impl Redirect {
    pub fn read(path: impl Into<PathBuf>) -> Self {
        Redirect::Read(path.into())
    }

    pub fn write(path: impl Into<PathBuf>) -> Self {
        Redirect::Write(path.into())
    }

    pub fn append(path: impl Into<PathBuf>) -> Self {
        Redirect::Append(path.into())
    }

    pub fn is_inherit(&self) -> bool {
        matches!(self, Redirect::Inherit)
    }

    /// Open whatever the redirect names. Paths go through the gateway and
    /// come back owned; borrowed descriptors stay borrowed.
    pub(crate) fn resolve(self) -> Result<Resolved> {
        Ok(match self {
            Redirect::Inherit => Resolved::Inherit,
            Redirect::Fd(fd) => Resolved::Owned(fd),
            Redirect::Raw(fd) => Resolved::Borrowed(fd),
            Redirect::Read(path) => Resolved::Owned(open_read(&path)?),
            Redirect::Write(path) => Resolved::Owned(open_write(&path)?),
            Redirect::Append(path) => Resolved::Owned(open_append(&path)?),
        })
    }
}

impl From<OwnedFd> for Redirect {
    fn from(fd: OwnedFd) -> Self {
        Redirect::Fd(fd)
    }
}

impl From<File> for Redirect {
    fn from(file: File) -> Self {
        Redirect::Fd(file.into())
    }
}

/// A redirect after the gateway has opened it.
///
/// Dropping an `Owned` value closes the descriptor; `Borrowed` and
/// `Inherit` never close anything.
#[derive(Debug)]
pub(crate) enum Resolved {
    Inherit,
    Owned(OwnedFd),
    Borrowed(RawFd),
}

impl Resolved {
    /// Descriptor to install in the child, or `None` to inherit.
    pub(crate) fn raw(&self) -> Option<RawFd> {
        match self {
            Resolved::Inherit => None,
            Resolved::Owned(fd) => Some(fd.as_raw_fd()),
            Resolved::Borrowed(fd) => Some(*fd),
        }
    }
}

/// Rights for files created by [`open_write`] and [`open_append`]: 0644.
fn create_mode() -> Mode {
    Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IROTH
}

/// Open `path` with the given flags, close-on-exec.
pub fn open(path: &Path, flags: OFlag, mode: Mode) -> Result<OwnedFd> {
    match fcntl::open(path, flags | OFlag::O_CLOEXEC, mode) {
        Ok(raw) => {
            debug!(?path, fd = raw, "opened descriptor");
            // SAFETY: `open` just returned this descriptor and nothing else owns it.
            Ok(unsafe { OwnedFd::from_raw_fd(raw) })
        }
        Err(source) => {
            error!(?path, error = %source, "could not open file");
            Err(ProcError::Open {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

pub fn open_read(path: impl AsRef<Path>) -> Result<OwnedFd> {
    open(path.as_ref(), OFlag::O_RDONLY, Mode::empty())
}

pub fn open_write(path: impl AsRef<Path>) -> Result<OwnedFd> {
    open(
        path.as_ref(),
        OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
        create_mode(),
    )
}

pub fn open_append(path: impl AsRef<Path>) -> Result<OwnedFd> {
    open(
        path.as_ref(),
        OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND,
        create_mode(),
    )
}

/// Close a descriptor explicitly.
///
/// Failures are logged and otherwise ignored. Dropping the `OwnedFd` does
/// the same thing silently.
pub fn close(fd: OwnedFd) {
    let raw = fd.into_raw_fd();
    if let Err(e) = nix::unistd::close(raw) {
        warn!(fd = raw, error = %e, "failed to close descriptor");
    }
}

/// Both ends of an anonymous pipe.
#[derive(Debug)]
pub struct Pipe {
    pub read: OwnedFd,
    pub write: OwnedFd,
}

impl Pipe {
    /// Create a pipe whose ends are close-on-exec.
    pub fn open() -> Result<Pipe> {
        let (read, write) = new_pipe().map_err(|e| {
            error!(error = %e, "could not create pipe");
            ProcError::Pipe(e)
        })?;
        debug!(read = read.as_raw_fd(), write = write.as_raw_fd(), "opened pipe");
        Ok(Pipe { read, write })
    }
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
fn new_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    nix::unistd::pipe2(OFlag::O_CLOEXEC)
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
fn new_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    let (read, write) = nix::unistd::pipe()?;
    set_cloexec(read.as_raw_fd())?;
    set_cloexec(write.as_raw_fd())?;
    Ok((read, write))
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
fn set_cloexec(fd: RawFd) -> nix::Result<()> {
    fcntl::fcntl(fd, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC)).map(drop)
}

/// Let `fd` survive `exec`. Async-signal-safe, so the child may call it.
pub(crate) fn clear_cloexec(fd: RawFd) -> nix::Result<()> {
    fcntl::fcntl(fd, FcntlArg::F_SETFD(FdFlag::empty())).map(drop)
}

/// Duplicate `fd` onto the lowest free descriptor above the standard
/// streams, close-on-exec. Async-signal-safe.
pub(crate) fn dup_above_stdio(fd: RawFd) -> nix::Result<RawFd> {
    fcntl::fcntl(fd, FcntlArg::F_DUPFD_CLOEXEC(libc::STDERR_FILENO + 1))
}

/// Drain `fd` until end of file and return the bytes as UTF-8 (lossy).
///
/// Consumes the descriptor, so it is closed once reading is done.
pub fn read_to_string(fd: OwnedFd) -> Result<String> {
    let mut file = File::from(fd);
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
