// src/cmd/mod.rs

//! Command buffers and the one-call runner.
//!
//! - [`Cmd`] is the argument list a caller fills before running it.
//! - [`options`] holds [`RunOptions`] and the per-stream [`Streams`].
//! - [`runner`] ties launcher, pool and reaper together.

pub mod options;
pub mod runner;

use std::ffi::CString;
use std::fmt;

use crate::errors::{ProcError, Result};

pub use options::{RunOptions, Streams, default_max_procs};
pub use runner::{capture, run};

/// Build a [`Cmd`] from a list of arguments, program first.
///
/// ```
/// let cmd = procpipe::cmd!["echo", "hello"];
/// assert_eq!(cmd.to_string(), "echo hello");
/// ```
#[macro_export]
macro_rules! cmd {
    () => {
        $crate::cmd::Cmd::new()
    };
    ($($arg:expr),+ $(,)?) => {{
        let mut cmd = $crate::cmd::Cmd::new();
        $(cmd.push($arg);)+
        cmd
    }};
}

/// An ordered argument list, program name first.
///
/// The buffer is meant to be reused: running it clears it unless the run
/// asked to preserve it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cmd {
    args: Vec<String>,
}

impl Cmd {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn extend<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.args
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn clear(&mut self) {
        self.args.clear();
    }

    /// Arguments as C strings for `exec`. The NULL terminator is added by
    /// the launcher and never stored here.
    pub(crate) fn to_cstrings(&self) -> Result<Vec<CString>> {
        self.args
            .iter()
            .map(|arg| CString::new(arg.as_str()).map_err(|_| ProcError::NulByte(arg.clone())))
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for Cmd {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            args: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<String>> From<Vec<S>> for Cmd {
    fn from(args: Vec<S>) -> Self {
        args.into_iter().collect()
    }
}

/// Space-joined command line; arguments that would not survive a round trip
/// through a shell are single-quoted.
impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if needs_quoting(arg) {
                write!(f, "'{}'", arg.replace('\'', r"'\''"))?;
            } else {
                f.write_str(arg)?;
            }
        }
        Ok(())
    }
}

fn needs_quoting(arg: &str) -> bool {
    arg.is_empty()
        || arg
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '\\' | '$' | '`'))
}
