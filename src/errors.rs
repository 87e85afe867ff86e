// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcError {
    #[error("could not open file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: Errno,
    },

    #[error("cannot launch an empty command")]
    EmptyCommand,

    #[error("argument contains a NUL byte: {0:?}")]
    NulByte(String),

    #[error("could not fork child process: {0}")]
    Fork(#[source] Errno),

    #[error("could not wait on command (pid {pid}): {source}")]
    Wait {
        pid: i32,
        #[source]
        source: Errno,
    },

    #[error("command exited with exit code {code}")]
    ChildExit { pid: i32, code: i32 },

    #[error("command process was terminated by signal {signal}")]
    ChildSignaled { pid: i32, signal: i32 },

    #[error("command process was stopped by signal {signal}")]
    ChildStopped { pid: i32, signal: i32 },

    #[error("could not create pipe: {0}")]
    Pipe(#[source] Errno),

    #[error("pipeline already failed; further stages are ignored")]
    PipelineErrored,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ProcError>;
