// src/lib.rs

//! Launch external commands, chain them into pipelines and cap how many
//! run at once.
//!
//! ```no_run
//! use procpipe::cmd::{RunOptions, Streams, run};
//! use procpipe::fd::Redirect;
//! use procpipe::pipeline::{Pipeline, PipelineOptions};
//!
//! # fn main() -> procpipe::errors::Result<()> {
//! let mut cmd = procpipe::cmd!["echo", "hello"];
//! run(&mut cmd, RunOptions::default())?;
//!
//! Pipeline::scope(PipelineOptions::default(), |p| {
//!     cmd.extend(["printf", "a\nb\nc\n"]);
//!     p.chain(&mut cmd, Streams::default())?;
//!     cmd.extend(["wc", "-l"]);
//!     p.chain(&mut cmd, Streams::new().stdout(Redirect::write("count.txt")))
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod cmd;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fd;
pub mod logging;
pub mod pipeline;
pub mod proc;

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::cli::CliArgs;
use crate::cmd::default_max_procs;
use crate::config::{ConfigFile, load_and_validate};
use crate::engine::Engine;

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the job file, applies CLI overrides, then either
/// prints the jobs (`--dry-run`) or runs them.
pub fn run(args: CliArgs) -> Result<()> {
    let mut cfg = load_and_validate(&args.config)
        .with_context(|| format!("loading job file '{}'", args.config.display()))?;
    apply_overrides(&mut cfg, &args);

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let report = Engine::new(&cfg).run(args.job.as_deref())?;
    if !report.is_success() {
        bail!(
            "{} job(s) failed{}",
            report.failed,
            if report.drain_failed {
                ", and at least one async job exited unsuccessfully"
            } else {
                ""
            }
        );
    }

    Ok(())
}

fn apply_overrides(cfg: &mut ConfigFile, args: &CliArgs) {
    if let Some(max_procs) = args.max_procs {
        cfg.config.max_procs = max_procs;
    }
    if args.quiet {
        cfg.config.echo = false;
    }
}

/// Simple dry-run output: print settings, jobs and their stages.
fn print_dry_run(cfg: &ConfigFile) {
    println!("procpipe dry-run");
    if cfg.config.max_procs == 0 {
        println!("  config.max_procs = 0 (default: {})", default_max_procs());
    } else {
        println!("  config.max_procs = {}", cfg.config.max_procs);
    }
    println!("  config.echo = {}", cfg.config.echo);
    println!();

    println!("jobs ({}):", cfg.job.len());
    for job in &cfg.job {
        let mode = if job.background { "async" } else { "sync" };
        println!("  - {} ({mode})", job.name);
        for (i, stage) in job.stage.iter().enumerate() {
            let prefix = if i == 0 { "      " } else { "    | " };
            println!("{prefix}{}", stage.command());
            if let Some(ref path) = stage.stdin {
                println!("        < {}", path.display());
            }
            if let Some(ref path) = stage.stdout {
                println!("        > {}", path.display());
            }
            if let Some(ref path) = stage.stdout_append {
                println!("        >> {}", path.display());
            }
            if let Some(ref path) = stage.stderr {
                println!("        2> {}", path.display());
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
