// tests/pipeline.rs

mod common;
use crate::common::{init_tracing, read, sh};

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tempfile::tempdir;

use procpipe::cmd;
use procpipe::cmd::{Cmd, Streams};
use procpipe::errors::ProcError;
use procpipe::fd::Redirect;
use procpipe::pipeline::{Pipeline, PipelineOptions, PipelineState};
use procpipe::proc::ProcPool;

#[test]
fn printf_into_wc_counts_lines() {
    init_tracing();
    let dir = tempdir().unwrap();
    let out = dir.path().join("count.txt");

    let mut cmd = Cmd::new();
    Pipeline::scope(PipelineOptions::default(), |p| {
        cmd.extend(["printf", "a\nb\nc\n"]);
        p.chain(&mut cmd, Streams::default())?;
        cmd.extend(["wc", "-l"]);
        p.chain(&mut cmd, Streams::new().stdout(Redirect::write(&out)))
    })
    .unwrap();

    assert_eq!(read(&out).trim(), "3");
}

#[test]
fn three_stage_async_pipeline_passes_bytes_through() {
    init_tracing();
    let dir = tempdir().unwrap();
    let out = dir.path().join("sorted.txt");
    let mut pool = ProcPool::new();

    let mut p = Pipeline::new(PipelineOptions::default().pool(&mut pool).max_procs(4));
    let mut cmd = cmd!["printf", "b\na\nc\n"];
    p.chain(&mut cmd, Streams::default()).unwrap();
    assert_eq!(p.state(), PipelineState::Staging);
    assert!(cmd.is_empty());

    cmd.extend(["sort"]);
    p.chain(&mut cmd, Streams::default()).unwrap();
    cmd.extend(["tr", "a-z", "A-Z"]);
    p.chain(&mut cmd, Streams::new().stdout(Redirect::write(&out)))
        .unwrap();
    p.end().unwrap();
    assert_eq!(p.state(), PipelineState::Empty);
    drop(p);

    pool.flush().unwrap();
    assert_eq!(read(&out), "A\nB\nC\n");
}

#[test]
fn explicit_stdout_wins_over_pipe() {
    init_tracing();
    let dir = tempdir().unwrap();
    let first = dir.path().join("first.txt");
    let count = dir.path().join("count.txt");

    let mut cmd = Cmd::new();
    Pipeline::scope(PipelineOptions::default(), |p| {
        cmd.extend(["printf", "x\ny\n"]);
        p.chain(&mut cmd, Streams::new().stdout(Redirect::write(&first)))?;
        cmd.extend(["wc", "-l"]);
        p.chain(&mut cmd, Streams::new().stdout(Redirect::write(&count)))
    })
    .unwrap();

    assert_eq!(read(&first), "x\ny\n");
    // The pipe's write end was discarded, so wc saw an empty stream.
    assert_eq!(read(&count).trim(), "0");
}

#[test]
fn explicit_stdin_wins_over_pipe() {
    init_tracing();
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let out = dir.path().join("out.txt");
    std::fs::write(&input, "from file\n").unwrap();

    let mut cmd = Cmd::new();
    Pipeline::scope(PipelineOptions::default(), |p| {
        cmd.extend(["true"]);
        p.chain(&mut cmd, Streams::default())?;
        cmd.extend(["cat"]);
        p.chain(
            &mut cmd,
            Streams::new()
                .stdin(Redirect::read(&input))
                .stdout(Redirect::write(&out)),
        )
    })
    .unwrap();

    assert_eq!(read(&out), "from file\n");
}

#[test]
fn output_larger_than_a_pipe_buffer_flows_without_a_pool() {
    init_tracing();
    let dir = tempdir().unwrap();
    let out = dir.path().join("bytes.txt");

    let (tx, rx) = mpsc::channel();
    let target = out.clone();
    thread::spawn(move || {
        let mut cmd = Cmd::new();
        let result = Pipeline::scope(PipelineOptions::default().echo(false), |p| {
            cmd.extend(["head", "-c", "200000", "/dev/zero"]);
            p.chain(&mut cmd, Streams::default())?;
            cmd.extend(["wc", "-c"]);
            p.chain(&mut cmd, Streams::new().stdout(Redirect::write(&target)))
        });
        let _ = tx.send(result);
    });

    let result = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("pipeline did not finish in time");
    result.unwrap();
    assert_eq!(read(&out).trim(), "200000");
}

#[test]
fn end_waits_for_every_stage_without_a_pool() {
    init_tracing();
    let dir = tempdir().unwrap();
    let out = dir.path().join("late.txt");

    let mut p = Pipeline::new(PipelineOptions::default());
    let mut cmd = sh("sleep 0.1; echo late");
    p.chain(&mut cmd, Streams::default()).unwrap();
    cmd.extend(["cat"]);
    p.chain(&mut cmd, Streams::new().stdout(Redirect::write(&out)))
        .unwrap();
    p.end().unwrap();

    assert_eq!(read(&out), "late\n");
    assert_eq!(p.state(), PipelineState::Empty);
}

#[test]
fn failed_launch_latches_errored() {
    init_tracing();
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.txt");
    let mut p = Pipeline::new(PipelineOptions::default().echo(false));

    let mut cmd = cmd!["cat"];
    p.chain(&mut cmd, Streams::new().stdin(Redirect::read(&missing)))
        .unwrap();

    cmd.extend(["wc", "-l"]);
    assert!(matches!(
        p.chain(&mut cmd, Streams::default()),
        Err(ProcError::Open { .. })
    ));
    assert_eq!(p.state(), PipelineState::Errored);

    cmd.clear();
    cmd.extend(["echo", "never"]);
    assert!(matches!(
        p.chain(&mut cmd, Streams::default()),
        Err(ProcError::PipelineErrored)
    ));
    // The rejected command was left alone.
    assert_eq!(cmd.len(), 2);

    assert!(matches!(p.end(), Err(ProcError::PipelineErrored)));
    assert!(p.is_errored());
}

#[test]
fn scope_reports_first_error() {
    init_tracing();
    let mut cmd = Cmd::new();
    let result = Pipeline::scope(PipelineOptions::default(), |p| {
        cmd.extend(["sh", "-c", "exit 5"]);
        p.chain(&mut cmd, Streams::default())?;
        cmd.extend(["cat"]);
        p.chain(&mut cmd, Streams::default())
    });
    assert!(matches!(result, Err(ProcError::ChildExit { code: 5, .. })));
}

#[test]
fn last_stage_failure_surfaces_from_end() {
    init_tracing();
    let mut p = Pipeline::new(PipelineOptions::default());
    let mut cmd = cmd!["echo", "hi"];
    p.chain(&mut cmd, Streams::default()).unwrap();
    let mut cmd = sh("cat >/dev/null; exit 6");
    p.chain(&mut cmd, Streams::default()).unwrap();

    assert!(matches!(p.end(), Err(ProcError::ChildExit { code: 6, .. })));
    assert_eq!(p.state(), PipelineState::Errored);
    assert!(matches!(p.end(), Err(ProcError::PipelineErrored)));
}

#[test]
fn earlier_stage_failure_surfaces_from_end() {
    init_tracing();
    let mut p = Pipeline::new(PipelineOptions::default().echo(false));
    let mut cmd = cmd!["false"];
    p.chain(&mut cmd, Streams::default()).unwrap();
    cmd.extend(["cat"]);
    p.chain(&mut cmd, Streams::default()).unwrap();

    assert!(matches!(p.end(), Err(ProcError::ChildExit { code: 1, .. })));
    assert!(p.is_errored());
}

#[test]
fn preserve_keeps_caller_buffer() {
    init_tracing();
    let mut p = Pipeline::new(PipelineOptions::default().preserve(true));
    let mut cmd = cmd!["true"];
    p.chain(&mut cmd, Streams::default()).unwrap();
    assert_eq!(cmd.as_slice(), ["true"]);
    p.end().unwrap();
}

#[test]
fn ending_an_empty_pipeline_is_a_no_op() {
    let mut p = Pipeline::new(PipelineOptions::default());
    assert_eq!(p.state(), PipelineState::Empty);
    p.end().unwrap();
}
