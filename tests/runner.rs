// tests/runner.rs

mod common;
use crate::common::{init_tracing, read, sh};

use std::fs::File;
use std::io::Write;
use std::os::fd::AsRawFd;

use nix::sys::signal::{Signal, kill};
use nix::sys::wait::waitpid;
use nix::unistd::Pid;
use tempfile::tempdir;

use procpipe::cmd;
use procpipe::cmd::{Cmd, RunOptions, capture, run};
use procpipe::errors::ProcError;
use procpipe::fd::{self, Redirect};

#[test]
fn echo_hello_succeeds() {
    init_tracing();
    let mut cmd = cmd!["echo", "hello"];
    run(&mut cmd, RunOptions::default()).expect("echo should succeed");
}

#[test]
fn empty_command_fails_without_forking() {
    init_tracing();
    let mut cmd = Cmd::new();
    match run(&mut cmd, RunOptions::default()) {
        Err(ProcError::EmptyCommand) => {}
        other => panic!("expected EmptyCommand, got {other:?}"),
    }
}

#[test]
fn nonzero_exit_is_reported_with_its_code() {
    init_tracing();
    let mut cmd = sh("exit 3");
    match run(&mut cmd, RunOptions::default()) {
        Err(ProcError::ChildExit { code, .. }) => assert_eq!(code, 3),
        other => panic!("expected ChildExit, got {other:?}"),
    }

    let mut cmd = cmd!["false"];
    assert!(matches!(
        run(&mut cmd, RunOptions::default()),
        Err(ProcError::ChildExit { code: 1, .. })
    ));
}

#[test]
fn missing_program_fails_in_child_with_exit_127() {
    init_tracing();
    let mut cmd = cmd!["procpipe-definitely-not-a-real-program"];
    match run(&mut cmd, RunOptions::default()) {
        Err(ProcError::ChildExit { code, .. }) => assert_eq!(code, 127),
        other => panic!("expected ChildExit(127), got {other:?}"),
    }
}

#[test]
fn killed_child_reports_signal() {
    init_tracing();
    let mut cmd = sh("kill -9 $$");
    match run(&mut cmd, RunOptions::default()) {
        Err(ProcError::ChildSignaled { signal, .. }) => {
            assert_eq!(signal, Signal::SIGKILL as i32)
        }
        other => panic!("expected ChildSignaled, got {other:?}"),
    }
}

#[test]
fn stopped_child_is_a_failure() {
    init_tracing();
    let mut cmd = sh("kill -STOP $$");
    match run(&mut cmd, RunOptions::default()) {
        Err(ProcError::ChildStopped { pid, signal }) => {
            assert_eq!(signal, Signal::SIGSTOP as i32);
            // Not resumed by the engine; clean it up here.
            let pid = Pid::from_raw(pid);
            kill(pid, Signal::SIGKILL).unwrap();
            waitpid(pid, None).unwrap();
        }
        other => panic!("expected ChildStopped, got {other:?}"),
    }
}

#[test]
fn buffer_is_cleared_unless_preserved() {
    init_tracing();
    let mut cmd = cmd!["true"];
    run(&mut cmd, RunOptions::default()).unwrap();
    assert!(cmd.is_empty());

    let mut cmd = cmd!["true"];
    run(&mut cmd, RunOptions::default().preserve(true)).unwrap();
    assert_eq!(cmd.as_slice(), ["true"]);

    // Cleared on failure paths too.
    let mut cmd = cmd!["false"];
    assert!(run(&mut cmd, RunOptions::default()).is_err());
    assert!(cmd.is_empty());
}

#[test]
fn stdout_redirect_truncates_and_append_appends() {
    init_tracing();
    let dir = tempdir().unwrap();
    let out = dir.path().join("out.txt");

    let mut cmd = cmd!["echo", "first"];
    run(&mut cmd, RunOptions::default().stdout(Redirect::write(&out))).unwrap();
    cmd.extend(["echo", "second"]);
    run(&mut cmd, RunOptions::default().stdout(Redirect::write(&out))).unwrap();
    assert_eq!(read(&out), "second\n");

    cmd.extend(["echo", "third"]);
    run(&mut cmd, RunOptions::default().stdout(Redirect::append(&out))).unwrap();
    assert_eq!(read(&out), "second\nthird\n");
}

#[test]
fn stdin_and_stderr_redirects() {
    init_tracing();
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let out = dir.path().join("out.txt");
    let err = dir.path().join("err.txt");
    std::fs::write(&input, "x\ny\n").unwrap();

    let mut cmd = cmd!["wc", "-l"];
    let opts = RunOptions::default()
        .stdin(Redirect::read(&input))
        .stdout(Redirect::write(&out));
    run(&mut cmd, opts).unwrap();
    assert_eq!(read(&out).trim(), "2");

    let mut cmd = sh("echo oops >&2");
    run(&mut cmd, RunOptions::default().stderr(Redirect::write(&err))).unwrap();
    assert_eq!(read(&err), "oops\n");
}

#[test]
fn open_failure_short_circuits_and_still_clears_buffer() {
    init_tracing();
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing").join("in.txt");

    let mut cmd = cmd!["cat"];
    match run(&mut cmd, RunOptions::default().stdin(Redirect::read(&missing))) {
        Err(ProcError::Open { path, .. }) => assert_eq!(path, missing),
        other => panic!("expected Open error, got {other:?}"),
    }
    assert!(cmd.is_empty());
}

#[test]
fn already_open_descriptor_is_passed_through() {
    init_tracing();
    let dir = tempdir().unwrap();
    let out = dir.path().join("out.txt");

    let file = fd::open_write(&out).unwrap();
    let mut cmd = cmd!["echo", "via fd"];
    run(&mut cmd, RunOptions::default().stdout(file)).unwrap();
    assert_eq!(read(&out), "via fd\n");
}

#[test]
fn borrowed_descriptor_stays_open_after_run() {
    init_tracing();
    let dir = tempdir().unwrap();
    let out = dir.path().join("out.txt");

    let file = fd::open_write(&out).unwrap();
    let mut cmd = cmd!["echo", "from child"];
    run(
        &mut cmd,
        RunOptions::default().stdout(Redirect::Raw(file.as_raw_fd())),
    )
    .unwrap();

    // Still ours: writing through it continues at the shared offset.
    let mut file = File::from(file);
    file.write_all(b"from parent\n").unwrap();
    drop(file);
    assert_eq!(read(&out), "from child\nfrom parent\n");
}

#[test]
fn capture_ignores_stdout_redirect() {
    init_tracing();
    let dir = tempdir().unwrap();
    let out = dir.path().join("never.txt");

    let mut cmd = cmd!["echo", "captured"];
    let output = capture(&mut cmd, RunOptions::default().stdout(Redirect::write(&out))).unwrap();
    assert_eq!(output, "captured\n");
    assert!(!out.exists());
}

#[test]
fn capture_returns_child_stdout() {
    init_tracing();
    let mut cmd = cmd!["echo", "lol", "haha"];
    let output = capture(&mut cmd, RunOptions::default()).unwrap();
    assert_eq!(output, "lol haha\n");
    assert!(cmd.is_empty());
}

#[test]
fn capture_handles_output_larger_than_a_pipe_buffer() {
    init_tracing();
    let mut cmd = sh("head -c 200000 /dev/zero");
    let output = capture(&mut cmd, RunOptions::default().echo(false)).unwrap();
    assert_eq!(output.len(), 200_000);
}

#[test]
fn capture_reports_child_failure() {
    init_tracing();
    let mut cmd = sh("echo partial; exit 2");
    assert!(matches!(
        capture(&mut cmd, RunOptions::default()),
        Err(ProcError::ChildExit { code: 2, .. })
    ));
}

#[test]
fn nul_byte_in_argument_is_rejected() {
    init_tracing();
    let mut cmd = cmd!["echo", "a\0b"];
    assert!(matches!(
        run(&mut cmd, RunOptions::default()),
        Err(ProcError::NulByte(_))
    ));
}

#[test]
fn display_quotes_arguments_with_spaces() {
    let cmd = cmd!["printf", "a b", "it's", ""];
    assert_eq!(cmd.to_string(), r"printf 'a b' 'it'\''s' ''");
}
