// Copyright 2024 The Crate Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! End-to-end tests that spawn the real `shell` binary and real child
//! processes (`echo`, `wc`, `cat`, `printf`, `sleep`). Ignored by default
//! since they need a POSIX environment with coreutils on `PATH`; run with
//! `cargo test -p shell -- --ignored`.

use std::io::Write;
use std::process::Command;
use std::process::Stdio;
use std::time::Duration;
use std::time::Instant;

fn run_shell(script: &str) -> (String, i32) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_shell"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn shell binary");

    child.stdin.take().unwrap().write_all(script.as_bytes()).unwrap();
    let output = child.wait_with_output().unwrap();
    (String::from_utf8_lossy(&output.stdout).to_string(), output.status.code().unwrap_or(-1))
}

#[test]
#[ignore]
fn pipes_between_two_commands() {
    let (stdout, code) = run_shell("echo hello | wc -c\n");
    assert_eq!(stdout.trim_end(), "6");
    assert_eq!(code, 0);
}

#[test]
#[ignore]
fn logical_chain_short_circuits() {
    let (stdout, code) = run_shell("false && echo A || echo B\n");
    assert_eq!(stdout, "B\n");
    assert_eq!(code, 0);
}

#[test]
#[ignore]
fn redirection_truncate_then_append() {
    let dir = std::env::temp_dir().join(format!("shell-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let out = dir.join("out");
    let script = format!(
        "printf 'xy' > {path}\nprintf 'zw' >> {path}\ncat {path}\n",
        path = out.display()
    );
    let (stdout, code) = run_shell(&script);
    assert_eq!(stdout, "xyzw");
    assert_eq!(code, 0);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
#[ignore]
fn cd_changes_directory_and_exit_sets_status() {
    let (stdout, code) = run_shell("cd /tmp && pwd\nexit 7\n");
    assert_eq!(stdout.trim_end(), "/tmp");
    assert_eq!(code, 7);
}

#[test]
#[ignore]
fn background_pipeline_is_tracked_and_reaped_before_exit() {
    // The command line itself must not block on the backgrounded sleep; the
    // shell only waits for it as part of its final, unconditional reap when
    // `exit` is processed, so total runtime is bounded by the sleep itself
    // rather than hanging indefinitely.
    let start = Instant::now();
    let (_, code) = run_shell("sleep 1 &\nexit 0\n");
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(900));
    assert!(elapsed < Duration::from_secs(10));
    assert_eq!(code, 0);
}
