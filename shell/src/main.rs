// Copyright 2024 The Crate Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Reads command lines from stdin and executes them until `exit` or EOF.

use std::io::Read;
use std::process;

use anyhow::Result;
use base::info;
use base::syslog;
use base::syslog::LogConfig;
use shell::Outcome;
use shell::Shell;
use shell::INPUT_CHUNK_SIZE;

fn main() {
    let log_config = LogConfig { proc_name: "shell", ..Default::default() };
    syslog::init_with(log_config);

    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("shell: {e:#}");
            1
        }
    };
    process::exit(code);
}

fn run() -> Result<i32> {
    let mut shell = Shell::new();
    let mut pending = String::new();
    let mut chunk = [0u8; INPUT_CHUNK_SIZE];
    let mut last_code = 0;

    let exit_code = 'outer: loop {
        let n = std::io::stdin().read(&mut chunk)?;
        if n == 0 {
            // EOF: run whatever's left in `pending` as a final line.
            if !pending.is_empty() {
                if let Some(code) = run_line(&mut shell, &pending, &mut last_code)? {
                    break 'outer code;
                }
            }
            break last_code;
        }
        pending.push_str(&String::from_utf8_lossy(&chunk[..n]));

        while let Some(newline) = pending.find('\n') {
            let line = pending[..newline].to_string();
            pending.drain(..=newline);
            if let Some(code) = run_line(&mut shell, &line, &mut last_code)? {
                break 'outer code;
            }
        }
    };

    shell.reap_remaining_background();
    info!("shell exiting with code {exit_code}");
    Ok(exit_code)
}

/// Runs one line; returns `Some(code)` if the shell should exit now.
fn run_line(shell: &mut Shell, line: &str, last_code: &mut i32) -> Result<Option<i32>> {
    match shell.execute_line(line)? {
        Outcome::Continue(code) => {
            *last_code = code;
            Ok(None)
        }
        Outcome::Exit(code) => Ok(Some(code)),
    }
}
