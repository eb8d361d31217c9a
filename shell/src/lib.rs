// Copyright 2024 The Crate Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! A small POSIX-flavored shell: pipelines, `&&`/`||` chaining, output
//! redirection, background execution, and the `cd`/`exit` built-ins.

pub mod background;
mod builtins;
mod error;
pub mod parser;
mod pipeline;

pub use error::Error;
pub use error::Result;

use log::debug;
use log::warn;

use background::BackgroundRegistry;
use parser::LogicalOp;

/// Reads stdin in chunks of up to this many bytes before splitting on
/// newlines and handing complete lines to the parser.
pub const INPUT_CHUNK_SIZE: usize = 1024;

/// What happened after running one line.
pub enum Outcome {
    /// Keep reading; carries the line's exit code (for `$?`-style use).
    Continue(i32),
    /// `exit` was invoked; carries the requested process exit code.
    Exit(i32),
}

/// Owns the background process registry across command lines. One `Shell`
/// per process; not `Send`/`Sync` (child-process bookkeeping is inherently
/// tied to this process).
pub struct Shell {
    background: BackgroundRegistry,
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

impl Shell {
    pub fn new() -> Self {
        Shell { background: BackgroundRegistry::new() }
    }

    /// Runs one line: parses it, executes its pipeline segments honoring
    /// `&&`/`||` short-circuiting, and performs the opportunistic
    /// non-blocking background sweep.
    pub fn execute_line(&mut self, line: &str) -> Result<Outcome> {
        self.background.reap_nonblocking();

        let command_line = match parser::parse_line(line) {
            Ok(Some(cl)) => cl,
            Ok(None) => return Ok(Outcome::Continue(0)),
            Err(e) => {
                eprintln!("shell: {e}");
                warn!("shell: parse error on `{line}`: {e}");
                return Ok(Outcome::Continue(1));
            }
        };

        let segment_count = command_line.segments.len();
        let mut code = 0;
        let mut skip = false;

        for (idx, segment) in command_line.segments.iter().enumerate() {
            if idx > 0 {
                let op = command_line.ops[idx - 1];
                skip = match op {
                    LogicalOp::And => code != 0,
                    LogicalOp::Or => code == 0,
                };
            }
            if skip {
                continue;
            }

            if let Some(cmd) = segment.as_single() {
                if cmd.exe == "exit" {
                    let exit_code = builtins::parse_exit_code(cmd)?;
                    return Ok(Outcome::Exit(exit_code));
                }
                if cmd.exe == "cd" {
                    code = builtins::run_cd(cmd)?;
                    continue;
                }
            }

            let is_final = idx + 1 == segment_count;
            let redirect = if is_final { command_line.redirect.as_ref() } else { None };
            let background = is_final && command_line.background;

            let pids = pipeline::spawn_pipeline(&segment.commands, redirect, background)?;
            if background {
                debug!("shell: backgrounding {} pid(s)", pids.len());
                for pid in pids {
                    self.background.track(pid);
                }
                code = 0;
            } else {
                code = pipeline::wait_for_pipeline(&pids);
            }
        }

        Ok(Outcome::Continue(code))
    }

    /// Final blocking reap of whatever background children remain, so none
    /// outlive the shell unreaped. Call once when the driver loop ends.
    pub fn reap_remaining_background(&mut self) {
        if !self.background.is_empty() {
            debug!("shell: reaping {} remaining background pid(s) at exit", self.background.len());
        }
        self.background.reap_all_blocking();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_line_continues_with_zero() {
        let mut shell = Shell::new();
        match shell.execute_line("").unwrap() {
            Outcome::Continue(0) => {}
            _ => panic!("expected Continue(0)"),
        }
    }

    #[test]
    fn exit_with_no_argument_defaults_to_zero() {
        let mut shell = Shell::new();
        match shell.execute_line("exit").unwrap() {
            Outcome::Exit(0) => {}
            _ => panic!("expected Exit(0)"),
        }
    }

    #[test]
    fn exit_with_argument_parses_code() {
        let mut shell = Shell::new();
        match shell.execute_line("exit 7").unwrap() {
            Outcome::Exit(7) => {}
            _ => panic!("expected Exit(7)"),
        }
    }

    #[test]
    fn parse_error_continues_with_nonzero_code() {
        let mut shell = Shell::new();
        match shell.execute_line("echo hi |").unwrap() {
            Outcome::Continue(1) => {}
            _ => panic!("expected Continue(1)"),
        }
    }

    #[test]
    fn reaping_empty_background_registry_is_harmless() {
        let mut shell = Shell::new();
        shell.reap_remaining_background();
    }
}
