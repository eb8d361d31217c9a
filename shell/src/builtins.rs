// Copyright 2024 The Crate Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The shell's two built-ins. Recognized only when a pipeline segment names
//! them alone (no pipe partners).

use std::path::Path;

use log::warn;

use crate::error::Error;
use crate::error::Result;
use crate::parser::Command;

pub fn is_builtin(name: &str) -> bool {
    matches!(name, "cd" | "exit")
}

/// `cd <dir>`. Exactly one argument is required.
pub fn run_cd(cmd: &Command) -> Result<i32> {
    let dir = match cmd.args.as_slice() {
        [dir] => dir,
        _ => {
            warn!("shell: cd: expected exactly one argument, got {}", cmd.args.len());
            return Err(Error::BadBuiltinArgs("cd".to_string()));
        }
    };
    match std::env::set_current_dir(Path::new(dir)) {
        Ok(()) => Ok(0),
        Err(e) => {
            eprintln!("shell: cd: {dir}: {e}");
            Ok(1)
        }
    }
}

/// `exit [n]`. Parses the optional status argument; defaults to 0.
pub fn parse_exit_code(cmd: &Command) -> Result<i32> {
    match cmd.args.as_slice() {
        [] => Ok(0),
        [n] => n.parse::<i32>().map_err(|_| Error::BadBuiltinArgs("exit".to_string())),
        _ => Err(Error::BadBuiltinArgs("exit".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_builtins() {
        assert!(is_builtin("cd"));
        assert!(is_builtin("exit"));
        assert!(!is_builtin("echo"));
    }

    #[test]
    fn exit_code_defaults_to_zero() {
        let cmd = Command { exe: "exit".to_string(), args: vec![] };
        assert_eq!(parse_exit_code(&cmd).unwrap(), 0);
    }

    #[test]
    fn exit_code_parses_argument() {
        let cmd = Command { exe: "exit".to_string(), args: vec!["7".to_string()] };
        assert_eq!(parse_exit_code(&cmd).unwrap(), 7);
    }

    #[test]
    fn exit_rejects_non_numeric_argument() {
        let cmd = Command { exe: "exit".to_string(), args: vec!["abc".to_string()] };
        assert!(parse_exit_code(&cmd).is_err());
    }

    #[test]
    fn cd_rejects_wrong_arg_count() {
        let cmd = Command { exe: "cd".to_string(), args: vec![] };
        assert!(run_cd(&cmd).is_err());
        let cmd = Command { exe: "cd".to_string(), args: vec!["a".to_string(), "b".to_string()] };
        assert!(run_cd(&cmd).is_err());
    }
}
