// Copyright 2024 The Crate Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Turns one line of input into a [`CommandLine`]. This is the one corner of
//! the crate that is deliberately minimal rather than idiomatic-production:
//! whitespace-delimited tokens only, no quoting, globbing, or variable
//! expansion.

/// One stage of a pipeline: a program name and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub exe: String,
    pub args: Vec<String>,
}

/// A maximal run of `C1 | C2 | … | Ck`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSegment {
    pub commands: Vec<Command>,
}

impl PipelineSegment {
    /// The single command this segment names, if it has no pipe in it.
    pub fn as_single(&self) -> Option<&Command> {
        match self.commands.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    Truncate,
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub path: String,
    pub mode: RedirectMode,
}

/// A fully parsed line: one or more pipeline segments joined by logical
/// operators, with redirection and backgrounding applying only to the last
/// segment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandLine {
    pub segments: Vec<PipelineSegment>,
    pub ops: Vec<LogicalOp>,
    pub redirect: Option<Redirect>,
    pub background: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("`{0}` with nothing after it")]
    DanglingOperator(&'static str),
    #[error("redirection with no target file")]
    MissingRedirectTarget,
}

/// Parses a single line. Returns `Ok(None)` for a blank or comment-only line.
pub fn parse_line(line: &str) -> Result<Option<CommandLine>, ParseError> {
    let mut line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut background = false;
    if let Some(rest) = line.strip_suffix('&') {
        // A `&&` has already been tokenized as its own operator below; a
        // lone trailing `&` marks background only if it isn't part of one.
        if !rest.trim_end().ends_with('&') {
            background = true;
            line = rest.trim_end();
        }
    }

    let tokens = tokenize(line);
    if tokens.is_empty() {
        return Ok(None);
    }

    let mut segments = Vec::new();
    let mut ops = Vec::new();
    let mut redirect = None;

    let mut commands = Vec::new();
    let mut cur_exe: Option<String> = None;
    let mut cur_args = Vec::new();
    // Set to the operator just consumed while no command has followed it
    // yet; cleared as soon as a word starts a new command.
    let mut pending_operator: Option<&'static str> = Some("start of line");

    let mut iter = tokens.into_iter();
    while let Some(tok) = iter.next() {
        match tok.as_str() {
            "|" => {
                if let Some(op) = pending_operator {
                    return Err(ParseError::DanglingOperator(op));
                }
                flush_command(&mut commands, &mut cur_exe, &mut cur_args);
                pending_operator = Some("|");
            }
            "&&" | "||" => {
                if let Some(op) = pending_operator {
                    return Err(ParseError::DanglingOperator(op));
                }
                flush_command(&mut commands, &mut cur_exe, &mut cur_args);
                segments.push(PipelineSegment { commands: std::mem::take(&mut commands) });
                ops.push(if tok == "&&" { LogicalOp::And } else { LogicalOp::Or });
                pending_operator = Some(if tok == "&&" { "&&" } else { "||" });
            }
            ">" | ">>" => {
                if let Some(op) = pending_operator {
                    return Err(ParseError::DanglingOperator(op));
                }
                flush_command(&mut commands, &mut cur_exe, &mut cur_args);
                let path = iter.next().ok_or(ParseError::MissingRedirectTarget)?;
                redirect = Some(Redirect {
                    path,
                    mode: if tok == ">" { RedirectMode::Truncate } else { RedirectMode::Append },
                });
            }
            word => {
                if cur_exe.is_none() {
                    cur_exe = Some(word.to_string());
                } else {
                    cur_args.push(word.to_string());
                }
                pending_operator = None;
            }
        }
    }
    if let Some(op) = pending_operator {
        if op == "start of line" {
            return Err(ParseError::Empty);
        }
        return Err(ParseError::DanglingOperator(op));
    }
    flush_command(&mut commands, &mut cur_exe, &mut cur_args);
    segments.push(PipelineSegment { commands });

    Ok(Some(CommandLine { segments, ops, redirect, background }))
}

fn flush_command(commands: &mut Vec<Command>, cur_exe: &mut Option<String>, cur_args: &mut Vec<String>) {
    if let Some(exe) = cur_exe.take() {
        commands.push(Command { exe, args: std::mem::take(cur_args) });
    }
}

fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    let mut word = String::new();

    macro_rules! flush {
        () => {
            if !word.is_empty() {
                tokens.push(std::mem::take(&mut word));
            }
        };
    }

    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' => flush!(),
            '|' => {
                flush!();
                if chars.peek() == Some(&'|') {
                    chars.next();
                    tokens.push("||".to_string());
                } else {
                    tokens.push("|".to_string());
                }
            }
            '&' => {
                flush!();
                if chars.peek() == Some(&'&') {
                    chars.next();
                    tokens.push("&&".to_string());
                } else {
                    tokens.push("&".to_string());
                }
            }
            '>' => {
                flush!();
                if chars.peek() == Some(&'>') {
                    chars.next();
                    tokens.push(">>".to_string());
                } else {
                    tokens.push(">".to_string());
                }
            }
            c => word.push(c),
        }
    }
    flush!();
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_command() {
        let cl = parse_line("echo hello").unwrap().unwrap();
        assert_eq!(cl.segments.len(), 1);
        assert_eq!(cl.segments[0].commands.len(), 1);
        assert_eq!(cl.segments[0].commands[0].exe, "echo");
        assert_eq!(cl.segments[0].commands[0].args, vec!["hello"]);
        assert!(!cl.background);
        assert!(cl.redirect.is_none());
    }

    #[test]
    fn parses_pipeline() {
        let cl = parse_line("echo hello | wc -c").unwrap().unwrap();
        assert_eq!(cl.segments.len(), 1);
        let seg = &cl.segments[0];
        assert_eq!(seg.commands.len(), 2);
        assert_eq!(seg.commands[1].exe, "wc");
        assert_eq!(seg.commands[1].args, vec!["-c"]);
    }

    #[test]
    fn parses_logical_chain() {
        let cl = parse_line("false && echo A || echo B").unwrap().unwrap();
        assert_eq!(cl.segments.len(), 3);
        assert_eq!(cl.ops, vec![LogicalOp::And, LogicalOp::Or]);
    }

    #[test]
    fn parses_redirection_and_background() {
        let cl = parse_line("printf 'xy' >> out &").unwrap().unwrap();
        assert!(cl.background);
        let redirect = cl.redirect.unwrap();
        assert_eq!(redirect.path, "out");
        assert_eq!(redirect.mode, RedirectMode::Append);
    }

    #[test]
    fn blank_and_comment_lines_are_none() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# comment").unwrap(), None);
    }

    #[test]
    fn dangling_pipe_is_an_error() {
        assert_eq!(parse_line("echo hi |").unwrap_err(), ParseError::DanglingOperator("|"));
    }

    #[test]
    fn redirect_without_target_is_an_error() {
        assert_eq!(parse_line("echo hi >").unwrap_err(), ParseError::MissingRedirectTarget);
    }
}
