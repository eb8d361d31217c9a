// Copyright 2024 The Crate Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! fork/exec/pipe execution of a single pipeline segment.

use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use log::debug;
use log::trace;

use crate::error::Error;
use crate::error::Result;
use crate::parser::Command;
use crate::parser::Redirect;
use crate::parser::RedirectMode;

/// Spawns every stage of `commands`, wiring stdout of stage `i` to stdin of
/// stage `i + 1` through a pipe. `redirect`, if given, replaces the final
/// stage's stdout. `background` controls whether the first stage's stdin is
/// inherited from the shell (foreground) or closed (background).
///
/// Returns the PIDs of every spawned child, in spawn order.
pub fn spawn_pipeline(
    commands: &[Command],
    redirect: Option<&Redirect>,
    background: bool,
) -> Result<Vec<libc::pid_t>> {
    let mut pids = Vec::with_capacity(commands.len());
    // `in_fd` is the fd the next stage should read from; `-1` means "inherit
    // the shell's stdin" (only meaningful for the first, foreground stage).
    let mut in_fd: libc::c_int = -1;

    for (i, cmd) in commands.iter().enumerate() {
        let is_last = i + 1 == commands.len();
        let mut pipe_fds = [-1i32; 2];
        if !is_last {
            // SAFETY: pipe_fds is a valid 2-element buffer for libc::pipe.
            if unsafe { libc::pipe(pipe_fds.as_mut_ptr()) } != 0 {
                return Err(Error::Pipe(std::io::Error::last_os_error()));
            }
        }

        let out_fd = if is_last {
            match redirect {
                Some(r) => Some(open_redirect(r)?),
                None => None,
            }
        } else {
            Some(pipe_fds[1])
        };

        // SAFETY: fork() has no preconditions beyond being called from a
        // single-threaded-enough context for the child to safely exec
        // immediately, which this driver guarantees by forking per stage
        // from the main thread only.
        let pid = unsafe { libc::fork() };
        if pid < 0 {
            return Err(Error::Fork(std::io::Error::last_os_error()));
        }

        if pid == 0 {
            child_exec(cmd, in_fd, out_fd, background && i == 0, pipe_fds);
            // child_exec never returns on success.
        }

        trace!("shell: spawned pid {pid} for `{}`", cmd.exe);
        pids.push(pid);

        if in_fd >= 0 {
            // SAFETY: in_fd was opened by this process via pipe().
            unsafe { libc::close(in_fd) };
        }
        if !is_last {
            // SAFETY: pipe_fds[1] was opened by this process via pipe().
            unsafe { libc::close(pipe_fds[1]) };
            in_fd = pipe_fds[0];
        } else if let Some(fd) = out_fd {
            if redirect.is_some() {
                // SAFETY: fd was opened by this process via open().
                unsafe { libc::close(fd) };
            }
        }
    }

    debug!("shell: pipeline of {} stage(s) spawned, background={background}", commands.len());
    Ok(pids)
}

/// Runs in the forked child: wires up fds and execs. Does not return.
fn child_exec(cmd: &Command, in_fd: libc::c_int, out_fd: Option<libc::c_int>, close_stdin: bool, pipe_fds: [libc::c_int; 2]) {
    unsafe {
        if close_stdin {
            libc::close(libc::STDIN_FILENO);
        } else if in_fd >= 0 {
            libc::dup2(in_fd, libc::STDIN_FILENO);
            libc::close(in_fd);
        }
        if let Some(fd) = out_fd {
            libc::dup2(fd, libc::STDOUT_FILENO);
            libc::close(fd);
        }
        if pipe_fds[0] >= 0 {
            libc::close(pipe_fds[0]);
        }

        let exe = match CString::new(cmd.exe.clone()) {
            Ok(s) => s,
            Err(_) => libc::_exit(127),
        };
        let c_args: Vec<CString> =
            std::iter::once(exe.clone()).chain(cmd.args.iter().filter_map(|a| CString::new(a.clone()).ok())).collect();
        let mut argv: Vec<*const c_char> = c_args.iter().map(|s| s.as_ptr()).collect();
        argv.push(ptr::null());

        libc::execvp(exe.as_ptr(), argv.as_ptr());
        // execvp only returns on failure.
        eprintln!("shell: {}: command not found", cmd.exe);
        libc::_exit(127);
    }
}

fn open_redirect(redirect: &Redirect) -> Result<libc::c_int> {
    let path = CString::new(redirect.path.clone())
        .map_err(|_| Error::Redirect { path: redirect.path.clone(), source: std::io::Error::from_raw_os_error(libc::EINVAL) })?;
    let extra_flag = match redirect.mode {
        RedirectMode::Truncate => libc::O_TRUNC,
        RedirectMode::Append => libc::O_APPEND,
    };
    // SAFETY: path is a valid NUL-terminated C string.
    let fd = unsafe { libc::open(path.as_ptr(), libc::O_CREAT | libc::O_WRONLY | extra_flag, 0o644) };
    if fd < 0 {
        return Err(Error::Redirect { path: redirect.path.clone(), source: std::io::Error::last_os_error() });
    }
    Ok(fd)
}

/// Waits for every PID in `pids`, returning the exit status of the
/// highest-indexed one observed to exit normally (i.e. the last child
/// spawned), as the spec's "return code of the last stage" rule requires.
pub fn wait_for_pipeline(pids: &[libc::pid_t]) -> i32 {
    let mut code = 0;
    for (i, &pid) in pids.iter().enumerate() {
        let mut status: libc::c_int = 0;
        // SAFETY: pid was returned by a fork() this process performed and
        // has not been waited on yet.
        let ret = unsafe { libc::waitpid(pid, &mut status, 0) };
        if ret < 0 {
            continue;
        }
        if i + 1 == pids.len() {
            code = exit_code_from_status(status);
        }
    }
    code
}

pub fn exit_code_from_status(status: libc::c_int) -> i32 {
    if libc::WIFEXITED(status) {
        libc::WEXITSTATUS(status)
    } else if libc::WIFSIGNALED(status) {
        128 + libc::WTERMSIG(status)
    } else {
        1
    }
}
