// Copyright 2024 The Crate Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Tracks background child PIDs for opportunistic, then final blocking,
//! reaping.

use log::debug;
use log::trace;

/// A growable registry of background child PIDs, reaped opportunistically
/// between command lines and exhaustively at shell exit.
#[derive(Default)]
pub struct BackgroundRegistry {
    pids: Vec<libc::pid_t>,
}

impl BackgroundRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, pid: libc::pid_t) {
        trace!("shell: tracking background pid {pid}");
        self.pids.push(pid);
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    /// Non-blocking sweep: reaps any children that have already exited,
    /// compacting the registry in place.
    pub fn reap_nonblocking(&mut self) {
        self.pids.retain(|&pid| {
            let mut status: libc::c_int = 0;
            // SAFETY: pid is a child this process forked and has not yet
            // been waited on (retained entries only).
            let ret = unsafe { libc::waitpid(pid, &mut status, libc::WNOHANG) };
            if ret == 0 {
                true
            } else {
                if ret > 0 {
                    debug!("shell: reaped background pid {pid}");
                }
                false
            }
        });
    }

    /// Blocking sweep over every still-tracked PID, used once at shell exit
    /// so no background child outlives the shell unreaped.
    pub fn reap_all_blocking(&mut self) {
        for pid in self.pids.drain(..) {
            let mut status: libc::c_int = 0;
            // SAFETY: pid is a child this process forked and has not yet
            // been waited on.
            unsafe { libc::waitpid(pid, &mut status, 0) };
            debug!("shell: reaped background pid {pid} at exit");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_registry_reaps_are_no_ops() {
        let mut reg = BackgroundRegistry::new();
        reg.reap_nonblocking();
        reg.reap_all_blocking();
        assert!(reg.is_empty());
    }

    #[test]
    fn track_increases_len() {
        let mut reg = BackgroundRegistry::new();
        reg.track(1234);
        assert_eq!(reg.len(), 1);
    }
}
