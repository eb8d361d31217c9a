// Copyright 2024 The Crate Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use log::debug;
use log::trace;
use sync::Condvar;
use sync::Mutex;

use crate::error::Error;
use crate::error::Result;
use crate::task::PoolTask;
use crate::task::Task;

/// Hard ceiling on a pool's `max_threads`.
pub const TPOOL_MAX_THREADS: usize = 64;
/// Hard ceiling on how many tasks may be queued (not counting the one
/// currently running on each worker) at once.
pub const TPOOL_MAX_TASKS: usize = 4096;

struct State {
    queue: VecDeque<Arc<dyn PoolTask>>,
    task_total: usize,
    threads_created: usize,
    threads_busy: usize,
    shutdown: bool,
}

struct Shared {
    max_threads: usize,
    state: Mutex<State>,
    task_available: Condvar,
    all_idle: Condvar,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

/// A bounded, lazily-scaling worker thread pool.
///
/// Worker threads are spawned on demand, up to `max_threads`, the first
/// time a `push` finds every existing worker busy. `Pool` is intentionally
/// not `Clone`: there is exactly one owner, matching the spec's single
/// `pool_delete` call site.
pub struct Pool {
    shared: Arc<Shared>,
}

impl Pool {
    /// Creates a pool with no worker threads yet.
    pub fn new(max_threads: usize) -> Result<Self> {
        if max_threads == 0 || max_threads > TPOOL_MAX_THREADS {
            return Err(Error::InvalidArgument);
        }
        Ok(Pool {
            shared: Arc::new(Shared {
                max_threads,
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    task_total: 0,
                    threads_created: 0,
                    threads_busy: 0,
                    shutdown: false,
                }),
                task_available: Condvar::new(),
                all_idle: Condvar::new(),
                workers: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Number of worker threads spawned so far (observational; monotonic
    /// until shutdown).
    pub fn thread_count(&self) -> usize {
        self.shared.state.lock().threads_created
    }

    /// Enqueues `task`, spawning a new worker if every existing one is busy
    /// and the pool hasn't hit `max_threads` yet. Exactly one sleeping
    /// worker, if any, is woken.
    pub fn push<A, R>(&self, task: &Task<A, R>) -> Result<()>
    where
        A: Send + Sync + 'static,
        R: Send + 'static,
    {
        let mut state = self.shared.state.lock();
        if state.task_total >= TPOOL_MAX_TASKS {
            return Err(Error::TooManyTasks);
        }

        let runnable = task.as_pool_task();
        runnable.mark_queued()?;

        state.queue.push_back(runnable);
        state.task_total += 1;

        let should_spawn = state.threads_busy >= state.threads_created
            && state.threads_created < self.shared.max_threads;
        if should_spawn {
            state.threads_created += 1;
        }
        drop(state);

        if should_spawn {
            self.spawn_worker();
        }
        self.shared.task_available.notify_one();
        Ok(())
    }

    fn spawn_worker(&self) {
        let shared = self.shared.clone();
        let handle = thread::spawn(move || worker_loop(shared));
        self.shared.workers.lock().push(handle);
        trace!("tpool: spawned worker ({} total)", self.shared.state.lock().threads_created);
    }

    /// Tears the pool down: refuses while any task is queued or running,
    /// otherwise wakes every worker and joins them all.
    pub fn shutdown(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        if state.task_total > 0 || state.threads_busy > 0 {
            return Err(Error::HasTasks);
        }
        state.shutdown = true;
        drop(state);

        self.shared.task_available.notify_all();
        let handles = std::mem::take(&mut *self.shared.workers.lock());
        debug!("tpool: shutting down, joining {} workers", handles.len());
        for handle in handles {
            let _ = handle.join();
        }
        Ok(())
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let mut state = shared.state.lock();
        state = shared
            .task_available
            .wait_while(state, |s| s.queue.is_empty() && !s.shutdown);

        let task = match state.queue.pop_front() {
            Some(task) => task,
            None => {
                debug_assert!(state.shutdown);
                break;
            }
        };
        task.mark_running();
        state.task_total -= 1;
        state.threads_busy += 1;
        drop(state);

        task.execute_and_complete();

        let mut state = shared.state.lock();
        state.threads_busy -= 1;
        if state.task_total == 0 && state.threads_busy == 0 {
            shared.all_idle.notify_all();
        }
        drop(state);
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            // A pool dropped with outstanding work is a lifecycle bug in the
            // caller, not something this crate can paper over: leaking the
            // worker threads would hide it instead of surfacing it.
            panic!("pool dropped with outstanding work: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Barrier;
    use std::time::Duration;

    use super::*;

    #[test]
    fn new_rejects_out_of_range_max_threads() {
        assert_eq!(Pool::new(0).unwrap_err(), Error::InvalidArgument);
        assert!(Pool::new(TPOOL_MAX_THREADS + 1).is_err());
        assert!(Pool::new(1).is_ok());
    }

    #[test]
    fn join_waits_for_completion_and_returns_result() {
        let pool = Pool::new(2).unwrap();
        let task = Task::new(20, |x: &i32| x * 2);
        pool.push(&task).unwrap();
        assert_eq!(task.join().unwrap(), 40);
        pool.shutdown().unwrap();
    }

    #[test]
    fn lazy_growth_spawns_at_most_cap_workers() {
        let pool = Pool::new(3).unwrap();
        let barrier = Arc::new(Barrier::new(4));
        let tasks: Vec<_> = (0..5)
            .map(|i| {
                let barrier = barrier.clone();
                Task::new(i, move |_: &i32| {
                    if barrier.wait().is_leader() {}
                    i
                })
            })
            .collect();

        // Push enough tasks to saturate the cap, but don't let any of them
        // finish yet (the 4th barrier party is never met because only 3
        // workers exist), so we can observe growth without racing shutdown.
        for t in tasks.iter().take(3) {
            pool.push(t).unwrap();
        }
        // Give the pool a moment to actually spawn workers and have them
        // block on the barrier.
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(pool.thread_count(), 3);

        for t in &tasks[..3] {
            barrier.wait();
        }
        for t in tasks.iter().take(3) {
            t.join().unwrap();
        }
        pool.shutdown().unwrap();
    }

    #[test]
    fn fifo_dispatch_with_single_worker() {
        let pool = Pool::new(1).unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut tasks = Vec::new();
        for i in 0..5 {
            let order = order.clone();
            let task = Task::new(i, move |i: &i32| {
                order.lock().push(*i);
                *i
            });
            pool.push(&task).unwrap();
            tasks.push(task);
        }
        for t in &tasks {
            t.join().unwrap();
        }
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
        pool.shutdown().unwrap();
    }

    #[test]
    fn shutdown_refuses_with_outstanding_tasks() {
        let pool = Pool::new(1).unwrap();
        let started = Arc::new(AtomicUsize::new(0));
        let release = Arc::new(Barrier::new(2));
        let s = started.clone();
        let r = release.clone();
        let task = Task::new((), move |_| {
            s.fetch_add(1, Ordering::SeqCst);
            r.wait();
        });
        pool.push(&task).unwrap();
        while started.load(Ordering::SeqCst) == 0 {
            std::thread::yield_now();
        }
        assert_eq!(pool.shutdown().unwrap_err(), Error::HasTasks);
        release.wait();
        task.join().unwrap();
        pool.shutdown().unwrap();
    }

    #[test]
    fn task_delete_refuses_while_queued_or_running() {
        let pool = Pool::new(1).unwrap();
        let barrier = Arc::new(Barrier::new(2));
        let b = barrier.clone();
        let task = Task::new((), move |_| b.wait());
        pool.push(&task).unwrap();
        let task_clone = task.clone();
        assert_eq!(task_clone.delete().unwrap_err(), Error::TaskInPool);
        barrier.wait();
        task.join().unwrap();
        pool.shutdown().unwrap();
    }

    #[test]
    fn join_on_unpushed_task_fails() {
        let task: Task<(), ()> = Task::new((), |_| ());
        assert_eq!(task.join().unwrap_err(), Error::TaskNotPushed);
    }

    #[test]
    fn task_can_be_rerun_after_join() {
        let pool = Pool::new(1).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let task = Task::new((), move |_| c.fetch_add(1, Ordering::SeqCst));
        pool.push(&task).unwrap();
        task.join().unwrap();
        pool.push(&task).unwrap();
        task.join().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        pool.shutdown().unwrap();
    }

    #[test]
    fn timed_join_and_detach_are_stubs() {
        let task: Task<(), ()> = Task::new((), |_| ());
        assert_eq!(task.timed_join(Duration::from_millis(1)).unwrap_err(), Error::NotImplemented);
        assert_eq!(task.detach().unwrap_err(), Error::NotImplemented);
    }
}
