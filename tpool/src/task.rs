// Copyright 2024 The Crate Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::sync::Arc;

use sync::Condvar;
use sync::Mutex;

use crate::error::Error;
use crate::error::Result;

/// A task's lifecycle state. See the crate-level docs for the full
/// transition diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    New,
    Queued,
    Running,
    Done,
}

/// Anything a [`crate::Pool`] can dispatch, independent of the task's
/// argument/result types. The pool's queue stores `Arc<dyn PoolTask>` so a
/// single pool can mix tasks of different signatures.
pub(crate) trait PoolTask: Send + Sync {
    /// Transitions `New`/`Done` -> `Queued`. Called by `push` while holding
    /// the pool lock, before the task is enqueued.
    fn mark_queued(&self) -> Result<()>;

    /// Transitions `Queued` -> `Running`. Called by a worker immediately
    /// after popping the task off the queue, still holding the pool lock.
    fn mark_running(&self);

    /// Runs the user function and transitions `Running` -> `Done`, waking
    /// any joiners. Called by a worker *after* releasing the pool lock.
    fn execute_and_complete(&self);
}

struct TaskInner<A, R> {
    func: Box<dyn Fn(&A) -> R + Send + Sync>,
    arg: A,
    state: Mutex<TaskState>,
    result: Mutex<Option<R>>,
    done: Condvar,
}

/// A unit of work: a function, an argument, and a result slot, shared by
/// `Arc` so the same task can be observed from the pool's queue, from a
/// worker thread, and from the caller holding the original `Task` value.
pub struct Task<A, R> {
    inner: Arc<TaskInner<A, R>>,
}

impl<A, R> Clone for Task<A, R> {
    fn clone(&self) -> Self {
        Task { inner: self.inner.clone() }
    }
}

impl<A, R> Task<A, R>
where
    A: Send + Sync + 'static,
    R: Send + 'static,
{
    /// Creates a task in state `NEW`. `func` is invoked with a reference to
    /// `arg` every time the task runs, which is what makes a task re-runnable
    /// after it has been joined and pushed again.
    pub fn new(arg: A, func: impl Fn(&A) -> R + Send + Sync + 'static) -> Self {
        Task {
            inner: Arc::new(TaskInner {
                func: Box::new(func),
                arg,
                state: Mutex::new(TaskState::New),
                result: Mutex::new(None),
                done: Condvar::new(),
            }),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(*self.inner.state.lock(), TaskState::Done)
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.inner.state.lock(), TaskState::Running)
    }

    /// Blocks until the task reaches `DONE` and returns its result. Fails
    /// with [`Error::TaskNotPushed`] if the task has never been pushed.
    /// After a successful join the task is eligible to be pushed again.
    pub fn join(&self) -> Result<R> {
        let state = self.inner.state.lock();
        if matches!(*state, TaskState::New) {
            return Err(Error::TaskNotPushed);
        }
        let state = self.inner.done.wait_while(state, |s| !matches!(s, TaskState::Done));
        drop(state);
        Ok(self.inner.result.lock().take().expect("DONE task always has a result"))
    }

    /// Consumes the task, failing with [`Error::TaskInPool`] if it is
    /// currently queued or running.
    pub fn delete(self) -> Result<()> {
        match *self.inner.state.lock() {
            TaskState::Queued | TaskState::Running => Err(Error::TaskInPool),
            TaskState::New | TaskState::Done => Ok(()),
        }
    }

    /// Not implemented; the spec allows exposing this as stub surface rather
    /// than omitting it.
    pub fn timed_join(&self, _timeout: std::time::Duration) -> Result<R> {
        Err(Error::NotImplemented)
    }

    /// Not implemented; the spec allows exposing this as stub surface rather
    /// than omitting it.
    pub fn detach(self) -> Result<()> {
        Err(Error::NotImplemented)
    }

    pub(crate) fn as_pool_task(&self) -> Arc<dyn PoolTask> {
        self.inner.clone() as Arc<dyn PoolTask>
    }
}

impl<A, R> PoolTask for TaskInner<A, R>
where
    A: Send + Sync,
    R: Send,
{
    fn mark_queued(&self) -> Result<()> {
        let mut state = self.state.lock();
        match *state {
            TaskState::New | TaskState::Done => {
                *state = TaskState::Queued;
                Ok(())
            }
            TaskState::Queued | TaskState::Running => Err(Error::TaskInPool),
        }
    }

    fn mark_running(&self) {
        *self.state.lock() = TaskState::Running;
    }

    fn execute_and_complete(&self) {
        let result = (self.func)(&self.arg);
        *self.result.lock() = Some(result);
        *self.state.lock() = TaskState::Done;
        self.done.notify_all();
    }
}
