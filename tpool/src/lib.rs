// Copyright 2024 The Crate Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! A bounded, lazily-growing worker thread pool.
//!
//! Workers are spawned on demand as tasks are pushed, up to a fixed cap, and
//! never shrink back down; tearing down a pool with outstanding tasks is a
//! programming error, reported through [`Error::HasTasks`] and, if ignored,
//! a panic from `Pool`'s `Drop` impl.

mod error;
mod pool;
mod task;

pub use error::Error;
pub use error::Result;
pub use pool::Pool;
pub use pool::TPOOL_MAX_TASKS;
pub use pool::TPOOL_MAX_THREADS;
pub use task::Task;
pub use task::TaskState;
