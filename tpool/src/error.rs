// Copyright 2024 The Crate Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("invalid argument")]
    InvalidArgument,
    #[error("task queue is at capacity")]
    TooManyTasks,
    #[error("pool has outstanding or running tasks")]
    HasTasks,
    #[error("task is already queued or running")]
    TaskInPool,
    #[error("task was never pushed to a pool")]
    TaskNotPushed,
    #[error("operation not implemented")]
    NotImplemented,
}

pub type Result<T> = std::result::Result<T, Error>;
