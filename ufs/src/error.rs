// Copyright 2024 The Crate Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use thiserror::Error;

/// Error kinds returned by [`crate::FileSystem`] operations.
///
/// Every public operation resets the filesystem's sticky error (see
/// [`crate::FileSystem::errno`]) to `None` on success and to `Some(kind)` on
/// failure, mirroring the C original's global `errno` while still returning
/// a typed `Result` from every call.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("no such file")]
    NoFile,
    #[error("out of memory or over the size cap")]
    NoMemory,
    #[error("operation not permitted by the descriptor's open mode")]
    NoPermission,
    #[error("invalid argument")]
    InvalidArgument,
}

pub type Result<T> = std::result::Result<T, Error>;
