// Copyright 2024 The Crate Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! An in-memory, POSIX-like user-space file system: per-file block chains,
//! a file descriptor table with open/close reference counting, and
//! deferred deletion of files that are still held open.
//!
//! Everything lives behind one [`FileSystem`] value rather than process-wide
//! globals; the crate does no locking of its own; a caller that needs to
//! share a `FileSystem` across threads wraps it (e.g. in `sync::Mutex`).

mod block;
mod descriptor;
mod error;
mod file;
mod fs;

pub use block::BLOCK_SIZE;
pub use descriptor::OpenFlags;
pub use error::Error;
pub use error::Result;
pub use file::MAX_FILE_SIZE;
pub use fs::FileSystem;
pub use fs::Metadata;
pub use fs::WriteOutcome;
