// Copyright 2024 The Crate Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Shared plumbing used by every crate in this workspace: process-wide
//! logging init, following the same init-once-from-main pattern the rest of
//! the stack uses.

pub mod syslog;

pub use syslog::init;
pub use syslog::init_with;
pub use syslog::LogConfig;

pub use log::debug;
pub use log::error;
pub use log::info;
pub use log::trace;
pub use log::warn;
