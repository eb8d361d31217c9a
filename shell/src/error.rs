// Copyright 2024 The Crate Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to create pipe: {0}")]
    Pipe(std::io::Error),
    #[error("fork failed: {0}")]
    Fork(std::io::Error),
    #[error("failed to exec {exe}: {source}")]
    Exec { exe: String, source: std::io::Error },
    #[error("failed to open redirect target {path}: {source}")]
    Redirect { path: String, source: std::io::Error },
    #[error("bad arguments to builtin {0}")]
    BadBuiltinArgs(String),
}

pub type Result<T> = std::result::Result<T, Error>;
