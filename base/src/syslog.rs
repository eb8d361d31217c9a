// Copyright 2024 The Crate Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Process-wide logging initialization.
//!
//! The subsystems in this workspace don't specify *what* gets logged (the
//! spec they implement explicitly leaves free-text diagnostics out of
//! scope), only that they log through the usual `log` facade at the right
//! call sites. This module just wires that facade up once per process, the
//! way a `main()` does it before touching any subsystem.

use std::io::Write;

use chrono::Local;
use log::LevelFilter;
use once_cell::sync::OnceCell;

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Configuration for [`init_with`].
pub struct LogConfig<'a> {
    /// Name prefixed to every line, mirroring a syslog tag.
    pub proc_name: &'a str,
    /// Default level filter used when `RUST_LOG` is unset.
    pub filter: LevelFilter,
}

impl Default for LogConfig<'_> {
    fn default() -> Self {
        LogConfig {
            proc_name: env!("CARGO_PKG_NAME"),
            filter: LevelFilter::Info,
        }
    }
}

/// Initializes logging with the default configuration. Safe to call more
/// than once; only the first call takes effect.
pub fn init() {
    init_with(LogConfig::default())
}

/// Initializes logging with an explicit configuration. Safe to call more
/// than once; only the first call takes effect.
pub fn init_with(config: LogConfig) {
    // `env_logger` panics if installed twice, and several of our binaries /
    // test harnesses may race to initialize it; guard with a `OnceCell`
    // instead of letting the second caller crash the process.
    let _ = INITIALIZED.get_or_init(|| {
        let proc_name = config.proc_name.to_string();
        let mut builder = env_logger::Builder::new();
        builder
            .filter_level(config.filter)
            .parse_env("RUST_LOG")
            .format(move |buf, record| {
                writeln!(
                    buf,
                    "{} {} [{}] {}: {}",
                    Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                    proc_name,
                    record.level(),
                    record.target(),
                    record.args()
                )
            });
        builder.init();
    });
}
