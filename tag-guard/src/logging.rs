// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use env_logger::{Builder, Logger};
use log::{LevelFilter, SetLoggerError};
use std::io::Write;

/// Worker start/stop chatter from the server runtime stays out of the log
/// unless `RUST_LOG` asks for it.
const SERVER_RUNTIME_TARGET: &str = "actix_server";

fn builder(level: LevelFilter) -> Builder {
    let mut builder = Builder::from_default_env();
    builder
        .filter_level(level)
        .filter_module(SERVER_RUNTIME_TARGET, level.min(LevelFilter::Warn))
        .target(env_logger::Target::Stdout)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f UTC"),
                record.level(),
                record.target(),
                record.args()
            )
        });
    builder
}

pub fn build_logger(level: LevelFilter) -> Logger {
    builder(level).build()
}

pub fn init_logger(level: LevelFilter) -> Result<(), SetLoggerError> {
    builder(level).try_init()
}
