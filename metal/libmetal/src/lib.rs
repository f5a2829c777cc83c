// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Entry point of the metal core.
//!
//! [`init`] configures logging and brings up the interrupt table; [`finish`]
//! tears the table down again. The building blocks are re-exported as
//! [`io`] and [`irq`].
//!
//! ```rust,ignore
//! libmetal::init(&libmetal::InitParams::default());
//! // ... register handlers, map regions ...
//! libmetal::finish();
//! ```

#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate log;

use core::str::FromStr;

use log::{LevelFilter, Log};

pub use merrno::{MError, MResult};
pub use metal_io as io;
pub use metal_irq as irq;

/// Parameters of [`init`].
#[derive(Clone, Copy)]
pub struct InitParams {
    /// Logger to install, if the image has not installed one already.
    pub log_handler: Option<&'static dyn Log>,
    /// Maximum level that reaches the logger.
    pub log_level: LevelFilter,
}

impl InitParams {
    /// Level configured at build time through `METAL_LOG_LEVEL`, or `Info`
    /// when that value does not name a level.
    pub fn default_log_level() -> LevelFilter {
        LevelFilter::from_str(mconfig::LOG_LEVEL).unwrap_or(LevelFilter::Info)
    }
}

impl Default for InitParams {
    fn default() -> Self {
        Self {
            log_handler: None,
            log_level: Self::default_log_level(),
        }
    }
}

/// Initializes logging and the interrupt table.
pub fn init(params: &InitParams) {
    if let Some(logger) = params.log_handler {
        if log::set_logger(logger).is_err() {
            warn!("metal: a logger is already installed, keeping it");
        }
    }
    log::set_max_level(params.log_level);
    irq::init();
    info!("metal: initialized, log level {}", params.log_level);
}

/// Tears down the interrupt table.
pub fn finish() {
    irq::deinit();
    info!("metal: finished");
}
