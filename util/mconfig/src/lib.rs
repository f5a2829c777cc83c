// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Compile-time configuration of the metal core.
//!
//! Values come from the environment at build time:
//!
//! - `METAL_MAX_IRQS`: number of interrupt vectors (default 128).
//! - `METAL_MAX_IRQ_HANDLERS`: handler slots per vector (default 8).
//! - `METAL_LOG_LEVEL`: default log filter (default `info`).
#![no_std]

include!(env!("CONFIG_RS_PATH"));
