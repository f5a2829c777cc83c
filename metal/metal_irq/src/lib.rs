// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Interrupt registration and dispatch.
//!
//! The crate keeps one process-wide [`IrqTable`]: for every vector an
//! ordered list of `(handler, driver id)` registrations. The platform's trap
//! vector calls [`isr`], which runs every handler of the fired vector in
//! registration order.
//!
//! # Platform glue
//!
//! The interrupt controller is reached through [`SysIrqIf`], which the
//! platform implements once with `#[crate_interface::impl_interface]`.
//!
//! # Concurrency
//!
//! - [`register`] and its variants serialize on the table mutex, and write
//!   the slots inside a [`save_disable`]/[`restore_enable`] section.
//! - [`isr`] never blocks and never takes the mutex. It relies on occupied
//!   slots always being a contiguous prefix of the vector's slots.
//! - [`save_disable`] nests: only the outermost call disables interrupts at
//!   the platform and only the matching outermost [`restore_enable`]
//!   enables them again.
//!
//! # Usage
//!
//! ```rust,ignore
//! use metal_irq::{DriverId, IrqStatus};
//!
//! fn uart_irq(vector: usize, id: DriverId) -> IrqStatus {
//!     let uart = unsafe { &*(id.as_usize() as *const Uart) };
//!     uart.ack();
//!     IrqStatus::Handled
//! }
//!
//! metal_irq::init();
//! let id = DriverId::from_ptr(&UART).unwrap();
//! metal_irq::register(33, Some(uart_irq), 0, Some(id))?;
//! metal_irq::enable(33);
//! ```

#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate log;

mod critical;
mod sys;
mod table;

#[cfg(test)]
mod tests;

pub use mconfig::{MAX_IRQ_HANDLERS, MAX_IRQS};
use merrno::MResult;

pub use self::{
    critical::{IrqSave, disable_depth, restore_enable, save_disable},
    sys::SysIrqIf,
    table::{DriverId, IrqHandler, IrqStatus, IrqTable},
};

static IRQ_TABLE: IrqTable = IrqTable::new();

/// Initializes the interrupt table. Every vector starts empty.
pub fn init() {
    IRQ_TABLE.clear();
    info!("IRQ: table initialized ({MAX_IRQS} vectors, {MAX_IRQ_HANDLERS} handlers each)");
}

/// Drops every registration.
pub fn deinit() {
    IRQ_TABLE.clear();
    debug!("IRQ: table torn down");
}

/// Registers or removes handlers; see [`IrqTable::register`].
pub fn register(
    vector: usize,
    handler: Option<IrqHandler>,
    dev: usize,
    drv_id: Option<DriverId>,
) -> MResult {
    IRQ_TABLE.register(vector, handler, dev, drv_id)
}

/// Removes the registration of `id` from `vector`.
pub fn unregister(vector: usize, id: DriverId) -> MResult {
    IRQ_TABLE.unregister(vector, id)
}

/// Removes every registration of `vector`.
pub fn unregister_all(vector: usize) -> MResult {
    IRQ_TABLE.unregister_all(vector)
}

/// Interrupt service entry, called by the platform trap handler.
///
/// Returns the number of handlers that were run.
pub fn isr(vector: usize) -> usize {
    IRQ_TABLE.dispatch(vector)
}

/// Number of handlers registered on `vector`.
pub fn handler_count(vector: usize) -> usize {
    IRQ_TABLE.handler_count(vector)
}

/// Ids of the handlers registered on `vector`, in dispatch order.
pub fn driver_ids(vector: usize) -> heapless::Vec<DriverId, MAX_IRQ_HANDLERS> {
    IRQ_TABLE
        .registrations(vector)
        .into_iter()
        .map(|(id, _dev)| id)
        .collect()
}

/// Unmasks `vector` at the interrupt controller.
pub fn enable(vector: usize) {
    sys::sys_irq_enable(vector)
}

/// Masks `vector` at the interrupt controller.
pub fn disable(vector: usize) {
    sys::sys_irq_disable(vector)
}
