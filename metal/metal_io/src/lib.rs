// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Mapped I/O regions.
//!
//! An [`IoRegion`] describes one window of device registers or shared memory
//! and offers:
//!
//! - width-typed atomic reads and writes with a caller-chosen
//!   [`MemoryOrder`] ([`IoRegion::read`], [`IoRegion::write32`], ...);
//! - bulk copies ([`IoRegion::block_read`], [`IoRegion::block_write`],
//!   [`IoRegion::block_set`]);
//! - translation between offsets, virtual addresses and physical addresses
//!   through a per-page physical map.
//!
//! A region can carry an [`IoOps`] implementation, which takes over the
//! accesses it overrides. Callers use the same API either way.
//!
//! ```rust,ignore
//! use metal_io::{IoRegion, MemFlags, MemoryOrder};
//!
//! let regs = unsafe { IoRegion::new(base, Some(&pages), 0x1000, 12, MemFlags::DEVICE, None) };
//! regs.write32(0x10, 1);
//! while regs.read32_explicit(0x14, MemoryOrder::Acquire) & 1 == 0 {}
//! ```

#![cfg_attr(not(test), no_std)]

mod block;
mod flags;
mod order;
mod region;


pub use flags::{CachePolicy, MemFlags};
pub use order::MemoryOrder;
pub use region::{IoOps, IoRegion};

/// A physical address.
pub type PhysAddr = usize;

/// Physical map entry for a page with no physical backing.
pub const BAD_PHYS: PhysAddr = usize::MAX;

/// `page_shift` value describing a physically contiguous region.
pub const SINGLE_PAGE: u32 = u32::MAX;
