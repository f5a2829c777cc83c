//! The I/O region type and its translation helpers.

use core::{
    fmt,
    sync::atomic::{AtomicU8, AtomicU16, AtomicU32},
};

use merrno::MResult;

use crate::{BAD_PHYS, MemFlags, MemoryOrder, PhysAddr};

/// Device-specific behaviour for an [`IoRegion`].
///
/// Every method defaults to the plain atomic access on the mapped memory,
/// so an implementation overrides only the accesses that have side effects
/// on its device (a FIFO whose "read" pops an entry, for instance).
pub trait IoOps: Sync {
    /// Reads `width` bytes at `offset`.
    fn read(&self, io: &IoRegion<'_>, offset: usize, order: MemoryOrder, width: usize) -> u64 {
        io.read_direct(offset, order, width)
    }

    /// Writes the low `width` bytes of `value` at `offset`.
    fn write(
        &self,
        io: &IoRegion<'_>,
        offset: usize,
        value: u64,
        order: MemoryOrder,
        width: usize,
    ) {
        io.write_direct(offset, value, order, width)
    }

    /// Copies bytes starting at `offset` into `dst`.
    fn block_read(&self, io: &IoRegion<'_>, offset: usize, dst: &mut [u8]) -> MResult<usize> {
        io.block_read_direct(offset, dst)
    }

    /// Copies `src` into the region starting at `offset`.
    fn block_write(&self, io: &IoRegion<'_>, offset: usize, src: &[u8]) -> MResult<usize> {
        io.block_write_direct(offset, src)
    }

    /// Fills `len` bytes starting at `offset` with `value`.
    fn block_set(&self, io: &IoRegion<'_>, offset: usize, value: u8, len: usize) -> MResult<usize> {
        io.block_set_direct(offset, value, len)
    }

    /// Called once by [`IoRegion::finish`].
    fn close(&self, _io: &IoRegion<'_>) {}
}

/// One contiguous mapped window of device registers or shared memory.
///
/// The region borrows its physical page map and its optional [`IoOps`]; the
/// mapping behind `virt` is owned by whoever created it. Region metadata is
/// immutable after construction, while the memory behind it is accessed
/// concurrently through atomics with caller-chosen ordering.
pub struct IoRegion<'a> {
    virt: *mut u8,
    physmap: Option<&'a [PhysAddr]>,
    size: usize,
    page_shift: u32,
    page_mask: usize,
    mem_flags: MemFlags,
    ops: Option<&'a dyn IoOps>,
}

// SAFETY: the mapped memory is only touched through atomic loads and stores,
// and all other fields are read-only after construction.
unsafe impl Send for IoRegion<'_> {}
unsafe impl Sync for IoRegion<'_> {}

impl<'a> IoRegion<'a> {
    /// Creates a region over `size` bytes mapped at `virt`.
    ///
    /// `physmap` holds one physical address per page of `1 << page_shift`
    /// bytes; pass [`crate::SINGLE_PAGE`] as `page_shift` for a window that
    /// is physically contiguous, in which case `physmap[0]` is its base.
    /// Entries equal to [`BAD_PHYS`] mark pages without a physical address.
    ///
    /// # Safety
    ///
    /// Unless `ops` overrides every access, `virt..virt + size` must stay
    /// mapped and valid for atomic reads and writes for as long as the region
    /// is used.
    pub unsafe fn new(
        virt: *mut u8,
        physmap: Option<&'a [PhysAddr]>,
        size: usize,
        page_shift: u32,
        mem_flags: MemFlags,
        ops: Option<&'a dyn IoOps>,
    ) -> Self {
        let page_mask = if page_shift >= usize::BITS {
            usize::MAX
        } else {
            (1usize << page_shift) - 1
        };
        Self {
            virt,
            physmap,
            size,
            page_shift,
            page_mask,
            mem_flags,
            ops,
        }
    }

    /// Tears the region down, running the `close` hook of its ops.
    pub fn finish(self) {
        if let Some(ops) = self.ops {
            ops.close(&self);
        }
    }

    /// Base of the mapped window.
    pub fn virt_base(&self) -> *mut u8 {
        self.virt
    }

    /// Size of the window in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn page_shift(&self) -> u32 {
        self.page_shift
    }

    pub fn page_mask(&self) -> usize {
        self.page_mask
    }

    pub fn mem_flags(&self) -> MemFlags {
        self.mem_flags
    }

    pub fn physmap(&self) -> Option<&'a [PhysAddr]> {
        self.physmap
    }

    pub(crate) fn ops(&self) -> Option<&'a dyn IoOps> {
        self.ops
    }

    fn is_single_page(&self) -> bool {
        self.page_mask == usize::MAX
    }

    /// Returns the virtual address of `offset`.
    ///
    /// `offset == size` is accepted and yields the one-past-the-end address.
    pub fn virt(&self, offset: usize) -> Option<*mut u8> {
        if self.virt.is_null() || offset > self.size {
            return None;
        }
        Some(self.virt.wrapping_add(offset))
    }

    /// Converts a virtual address inside the window back to an offset.
    pub fn virt_to_offset(&self, virt: *const u8) -> Option<usize> {
        if self.virt.is_null() {
            return None;
        }
        let offset = (virt as usize).wrapping_sub(self.virt as usize);
        (offset < self.size).then_some(offset)
    }

    /// Returns the physical address backing `offset`.
    pub fn phys(&self, offset: usize) -> Option<PhysAddr> {
        let map = self.physmap?;
        if offset > self.size {
            return None;
        }
        let page = offset.checked_shr(self.page_shift).unwrap_or(0);
        match map.get(page) {
            Some(&base) if base != BAD_PHYS => Some(base + (offset & self.page_mask)),
            _ => None,
        }
    }

    /// Converts a physical address to an offset into the window.
    ///
    /// Multi-page regions are searched one page at a time, so the cost grows
    /// with the page count.
    pub fn phys_to_offset(&self, phys: PhysAddr) -> Option<usize> {
        let map = self.physmap?;
        if self.is_single_page() {
            let base = *map.first()?;
            if base == BAD_PHYS {
                return None;
            }
            return phys.checked_sub(base).filter(|&offset| offset <= self.size);
        }

        let mut offset = phys & self.page_mask;
        while offset <= self.size {
            if self.phys(offset) == Some(phys) {
                return Some(offset);
            }
            offset = offset.checked_add(self.page_mask + 1)?;
        }
        None
    }

    /// Translates a physical address to its virtual address in the window.
    pub fn phys_to_virt(&self, phys: PhysAddr) -> Option<*mut u8> {
        self.phys_to_offset(phys).and_then(|offset| self.virt(offset))
    }

    /// Translates a virtual address in the window to its physical address.
    pub fn virt_to_phys(&self, virt: *const u8) -> Option<PhysAddr> {
        self.virt_to_offset(virt).and_then(|offset| self.phys(offset))
    }

    /// Reads `width` (1, 2, 4 or 8) bytes at `offset`.
    ///
    /// Delegates to the region's [`IoOps`] when present.
    ///
    /// # Panics
    ///
    /// Without ops, panics on an unsupported width, an access that does not
    /// fit in the window, or a misaligned offset.
    pub fn read(&self, offset: usize, order: MemoryOrder, width: usize) -> u64 {
        match self.ops {
            Some(ops) => ops.read(self, offset, order, width),
            None => self.read_direct(offset, order, width),
        }
    }

    /// Writes the low `width` bytes of `value` at `offset`.
    ///
    /// Delegates to the region's [`IoOps`] when present.
    ///
    /// # Panics
    ///
    /// Same conditions as [`IoRegion::read`].
    pub fn write(&self, offset: usize, value: u64, order: MemoryOrder, width: usize) {
        match self.ops {
            Some(ops) => ops.write(self, offset, value, order, width),
            None => self.write_direct(offset, value, order, width),
        }
    }

    fn access_ptr(&self, offset: usize, width: usize) -> *mut u8 {
        assert!(
            matches!(width, 1 | 2 | 4 | 8),
            "unsupported I/O access width {width}"
        );
        let ptr = self
            .virt(offset)
            .unwrap_or_else(|| panic!("I/O offset {offset:#x} outside region of {:#x}", self.size));
        assert!(
            offset.checked_add(width).is_some_and(|end| end <= self.size),
            "I/O access of {width} bytes at {offset:#x} crosses region end {:#x}",
            self.size
        );
        assert!(
            (ptr as usize) % width == 0,
            "misaligned I/O access of {width} bytes at {offset:#x}"
        );
        ptr
    }

    /// Atomic load at `offset`, bypassing any [`IoOps`].
    pub fn read_direct(&self, offset: usize, order: MemoryOrder, width: usize) -> u64 {
        let ptr = self.access_ptr(offset, width);
        let order = order.for_load();
        // SAFETY: `access_ptr` checked bounds and alignment; `new` requires the
        // window to be valid for atomic access.
        unsafe {
            match width {
                1 => AtomicU8::from_ptr(ptr).load(order) as u64,
                2 => AtomicU16::from_ptr(ptr.cast()).load(order) as u64,
                4 => AtomicU32::from_ptr(ptr.cast()).load(order) as u64,
                _ => load64(ptr, order),
            }
        }
    }

    /// Atomic store at `offset`, bypassing any [`IoOps`].
    pub fn write_direct(&self, offset: usize, value: u64, order: MemoryOrder, width: usize) {
        let ptr = self.access_ptr(offset, width);
        let order = order.for_store();
        // SAFETY: see `read_direct`.
        unsafe {
            match width {
                1 => AtomicU8::from_ptr(ptr).store(value as u8, order),
                2 => AtomicU16::from_ptr(ptr.cast()).store(value as u16, order),
                4 => AtomicU32::from_ptr(ptr.cast()).store(value as u32, order),
                _ => store64(ptr, value, order),
            }
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_has_atomic = "64")] {
        use core::sync::atomic::{AtomicU64, Ordering};

        unsafe fn load64(ptr: *mut u8, order: Ordering) -> u64 {
            unsafe { AtomicU64::from_ptr(ptr.cast()).load(order) }
        }

        unsafe fn store64(ptr: *mut u8, value: u64, order: Ordering) {
            unsafe { AtomicU64::from_ptr(ptr.cast()).store(value, order) }
        }
    } else {
        use core::sync::atomic::Ordering;

        unsafe fn load64(_ptr: *mut u8, _order: Ordering) -> u64 {
            panic!("64-bit atomic I/O is not available on this target")
        }

        unsafe fn store64(_ptr: *mut u8, _value: u64, _order: Ordering) {
            panic!("64-bit atomic I/O is not available on this target")
        }
    }
}

macro_rules! width_accessors {
    ($($ty:ty, $width:literal, $read:ident, $read_explicit:ident, $write:ident, $write_explicit:ident;)*) => {
        impl IoRegion<'_> {
            $(
                #[doc = concat!("Reads a `", stringify!($ty), "` at `offset` with sequentially consistent ordering.")]
                #[inline]
                pub fn $read(&self, offset: usize) -> $ty {
                    self.read(offset, MemoryOrder::SeqCst, $width) as $ty
                }

                #[doc = concat!("Reads a `", stringify!($ty), "` at `offset` with the given ordering.")]
                #[inline]
                pub fn $read_explicit(&self, offset: usize, order: MemoryOrder) -> $ty {
                    self.read(offset, order, $width) as $ty
                }

                #[doc = concat!("Writes a `", stringify!($ty), "` at `offset` with sequentially consistent ordering.")]
                #[inline]
                pub fn $write(&self, offset: usize, value: $ty) {
                    self.write(offset, value as u64, MemoryOrder::SeqCst, $width)
                }

                #[doc = concat!("Writes a `", stringify!($ty), "` at `offset` with the given ordering.")]
                #[inline]
                pub fn $write_explicit(&self, offset: usize, value: $ty, order: MemoryOrder) {
                    self.write(offset, value as u64, order, $width)
                }
            )*
        }
    };
}

width_accessors! {
    u8, 1, read8, read8_explicit, write8, write8_explicit;
    u16, 2, read16, read16_explicit, write16, write16_explicit;
    u32, 4, read32, read32_explicit, write32, write32_explicit;
    u64, 8, read64, read64_explicit, write64, write64_explicit;
}

impl fmt::Debug for IoRegion<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoRegion")
            .field("virt", &self.virt)
            .field("size", &format_args!("{:#x}", self.size))
            .field("page_shift", &self.page_shift)
            .field("mem_flags", &self.mem_flags)
            .field("pages", &self.physmap.map(<[PhysAddr]>::len))
            .field("ops", &self.ops.is_some())
            .finish()
    }
}
