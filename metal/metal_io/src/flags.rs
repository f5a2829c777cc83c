//! Descriptive attributes of a mapped window.

use bitflags::bitflags;

bitflags! {
    /// Cache policy and memory type of an I/O region.
    ///
    /// These bits are informational: the region records them for callers
    /// and never changes its own behaviour based on them.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
    pub struct MemFlags: u32 {
        /// Write-back cacheable.
        const CACHE_WB = 1 << 0;
        /// Write-through cacheable.
        const CACHE_WT = 1 << 1;
        /// Cache policy not known to the mapper.
        const CACHE_UNKNOWN = Self::CACHE_WB.bits() | Self::CACHE_WT.bits();
        /// Normal memory-mapped window.
        const MEM_MAPPED = 1 << 4;
        /// Port/IO-mapped window.
        const IO_MAPPED = 1 << 5;
        /// Memory shared with another processor.
        const SHARED = 1 << 6;
    }
}

/// Decoded cache bits of [`MemFlags`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CachePolicy {
    Uncached,
    WriteBack,
    WriteThrough,
    Unknown,
}

impl MemFlags {
    /// Flags for an uncached device register window.
    pub const DEVICE: Self = Self::MEM_MAPPED;

    /// Returns the cache policy encoded in the low bits.
    pub const fn cache_policy(self) -> CachePolicy {
        match (self.contains(Self::CACHE_WB), self.contains(Self::CACHE_WT)) {
            (false, false) => CachePolicy::Uncached,
            (true, false) => CachePolicy::WriteBack,
            (false, true) => CachePolicy::WriteThrough,
            (true, true) => CachePolicy::Unknown,
        }
    }
}
