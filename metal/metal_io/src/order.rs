//! Memory ordering requested by callers of region accesses.

use core::sync::atomic::Ordering;

/// The six C11 memory orders threaded through region reads and writes.
///
/// Rust atomics have no `consume` order and reject release semantics on
/// loads (acquire semantics on stores), so each variant is lowered to the
/// nearest [`Ordering`] valid for the access direction. Orders that make no
/// sense for a direction are strengthened to [`Ordering::SeqCst`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum MemoryOrder {
    Relaxed,
    Consume,
    Acquire,
    Release,
    AcqRel,
    #[default]
    SeqCst,
}

impl MemoryOrder {
    /// All orders, weakest first.
    pub const ALL: [MemoryOrder; 6] = [
        MemoryOrder::Relaxed,
        MemoryOrder::Consume,
        MemoryOrder::Acquire,
        MemoryOrder::Release,
        MemoryOrder::AcqRel,
        MemoryOrder::SeqCst,
    ];

    /// Ordering used for an atomic load.
    pub const fn for_load(self) -> Ordering {
        match self {
            MemoryOrder::Relaxed => Ordering::Relaxed,
            MemoryOrder::Consume | MemoryOrder::Acquire => Ordering::Acquire,
            MemoryOrder::Release | MemoryOrder::AcqRel | MemoryOrder::SeqCst => Ordering::SeqCst,
        }
    }

    /// Ordering used for an atomic store.
    pub const fn for_store(self) -> Ordering {
        match self {
            MemoryOrder::Relaxed => Ordering::Relaxed,
            MemoryOrder::Release => Ordering::Release,
            MemoryOrder::Consume
            | MemoryOrder::Acquire
            | MemoryOrder::AcqRel
            | MemoryOrder::SeqCst => Ordering::SeqCst,
        }
    }
}
