//! Nestable global interrupt masking.
//!
//! Only the outermost `save_disable` reaches the platform, and only the
//! matching outermost `restore_enable` re-enables interrupts. Inner pairs
//! just move the depth counter.

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::sys::{sys_irq_restore_enable, sys_irq_save_disable};

static DISABLE_DEPTH: AtomicUsize = AtomicUsize::new(0);
static SAVED_FLAGS: AtomicUsize = AtomicUsize::new(0);

/// Disables interrupts and returns a token for [`restore_enable`].
///
/// The token is the nesting depth before this call; the platform is only
/// asked to disable interrupts when it is zero.
pub fn save_disable() -> usize {
    let depth = DISABLE_DEPTH.fetch_add(1, Ordering::AcqRel);
    if depth == 0 {
        SAVED_FLAGS.store(sys_irq_save_disable(), Ordering::Release);
    }
    depth
}

/// Leaves one level of [`save_disable`], re-enabling interrupts when the
/// outermost level is left.
///
/// `token` is only reported in diagnostics. Concurrent callers on several
/// cores may leave their sections in any order.
pub fn restore_enable(token: usize) {
    let flags = SAVED_FLAGS.load(Ordering::Acquire);
    let Ok(depth) = DISABLE_DEPTH.fetch_update(Ordering::AcqRel, Ordering::Acquire, |depth| {
        depth.checked_sub(1)
    }) else {
        warn!("restore_enable({token}) without a matching save_disable");
        return;
    };
    if depth == 1 {
        sys_irq_restore_enable(flags);
    }
}

/// Current nesting depth of [`save_disable`].
pub fn disable_depth() -> usize {
    DISABLE_DEPTH.load(Ordering::Acquire)
}

/// RAII guard that keeps interrupts disabled while alive.
#[derive(Debug)]
pub struct IrqSave(usize);

impl IrqSave {
    /// Enter the critical section.
    #[inline]
    pub fn new() -> Self {
        Self(save_disable())
    }
}

impl Default for IrqSave {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IrqSave {
    #[inline]
    fn drop(&mut self) {
        restore_enable(self.0)
    }
}
