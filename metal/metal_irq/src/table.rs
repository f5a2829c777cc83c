//! Per-vector handler slots.

use core::{
    fmt,
    num::NonZeroUsize,
    sync::atomic::{AtomicUsize, Ordering},
};

use mconfig::{MAX_IRQ_HANDLERS, MAX_IRQS};
use merrno::{MResult, ensure, m_bail, m_err};

use crate::critical::IrqSave;

/// Result of an interrupt handler.
#[repr(usize)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IrqStatus {
    /// The interrupt was not raised by this handler's device.
    NotHandled = 0,
    /// The handler serviced the interrupt.
    Handled = 1,
}

/// Key that identifies one registration on a vector.
///
/// Usually the address of the driver's device state. It is never zero.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DriverId(NonZeroUsize);

impl DriverId {
    /// Returns `None` for zero.
    pub const fn new(raw: usize) -> Option<Self> {
        match NonZeroUsize::new(raw) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// Uses the address of `ptr` as the id.
    pub fn from_ptr<T>(ptr: *const T) -> Option<Self> {
        Self::new(ptr as usize)
    }

    pub const fn as_usize(self) -> usize {
        self.0.get()
    }
}

impl fmt::Debug for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DriverId({:#x})", self.0)
    }
}

/// Interrupt handler, called with the vector number and the id it was
/// registered under.
pub type IrqHandler = fn(usize, DriverId) -> IrqStatus;

/// One (handler, driver id) pair. A zero `drv_id` marks the slot free.
pub(crate) struct Slot {
    pub(crate) handler: AtomicUsize,
    pub(crate) drv_id: AtomicUsize,
    pub(crate) dev: AtomicUsize,
}

impl Slot {
    const EMPTY: Self = Self {
        handler: AtomicUsize::new(0),
        drv_id: AtomicUsize::new(0),
        dev: AtomicUsize::new(0),
    };

    fn id(&self) -> usize {
        self.drv_id.load(Ordering::Acquire)
    }

    fn occupy(&self, handler: IrqHandler, dev: usize, id: usize) {
        self.handler.store(handler as usize, Ordering::Relaxed);
        self.dev.store(dev, Ordering::Relaxed);
        self.drv_id.store(id, Ordering::Release);
    }

    fn copy_from(&self, other: &Slot) {
        self.handler
            .store(other.handler.load(Ordering::Relaxed), Ordering::Relaxed);
        self.dev.store(other.dev.load(Ordering::Relaxed), Ordering::Relaxed);
        self.drv_id.store(other.id(), Ordering::Release);
    }

    fn clear(&self) {
        self.drv_id.store(0, Ordering::Release);
        self.handler.store(0, Ordering::Relaxed);
        self.dev.store(0, Ordering::Relaxed);
    }
}

/// The slots of one vector. Occupied slots always form the prefix
/// `slots[..len]`.
pub(crate) struct VectorSlots<const N: usize> {
    pub(crate) slots: [Slot; N],
    pub(crate) len: AtomicUsize,
}

impl<const N: usize> VectorSlots<N> {
    const EMPTY: Self = Self {
        slots: [const { Slot::EMPTY }; N],
        len: AtomicUsize::new(0),
    };

    fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    fn position(&self, id: usize) -> Option<usize> {
        self.slots[..self.len()].iter().position(|s| s.id() == id)
    }

    /// Removes slot `idx` by shifting every later slot down one place.
    ///
    /// Must run with interrupts disabled.
    fn remove(&self, idx: usize) {
        let len = self.len();
        for i in idx..len - 1 {
            self.slots[i].copy_from(&self.slots[i + 1]);
        }
        self.slots[len - 1].clear();
        self.len.store(len - 1, Ordering::Release);
    }
}

/// Interrupt handler table with `VECTORS` vectors of `HANDLERS` slots each.
///
/// Registration and removal serialize on an internal mutex and write the
/// slots with interrupts disabled. [`IrqTable::dispatch`] takes no lock and
/// may run in interrupt context.
pub struct IrqTable<const VECTORS: usize = MAX_IRQS, const HANDLERS: usize = MAX_IRQ_HANDLERS> {
    pub(crate) vectors: [VectorSlots<HANDLERS>; VECTORS],
    lock: spin::Mutex<()>,
}

impl<const VECTORS: usize, const HANDLERS: usize> IrqTable<VECTORS, HANDLERS> {
    /// Creates a table with every vector empty.
    pub const fn new() -> Self {
        Self {
            vectors: [const { VectorSlots::<HANDLERS>::EMPTY }; VECTORS],
            lock: spin::Mutex::new(()),
        }
    }

    fn vector(&self, vector: usize) -> MResult<&VectorSlots<HANDLERS>> {
        match self.vectors.get(vector) {
            Some(slots) => Ok(slots),
            None => m_err!(InvalidInput, "IRQ vector {vector} out of range (max {VECTORS})"),
        }
    }

    /// Adds or removes handlers of `vector`.
    ///
    /// - `Some(handler)` with `Some(id)` appends a registration; `id` must
    ///   not already be registered on the vector.
    /// - `None` with `Some(id)` removes the registration of `id`.
    /// - `None` with `None` removes every registration of the vector.
    ///
    /// `dev` is an opaque device handle kept alongside the registration.
    ///
    /// # Errors
    ///
    /// [`InvalidInput`] for an out-of-range vector, a handler without id, a
    /// duplicate id or an unknown id; [`NoMemory`] when the vector has no
    /// free slot. A failed call leaves the table unchanged.
    ///
    /// [`InvalidInput`]: merrno::MError::InvalidInput
    /// [`NoMemory`]: merrno::MError::NoMemory
    pub fn register(
        &self,
        vector: usize,
        handler: Option<IrqHandler>,
        dev: usize,
        drv_id: Option<DriverId>,
    ) -> MResult {
        let slots = self.vector(vector)?;
        let _table = self.lock.lock();

        match (handler, drv_id) {
            (Some(handler), Some(id)) => {
                let id = id.as_usize();
                ensure!(
                    slots.position(id).is_none(),
                    m_err!(InvalidInput, "IRQ {vector}: driver {id:#x} already registered")
                );
                let len = slots.len();
                ensure!(
                    len < HANDLERS,
                    m_err!(NoMemory, "IRQ {vector}: all {HANDLERS} handler slots in use")
                );
                {
                    let _irq = IrqSave::new();
                    slots.slots[len].occupy(handler, dev, id);
                    slots.len.store(len + 1, Ordering::Release);
                }
                debug!("IRQ {vector}: registered driver {id:#x} in slot {len}");
            }
            (Some(_), None) => {
                m_bail!(InvalidInput, "IRQ {vector}: handler registered without a driver id");
            }
            (None, Some(id)) => {
                let id = id.as_usize();
                let Some(idx) = slots.position(id) else {
                    m_bail!(InvalidInput, "IRQ {vector}: driver {id:#x} not registered");
                };
                {
                    let _irq = IrqSave::new();
                    slots.remove(idx);
                }
                debug!("IRQ {vector}: unregistered driver {id:#x}");
            }
            (None, None) => {
                let mut removed = 0;
                while slots.len() > 0 {
                    let _irq = IrqSave::new();
                    slots.remove(0);
                    removed += 1;
                }
                debug!("IRQ {vector}: unregistered all {removed} handlers");
            }
        }
        Ok(())
    }

    /// Removes the registration of `id` from `vector`.
    pub fn unregister(&self, vector: usize, id: DriverId) -> MResult {
        self.register(vector, None, 0, Some(id))
    }

    /// Removes every registration of `vector`.
    pub fn unregister_all(&self, vector: usize) -> MResult {
        self.register(vector, None, 0, None)
    }

    /// Calls every handler of `vector` in registration order and returns how
    /// many were called.
    ///
    /// Handler results are not inspected: each handler acknowledges its own
    /// device.
    pub fn dispatch(&self, vector: usize) -> usize {
        let Some(slots) = self.vectors.get(vector) else {
            warn!("IRQ: dispatch of out-of-range vector {vector}");
            return 0;
        };

        let len = slots.len();
        let mut called = 0;
        for slot in &slots.slots[..len] {
            let Some(id) = DriverId::new(slot.id()) else {
                break;
            };
            let raw = slot.handler.load(Ordering::Relaxed);
            // SAFETY: a non-zero id is published with Release after the handler
            // was stored from a valid `IrqHandler`.
            let handler = unsafe { core::mem::transmute::<usize, IrqHandler>(raw) };
            handler(vector, id);
            called += 1;
        }
        called
    }

    /// Number of handlers registered on `vector` (zero when out of range).
    pub fn handler_count(&self, vector: usize) -> usize {
        self.vectors.get(vector).map_or(0, VectorSlots::len)
    }

    /// Snapshot of the `(driver id, device handle)` registrations of
    /// `vector`, in dispatch order.
    pub fn registrations(&self, vector: usize) -> heapless::Vec<(DriverId, usize), HANDLERS> {
        let mut out = heapless::Vec::new();
        if let Some(slots) = self.vectors.get(vector) {
            let _table = self.lock.lock();
            for slot in &slots.slots[..slots.len()] {
                if let Some(id) = DriverId::new(slot.id()) {
                    // Cannot overflow: `out` has one entry per slot.
                    let _ = out.push((id, slot.dev.load(Ordering::Relaxed)));
                }
            }
        }
        out
    }

    /// Empties every vector.
    pub fn clear(&self) {
        let _table = self.lock.lock();
        let _irq = IrqSave::new();
        for slots in &self.vectors {
            for slot in &slots.slots[..slots.len()] {
                slot.clear();
            }
            slots.len.store(0, Ordering::Release);
        }
    }
}

impl<const VECTORS: usize, const HANDLERS: usize> Default for IrqTable<VECTORS, HANDLERS> {
    fn default() -> Self {
        Self::new()
    }
}
