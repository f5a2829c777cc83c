//! Test suite for metal_irq

use std::sync::{
    Mutex, MutexGuard,
    atomic::{AtomicUsize, Ordering},
};

use merrno::MError;

use super::*;

static PLAT_DISABLES: AtomicUsize = AtomicUsize::new(0);
static PLAT_ENABLES: AtomicUsize = AtomicUsize::new(0);
static PLAT_MASKED: AtomicUsize = AtomicUsize::new(usize::MAX);
static PLAT_UNMASKED: AtomicUsize = AtomicUsize::new(usize::MAX);

const PLAT_FLAGS: usize = 0x80;

struct MockSys;

#[crate_interface::impl_interface]
impl SysIrqIf for MockSys {
    fn save_disable() -> usize {
        PLAT_DISABLES.fetch_add(1, Ordering::SeqCst);
        PLAT_FLAGS
    }

    fn restore_enable(flags: usize) {
        assert_eq!(flags, PLAT_FLAGS);
        PLAT_ENABLES.fetch_add(1, Ordering::SeqCst);
    }

    fn enable(vector: usize) {
        PLAT_UNMASKED.store(vector, Ordering::SeqCst);
    }

    fn disable(vector: usize) {
        PLAT_MASKED.store(vector, Ordering::SeqCst);
    }
}

/// The table singleton, the disable depth and the mock platform are shared
/// by every test in this binary.
fn serial() -> MutexGuard<'static, ()> {
    static SERIAL: Mutex<()> = Mutex::new(());
    let guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    CALLS.lock().unwrap().clear();
    guard
}

static CALLS: Mutex<Vec<(&'static str, usize, usize)>> = Mutex::new(Vec::new());

fn record(tag: &'static str, vector: usize, id: DriverId) {
    CALLS.lock().unwrap().push((tag, vector, id.as_usize()));
}

fn handler_a(vector: usize, id: DriverId) -> IrqStatus {
    record("a", vector, id);
    IrqStatus::Handled
}

fn handler_b(vector: usize, id: DriverId) -> IrqStatus {
    record("b", vector, id);
    IrqStatus::NotHandled
}

fn handler_c(vector: usize, id: DriverId) -> IrqStatus {
    record("c", vector, id);
    IrqStatus::Handled
}

fn calls() -> Vec<(&'static str, usize, usize)> {
    core::mem::take(&mut *CALLS.lock().unwrap())
}

fn id(raw: usize) -> Option<DriverId> {
    DriverId::new(raw)
}

fn ids<const V: usize, const H: usize>(table: &IrqTable<V, H>, vector: usize) -> Vec<usize> {
    table
        .registrations(vector)
        .iter()
        .map(|(id, _)| id.as_usize())
        .collect()
}

/// Occupied slots form a prefix of exactly `len` entries.
fn assert_hole_free<const V: usize, const H: usize>(table: &IrqTable<V, H>, vector: usize) {
    let slots = &table.vectors[vector];
    let len = slots.len.load(Ordering::SeqCst);
    for (i, slot) in slots.slots.iter().enumerate() {
        let occupied = slot.drv_id.load(Ordering::SeqCst) != 0;
        assert_eq!(occupied, i < len, "vector {vector} slot {i} (len {len})");
    }
}

#[test]
fn driver_id_rejects_zero() {
    assert!(DriverId::new(0).is_none());
    assert_eq!(DriverId::new(7).map(DriverId::as_usize), Some(7));
    assert!(DriverId::from_ptr(core::ptr::null::<u8>()).is_none());
    let x = 5u32;
    assert_eq!(DriverId::from_ptr(&x).unwrap().as_usize(), &x as *const u32 as usize);
}

#[test]
fn dispatch_runs_handlers_in_order() {
    let _s = serial();
    let table: IrqTable<8, 4> = IrqTable::new();

    table.register(5, Some(handler_a), 0, id(0x1)).unwrap();
    table.register(5, Some(handler_b), 0, id(0x2)).unwrap();
    table.register(5, Some(handler_c), 0, id(0x3)).unwrap();

    assert_eq!(table.dispatch(5), 3);
    assert_eq!(calls(), [("a", 5, 0x1), ("b", 5, 0x2), ("c", 5, 0x3)]);
    assert_eq!(table.dispatch(4), 0);
    assert!(calls().is_empty());
}

#[test]
fn unregister_preserves_order() {
    let _s = serial();
    let table: IrqTable<8, 4> = IrqTable::new();

    table.register(2, Some(handler_a), 0, id(0x10)).unwrap();
    table.register(2, Some(handler_b), 0, id(0x20)).unwrap();
    table.register(2, Some(handler_c), 0, id(0x30)).unwrap();
    table.unregister(2, id(0x20).unwrap()).unwrap();

    assert_eq!(ids(&table, 2), [0x10, 0x30]);
    assert_hole_free(&table, 2);
    table.dispatch(2);
    assert_eq!(calls(), [("a", 2, 0x10), ("c", 2, 0x30)]);

    table.unregister(2, id(0x10).unwrap()).unwrap();
    assert_eq!(ids(&table, 2), [0x30]);
    assert_hole_free(&table, 2);
}

#[test]
fn duplicate_id_is_rejected() {
    let _s = serial();
    let table: IrqTable<8, 4> = IrqTable::new();

    table.register(1, Some(handler_a), 0xd0, id(0x1)).unwrap();
    for _ in 0..2 {
        assert_eq!(
            table.register(1, Some(handler_b), 0xd1, id(0x1)),
            Err(MError::InvalidInput)
        );
    }
    assert_eq!(table.registrations(1).as_slice(), [(id(0x1).unwrap(), 0xd0)]);

    // The same id is fine on another vector.
    table.register(3, Some(handler_b), 0, id(0x1)).unwrap();
    table.dispatch(1);
    assert_eq!(calls(), [("a", 1, 0x1)]);
}

#[test]
fn full_vector_reports_no_memory() {
    let _s = serial();
    let table: IrqTable<4, 3> = IrqTable::new();

    for raw in 1..=3 {
        table.register(0, Some(handler_a), 0, id(raw)).unwrap();
    }
    assert_eq!(table.register(0, Some(handler_a), 0, id(4)), Err(MError::NoMemory));
    assert_eq!(table.handler_count(0), 3);
    assert_eq!(ids(&table, 0), [1, 2, 3]);
    assert_hole_free(&table, 0);

    // A duplicate on a full vector is still a duplicate.
    assert_eq!(table.register(0, Some(handler_a), 0, id(2)), Err(MError::InvalidInput));
}

#[test]
fn invalid_arguments() {
    let _s = serial();
    let table: IrqTable<4, 2> = IrqTable::new();

    assert_eq!(table.register(4, Some(handler_a), 0, id(1)), Err(MError::InvalidInput));
    assert_eq!(table.register(0, Some(handler_a), 0, None), Err(MError::InvalidInput));
    assert_eq!(table.unregister(0, id(9).unwrap()), Err(MError::InvalidInput));
    assert_eq!(table.unregister_all(17), Err(MError::InvalidInput));
    assert_eq!(table.handler_count(0), 0);
    assert_eq!(table.dispatch(99), 0);
}

#[test]
fn unregister_all_empties_vector() {
    let _s = serial();
    let table: IrqTable<8, 4> = IrqTable::new();

    for raw in 1..=4 {
        table.register(6, Some(handler_b), 0, id(raw)).unwrap();
    }
    table.register(7, Some(handler_c), 0, id(1)).unwrap();

    table.unregister_all(6).unwrap();
    assert_eq!(table.handler_count(6), 0);
    assert_hole_free(&table, 6);
    assert_eq!(table.dispatch(6), 0);
    assert!(calls().is_empty());

    // Emptying an empty vector is not an error; other vectors are untouched.
    table.unregister_all(6).unwrap();
    assert_eq!(table.dispatch(7), 1);
}

#[test]
fn random_sequences_stay_hole_free() {
    let _s = serial();
    let table: IrqTable<2, 5> = IrqTable::new();
    let mut model: Vec<usize> = Vec::new();
    let mut seed = 0x2545_f491u32;

    for _ in 0..2000 {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        let raw = (seed % 7) as usize + 1;
        match seed >> 28 {
            0 => {
                table.unregister_all(1).unwrap();
                model.clear();
            }
            n if n % 2 == 0 => {
                let res = table.register(1, Some(handler_a), raw, id(raw));
                if model.contains(&raw) {
                    assert_eq!(res, Err(MError::InvalidInput));
                } else if model.len() == 5 {
                    assert_eq!(res, Err(MError::NoMemory));
                } else {
                    assert_eq!(res, Ok(()));
                    model.push(raw);
                }
            }
            _ => {
                let res = table.unregister(1, id(raw).unwrap());
                match model.iter().position(|&r| r == raw) {
                    Some(pos) => {
                        assert_eq!(res, Ok(()));
                        model.remove(pos);
                    }
                    None => assert_eq!(res, Err(MError::InvalidInput)),
                }
            }
        }
        assert_hole_free(&table, 1);
        assert_eq!(ids(&table, 1), model);
    }
    assert_eq!(table.handler_count(0), 0);
}

#[test]
fn mutations_run_with_interrupts_disabled() {
    let _s = serial();
    let table: IrqTable<4, 4> = IrqTable::new();
    let before = PLAT_DISABLES.load(Ordering::SeqCst);

    table.register(0, Some(handler_a), 0, id(1)).unwrap();
    table.register(0, Some(handler_b), 0, id(2)).unwrap();
    table.unregister(0, id(1).unwrap()).unwrap();
    assert_eq!(PLAT_DISABLES.load(Ordering::SeqCst) - before, 3);

    // Rejected calls never touch the slots.
    let _ = table.register(0, Some(handler_a), 0, id(2));
    let _ = table.unregister(0, id(9).unwrap());
    assert_eq!(PLAT_DISABLES.load(Ordering::SeqCst) - before, 3);

    assert_eq!(PLAT_ENABLES.load(Ordering::SeqCst), PLAT_DISABLES.load(Ordering::SeqCst));
    assert_eq!(disable_depth(), 0);
}

#[test]
fn nested_disable_reaches_platform_once() {
    let _s = serial();
    let disables = PLAT_DISABLES.load(Ordering::SeqCst);
    let enables = PLAT_ENABLES.load(Ordering::SeqCst);

    let outer = save_disable();
    let inner = save_disable();
    assert_eq!((outer, inner), (0, 1));
    assert_eq!(disable_depth(), 2);
    assert_eq!(PLAT_DISABLES.load(Ordering::SeqCst), disables + 1);

    restore_enable(inner);
    // The outer section is still protected.
    assert_eq!(PLAT_ENABLES.load(Ordering::SeqCst), enables);
    assert_eq!(disable_depth(), 1);

    restore_enable(outer);
    assert_eq!(PLAT_ENABLES.load(Ordering::SeqCst), enables + 1);
    assert_eq!(disable_depth(), 0);
}

#[test]
fn unbalanced_restore_is_ignored() {
    let _s = serial();
    let enables = PLAT_ENABLES.load(Ordering::SeqCst);
    restore_enable(0);
    assert_eq!(PLAT_ENABLES.load(Ordering::SeqCst), enables);
    assert_eq!(disable_depth(), 0);
}

#[test]
fn concurrent_sections_keep_depth_balanced() {
    let _s = serial();
    let disables = PLAT_DISABLES.load(Ordering::SeqCst);
    let enables = PLAT_ENABLES.load(Ordering::SeqCst);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            std::thread::spawn(|| {
                for _ in 0..2000 {
                    let _irq = IrqSave::new();
                    assert!(disable_depth() >= 1);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(disable_depth(), 0);
    let disabled = PLAT_DISABLES.load(Ordering::SeqCst) - disables;
    let enabled = PLAT_ENABLES.load(Ordering::SeqCst) - enables;
    assert!(disabled >= 1);
    assert_eq!(disabled, enabled);
}

#[test]
fn irq_save_guard_nests() {
    let _s = serial();
    let disables = PLAT_DISABLES.load(Ordering::SeqCst);
    {
        let _outer = IrqSave::new();
        {
            let _inner = IrqSave::default();
            assert_eq!(disable_depth(), 2);
        }
        assert_eq!(disable_depth(), 1);
    }
    assert_eq!(disable_depth(), 0);
    assert_eq!(PLAT_DISABLES.load(Ordering::SeqCst), disables + 1);
}

#[test]
fn vector_masking_passes_through() {
    let _s = serial();
    enable(12);
    disable(13);
    assert_eq!(PLAT_UNMASKED.load(Ordering::SeqCst), 12);
    assert_eq!(PLAT_MASKED.load(Ordering::SeqCst), 13);
}

#[test]
fn global_table_end_to_end() {
    let _s = serial();
    init();

    register(5, Some(handler_a), 0, id(0x1)).unwrap();
    register(5, Some(handler_b), 0, id(0x2)).unwrap();
    assert_eq!(isr(5), 2);
    assert_eq!(calls(), [("a", 5, 0x1), ("b", 5, 0x2)]);

    unregister(5, id(0x1).unwrap()).unwrap();
    assert_eq!(isr(5), 1);
    assert_eq!(calls(), [("b", 5, 0x2)]);
    assert_eq!(driver_ids(5).as_slice(), [id(0x2).unwrap()]);

    register(MAX_IRQS - 1, Some(handler_c), 0, id(0x3)).unwrap();
    assert_eq!(register(MAX_IRQS, Some(handler_c), 0, id(0x3)), Err(MError::InvalidInput));
    assert_eq!(handler_count(MAX_IRQS - 1), 1);

    deinit();
    assert_eq!(handler_count(5), 0);
    assert_eq!(handler_count(MAX_IRQS - 1), 0);
    assert_eq!(isr(5), 0);
    assert!(calls().is_empty());
    assert_eq!(unregister_all(5), Ok(()));
}
