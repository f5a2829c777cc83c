//! Interface to the platform interrupt controller.

/// Primitives the platform provides to the IRQ layer.
///
/// Exactly one crate in the final image implements this trait with
/// `#[crate_interface::impl_interface]`.
///
/// ```rust,ignore
/// struct Gic;
///
/// #[crate_interface::impl_interface]
/// impl metal_irq::SysIrqIf for Gic {
///     fn save_disable() -> usize {
///         let flags = read_daif();
///         mask_irqs();
///         flags
///     }
///     fn restore_enable(flags: usize) {
///         write_daif(flags);
///     }
///     fn enable(vector: usize) {
///         gic_set_enable(vector, true);
///     }
///     fn disable(vector: usize) {
///         gic_set_enable(vector, false);
///     }
/// }
/// ```
#[crate_interface::def_interface]
pub trait SysIrqIf {
    /// Disables local interrupts, returning the previous state.
    fn save_disable() -> usize;

    /// Restores local interrupts to a state returned by `save_disable`.
    fn restore_enable(flags: usize);

    /// Unmasks one interrupt vector at the controller.
    fn enable(vector: usize);

    /// Masks one interrupt vector at the controller.
    fn disable(vector: usize);
}

#[inline]
pub(crate) fn sys_irq_save_disable() -> usize {
    crate_interface::call_interface!(SysIrqIf::save_disable)
}

#[inline]
pub(crate) fn sys_irq_restore_enable(flags: usize) {
    crate_interface::call_interface!(SysIrqIf::restore_enable, flags)
}

#[inline]
pub(crate) fn sys_irq_enable(vector: usize) {
    crate_interface::call_interface!(SysIrqIf::enable, vector)
}

#[inline]
pub(crate) fn sys_irq_disable(vector: usize) {
    crate_interface::call_interface!(SysIrqIf::disable, vector)
}
