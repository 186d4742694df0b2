use crate::vm::VM;

/// A peripheral on the hardware bus.
///
/// HWN, HWQ and HWI are decoded but still report the unimplemented signal, so
/// program code cannot reach a device yet. The host delivers interrupts with
/// `Interpreter::interrupt_device`; `on_interrupt` gets the machine state the
/// engine owns, and HWI will route through the same call once it exists.
pub trait Device {
    /// 32-bit hardware id
    fn id(&self) -> u32;
    fn version(&self) -> u16;
    /// 32-bit manufacturer id
    fn manufacturer(&self) -> u32;
    /// Handle an interrupt sent to this device
    fn on_interrupt(&mut self, vm: &mut VM);
}
