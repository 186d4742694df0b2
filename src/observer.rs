//! Outbound notifications from the execution engine.
//!
//! Observers are called only at instruction or batch boundaries and receive
//! a shared view of the machine, so they cannot change engine state from
//! inside a notification.

use crate::vm::VM;

/// What just happened in the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionEvent {
    /// A single notifying step finished
    Step,
    /// A batch finished (completed or stopped early at a breakpoint)
    Batch,
    /// The engine left the running state
    Stopped,
}

/// Handle returned by `Interpreter::subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);

pub trait ExecutionObserver {
    fn on_event(&mut self, event: ExecutionEvent, vm: &VM);
}

impl<F> ExecutionObserver for F
where
    F: FnMut(ExecutionEvent, &VM),
{
    fn on_event(&mut self, event: ExecutionEvent, vm: &VM) {
        self(event, vm)
    }
}
