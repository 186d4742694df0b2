/// Conditional operations
///
/// Every IF opcode compares b against a and, when the test fails, asks the
/// engine to skip the following instruction. Nothing is written back.
use crate::interpreter::{ExecutionResult, Interpreter};
use crate::vm::{Location, Word};
use log::trace;

fn branch(name: &str, passed: bool, b: Word, a: Word) -> ExecutionResult {
    trace!("{} 0x{:04x} 0x{:04x} -> {}", name, b, a, passed);
    if passed {
        ExecutionResult::Continue
    } else {
        ExecutionResult::SkipNext
    }
}

impl Interpreter {
    /// IFB: run next only if (b & a) != 0
    pub(crate) fn op_ifb(&mut self, _dest: Location, b: Word, a: Word) -> ExecutionResult {
        branch("ifb", b & a != 0, b, a)
    }

    /// IFC: run next only if (b & a) == 0
    pub(crate) fn op_ifc(&mut self, _dest: Location, b: Word, a: Word) -> ExecutionResult {
        branch("ifc", b & a == 0, b, a)
    }

    pub(crate) fn op_ife(&mut self, _dest: Location, b: Word, a: Word) -> ExecutionResult {
        branch("ife", b == a, b, a)
    }

    pub(crate) fn op_ifn(&mut self, _dest: Location, b: Word, a: Word) -> ExecutionResult {
        branch("ifn", b != a, b, a)
    }

    /// IFG: unsigned b > a
    pub(crate) fn op_ifg(&mut self, _dest: Location, b: Word, a: Word) -> ExecutionResult {
        branch("ifg", b > a, b, a)
    }

    /// IFA: signed b > a
    pub(crate) fn op_ifa(&mut self, _dest: Location, b: Word, a: Word) -> ExecutionResult {
        branch("ifa", (b as i16) > (a as i16), b, a)
    }

    /// IFL: unsigned b < a
    pub(crate) fn op_ifl(&mut self, _dest: Location, b: Word, a: Word) -> ExecutionResult {
        branch("ifl", b < a, b, a)
    }

    /// IFU: signed b < a
    pub(crate) fn op_ifu(&mut self, _dest: Location, b: Word, a: Word) -> ExecutionResult {
        branch("ifu", (b as i16) < (a as i16), b, a)
    }
}
