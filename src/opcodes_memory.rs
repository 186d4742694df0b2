/// Data movement and subroutine operations
///
/// SET copies the source operand into the destination. JSR pushes the
/// return address (the word after the JSR and its trailing word) and jumps.
/// Returning is done in program code with `SET PC, POP`.
use crate::interpreter::{ExecutionResult, Interpreter};
use crate::vm::{Location, Word};
use log::debug;

impl Interpreter {
    pub(crate) fn op_set(&mut self, dest: Location, _b: Word, a: Word) -> ExecutionResult {
        self.store(dest, a);
        ExecutionResult::Continue
    }

    /// JSR: push PC, then PC = a
    pub(crate) fn op_jsr(&mut self, a: Word) -> ExecutionResult {
        let return_address = self.pc();
        debug!("jsr 0x{:04x} (return to 0x{:04x})", a, return_address);
        self.push_word(return_address);
        self.set_pc(a);
        ExecutionResult::Continue
    }
}
