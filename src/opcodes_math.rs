/// Arithmetic and bitwise operations
///
/// This module handles the basic opcodes that compute a value from the
/// destination (b) and source (a) operands:
/// - Arithmetic (ADD, SUB, MUL, DIV, MOD) with overflow, borrow and
///   remainder byproducts in EX
/// - Bitwise (AND, BOR, XOR), which leave EX alone
/// - Logical shifts (SHR, SHL), with the shifted-out bits in EX
///
/// All arithmetic is unsigned 16-bit; the signed variants are decoded but
/// report the unimplemented signal from the dispatch table.
use crate::interpreter::{ExecutionResult, Interpreter};
use crate::vm::{Location, Word};
use log::debug;

impl Interpreter {
    /// ADD: b + a; EX = 1 on overflow, otherwise 0
    pub(crate) fn op_add(&mut self, dest: Location, b: Word, a: Word) -> ExecutionResult {
        let sum = u32::from(b) + u32::from(a);
        debug!("add {} {}", b, a);
        self.set_ex(if sum > 0xffff { 1 } else { 0 });
        self.store(dest, sum as Word);
        ExecutionResult::Continue
    }

    /// SUB: b - a; EX = 0xFFFF on borrow, otherwise 0
    pub(crate) fn op_sub(&mut self, dest: Location, b: Word, a: Word) -> ExecutionResult {
        debug!("sub {} {}", b, a);
        self.set_ex(if a > b { 0xffff } else { 0 });
        self.store(dest, b.wrapping_sub(a));
        ExecutionResult::Continue
    }

    /// MUL: low word of the 32-bit product; EX = high word
    pub(crate) fn op_mul(&mut self, dest: Location, b: Word, a: Word) -> ExecutionResult {
        let product = u32::from(b) * u32::from(a);
        debug!("mul {} {}", b, a);
        self.set_ex((product >> 16) as Word);
        self.store(dest, product as Word);
        ExecutionResult::Continue
    }

    /// DIV: b / a; EX = ((b << 16) / a) & 0xFFFF. Division by zero yields 0 and EX 0.
    pub(crate) fn op_div(&mut self, dest: Location, b: Word, a: Word) -> ExecutionResult {
        debug!("div {} {}", b, a);
        if a == 0 {
            self.set_ex(0);
            self.store(dest, 0);
            return ExecutionResult::Continue;
        }
        let fraction = (u32::from(b) << 16) / u32::from(a);
        self.set_ex(fraction as Word);
        self.store(dest, b / a);
        ExecutionResult::Continue
    }

    /// MOD: b % a; modulo by zero yields 0
    pub(crate) fn op_mod(&mut self, dest: Location, b: Word, a: Word) -> ExecutionResult {
        debug!("mod {} {}", b, a);
        let result = b.checked_rem(a).unwrap_or(0);
        self.store(dest, result);
        ExecutionResult::Continue
    }

    pub(crate) fn op_and(&mut self, dest: Location, b: Word, a: Word) -> ExecutionResult {
        self.store(dest, b & a);
        ExecutionResult::Continue
    }

    pub(crate) fn op_bor(&mut self, dest: Location, b: Word, a: Word) -> ExecutionResult {
        self.store(dest, b | a);
        ExecutionResult::Continue
    }

    pub(crate) fn op_xor(&mut self, dest: Location, b: Word, a: Word) -> ExecutionResult {
        self.store(dest, b ^ a);
        ExecutionResult::Continue
    }

    /// SHR: logical b >> a; EX = ((b << 16) >> a) & 0xFFFF
    pub(crate) fn op_shr(&mut self, dest: Location, b: Word, a: Word) -> ExecutionResult {
        debug!("shr {} {}", b, a);
        let wide = u64::from(b) << 16;
        let shifted = wide.checked_shr(u32::from(a)).unwrap_or(0);
        self.set_ex(shifted as Word);
        self.store(dest, (shifted >> 16) as Word);
        ExecutionResult::Continue
    }

    /// SHL: b << a; EX = ((b << a) >> 16) & 0xFFFF
    pub(crate) fn op_shl(&mut self, dest: Location, b: Word, a: Word) -> ExecutionResult {
        debug!("shl {} {}", b, a);
        let shifted = u64::from(b).checked_shl(u32::from(a)).unwrap_or(0);
        self.set_ex((shifted >> 16) as Word);
        self.store(dest, shifted as Word);
        ExecutionResult::Continue
    }
}
