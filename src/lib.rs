#[macro_use]
extern crate lazy_static;

pub mod assembler;
pub mod config;
pub mod debugger;
pub mod device;
pub mod disassembler;
pub mod instruction;
pub mod interpreter;
pub mod observer;
pub mod opcode_tables;
pub mod opcodes_branch;
pub mod opcodes_math;
pub mod opcodes_memory;
pub mod vm;

#[cfg(test)]
mod branch_tests;
#[cfg(test)]
mod debugger_tests;
#[cfg(test)]
mod instruction_tests;
#[cfg(test)]
mod test_utils;

pub use assembler::{assemble, assemble_source, Assembler, AssemblerError, AssemblyOutput};
pub use interpreter::{ExecutionError, Interpreter, RunState};
