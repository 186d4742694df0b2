// Test helpers: build engines from assembly source without going through files
use crate::assembler::{Assembler, AssemblyOutput};
use crate::instruction::encode_basic;
use crate::interpreter::Interpreter;
use crate::vm::Word;

/// Assemble `source` at address 0, panicking on failure
pub fn assemble(source: &str) -> AssemblyOutput {
    match Assembler::new().assemble_str(source) {
        Ok(output) => output,
        Err(e) => panic!("assembly failed: {}", e),
    }
}

/// An engine with `source` assembled and loaded at 0
pub fn engine_with(source: &str) -> Interpreter {
    let output = assemble(source);
    let mut interpreter = Interpreter::new();
    interpreter.load(&output.bytes(), 0);
    interpreter
}

/// An engine with raw words loaded at 0
pub fn engine_with_words(words: &[Word]) -> Interpreter {
    let mut interpreter = Interpreter::new();
    for (addr, word) in words.iter().enumerate() {
        interpreter.write_memory(addr as Word, *word);
    }
    interpreter
}

/// Execute `count` instructions, panicking on an execution error
pub fn run_steps(interpreter: &mut Interpreter, count: usize) {
    for _ in 0..count {
        if let Err(e) = interpreter.step(false) {
            panic!("execution failed: {}", e);
        }
    }
}

/// Basic instruction word with inline operand codes
pub fn word(op: u8, b: u8, a: u8) -> Word {
    encode_basic(op, b, a)
}
