use crate::disassembler::Disassembler;
use crate::interpreter::{ExecutionError, Interpreter};
use crate::vm::{Register, Word};
use log::{debug, info};
use std::collections::VecDeque;
use std::fmt::Write;

/// Why `Debugger::run` returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// PC reached a breakpoint; the instruction there has not run
    Breakpoint(Word),
    /// The step limit was reached
    StepLimit,
}

/// A debugger for step-by-step execution and disassembly
pub struct Debugger {
    /// Current interpreter state
    pub interpreter: Interpreter,
    /// Print each instruction as it executes
    trace: bool,
    /// Instruction history
    history: VecDeque<(Word, String)>,
    /// Maximum history size
    max_history: usize,
}

impl Debugger {
    pub fn new(interpreter: Interpreter) -> Self {
        Debugger {
            interpreter,
            trace: false,
            history: VecDeque::new(),
            max_history: 100,
        }
    }

    pub fn set_trace(&mut self, enabled: bool) {
        self.trace = enabled;
        debug!("trace {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn set_max_history(&mut self, size: usize) {
        self.max_history = size.max(1);
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }
    }

    /// Add a breakpoint; returns false if one was already set
    pub fn add_breakpoint(&mut self, addr: Word) -> bool {
        if self.interpreter.has_breakpoint(addr) {
            return false;
        }
        self.interpreter.toggle_breakpoint(addr)
    }

    /// Remove a breakpoint; returns false if none was set
    pub fn remove_breakpoint(&mut self, addr: Word) -> bool {
        if !self.interpreter.has_breakpoint(addr) {
            return false;
        }
        !self.interpreter.toggle_breakpoint(addr)
    }

    pub fn list_breakpoints(&self) -> Vec<Word> {
        self.interpreter.breakpoints()
    }

    /// Disassemble instruction at current PC
    pub fn disassemble_current(&self) -> String {
        self.disassemble_at(self.interpreter.pc())
    }

    /// Disassemble instruction at given address
    pub fn disassemble_at(&self, addr: Word) -> String {
        let (text, _) = Disassembler::for_vm(self.interpreter.vm()).format_at(addr);
        format!("{:04x}: {}", addr, text)
    }

    /// Disassemble a range of instructions
    pub fn disassemble_range(&self, start: Word, count: usize) -> Vec<String> {
        let disassembler = Disassembler::for_vm(self.interpreter.vm());
        let mut results = Vec::with_capacity(count);
        let mut addr = start;

        for _ in 0..count {
            let (text, size) = disassembler.format_at(addr);
            results.push(format!("{:04x}: {}", addr, text));
            addr = addr.wrapping_add(size as Word);
        }

        results
    }

    /// Registers, the current instruction and the top of the stack
    pub fn state(&self) -> String {
        let interpreter = &self.interpreter;
        let mut output = String::new();

        let _ = writeln!(&mut output, "=== CPU State ===");
        for reg in Register::ALL {
            let _ = write!(&mut output, "{}: {:04x}  ", reg, interpreter.register(reg));
        }
        let _ = writeln!(&mut output);
        let _ = writeln!(
            &mut output,
            "PC: {:04x}  SP: {:04x}  EX: {:04x}  IA: {:04x}",
            interpreter.pc(),
            interpreter.sp(),
            interpreter.ex(),
            interpreter.ia()
        );
        let _ = writeln!(&mut output, "Steps: {}", interpreter.step_count());
        let _ = writeln!(&mut output, "Current: {}", self.disassemble_current());

        // the stack grows down from 0xFFFF; SP == 0 means empty
        let depth = (0x10000 - usize::from(interpreter.sp())) % 0x10000;
        if depth > 0 {
            let _ = writeln!(&mut output, "Stack (top {}):", depth.min(5));
            for i in 0..depth.min(5) {
                let addr = interpreter.sp().wrapping_add(i as Word);
                let _ = writeln!(
                    &mut output,
                    "  [{:04x}] {:04x}",
                    addr,
                    interpreter.read_memory(addr)
                );
            }
        }

        output
    }

    /// The last `count` executed instructions, oldest first
    pub fn history(&self, count: usize) -> Vec<String> {
        let start = self.history.len().saturating_sub(count);
        self.history
            .iter()
            .skip(start)
            .map(|(pc, text)| format!("{:04x}: {}", pc, text))
            .collect()
    }

    /// Execute a single instruction, recording it in the history.
    /// Returns false when the new PC is a breakpoint.
    pub fn step(&mut self) -> Result<bool, ExecutionError> {
        let pc = self.interpreter.pc();
        let (text, _) = Disassembler::for_vm(self.interpreter.vm()).format_at(pc);

        if self.trace {
            info!("{:04x}: {}", pc, text);
        }

        self.history.push_back((pc, text));
        if self.history.len() > self.max_history {
            self.history.pop_front();
        }

        self.interpreter.step(true)
    }

    /// Step until a breakpoint or `max_steps` instructions
    pub fn run(&mut self, max_steps: u64) -> Result<StopReason, ExecutionError> {
        for _ in 0..max_steps {
            if !self.step()? {
                let pc = self.interpreter.pc();
                info!("Hit breakpoint at 0x{:04x}", pc);
                return Ok(StopReason::Breakpoint(pc));
            }
        }
        Ok(StopReason::StepLimit)
    }
}
