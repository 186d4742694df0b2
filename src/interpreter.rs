use crate::config::RuntimeConfig;
use crate::device::Device;
use crate::instruction::{
    is_conditional_code, split_word, BasicOp, Opcode, OperandField, OperandMode, SpecialOp,
};
use crate::observer::{ExecutionEvent, ExecutionObserver, ObserverId};
use crate::opcode_tables::{get_opcode_info, OpcodeInfo};
use crate::vm::{Location, Register, Word, MEMORY_WORDS, VM};
use bitvec::prelude::*;
use log::{debug, trace};
use std::fmt;

/// Instructions per host-scheduler batch
pub const DEFAULT_BATCH_SIZE: usize = 3000;

/// Result of executing an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Continue with the next instruction
    Continue,
    /// A conditional failed; the following instruction (chain) is skipped
    SkipNext,
}

/// Run/idle state seen by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    /// Stopped because PC reached a breakpoint; the instruction there has not run
    Breakpoint(Word),
}

/// Fatal execution failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// The word at `address` does not decode to any opcode
    InvalidOpcode { word: Word, address: Word },
    /// The opcode is recognised but has no semantics in this engine
    Unimplemented { mnemonic: &'static str, address: Word },
}

impl ExecutionError {
    pub fn is_unimplemented(&self) -> bool {
        matches!(self, ExecutionError::Unimplemented { .. })
    }

    pub fn address(&self) -> Word {
        match self {
            ExecutionError::InvalidOpcode { address, .. } => *address,
            ExecutionError::Unimplemented { address, .. } => *address,
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExecutionError::InvalidOpcode { word, address } => write!(
                f,
                "Unknown opcode in word 0x{:04x} at 0x{:04x}",
                word, address
            ),
            ExecutionError::Unimplemented { mnemonic, address } => write!(
                f,
                "Opcode {} at 0x{:04x} is not implemented",
                mnemonic, address
            ),
        }
    }
}

impl std::error::Error for ExecutionError {}

type BasicHandler = fn(&mut Interpreter, Location, Word, Word) -> ExecutionResult;
type SpecialHandler = fn(&mut Interpreter, Word) -> ExecutionResult;

/// Handlers for basic opcodes, indexed by the low five bits of the word.
/// Whether an opcode may run at all comes from `opcode_tables::OPCODES`.
const BASIC_HANDLERS: [Option<BasicHandler>; 32] = [
    None,                      // 0x00 special prefix
    Some(Interpreter::op_set), // 0x01 SET
    Some(Interpreter::op_add), // 0x02 ADD
    Some(Interpreter::op_sub), // 0x03 SUB
    Some(Interpreter::op_mul), // 0x04 MUL
    None,                      // 0x05 MLI
    Some(Interpreter::op_div), // 0x06 DIV
    None,                      // 0x07 DVI
    Some(Interpreter::op_mod), // 0x08 MOD
    None,                      // 0x09 MDI
    Some(Interpreter::op_and), // 0x0a AND
    Some(Interpreter::op_bor), // 0x0b BOR
    Some(Interpreter::op_xor), // 0x0c XOR
    Some(Interpreter::op_shr), // 0x0d SHR
    None,                      // 0x0e ASR
    Some(Interpreter::op_shl), // 0x0f SHL
    Some(Interpreter::op_ifb), // 0x10 IFB
    Some(Interpreter::op_ifc), // 0x11 IFC
    Some(Interpreter::op_ife), // 0x12 IFE
    Some(Interpreter::op_ifn), // 0x13 IFN
    Some(Interpreter::op_ifg), // 0x14 IFG
    Some(Interpreter::op_ifa), // 0x15 IFA
    Some(Interpreter::op_ifl), // 0x16 IFL
    Some(Interpreter::op_ifu), // 0x17 IFU
    None,
    None,
    None,                      // 0x1a ADX
    None,                      // 0x1b SBX
    None,
    None,
    None,                      // 0x1e STI
    None,                      // 0x1f STD
];

/// Handlers for special opcodes, indexed by the b field
const SPECIAL_HANDLERS: [Option<SpecialHandler>; 32] = {
    let mut table: [Option<SpecialHandler>; 32] = [None; 32];
    table[0x01] = Some(Interpreter::op_jsr);
    table
};

/// Pick the handler for a decoded opcode. Opcodes marked unimplemented in the
/// opcode table raise the unimplemented signal; anything without an entry
/// there, or without a handler, is invalid.
fn dispatch<H>(
    info: Option<&'static OpcodeInfo>,
    handler: Option<H>,
    word: Word,
    address: Word,
) -> Result<H, ExecutionError> {
    match (info, handler) {
        (Some(info), _) if !info.is_implemented() => Err(ExecutionError::Unimplemented {
            mnemonic: info.mnemonic,
            address,
        }),
        (Some(_), Some(handler)) => Ok(handler),
        _ => Err(ExecutionError::InvalidOpcode { word, address }),
    }
}

/// The execution engine: owns the machine and drives fetch-decode-execute
pub struct Interpreter {
    /// Registers and memory; only reachable through the engine's methods
    vm: VM,
    /// Set while the instruction(s) after a failed conditional are being skipped
    skipping: bool,
    run_state: RunState,
    /// Instructions executed since the last clear
    step_count: u64,
    /// One bit per address
    breakpoints: BitVec,
    batch_size: usize,
    observers: Vec<(ObserverId, Box<dyn ExecutionObserver>)>,
    next_observer_id: u64,
    devices: Vec<Box<dyn Device>>,
}

impl Interpreter {
    /// Create an engine with zeroed memory and registers
    pub fn new() -> Self {
        Interpreter {
            vm: VM::new(),
            skipping: false,
            run_state: RunState::Idle,
            step_count: 0,
            breakpoints: bitvec![0; MEMORY_WORDS],
            batch_size: DEFAULT_BATCH_SIZE,
            observers: Vec::new(),
            next_observer_id: 0,
            devices: Vec::new(),
        }
    }

    /// Create an engine using the runtime section of a configuration
    pub fn with_config(config: &RuntimeConfig) -> Self {
        let mut interpreter = Interpreter::new();
        interpreter.set_batch_size(config.batch_size);
        for &addr in &config.breakpoints {
            if !interpreter.has_breakpoint(addr) {
                interpreter.toggle_breakpoint(addr);
            }
        }
        interpreter
    }

    /// Zero memory, registers and the step counter. Breakpoints are kept.
    pub fn clear(&mut self) {
        self.vm.reset();
        self.skipping = false;
        self.run_state = RunState::Idle;
        self.step_count = 0;
    }

    /// Copy a little-endian image into memory at `offset`
    pub fn load(&mut self, image: &[u8], offset: Word) -> usize {
        self.vm.load(image, offset)
    }

    // ---- state accessors ----

    pub fn vm(&self) -> &VM {
        &self.vm
    }

    pub fn register(&self, reg: Register) -> Word {
        self.vm.read_register(reg)
    }

    pub fn set_register(&mut self, reg: Register, value: Word) {
        self.vm.write_register(reg, value);
    }

    pub fn pc(&self) -> Word {
        self.vm.pc
    }

    pub fn set_pc(&mut self, value: Word) {
        self.vm.pc = value;
    }

    pub fn sp(&self) -> Word {
        self.vm.sp
    }

    pub fn set_sp(&mut self, value: Word) {
        self.vm.sp = value;
    }

    pub fn ex(&self) -> Word {
        self.vm.ex
    }

    pub fn ia(&self) -> Word {
        self.vm.ia
    }

    pub fn read_memory(&self, addr: Word) -> Word {
        self.vm.read_word(addr)
    }

    pub fn write_memory(&mut self, addr: Word, value: Word) {
        self.vm.write_word(addr, value);
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn set_batch_size(&mut self, size: usize) {
        self.batch_size = size.max(1);
    }

    // ---- breakpoints ----

    /// Flip the breakpoint at `addr`; returns whether it is now set
    pub fn toggle_breakpoint(&mut self, addr: Word) -> bool {
        let index = usize::from(addr);
        let enabled = !self.breakpoints[index];
        self.breakpoints.set(index, enabled);
        debug!(
            "breakpoint at 0x{:04x} {}",
            addr,
            if enabled { "set" } else { "cleared" }
        );
        enabled
    }

    pub fn has_breakpoint(&self, addr: Word) -> bool {
        self.breakpoints[usize::from(addr)]
    }

    /// Addresses with a breakpoint, ascending
    pub fn breakpoints(&self) -> Vec<Word> {
        self.breakpoints.iter_ones().map(|i| i as Word).collect()
    }

    // ---- observers ----

    pub fn subscribe(&mut self, observer: Box<dyn ExecutionObserver>) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push((id, observer));
        id
    }

    /// Remove an observer; returns false if the id is unknown
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    fn notify(&mut self, event: ExecutionEvent) {
        for (_, observer) in self.observers.iter_mut() {
            observer.on_event(event, &self.vm);
        }
    }

    // ---- devices ----

    pub fn attach_device(&mut self, device: Box<dyn Device>) {
        debug!(
            "attached device id=0x{:08x} version={} manufacturer=0x{:08x}",
            device.id(),
            device.version(),
            device.manufacturer()
        );
        self.devices.push(device);
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Deliver an interrupt to the device at `index` (attach order).
    /// Returns false if no device is attached there.
    pub fn interrupt_device(&mut self, index: usize) -> bool {
        match self.devices.get_mut(index) {
            Some(device) => {
                debug!("interrupt to device {} (id=0x{:08x})", index, device.id());
                device.on_interrupt(&mut self.vm);
                true
            }
            None => false,
        }
    }

    // ---- execution driver ----

    /// Execute one instruction. Returns false when the new PC is a breakpoint.
    pub fn step(&mut self, notify: bool) -> Result<bool, ExecutionError> {
        self.execute_instruction()?;
        self.step_count += 1;

        if notify {
            self.notify(ExecutionEvent::Step);
        }

        // the step itself runs even when it starts on a breakpoint
        Ok(!self.has_breakpoint(self.vm.pc))
    }

    /// Execute up to `count` instructions, stopping early at a breakpoint.
    /// Returns true when all `count` instructions ran.
    pub fn step_batch(&mut self, count: usize) -> Result<bool, ExecutionError> {
        let mut completed = true;
        for _ in 0..count {
            if !self.step(false)? {
                completed = false;
                break;
            }
        }
        self.notify(ExecutionEvent::Batch);
        Ok(completed)
    }

    /// Enter the running state and execute the first instruction
    pub fn start(&mut self) -> Result<(), ExecutionError> {
        debug!("starting at PC 0x{:04x}", self.vm.pc);
        self.run_state = RunState::Running;
        match self.step(false) {
            Ok(true) => Ok(()),
            Ok(false) => {
                self.halt_at_breakpoint();
                Ok(())
            }
            Err(e) => {
                self.stop();
                Err(e)
            }
        }
    }

    /// Leave the running state. A batch in progress is not interrupted.
    pub fn stop(&mut self) {
        debug!(
            "stopping at PC 0x{:04x} after {} steps",
            self.vm.pc, self.step_count
        );
        if self.run_state == RunState::Running {
            self.run_state = RunState::Idle;
        }
        self.notify(ExecutionEvent::Stopped);
    }

    /// One host-scheduler tick: run a batch while running.
    /// Returns true if the host should schedule another tick.
    pub fn run_slice(&mut self) -> Result<bool, ExecutionError> {
        self.run_slice_limited(self.batch_size)
    }

    /// Like `run_slice`, but the batch runs at most `limit` instructions
    pub fn run_slice_limited(&mut self, limit: usize) -> Result<bool, ExecutionError> {
        if self.run_state != RunState::Running {
            return Ok(false);
        }

        match self.step_batch(limit.min(self.batch_size)) {
            Ok(true) => Ok(self.run_state == RunState::Running),
            Ok(false) => {
                self.halt_at_breakpoint();
                Ok(false)
            }
            Err(e) => {
                self.stop();
                Err(e)
            }
        }
    }

    fn halt_at_breakpoint(&mut self) {
        debug!("breakpoint hit at 0x{:04x}", self.vm.pc);
        self.run_state = RunState::Breakpoint(self.vm.pc);
        self.notify(ExecutionEvent::Stopped);
    }

    // ---- fetch / decode / execute ----

    fn execute_instruction(&mut self) -> Result<(), ExecutionError> {
        let address = self.vm.pc;
        let word = self.vm.next_word();
        let (op, b, a) = split_word(word);
        trace!(
            "0x{:04x}: word=0x{:04x} op=0x{:02x} b=0x{:02x} a=0x{:02x}",
            address,
            word,
            op,
            b,
            a
        );

        if op == 0 {
            return self.execute_special(address, word, b, a);
        }

        let info = BasicOp::from_code(op).and_then(|op| get_opcode_info(Opcode::Basic(op)));
        let handler = dispatch(info, BASIC_HANDLERS[usize::from(op)], word, address)?;

        // a is always resolved before b
        let a_location = self.resolve_operand(OperandMode::from_code(a), OperandField::A);
        let a_value = self.vm.read_location(a_location);
        let destination = self.resolve_operand(OperandMode::from_code(b), OperandField::B);

        if !is_conditional_code(op) && !destination.is_writable() {
            debug!(
                "0x{:04x}: literal destination, instruction has no effect",
                address
            );
            return Ok(());
        }

        let b_value = self.vm.read_location(destination);
        if handler(self, destination, b_value, a_value) == ExecutionResult::SkipNext {
            self.skip_following();
        }
        Ok(())
    }

    fn execute_special(
        &mut self,
        address: Word,
        word: Word,
        selector: u8,
        a: u8,
    ) -> Result<(), ExecutionError> {
        let info =
            SpecialOp::from_code(selector).and_then(|op| get_opcode_info(Opcode::Special(op)));
        let handler = dispatch(info, SPECIAL_HANDLERS[usize::from(selector)], word, address)?;

        let location = self.resolve_operand(OperandMode::from_code(a), OperandField::A);
        let value = self.vm.read_location(location);
        if handler(self, value) == ExecutionResult::SkipNext {
            self.skip_following();
        }
        Ok(())
    }

    /// Consume the instruction after a failed conditional without side effects.
    /// Operands are still decoded so PC moves past trailing words; a skipped
    /// conditional extends the skip to the instruction after it.
    fn skip_following(&mut self) {
        self.skipping = true;
        for _ in 0..MEMORY_WORDS {
            let address = self.vm.pc;
            let word = self.vm.next_word();
            let (op, b, a) = split_word(word);
            self.resolve_operand(OperandMode::from_code(a), OperandField::A);
            if op != 0 {
                self.resolve_operand(OperandMode::from_code(b), OperandField::B);
            }
            trace!("0x{:04x}: skipped word=0x{:04x}", address, word);
            if !is_conditional_code(op) {
                break;
            }
        }
        self.skipping = false;
    }

    /// Resolve an operand to the location it names, consuming trailing words
    /// and moving SP for PUSH/POP (unless skipping)
    fn resolve_operand(&mut self, mode: OperandMode, field: OperandField) -> Location {
        match mode {
            OperandMode::Register(reg) => Location::Register(reg),
            OperandMode::RegisterIndirect(reg) => Location::Memory(self.vm.read_register(reg)),
            OperandMode::RegisterOffset(reg) => {
                let offset = self.vm.next_word();
                Location::Memory(offset.wrapping_add(self.vm.read_register(reg)))
            }
            OperandMode::PushPop => match field {
                OperandField::B => {
                    if !self.skipping {
                        self.vm.sp = self.vm.sp.wrapping_sub(1);
                    }
                    Location::Memory(self.vm.sp)
                }
                OperandField::A => {
                    let location = Location::Memory(self.vm.sp);
                    if !self.skipping {
                        self.vm.sp = self.vm.sp.wrapping_add(1);
                    }
                    location
                }
            },
            OperandMode::Peek => Location::Memory(self.vm.sp),
            OperandMode::Pick => {
                let offset = self.vm.next_word();
                Location::Memory(self.vm.sp.wrapping_add(offset))
            }
            OperandMode::Sp => Location::Sp,
            OperandMode::Pc => Location::Pc,
            OperandMode::Ex => Location::Ex,
            OperandMode::IndirectNextWord => Location::Memory(self.vm.next_word()),
            OperandMode::NextWord => Location::Literal(self.vm.next_word()),
            OperandMode::Inline(value) => Location::Literal(value),
        }
    }

    /// Write a result into the destination operand
    pub(crate) fn store(&mut self, destination: Location, value: Word) {
        self.vm.write_location(destination, value);
    }

    pub(crate) fn set_ex(&mut self, value: Word) {
        self.vm.ex = value;
    }

    pub(crate) fn push_word(&mut self, value: Word) {
        self.vm.push(value);
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
