use log::debug;
use std::fmt;

/// Number of addressable words (0x0000-0xFFFF)
pub const MEMORY_WORDS: usize = 0x10000;

/// The native 16-bit unit of memory and register storage
pub type Word = u16;

/// The eight general purpose registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    A,
    B,
    C,
    X,
    Y,
    Z,
    I,
    J,
}

impl Register {
    pub const ALL: [Register; 8] = [
        Register::A,
        Register::B,
        Register::C,
        Register::X,
        Register::Y,
        Register::Z,
        Register::I,
        Register::J,
    ];

    /// Register for a 3-bit operand code
    pub fn from_code(code: u8) -> Option<Register> {
        Register::ALL.get(usize::from(code)).copied()
    }

    /// The 3-bit operand code (0-7)
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Register::A => "A",
            Register::B => "B",
            Register::C => "C",
            Register::X => "X",
            Register::Y => "Y",
            Register::Z => "Z",
            Register::I => "I",
            Register::J => "J",
        }
    }

    /// Case-insensitive lookup by name
    pub fn from_name(name: &str) -> Option<Register> {
        Register::ALL
            .iter()
            .copied()
            .find(|reg| reg.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A storable (or, for literals, read-only) place an operand resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Register(Register),
    Memory(Word),
    Sp,
    Pc,
    Ex,
    /// Literal operand; writes to it are dropped
    Literal(Word),
}

impl Location {
    pub fn is_writable(&self) -> bool {
        !matches!(self, Location::Literal(_))
    }
}

/// Dense word-addressed memory. Every address is valid and reads zero until written.
pub struct Memory {
    words: Box<[Word]>,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            words: vec![0; MEMORY_WORDS].into_boxed_slice(),
        }
    }

    pub fn read(&self, addr: Word) -> Word {
        self.words.get(usize::from(addr)).copied().unwrap_or(0)
    }

    pub fn write(&mut self, addr: Word, value: Word) {
        if let Some(slot) = self.words.get_mut(usize::from(addr)) {
            *slot = value;
        }
    }

    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// All 65536 words, indexed by address
    pub fn as_slice(&self) -> &[Word] {
        &self.words
    }

    /// Copy `count` words starting at `start`, wrapping past 0xFFFF
    pub fn read_range(&self, start: Word, count: usize) -> Vec<Word> {
        (0..count)
            .map(|i| self.read(start.wrapping_add(i as Word)))
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

/// Register file and memory of the virtual processor
pub struct VM {
    /// Main memory
    pub memory: Memory,
    /// General purpose registers A-J
    registers: [Word; 8],
    /// Program counter - address of the next word to fetch
    pub pc: Word,
    /// Stack pointer; the stack grows down from 0xFFFF
    pub sp: Word,
    /// Overflow / carry / remainder register
    pub ex: Word,
    /// Interrupt address (no delivery path is wired up)
    pub ia: Word,
}

impl VM {
    /// Create a zeroed machine
    pub fn new() -> Self {
        VM {
            memory: Memory::new(),
            registers: [0; 8],
            pc: 0,
            sp: 0,
            ex: 0,
            ia: 0,
        }
    }

    /// Zero every register and every memory word
    pub fn reset(&mut self) {
        self.memory.clear();
        self.registers = [0; 8];
        self.pc = 0;
        self.sp = 0;
        self.ex = 0;
        self.ia = 0;
    }

    pub fn read_register(&self, reg: Register) -> Word {
        self.registers[usize::from(reg.code())]
    }

    pub fn write_register(&mut self, reg: Register, value: Word) {
        self.registers[usize::from(reg.code())] = value;
    }

    pub fn read_word(&self, addr: Word) -> Word {
        self.memory.read(addr)
    }

    pub fn write_word(&mut self, addr: Word, value: Word) {
        self.memory.write(addr, value);
    }

    /// Fetch the word at PC and advance PC
    pub fn next_word(&mut self) -> Word {
        let word = self.memory.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        word
    }

    /// Pre-decrement SP and store `value` at the new top of stack
    pub fn push(&mut self, value: Word) {
        self.sp = self.sp.wrapping_sub(1);
        self.memory.write(self.sp, value);
    }

    /// Read the top of stack and post-increment SP
    pub fn pop(&mut self) -> Word {
        let value = self.memory.read(self.sp);
        self.sp = self.sp.wrapping_add(1);
        value
    }

    pub fn read_location(&self, location: Location) -> Word {
        match location {
            Location::Register(reg) => self.read_register(reg),
            Location::Memory(addr) => self.memory.read(addr),
            Location::Sp => self.sp,
            Location::Pc => self.pc,
            Location::Ex => self.ex,
            Location::Literal(value) => value,
        }
    }

    /// Store into a location; literal destinations accept and ignore the write
    pub fn write_location(&mut self, location: Location, value: Word) {
        match location {
            Location::Register(reg) => self.write_register(reg, value),
            Location::Memory(addr) => self.memory.write(addr, value),
            Location::Sp => self.sp = value,
            Location::Pc => self.pc = value,
            Location::Ex => self.ex = value,
            Location::Literal(_) => {
                debug!("dropping write of 0x{:04x} to literal operand", value);
            }
        }
    }

    /// Copy a little-endian byte image into memory starting at `base`.
    /// Addresses wrap past 0xFFFF. Returns the number of words written.
    pub fn load(&mut self, image: &[u8], base: Word) -> usize {
        let mut count = 0;
        for (i, pair) in image.chunks(2).enumerate() {
            let low = Word::from(pair[0]);
            let high = pair.get(1).copied().map(Word::from).unwrap_or(0);
            self.memory
                .write(base.wrapping_add(i as Word), (high << 8) | low);
            count += 1;
        }
        debug!(
            "loaded {} words ({} bytes) at 0x{:04x}",
            count,
            image.len(),
            base
        );
        count
    }
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VM {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for reg in Register::ALL {
            write!(f, "{}={:04x} ", reg, self.read_register(reg))?;
        }
        write!(
            f,
            "PC={:04x} SP={:04x} EX={:04x} IA={:04x}",
            self.pc, self.sp, self.ex, self.ia
        )
    }
}
