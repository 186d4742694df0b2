use crate::opcode_tables;
use crate::vm::{Register, Word};
use std::fmt;

/// Operand codes outside the register ranges
pub const OPERAND_PUSH_POP: u8 = 0x18;
pub const OPERAND_PEEK: u8 = 0x19;
pub const OPERAND_PICK: u8 = 0x1a;
pub const OPERAND_SP: u8 = 0x1b;
pub const OPERAND_PC: u8 = 0x1c;
pub const OPERAND_EX: u8 = 0x1d;
pub const OPERAND_INDIRECT_NEXT_WORD: u8 = 0x1e;
pub const OPERAND_NEXT_WORD: u8 = 0x1f;
/// First inline literal code; encodes the value -1 (0xFFFF)
pub const OPERAND_INLINE_BASE: u8 = 0x20;

/// Smallest and largest value that fits the inline literal form
pub const INLINE_MIN: i64 = -1;
pub const INLINE_MAX: i64 = 30;

/// Mask for the 5-bit b field and the 6-bit a field
pub const B_FIELD_MASK: Word = 0x1f;
pub const A_FIELD_MASK: Word = 0x3f;
pub const B_FIELD_SHIFT: u32 = 5;
pub const A_FIELD_SHIFT: u32 = 10;

/// Which operand field of an instruction word an operand occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandField {
    /// Destination, bits 5-9
    B,
    /// Source, bits 10-15
    A,
}

impl OperandField {
    pub fn shift(self) -> u32 {
        match self {
            OperandField::B => B_FIELD_SHIFT,
            OperandField::A => A_FIELD_SHIFT,
        }
    }

    pub fn mask(self) -> Word {
        match self {
            OperandField::B => B_FIELD_MASK,
            OperandField::A => A_FIELD_MASK,
        }
    }

    /// Replace this field of `word` with `code`
    pub fn patch(self, word: Word, code: u8) -> Word {
        let cleared = word & !(self.mask() << self.shift());
        cleared | ((Word::from(code) & self.mask()) << self.shift())
    }
}

/// Addressing mode selected by an operand field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandMode {
    /// 0x00-0x07: register value
    Register(Register),
    /// 0x08-0x0f: [register]
    RegisterIndirect(Register),
    /// 0x10-0x17: [register + next word]
    RegisterOffset(Register),
    /// 0x18: PUSH in b, POP in a
    PushPop,
    /// 0x19: [SP]
    Peek,
    /// 0x1a: [SP + next word]
    Pick,
    Sp,
    Pc,
    Ex,
    /// 0x1e: [next word]
    IndirectNextWord,
    /// 0x1f: next word (literal)
    NextWord,
    /// 0x20-0x3f: literal -1..30 without a trailing word
    Inline(Word),
}

impl OperandMode {
    /// Decode a 5- or 6-bit operand code
    pub fn from_code(code: u8) -> OperandMode {
        let code = code & 0x3f;
        match code {
            0x00..=0x07 => OperandMode::Register(register_for(code)),
            0x08..=0x0f => OperandMode::RegisterIndirect(register_for(code - 0x08)),
            0x10..=0x17 => OperandMode::RegisterOffset(register_for(code - 0x10)),
            OPERAND_PUSH_POP => OperandMode::PushPop,
            OPERAND_PEEK => OperandMode::Peek,
            OPERAND_PICK => OperandMode::Pick,
            OPERAND_SP => OperandMode::Sp,
            OPERAND_PC => OperandMode::Pc,
            OPERAND_EX => OperandMode::Ex,
            OPERAND_INDIRECT_NEXT_WORD => OperandMode::IndirectNextWord,
            OPERAND_NEXT_WORD => OperandMode::NextWord,
            _ => OperandMode::Inline(Word::from(code - OPERAND_INLINE_BASE).wrapping_sub(1)),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            OperandMode::Register(reg) => reg.code(),
            OperandMode::RegisterIndirect(reg) => 0x08 + reg.code(),
            OperandMode::RegisterOffset(reg) => 0x10 + reg.code(),
            OperandMode::PushPop => OPERAND_PUSH_POP,
            OperandMode::Peek => OPERAND_PEEK,
            OperandMode::Pick => OPERAND_PICK,
            OperandMode::Sp => OPERAND_SP,
            OperandMode::Pc => OPERAND_PC,
            OperandMode::Ex => OPERAND_EX,
            OperandMode::IndirectNextWord => OPERAND_INDIRECT_NEXT_WORD,
            OperandMode::NextWord => OPERAND_NEXT_WORD,
            OperandMode::Inline(value) => OPERAND_INLINE_BASE + (value.wrapping_add(1) as u8 & 0x1f),
        }
    }

    /// True when decoding this operand consumes a word after the instruction
    pub fn uses_next_word(&self) -> bool {
        matches!(
            self,
            OperandMode::RegisterOffset(_)
                | OperandMode::Pick
                | OperandMode::IndirectNextWord
                | OperandMode::NextWord
        )
    }

    /// Inline literal code for `value`, when it is in -1..=30 (0xFFFF counts as -1)
    pub fn inline_code(value: i64) -> Option<u8> {
        if value == 0xffff {
            return Some(OPERAND_INLINE_BASE);
        }
        if (INLINE_MIN..=INLINE_MAX).contains(&value) {
            Some(OPERAND_INLINE_BASE + (value + 1) as u8)
        } else {
            None
        }
    }
}

fn register_for(code: u8) -> Register {
    Register::from_code(code & 0x07).unwrap_or(Register::A)
}

/// Two-operand opcodes (low five bits non-zero)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicOp {
    Set = 0x01,
    Add = 0x02,
    Sub = 0x03,
    Mul = 0x04,
    Mli = 0x05,
    Div = 0x06,
    Dvi = 0x07,
    Mod = 0x08,
    Mdi = 0x09,
    And = 0x0a,
    Bor = 0x0b,
    Xor = 0x0c,
    Shr = 0x0d,
    Asr = 0x0e,
    Shl = 0x0f,
    Ifb = 0x10,
    Ifc = 0x11,
    Ife = 0x12,
    Ifn = 0x13,
    Ifg = 0x14,
    Ifa = 0x15,
    Ifl = 0x16,
    Ifu = 0x17,
    Adx = 0x1a,
    Sbx = 0x1b,
    Sti = 0x1e,
    Std = 0x1f,
}

impl BasicOp {
    pub fn from_code(code: u8) -> Option<BasicOp> {
        let op = match code {
            0x01 => BasicOp::Set,
            0x02 => BasicOp::Add,
            0x03 => BasicOp::Sub,
            0x04 => BasicOp::Mul,
            0x05 => BasicOp::Mli,
            0x06 => BasicOp::Div,
            0x07 => BasicOp::Dvi,
            0x08 => BasicOp::Mod,
            0x09 => BasicOp::Mdi,
            0x0a => BasicOp::And,
            0x0b => BasicOp::Bor,
            0x0c => BasicOp::Xor,
            0x0d => BasicOp::Shr,
            0x0e => BasicOp::Asr,
            0x0f => BasicOp::Shl,
            0x10 => BasicOp::Ifb,
            0x11 => BasicOp::Ifc,
            0x12 => BasicOp::Ife,
            0x13 => BasicOp::Ifn,
            0x14 => BasicOp::Ifg,
            0x15 => BasicOp::Ifa,
            0x16 => BasicOp::Ifl,
            0x17 => BasicOp::Ifu,
            0x1a => BasicOp::Adx,
            0x1b => BasicOp::Sbx,
            0x1e => BasicOp::Sti,
            0x1f => BasicOp::Std,
            _ => return None,
        };
        Some(op)
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// The IF family reads both operands as values and never writes
    pub fn is_conditional(self) -> bool {
        is_conditional_code(self.code())
    }
}

/// Is `op` (low five bits of an instruction word) one of the IF opcodes?
pub fn is_conditional_code(op: u8) -> bool {
    (0x10..=0x17).contains(&op)
}

/// One-operand opcodes (low five bits zero, selector in bits 5-9)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialOp {
    Jsr = 0x01,
    Int = 0x08,
    Iag = 0x09,
    Ias = 0x0a,
    Rfi = 0x0b,
    Iaq = 0x0c,
    Hwn = 0x10,
    Hwq = 0x11,
    Hwi = 0x12,
}

impl SpecialOp {
    pub fn from_code(code: u8) -> Option<SpecialOp> {
        let op = match code {
            0x01 => SpecialOp::Jsr,
            0x08 => SpecialOp::Int,
            0x09 => SpecialOp::Iag,
            0x0a => SpecialOp::Ias,
            0x0b => SpecialOp::Rfi,
            0x0c => SpecialOp::Iaq,
            0x10 => SpecialOp::Hwn,
            0x11 => SpecialOp::Hwq,
            0x12 => SpecialOp::Hwi,
            _ => return None,
        };
        Some(op)
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Basic(BasicOp),
    Special(SpecialOp),
}

impl Opcode {
    pub fn mnemonic(&self) -> &'static str {
        opcode_tables::get_opcode_info(*self)
            .map(|info| info.mnemonic)
            .unwrap_or("???")
    }

    pub fn is_implemented(&self) -> bool {
        opcode_tables::get_opcode_info(*self)
            .map(|info| info.is_implemented())
            .unwrap_or(false)
    }

    pub fn is_conditional(&self) -> bool {
        match self {
            Opcode::Basic(op) => op.is_conditional(),
            Opcode::Special(_) => false,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// Split an instruction word into (opcode, b field, a field)
pub fn split_word(word: Word) -> (u8, u8, u8) {
    let op = (word & 0x1f) as u8;
    let b = ((word >> B_FIELD_SHIFT) & B_FIELD_MASK) as u8;
    let a = ((word >> A_FIELD_SHIFT) & A_FIELD_MASK) as u8;
    (op, b, a)
}

/// Pack a two-operand instruction word
pub fn encode_basic(op: u8, b: u8, a: u8) -> Word {
    let word = Word::from(op) & 0x1f;
    let word = OperandField::B.patch(word, b);
    OperandField::A.patch(word, a)
}

/// Pack a one-operand instruction word
pub fn encode_special(sub: u8, a: u8) -> Word {
    encode_basic(0, sub, a)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Low five bits do not name a basic opcode
    UnknownBasicOpcode(Word),
    /// Selector field of a one-operand word does not name a special opcode
    UnknownSpecialOpcode(Word),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodeError::UnknownBasicOpcode(word) => {
                write!(f, "Unknown opcode 0x{:02x} in word 0x{:04x}", word & 0x1f, word)
            }
            DecodeError::UnknownSpecialOpcode(word) => write!(
                f,
                "Unknown special opcode 0x{:02x} in word 0x{:04x}",
                (word >> B_FIELD_SHIFT) & B_FIELD_MASK,
                word
            ),
        }
    }
}

impl std::error::Error for DecodeError {}

/// A decoded instruction word (trailing operand words are not part of it)
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The raw instruction word
    pub word: Word,
    pub opcode: Opcode,
    /// Destination operand; absent for one-operand instructions
    pub b: Option<OperandMode>,
    /// Source operand (the only operand of special instructions)
    pub a: OperandMode,
}

impl Instruction {
    /// Decode an instruction word
    pub fn decode(word: Word) -> Result<Self, DecodeError> {
        let (op, b, a) = split_word(word);
        if op == 0 {
            let special =
                SpecialOp::from_code(b).ok_or(DecodeError::UnknownSpecialOpcode(word))?;
            return Ok(Instruction {
                word,
                opcode: Opcode::Special(special),
                b: None,
                a: OperandMode::from_code(a),
            });
        }

        let basic = BasicOp::from_code(op).ok_or(DecodeError::UnknownBasicOpcode(word))?;
        Ok(Instruction {
            word,
            opcode: Opcode::Basic(basic),
            b: Some(OperandMode::from_code(b)),
            a: OperandMode::from_code(a),
        })
    }

    pub fn is_conditional(&self) -> bool {
        self.opcode.is_conditional()
    }

    /// Number of trailing operand words after the instruction word
    pub fn extra_words(&self) -> usize {
        let a = usize::from(self.a.uses_next_word());
        let b = self.b.map(|b| usize::from(b.uses_next_word())).unwrap_or(0);
        a + b
    }

    /// Total size in words, including trailing operand words
    pub fn size(&self) -> usize {
        1 + self.extra_words()
    }
}
