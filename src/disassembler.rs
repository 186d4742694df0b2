use crate::instruction::{Instruction, OperandField, OperandMode};
use crate::vm::{Word, VM};
use std::fmt::Write;

/// Renders instruction words back into assembly text
pub struct Disassembler<'a> {
    words: &'a [Word],
    /// Address of `words[0]`
    base: Word,
}

impl<'a> Disassembler<'a> {
    pub fn new(words: &'a [Word], base: Word) -> Self {
        Disassembler { words, base }
    }

    /// Disassembler over the whole of a machine's memory
    pub fn for_vm(vm: &'a VM) -> Self {
        Disassembler::new(vm.memory.as_slice(), 0)
    }

    /// Word at logical address `addr`; addresses outside the slice read as 0
    fn word_at(&self, addr: Word) -> Word {
        let index = usize::from(addr.wrapping_sub(self.base));
        self.words.get(index).copied().unwrap_or(0)
    }

    /// Format the instruction at `addr`. Returns the text and its size in words.
    /// Words that do not decode are shown as `DAT`.
    pub fn format_at(&self, addr: Word) -> (String, usize) {
        let word = self.word_at(addr);
        let instruction = match Instruction::decode(word) {
            Ok(instruction) => instruction,
            Err(_) => return (format!("DAT 0x{:04x}", word), 1),
        };

        // trailing words: a first, then b
        let mut next = addr.wrapping_add(1);
        let a = self.format_operand(instruction.a, OperandField::A, &mut next);
        let text = match instruction.b {
            Some(b_mode) => {
                let b = self.format_operand(b_mode, OperandField::B, &mut next);
                format!("{} {}, {}", instruction.opcode, b, a)
            }
            None if instruction.opcode.mnemonic() == "RFI" => instruction.opcode.to_string(),
            None => format!("{} {}", instruction.opcode, a),
        };

        (text, instruction.size())
    }

    fn format_operand(&self, mode: OperandMode, field: OperandField, next: &mut Word) -> String {
        let mut trailing = || {
            let value = self.word_at(*next);
            *next = next.wrapping_add(1);
            value
        };

        match mode {
            OperandMode::Register(reg) => reg.to_string(),
            OperandMode::RegisterIndirect(reg) => format!("[{}]", reg),
            OperandMode::RegisterOffset(reg) => format!("[{} + 0x{:04x}]", reg, trailing()),
            OperandMode::PushPop => match field {
                OperandField::B => "PUSH".to_string(),
                OperandField::A => "POP".to_string(),
            },
            OperandMode::Peek => "PEEK".to_string(),
            OperandMode::Pick => format!("PICK 0x{:04x}", trailing()),
            OperandMode::Sp => "SP".to_string(),
            OperandMode::Pc => "PC".to_string(),
            OperandMode::Ex => "EX".to_string(),
            OperandMode::IndirectNextWord => format!("[0x{:04x}]", trailing()),
            OperandMode::NextWord => format!("0x{:04x}", trailing()),
            OperandMode::Inline(value) => format!("{}", value as i16),
        }
    }

    /// Disassemble `count` instructions (or until the end of the slice)
    /// starting at `start`, one `0xADDR: TEXT` line each
    pub fn disassemble(&self, start: Word, count: Option<usize>) -> Vec<String> {
        let mut lines = Vec::new();
        let mut addr = start;
        let mut consumed = usize::from(start.wrapping_sub(self.base));

        while consumed < self.words.len() {
            if let Some(max) = count {
                if lines.len() >= max {
                    break;
                }
            }
            let (text, size) = self.format_at(addr);
            lines.push(format!("0x{:04x}: {}", addr, text));
            addr = addr.wrapping_add(size as Word);
            consumed += size;
        }

        lines
    }

    /// Listing with the raw words next to each instruction
    pub fn listing(&self) -> String {
        let mut output = String::new();
        let mut offset = 0;

        while offset < self.words.len() {
            let addr = self.base.wrapping_add(offset as Word);
            let (text, size) = self.format_at(addr);
            let raw = self.words[offset..(offset + size).min(self.words.len())]
                .iter()
                .map(|w| format!("{:04x}", w))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(&mut output, "{:04x}: {:<15} {}", addr, raw, text);
            offset += size;
        }

        output
    }
}

/// Disassemble a single instruction from machine memory
pub fn disassemble_at(vm: &VM, addr: Word) -> (String, usize) {
    Disassembler::for_vm(vm).format_at(addr)
}

/// Disassemble an assembled word image loaded at `base`
pub fn disassemble_words(words: &[Word], base: Word) -> Vec<String> {
    Disassembler::new(words, base).disassemble(base, None)
}
