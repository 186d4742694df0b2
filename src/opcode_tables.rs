use crate::instruction::{BasicOp, Opcode, SpecialOp};
use std::collections::HashMap;

/// Whether the engine gives an opcode real semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    Implemented,
    /// Decoded and assembled, but executing it raises the unimplemented signal
    Unimplemented,
}

/// Static description of one opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub mnemonic: &'static str,
    pub opcode: Opcode,
    pub support: Support,
}

impl OpcodeInfo {
    pub fn is_implemented(&self) -> bool {
        self.support == Support::Implemented
    }

    /// Number of source operands the assembler expects
    pub fn operand_count(&self) -> usize {
        match self.opcode {
            Opcode::Basic(_) => 2,
            Opcode::Special(SpecialOp::Rfi) => 0,
            Opcode::Special(_) => 1,
        }
    }
}

const fn basic(mnemonic: &'static str, op: BasicOp, support: Support) -> OpcodeInfo {
    OpcodeInfo {
        mnemonic,
        opcode: Opcode::Basic(op),
        support,
    }
}

const fn special(mnemonic: &'static str, op: SpecialOp, support: Support) -> OpcodeInfo {
    OpcodeInfo {
        mnemonic,
        opcode: Opcode::Special(op),
        support,
    }
}

use Support::{Implemented, Unimplemented};

/// Every opcode the decoder recognises
pub const OPCODES: &[OpcodeInfo] = &[
    basic("SET", BasicOp::Set, Implemented),
    basic("ADD", BasicOp::Add, Implemented),
    basic("SUB", BasicOp::Sub, Implemented),
    basic("MUL", BasicOp::Mul, Implemented),
    basic("MLI", BasicOp::Mli, Unimplemented),
    basic("DIV", BasicOp::Div, Implemented),
    basic("DVI", BasicOp::Dvi, Unimplemented),
    basic("MOD", BasicOp::Mod, Implemented),
    basic("MDI", BasicOp::Mdi, Unimplemented),
    basic("AND", BasicOp::And, Implemented),
    basic("BOR", BasicOp::Bor, Implemented),
    basic("XOR", BasicOp::Xor, Implemented),
    basic("SHR", BasicOp::Shr, Implemented),
    basic("ASR", BasicOp::Asr, Unimplemented),
    basic("SHL", BasicOp::Shl, Implemented),
    basic("IFB", BasicOp::Ifb, Implemented),
    basic("IFC", BasicOp::Ifc, Implemented),
    basic("IFE", BasicOp::Ife, Implemented),
    basic("IFN", BasicOp::Ifn, Implemented),
    basic("IFG", BasicOp::Ifg, Implemented),
    basic("IFA", BasicOp::Ifa, Implemented),
    basic("IFL", BasicOp::Ifl, Implemented),
    basic("IFU", BasicOp::Ifu, Implemented),
    basic("ADX", BasicOp::Adx, Unimplemented),
    basic("SBX", BasicOp::Sbx, Unimplemented),
    basic("STI", BasicOp::Sti, Unimplemented),
    basic("STD", BasicOp::Std, Unimplemented),
    special("JSR", SpecialOp::Jsr, Implemented),
    special("INT", SpecialOp::Int, Unimplemented),
    special("IAG", SpecialOp::Iag, Unimplemented),
    special("IAS", SpecialOp::Ias, Unimplemented),
    special("RFI", SpecialOp::Rfi, Unimplemented),
    special("IAQ", SpecialOp::Iaq, Unimplemented),
    special("HWN", SpecialOp::Hwn, Unimplemented),
    special("HWQ", SpecialOp::Hwq, Unimplemented),
    special("HWI", SpecialOp::Hwi, Unimplemented),
];

/// Alternate spellings accepted by the assembler
const ALIASES: &[(&str, &str)] = &[("MOV", "SET")];

/// Directives that are recognised but rejected
pub const UNSUPPORTED_DIRECTIVES: &[&str] = &[
    "equ", "eq", "if", "elseif", "else", "endif", "macro", "nolist", "list", "dir_callmacro",
];

/// Directives that emit data or move the program counter
pub const DATA_DIRECTIVES: &[&str] = &["dat", "dw"];
pub const ORIGIN_DIRECTIVES: &[&str] = &["org"];

lazy_static! {
    static ref MNEMONIC_MAP: HashMap<&'static str, &'static OpcodeInfo> = {
        let mut m = HashMap::new();
        for info in OPCODES {
            m.insert(info.mnemonic, info);
        }
        for (alias, target) in ALIASES {
            if let Some(info) = OPCODES.iter().find(|info| info.mnemonic == *target) {
                m.insert(*alias, info);
            }
        }
        m
    };
    static ref OPCODE_MAP: HashMap<Opcode, &'static OpcodeInfo> =
        OPCODES.iter().map(|info| (info.opcode, info)).collect();
}

/// Case-insensitive mnemonic lookup (aliases included)
pub fn lookup_mnemonic(name: &str) -> Option<&'static OpcodeInfo> {
    MNEMONIC_MAP.get(name.to_ascii_uppercase().as_str()).copied()
}

pub fn get_opcode_info(opcode: Opcode) -> Option<&'static OpcodeInfo> {
    OPCODE_MAP.get(&opcode).copied()
}

/// Is `name` a directive the assembler knows about (supported or not)?
pub fn is_known_directive(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    DATA_DIRECTIVES.contains(&lower.as_str())
        || ORIGIN_DIRECTIVES.contains(&lower.as_str())
        || UNSUPPORTED_DIRECTIVES.contains(&lower.as_str())
}
