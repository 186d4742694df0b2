// Abstract Syntax Tree for DCPU-16 assembly source

use crate::assembler::error::SourceLocation;
use crate::vm::Register;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// `:name`, `name:` or a bare leading identifier
    Label(String),
    Instruction {
        mnemonic: String,
        operands: Vec<Operand>,
    },
    /// `.name args`, `#name args`, or bare `DAT`/`DW`/`ORG`
    Directive {
        name: String,
        arguments: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A value: register, literal or expression
    Direct(Expr),
    /// `[expr]`
    Indirect(Expr),
    /// `PICK expr`
    Pick(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(i64),
    Str(String),
    Register(RegisterName),
    /// Label reference
    Identifier(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
        Expr::Unary(op, Box::new(operand))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary(op, Box::new(left), Box::new(right))
    }

    /// True if any leaf is a label reference
    pub fn references_label(&self) -> bool {
        match self {
            Expr::Identifier(_) => true,
            Expr::Unary(_, operand) => operand.references_label(),
            Expr::Binary(_, left, right) => left.references_label() || right.references_label(),
            Expr::Number(_) | Expr::Str(_) | Expr::Register(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        };
        write!(f, "{}", symbol)
    }
}

/// Register keywords, including the stack pseudo-registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterName {
    General(Register),
    Sp,
    Pc,
    Ex,
    Ia,
    Push,
    Pop,
    Peek,
}

impl RegisterName {
    /// Case-insensitive keyword lookup
    pub fn from_name(name: &str) -> Option<RegisterName> {
        if let Some(reg) = Register::from_name(name) {
            return Some(RegisterName::General(reg));
        }
        match name.to_ascii_uppercase().as_str() {
            "SP" => Some(RegisterName::Sp),
            "PC" => Some(RegisterName::Pc),
            "EX" => Some(RegisterName::Ex),
            "IA" => Some(RegisterName::Ia),
            "PUSH" => Some(RegisterName::Push),
            "POP" => Some(RegisterName::Pop),
            "PEEK" => Some(RegisterName::Peek),
            _ => None,
        }
    }

    /// Would a label with this name collide with a register keyword?
    pub fn is_keyword(name: &str) -> bool {
        RegisterName::from_name(name).is_some()
    }
}

impl fmt::Display for RegisterName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RegisterName::General(reg) => write!(f, "{}", reg),
            RegisterName::Sp => write!(f, "SP"),
            RegisterName::Pc => write!(f, "PC"),
            RegisterName::Ex => write!(f, "EX"),
            RegisterName::Ia => write!(f, "IA"),
            RegisterName::Push => write!(f, "PUSH"),
            RegisterName::Pop => write!(f, "POP"),
            RegisterName::Peek => write!(f, "PEEK"),
        }
    }
}
