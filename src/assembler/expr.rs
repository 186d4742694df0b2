//! Pure expression evaluation.
//!
//! The same evaluator serves both passes. In [`ResolutionMode::Emit`] a label
//! reference makes the whole expression [`Evaluation::Deferred`]; in
//! [`ResolutionMode::Resolve`] labels are looked up and a missing one is a
//! resolution error. Evaluation never touches the output buffer.
//!
//! At most one leaf may be a register, and only under `+` (binary or unary).

use crate::assembler::ast::{BinaryOp, Expr, RegisterName, UnaryOp};
use crate::assembler::codegen::LabelTable;
use crate::assembler::error::{AssemblerError, SourceLocation};

#[derive(Debug, Clone, Copy)]
pub enum ResolutionMode<'a> {
    /// Pass 1: labels are not known yet
    Emit,
    /// Pass 2 (and ORG): labels are final
    Resolve(&'a LabelTable),
}

/// A fully evaluated expression: a numeric part plus an optional register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub value: i64,
    pub register: Option<RegisterName>,
}

impl Resolved {
    pub fn constant(value: i64) -> Self {
        Resolved {
            value,
            register: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Value(Resolved),
    /// Needs label addresses; evaluate again in pass 2
    Deferred,
}

pub fn evaluate(
    expr: &Expr,
    mode: ResolutionMode,
    location: &SourceLocation,
) -> Result<Evaluation, AssemblerError> {
    match expr {
        Expr::Number(value) => Ok(Evaluation::Value(Resolved::constant(*value))),
        // a string used as a value is its first character
        Expr::Str(text) => {
            let first = text.encode_utf16().next().map(i64::from).unwrap_or(0);
            Ok(Evaluation::Value(Resolved::constant(first)))
        }
        Expr::Register(register) => Ok(Evaluation::Value(Resolved {
            value: 0,
            register: Some(*register),
        })),
        Expr::Identifier(name) => match mode {
            ResolutionMode::Emit => Ok(Evaluation::Deferred),
            ResolutionMode::Resolve(labels) => {
                let address = lookup_label(labels, name, location)?;
                Ok(Evaluation::Value(Resolved::constant(i64::from(address))))
            }
        },
        Expr::Unary(op, operand) => {
            let inner = match evaluate(operand, mode, location)? {
                Evaluation::Value(inner) => inner,
                Evaluation::Deferred => return Ok(Evaluation::Deferred),
            };
            if inner.register.is_some() && *op != UnaryOp::Plus {
                return Err(sums_only(location));
            }
            let value = match op {
                UnaryOp::Plus => inner.value,
                UnaryOp::Minus => inner.value.wrapping_neg(),
                UnaryOp::Not => !inner.value,
            };
            Ok(Evaluation::Value(Resolved {
                value,
                register: inner.register,
            }))
        }
        Expr::Binary(op, left, right) => {
            let left = evaluate(left, mode, location)?;
            let right = evaluate(right, mode, location)?;
            let (left, right) = match (left, right) {
                (Evaluation::Value(l), Evaluation::Value(r)) => (l, r),
                _ => return Ok(Evaluation::Deferred),
            };

            if left.register.is_some() && right.register.is_some() {
                return Err(AssemblerError::Structural(
                    "Found multiple registers in one expression.".to_string(),
                    location.clone(),
                ));
            }
            let register = left.register.or(right.register);
            if register.is_some() && *op != BinaryOp::Add {
                return Err(sums_only(location));
            }

            let value = apply(*op, left.value, right.value, location)?;
            Ok(Evaluation::Value(Resolved { value, register }))
        }
    }
}

/// Evaluate where labels must already be known
pub fn resolve(
    expr: &Expr,
    labels: &LabelTable,
    location: &SourceLocation,
) -> Result<Resolved, AssemblerError> {
    match evaluate(expr, ResolutionMode::Resolve(labels), location)? {
        Evaluation::Value(resolved) => Ok(resolved),
        // identifiers always resolve or fail in Resolve mode
        Evaluation::Deferred => Err(AssemblerError::Resolution(
            "Expression could not be resolved".to_string(),
            location.clone(),
        )),
    }
}

pub fn lookup_label(
    labels: &LabelTable,
    name: &str,
    location: &SourceLocation,
) -> Result<u16, AssemblerError> {
    match labels.get(name) {
        Some(label) if !label.reserved => Ok(label.address),
        _ => Err(AssemblerError::Resolution(
            format!("Can't find definition for label \"{}\"", name),
            location.clone(),
        )),
    }
}

fn apply(op: BinaryOp, left: i64, right: i64, location: &SourceLocation) -> Result<i64, AssemblerError> {
    let value = match op {
        BinaryOp::Add => left.wrapping_add(right),
        BinaryOp::Sub => left.wrapping_sub(right),
        BinaryOp::Mul => left.wrapping_mul(right),
        BinaryOp::Div | BinaryOp::Mod if right == 0 => {
            return Err(AssemblerError::Structural(
                "Division by zero in expression.".to_string(),
                location.clone(),
            ))
        }
        BinaryOp::Div => left.wrapping_div(right),
        BinaryOp::Mod => left.wrapping_rem(right),
        BinaryOp::And => left & right,
        BinaryOp::Or => left | right,
        BinaryOp::Xor => left ^ right,
        BinaryOp::Shl => shift_amount(right)
            .and_then(|n| left.checked_shl(n))
            .unwrap_or(0),
        BinaryOp::Shr => shift_amount(right)
            .and_then(|n| left.checked_shr(n))
            .unwrap_or(if left < 0 { -1 } else { 0 }),
    };
    Ok(value)
}

fn shift_amount(value: i64) -> Option<u32> {
    u32::try_from(value).ok()
}

fn sums_only(location: &SourceLocation) -> AssemblerError {
    AssemblerError::Structural(
        "Registers inside expressions are allowed in sums only.".to_string(),
        location.clone(),
    )
}
