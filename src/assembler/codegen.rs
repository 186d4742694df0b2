/// Pass 1 of the assembler: emission
///
/// Walks the program once, appending instruction and data words to the
/// output buffer. Anything that depends on a label address is recorded as a
/// [`PendingReference`] with a placeholder word in its slot; pass 2
/// (`resolve.rs`) patches those slots once every label is known.
///
/// # Layout of an instruction
///
/// ```text
/// word 0        aaaaaa bbbbb ooooo   (special: aaaaaa sssss 00000)
/// word 1        trailing word of a, if a needs one
/// word 2        trailing word of b, if b needs one
/// ```
///
/// Operand a is always encoded before operand b so its trailing word comes first,
/// matching the order in which the engine fetches them.
use crate::assembler::ast::{Expr, Operand, Program, RegisterName, Statement, StatementKind};
use crate::assembler::error::{AssemblerError, SourceLocation, Warning};
use crate::assembler::expr::{self, Evaluation, ResolutionMode, Resolved};
use crate::instruction::{
    encode_basic, encode_special, Opcode, OperandField, OperandMode, SpecialOp, OPERAND_EX,
    OPERAND_INDIRECT_NEXT_WORD, OPERAND_NEXT_WORD, OPERAND_PC, OPERAND_PEEK, OPERAND_PICK,
    OPERAND_PUSH_POP, OPERAND_SP,
};
use crate::opcode_tables::{self, DATA_DIRECTIVES, ORIGIN_DIRECTIVES};
use crate::vm::Word;
use indexmap::IndexMap;
use log::{debug, warn};

/// Placeholder written into slots that pass 2 will patch
pub const PLACEHOLDER_WORD: Word = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub address: Word,
    pub location: SourceLocation,
    /// Named like a register keyword; recorded but never resolvable
    pub reserved: bool,
}

pub type LabelTable = IndexMap<String, Label>;

/// Which part of the output a pending reference patches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceField {
    /// Trailing word of the source operand
    A,
    /// Trailing word of the destination operand
    B,
    /// A `DAT`/`DW` word
    Data,
}

impl ReferenceField {
    /// Operand field to re-patch when a register turns up in pass 2
    pub fn operand_field(self) -> Option<OperandField> {
        match self {
            ReferenceField::A => Some(OperandField::A),
            ReferenceField::B => Some(OperandField::B),
            ReferenceField::Data => None,
        }
    }
}

impl From<OperandField> for ReferenceField {
    fn from(field: OperandField) -> Self {
        match field {
            OperandField::A => ReferenceField::A,
            OperandField::B => ReferenceField::B,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceKind {
    /// A bare label name
    Label(String),
    /// An expression containing at least one label. `deref` is true inside
    /// `[...]`, where a register leaf turns the operand into an offset form.
    Expression { expr: Expr, deref: bool },
}

/// A slot emitted in pass 1 whose value is only known in pass 2
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReference {
    /// Buffer index of the placeholder word
    pub slot: usize,
    /// Buffer index of the instruction word owning the operand
    pub opcode_slot: usize,
    pub field: ReferenceField,
    pub kind: ReferenceKind,
    pub location: SourceLocation,
}

/// All state of one assembly run, threaded through both passes
#[derive(Debug, Clone)]
pub struct AssemblyContext {
    /// Emitted words, contiguous regardless of ORG
    pub words: Vec<Word>,
    /// Logical address of the next emitted word
    pub pc: Word,
    pub base_address: Word,
    pub labels: LabelTable,
    pub pending: Vec<PendingReference>,
    pub warnings: Vec<Warning>,
    pub address_to_line: IndexMap<Word, SourceLocation>,
    pub line_to_address: IndexMap<SourceLocation, Word>,
    /// Address of the first statement
    pub entry_address: Option<Word>,
}

impl AssemblyContext {
    pub fn new(base_address: Word) -> Self {
        AssemblyContext {
            words: Vec::new(),
            pc: base_address,
            base_address,
            labels: IndexMap::new(),
            pending: Vec::new(),
            warnings: Vec::new(),
            address_to_line: IndexMap::new(),
            line_to_address: IndexMap::new(),
            entry_address: None,
        }
    }

    /// Append a word; returns its buffer index
    pub fn emit(&mut self, word: Word) -> usize {
        let slot = self.words.len();
        self.words.push(word);
        self.pc = self.pc.wrapping_add(1);
        slot
    }

    pub fn warn(&mut self, message: String, location: &SourceLocation) {
        let warning = Warning::new(message, location);
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Pass 1 over the whole program
    pub fn emit_program(&mut self, program: &Program) -> Result<(), AssemblerError> {
        debug!(
            "pass 1: {} statements from base 0x{:04x}",
            program.statements.len(),
            self.base_address
        );
        for statement in &program.statements {
            self.emit_statement(statement)?;
        }
        debug!(
            "pass 1 done: {} words, {} labels, {} pending references",
            self.words.len(),
            self.labels.len(),
            self.pending.len()
        );
        Ok(())
    }

    pub fn emit_statement(&mut self, statement: &Statement) -> Result<(), AssemblerError> {
        let location = &statement.location;
        self.entry_address.get_or_insert(self.pc);
        self.address_to_line.insert(self.pc, location.clone());
        self.line_to_address.insert(location.clone(), self.pc);

        match &statement.kind {
            StatementKind::Label(name) => {
                self.define_label(name, location);
                Ok(())
            }
            StatementKind::Directive { name, arguments } => {
                self.emit_directive(name, arguments, location)
            }
            StatementKind::Instruction { mnemonic, operands } => {
                self.emit_instruction(mnemonic, operands, location)
            }
        }
    }

    fn define_label(&mut self, name: &str, location: &SourceLocation) {
        if let Some(existing) = self.labels.get(name) {
            let message = format!(
                "Label \"{}\" already defined in {}, ignoring this definition.",
                name, existing.location
            );
            self.warn(message, location);
            return;
        }

        let reserved = RegisterName::is_keyword(name);
        if reserved {
            self.warn(
                format!("\"{}\" is a keyword. This label can not be referenced.", name),
                location,
            );
        }

        debug!("label {} = 0x{:04x}", name, self.pc);
        self.labels.insert(
            name.to_string(),
            Label {
                address: self.pc,
                location: location.clone(),
                reserved,
            },
        );
    }

    // ---- directives ----

    fn emit_directive(
        &mut self,
        name: &str,
        arguments: &[Expr],
        location: &SourceLocation,
    ) -> Result<(), AssemblerError> {
        if !opcode_tables::is_known_directive(name) {
            self.warn(format!("Ignoring unknown directive \"{}\".", name), location);
            return Ok(());
        }

        let lower = name.to_ascii_lowercase();
        if DATA_DIRECTIVES.contains(&lower.as_str()) {
            for argument in arguments {
                self.emit_data(argument, location)?;
            }
            return Ok(());
        }

        if ORIGIN_DIRECTIVES.contains(&lower.as_str()) {
            return self.set_origin(arguments, location);
        }

        Err(AssemblerError::Directive(
            format!("Not yet implemented: \"{}\".", name),
            location.clone(),
        ))
    }

    fn emit_data(&mut self, argument: &Expr, location: &SourceLocation) -> Result<(), AssemblerError> {
        if let Expr::Str(text) = argument {
            for unit in text.encode_utf16() {
                self.emit(unit);
            }
            return Ok(());
        }

        match expr::evaluate(argument, ResolutionMode::Emit, location)? {
            Evaluation::Value(Resolved {
                register: Some(register),
                ..
            }) => Err(AssemblerError::Structural(
                format!("Register \"{}\" is not allowed in data.", register),
                location.clone(),
            )),
            Evaluation::Value(resolved) => {
                self.emit(resolved.value as Word);
                Ok(())
            }
            Evaluation::Deferred => {
                let slot = self.emit(PLACEHOLDER_WORD);
                self.defer(argument, false, slot, slot, ReferenceField::Data, location);
                Ok(())
            }
        }
    }

    fn set_origin(&mut self, arguments: &[Expr], location: &SourceLocation) -> Result<(), AssemblerError> {
        let argument = match arguments {
            [argument] => argument,
            _ => {
                return Err(AssemblerError::Structural(
                    format!("ORG takes exactly one argument. Got {}", arguments.len()),
                    location.clone(),
                ))
            }
        };

        let resolved = expr::resolve(argument, &self.labels, location)?;
        if let Some(register) = resolved.register {
            return Err(AssemblerError::Structural(
                format!("Register \"{}\" is not allowed in ORG.", register),
                location.clone(),
            ));
        }
        self.pc = resolved.value as Word;
        debug!("org 0x{:04x}", self.pc);
        Ok(())
    }

    // ---- instructions ----

    fn emit_instruction(
        &mut self,
        mnemonic: &str,
        operands: &[Operand],
        location: &SourceLocation,
    ) -> Result<(), AssemblerError> {
        let info = opcode_tables::lookup_mnemonic(mnemonic).ok_or_else(|| {
            AssemblerError::Structural(
                format!("Unknown mnemonic \"{}\".", mnemonic),
                location.clone(),
            )
        })?;

        if operands.len() != info.operand_count() {
            return Err(AssemblerError::Structural(
                format!("Invalid number of parameters. Got {}", operands.len()),
                location.clone(),
            ));
        }

        let opcode_slot = self.emit(PLACEHOLDER_WORD);
        let word = match info.opcode {
            Opcode::Basic(op) => {
                let a = self.encode_operand(&operands[1], OperandField::A, opcode_slot, location)?;
                let b = self.encode_operand(&operands[0], OperandField::B, opcode_slot, location)?;
                encode_basic(op.code(), b, a)
            }
            Opcode::Special(SpecialOp::Rfi) => encode_special(SpecialOp::Rfi.code(), 0),
            Opcode::Special(op) => {
                let a = self.encode_operand(&operands[0], OperandField::A, opcode_slot, location)?;
                encode_special(op.code(), a)
            }
        };
        self.words[opcode_slot] = word;
        Ok(())
    }

    /// Encode one operand, emitting its trailing word if it has one
    fn encode_operand(
        &mut self,
        operand: &Operand,
        field: OperandField,
        opcode_slot: usize,
        location: &SourceLocation,
    ) -> Result<u8, AssemblerError> {
        match operand {
            Operand::Direct(Expr::Register(register)) => {
                register_code(*register, field, location)
            }
            Operand::Direct(expr) => {
                match expr::evaluate(expr, ResolutionMode::Emit, location)? {
                    Evaluation::Value(Resolved {
                        register: Some(_), ..
                    }) => Err(registers_need_deref(location)),
                    Evaluation::Value(resolved) => Ok(self.literal(resolved.value, field)),
                    Evaluation::Deferred => {
                        let slot = self.emit(PLACEHOLDER_WORD);
                        self.defer(expr, false, slot, opcode_slot, field.into(), location);
                        Ok(OPERAND_NEXT_WORD)
                    }
                }
            }
            Operand::Indirect(expr) => {
                match expr::evaluate(expr, ResolutionMode::Emit, location)? {
                    Evaluation::Value(Resolved {
                        value,
                        register: Some(register),
                    }) => {
                        if matches!(expr, Expr::Register(_)) {
                            indirect_register_code(register, location)
                        } else {
                            let code = offset_register_code(register, location)?;
                            self.emit(value as Word);
                            Ok(code)
                        }
                    }
                    Evaluation::Value(resolved) => {
                        self.emit(resolved.value as Word);
                        Ok(OPERAND_INDIRECT_NEXT_WORD)
                    }
                    Evaluation::Deferred => {
                        let slot = self.emit(PLACEHOLDER_WORD);
                        self.defer(expr, true, slot, opcode_slot, field.into(), location);
                        Ok(OPERAND_INDIRECT_NEXT_WORD)
                    }
                }
            }
            Operand::Pick(expr) => {
                match expr::evaluate(expr, ResolutionMode::Emit, location)? {
                    Evaluation::Value(Resolved {
                        register: Some(register),
                        ..
                    }) => Err(AssemblerError::Structural(
                        format!("Register \"{}\" is not allowed in PICK.", register),
                        location.clone(),
                    )),
                    Evaluation::Value(resolved) => {
                        self.emit(resolved.value as Word);
                        Ok(OPERAND_PICK)
                    }
                    Evaluation::Deferred => {
                        let slot = self.emit(PLACEHOLDER_WORD);
                        self.defer(expr, false, slot, opcode_slot, field.into(), location);
                        Ok(OPERAND_PICK)
                    }
                }
            }
        }
    }

    /// Literal operand: inline when it fits the a field, otherwise a trailing word
    fn literal(&mut self, value: i64, field: OperandField) -> u8 {
        if field == OperandField::A {
            if let Some(code) = OperandMode::inline_code(value) {
                return code;
            }
        }
        self.emit(value as Word);
        OPERAND_NEXT_WORD
    }

    fn defer(
        &mut self,
        expr: &Expr,
        deref: bool,
        slot: usize,
        opcode_slot: usize,
        field: ReferenceField,
        location: &SourceLocation,
    ) {
        let kind = match expr {
            Expr::Identifier(name) => ReferenceKind::Label(name.clone()),
            _ => ReferenceKind::Expression {
                expr: expr.clone(),
                deref,
            },
        };
        debug!(
            "pending {:?} reference at slot {} ({:?})",
            field, slot, kind
        );
        self.pending.push(PendingReference {
            slot,
            opcode_slot,
            field,
            kind,
            location: location.clone(),
        });
    }
}

/// Code for a bare register operand
fn register_code(
    register: RegisterName,
    field: OperandField,
    location: &SourceLocation,
) -> Result<u8, AssemblerError> {
    match register {
        RegisterName::General(reg) => Ok(reg.code()),
        RegisterName::Push if field == OperandField::A => Err(AssemblerError::Structural(
            "PUSH is not allowed in this context.".to_string(),
            location.clone(),
        )),
        RegisterName::Pop if field == OperandField::B => Err(AssemblerError::Structural(
            "POP is not allowed in this context.".to_string(),
            location.clone(),
        )),
        RegisterName::Push | RegisterName::Pop => Ok(OPERAND_PUSH_POP),
        RegisterName::Peek => Ok(OPERAND_PEEK),
        RegisterName::Sp => Ok(OPERAND_SP),
        RegisterName::Pc => Ok(OPERAND_PC),
        RegisterName::Ex => Ok(OPERAND_EX),
        RegisterName::Ia => Err(AssemblerError::Structural(
            "The register \"IA\" can not be used as an operand.".to_string(),
            location.clone(),
        )),
    }
}

/// Code for `[register]`
fn indirect_register_code(register: RegisterName, location: &SourceLocation) -> Result<u8, AssemblerError> {
    match register {
        RegisterName::General(reg) => Ok(0x08 + reg.code()),
        RegisterName::Sp => Ok(OPERAND_PEEK),
        other => Err(AssemblerError::Structural(
            format!("The register \"{}\" can not be dereferenced.", other),
            location.clone(),
        )),
    }
}

/// Code for `[register + offset]`
pub(crate) fn offset_register_code(
    register: RegisterName,
    location: &SourceLocation,
) -> Result<u8, AssemblerError> {
    match register {
        RegisterName::General(reg) => Ok(0x10 + reg.code()),
        RegisterName::Sp => Ok(OPERAND_PICK),
        other => Err(AssemblerError::Structural(
            format!("The register \"{}\" is not allowed in an expression.", other),
            location.clone(),
        )),
    }
}

pub(crate) fn registers_need_deref(location: &SourceLocation) -> AssemblerError {
    AssemblerError::Structural(
        "Registers inside expressions are only allowed in dereferences.".to_string(),
        location.clone(),
    )
}
