/// Pass 2 of the assembler: resolution
///
/// Every pending reference recorded in pass 1 is consumed exactly once.
/// Label references write the label address into their slot. Expression
/// references are evaluated with the final label table; when a dereferenced
/// expression turns out to contain a register, the owning instruction word
/// is re-patched from `[next word]` to `[register + next word]` (or PICK for SP).
use crate::assembler::codegen::{
    offset_register_code, registers_need_deref, AssemblyContext, PendingReference, ReferenceKind,
};
use crate::assembler::error::AssemblerError;
use crate::assembler::expr;
use crate::vm::Word;
use log::debug;

impl AssemblyContext {
    pub fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        let pending = std::mem::take(&mut self.pending);
        debug!("pass 2: {} pending references", pending.len());

        for reference in &pending {
            self.resolve_reference(reference)?;
        }
        Ok(())
    }

    fn resolve_reference(&mut self, reference: &PendingReference) -> Result<(), AssemblerError> {
        let location = &reference.location;

        match &reference.kind {
            ReferenceKind::Label(name) => {
                let address = expr::lookup_label(&self.labels, name, location)?;
                debug!(
                    "patch slot {} with label {} = 0x{:04x}",
                    reference.slot, name, address
                );
                self.words[reference.slot] = address;
            }
            ReferenceKind::Expression { expr, deref } => {
                let resolved = expr::resolve(expr, &self.labels, location)?;

                if let Some(register) = resolved.register {
                    let field = match reference.field.operand_field() {
                        Some(field) if *deref => field,
                        _ => return Err(registers_need_deref(location)),
                    };
                    let code = offset_register_code(register, location)?;
                    let word = self.words[reference.opcode_slot];
                    self.words[reference.opcode_slot] = field.patch(word, code);
                    debug!(
                        "re-patch operand {:?} of slot {} to {} offset",
                        field, reference.opcode_slot, register
                    );
                }

                debug!(
                    "patch slot {} with expression value 0x{:04x}",
                    reference.slot, resolved.value as Word
                );
                self.words[reference.slot] = resolved.value as Word;
            }
        }
        Ok(())
    }
}
