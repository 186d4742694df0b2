// Instruction word layout, operand codes and the opcode table

#[cfg(test)]
mod tests {
    use crate::instruction::{
        encode_basic, encode_special, split_word, BasicOp, DecodeError, Instruction, Opcode,
        OperandField, OperandMode, SpecialOp,
    };
    use crate::opcode_tables::{get_opcode_info, is_known_directive, lookup_mnemonic};
    use crate::vm::Register;
    use test_log::test;

    #[test]
    fn test_known_encodings() {
        // SET A, 0x30 and SET [0x1000], 0x20
        assert_eq!(encode_basic(0x01, 0x00, 0x1f), 0x7c01);
        assert_eq!(encode_basic(0x01, 0x1e, 0x1f), 0x7fc1);
        assert_eq!(split_word(0x7fc1), (0x01, 0x1e, 0x1f));
    }

    #[test]
    fn test_special_layout() {
        let word = encode_special(SpecialOp::Jsr.code(), 0x1f);
        assert_eq!(word, 0x7c20);
        let instruction = Instruction::decode(word).unwrap();
        assert_eq!(instruction.opcode, Opcode::Special(SpecialOp::Jsr));
        assert_eq!(instruction.b, None);
        assert_eq!(instruction.a, OperandMode::NextWord);
        assert_eq!(instruction.size(), 2);
    }

    #[test]
    fn test_decode_sizes() {
        let instruction = Instruction::decode(0x7fc1).unwrap();
        assert_eq!(instruction.opcode, Opcode::Basic(BasicOp::Set));
        assert_eq!(instruction.b, Some(OperandMode::IndirectNextWord));
        assert_eq!(instruction.extra_words(), 2);
        assert_eq!(instruction.size(), 3);

        // SET A, B
        let instruction = Instruction::decode(encode_basic(0x01, 0x00, 0x01)).unwrap();
        assert_eq!(instruction.size(), 1);
    }

    #[test]
    fn test_decode_unknown_opcodes() {
        assert_eq!(
            Instruction::decode(0x0018),
            Err(DecodeError::UnknownBasicOpcode(0x0018))
        );
        let word = encode_special(0x02, 0x00);
        assert_eq!(
            Instruction::decode(word),
            Err(DecodeError::UnknownSpecialOpcode(word))
        );
    }

    #[test]
    fn test_operand_modes() {
        assert_eq!(OperandMode::from_code(0x03), OperandMode::Register(Register::X));
        assert_eq!(
            OperandMode::from_code(0x0e),
            OperandMode::RegisterIndirect(Register::I)
        );
        assert_eq!(
            OperandMode::from_code(0x17),
            OperandMode::RegisterOffset(Register::J)
        );
        assert_eq!(OperandMode::from_code(0x18), OperandMode::PushPop);
        assert_eq!(OperandMode::from_code(0x1a), OperandMode::Pick);
        assert!(OperandMode::Pick.uses_next_word());
        assert!(!OperandMode::Peek.uses_next_word());
    }

    #[test]
    fn test_inline_literals() {
        assert_eq!(OperandMode::from_code(0x20), OperandMode::Inline(0xffff));
        assert_eq!(OperandMode::from_code(0x21), OperandMode::Inline(0));
        assert_eq!(OperandMode::from_code(0x3f), OperandMode::Inline(30));
        assert_eq!(OperandMode::Inline(0xffff).code(), 0x20);
        assert_eq!(OperandMode::Inline(30).code(), 0x3f);

        assert_eq!(OperandMode::inline_code(-1), Some(0x20));
        assert_eq!(OperandMode::inline_code(0xffff), Some(0x20));
        assert_eq!(OperandMode::inline_code(30), Some(0x3f));
        assert_eq!(OperandMode::inline_code(31), None);
        assert_eq!(OperandMode::inline_code(-2), None);
    }

    #[test]
    fn test_patch_field() {
        let word = encode_basic(0x01, 0x1e, 0x1f);
        let patched = OperandField::B.patch(word, 0x10);
        assert_eq!(split_word(patched), (0x01, 0x10, 0x1f));
        let patched = OperandField::A.patch(patched, 0x1a);
        assert_eq!(split_word(patched), (0x01, 0x10, 0x1a));
    }

    #[test]
    fn test_conditionals() {
        assert!(BasicOp::Ife.is_conditional());
        assert!(BasicOp::Ifu.is_conditional());
        assert!(!BasicOp::Set.is_conditional());
        assert!(!Opcode::Special(SpecialOp::Jsr).is_conditional());
    }

    #[test]
    fn test_mnemonic_lookup() {
        let set = lookup_mnemonic("set").unwrap();
        assert_eq!(set.opcode, Opcode::Basic(BasicOp::Set));
        assert_eq!(lookup_mnemonic("MOV"), Some(set));
        assert!(lookup_mnemonic("NOP").is_none());

        assert_eq!(lookup_mnemonic("RFI").unwrap().operand_count(), 0);
        assert_eq!(lookup_mnemonic("JSR").unwrap().operand_count(), 1);
        assert_eq!(lookup_mnemonic("IFE").unwrap().operand_count(), 2);
    }

    #[test]
    fn test_implemented_flags() {
        assert!(Opcode::Basic(BasicOp::Shl).is_implemented());
        assert!(!Opcode::Basic(BasicOp::Asr).is_implemented());
        assert!(!Opcode::Special(SpecialOp::Int).is_implemented());
        assert_eq!(
            get_opcode_info(Opcode::Special(SpecialOp::Hwi)).unwrap().mnemonic,
            "HWI"
        );
        assert_eq!(Opcode::Basic(BasicOp::Bor).to_string(), "BOR");
    }

    #[test]
    fn test_known_directives() {
        assert!(is_known_directive("DAT"));
        assert!(is_known_directive("org"));
        assert!(is_known_directive("macro"));
        assert!(!is_known_directive("include"));
    }
}
