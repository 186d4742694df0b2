// Expression evaluator tests

#[cfg(test)]
mod tests {
    use crate::assembler::ast::{BinaryOp, Expr, RegisterName, UnaryOp};
    use crate::assembler::codegen::{Label, LabelTable};
    use crate::assembler::error::{AssemblerError, SourceLocation};
    use crate::assembler::expr::{evaluate, resolve, Evaluation, ResolutionMode, Resolved};
    use crate::vm::Register;
    use test_log::test;

    fn here() -> SourceLocation {
        SourceLocation::new("test.dasm", 7)
    }

    fn num(value: i64) -> Expr {
        Expr::Number(value)
    }

    fn ident(name: &str) -> Expr {
        Expr::Identifier(name.to_string())
    }

    fn reg(register: Register) -> Expr {
        Expr::Register(RegisterName::General(register))
    }

    fn labels() -> LabelTable {
        let mut table = LabelTable::new();
        for (name, address, reserved) in [("start", 0x10, false), ("data", 0x200, false), ("X", 0x30, true)] {
            table.insert(
                name.to_string(),
                Label {
                    address,
                    location: here(),
                    reserved,
                },
            );
        }
        table
    }

    fn constant(expr: &Expr) -> i64 {
        match evaluate(expr, ResolutionMode::Emit, &here()).unwrap() {
            Evaluation::Value(Resolved {
                value,
                register: None,
            }) => value,
            other => panic!("expected a constant, got {:?}", other),
        }
    }

    fn structural_message(expr: &Expr) -> String {
        match evaluate(expr, ResolutionMode::Emit, &here()) {
            Err(AssemblerError::Structural(message, location)) => {
                assert_eq!(location, here());
                message
            }
            other => panic!("expected a structural error, got {:?}", other),
        }
    }

    #[test]
    fn test_arithmetic() {
        let expr = Expr::binary(
            BinaryOp::Sub,
            Expr::binary(BinaryOp::Mul, num(6), num(7)),
            Expr::binary(BinaryOp::Div, num(9), num(2)),
        );
        assert_eq!(constant(&expr), 38);
        assert_eq!(constant(&Expr::binary(BinaryOp::Mod, num(17), num(5))), 2);
    }

    #[test]
    fn test_bitwise_and_shifts() {
        assert_eq!(constant(&Expr::binary(BinaryOp::And, num(0xff0), num(0x0ff))), 0x0f0);
        assert_eq!(constant(&Expr::binary(BinaryOp::Or, num(0xf00), num(0x00f))), 0xf0f);
        assert_eq!(constant(&Expr::binary(BinaryOp::Xor, num(0xff), num(0x0f))), 0xf0);
        assert_eq!(constant(&Expr::binary(BinaryOp::Shl, num(1), num(4))), 16);
        assert_eq!(constant(&Expr::binary(BinaryOp::Shr, num(0x100), num(4))), 16);
        assert_eq!(constant(&Expr::binary(BinaryOp::Shl, num(1), num(100))), 0);
        assert_eq!(constant(&Expr::binary(BinaryOp::Shl, num(1), num(-1))), 0);
    }

    #[test]
    fn test_unary() {
        assert_eq!(constant(&Expr::unary(UnaryOp::Minus, num(5))), -5);
        assert_eq!(constant(&Expr::unary(UnaryOp::Not, num(0))), -1);
        assert_eq!(constant(&Expr::unary(UnaryOp::Plus, num(3))), 3);
    }

    #[test]
    fn test_strings_evaluate_to_first_character() {
        assert_eq!(constant(&Expr::Str("AB".to_string())), 0x41);
        assert_eq!(constant(&Expr::Str(String::new())), 0);
    }

    #[test]
    fn test_labels_defer_in_emit_mode() {
        let expr = Expr::binary(BinaryOp::Add, ident("data"), num(1));
        assert_eq!(
            evaluate(&expr, ResolutionMode::Emit, &here()).unwrap(),
            Evaluation::Deferred
        );
        assert_eq!(
            evaluate(&expr, ResolutionMode::Resolve(&labels()), &here()).unwrap(),
            Evaluation::Value(Resolved::constant(0x201))
        );
    }

    #[test]
    fn test_register_in_sum() {
        let expr = Expr::binary(BinaryOp::Add, reg(Register::B), num(2));
        assert_eq!(
            evaluate(&expr, ResolutionMode::Emit, &here()).unwrap(),
            Evaluation::Value(Resolved {
                value: 2,
                register: Some(RegisterName::General(Register::B)),
            })
        );

        let expr = Expr::binary(
            BinaryOp::Add,
            ident("start"),
            Expr::unary(UnaryOp::Plus, Expr::Register(RegisterName::Sp)),
        );
        assert_eq!(
            resolve(&expr, &labels(), &here()).unwrap(),
            Resolved {
                value: 0x10,
                register: Some(RegisterName::Sp),
            }
        );
    }

    #[test]
    fn test_register_outside_sum() {
        let expected = "Registers inside expressions are allowed in sums only.";
        assert_eq!(
            structural_message(&Expr::binary(BinaryOp::Mul, reg(Register::A), num(2))),
            expected
        );
        assert_eq!(
            structural_message(&Expr::binary(BinaryOp::Sub, num(2), reg(Register::A))),
            expected
        );
        assert_eq!(
            structural_message(&Expr::unary(UnaryOp::Minus, reg(Register::A))),
            expected
        );
    }

    #[test]
    fn test_multiple_registers() {
        let expr = Expr::binary(BinaryOp::Add, reg(Register::A), reg(Register::B));
        assert_eq!(
            structural_message(&expr),
            "Found multiple registers in one expression."
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            structural_message(&Expr::binary(BinaryOp::Div, num(1), num(0))),
            "Division by zero in expression."
        );
        assert_eq!(
            structural_message(&Expr::binary(BinaryOp::Mod, num(1), num(0))),
            "Division by zero in expression."
        );
    }

    #[test]
    fn test_unknown_and_reserved_labels() {
        let err = resolve(&ident("missing"), &labels(), &here()).unwrap_err();
        assert_eq!(
            err,
            AssemblerError::Resolution(
                "Can't find definition for label \"missing\"".to_string(),
                here()
            )
        );

        let err = resolve(&ident("X"), &labels(), &here()).unwrap_err();
        assert!(matches!(err, AssemblerError::Resolution(_, _)));
    }

    #[test]
    fn test_references_label() {
        assert!(Expr::binary(BinaryOp::Add, num(1), ident("x")).references_label());
        assert!(!Expr::unary(UnaryOp::Minus, reg(Register::A)).references_label());
    }
}
