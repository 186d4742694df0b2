// Conditional instructions and the skip chain

#[cfg(test)]
mod tests {
    use crate::test_utils::{engine_with, engine_with_words, run_steps, word};
    use crate::vm::Register;
    use test_log::test;

    /// Runs `condition` with A and B preset, then reports whether the
    /// instruction after it executed
    fn condition_passes(a: u16, b: u16, condition: &str) -> bool {
        let source = format!(
            "SET A, {}\nSET B, {}\n{}\nSET C, 1\nSET X, 1",
            a, b, condition
        );
        let mut cpu = engine_with(&source);
        run_steps(&mut cpu, 4);
        assert_eq!(cpu.register(Register::X), if cpu.register(Register::C) == 1 { 0 } else { 1 });
        cpu.register(Register::C) == 1
    }

    #[test]
    fn test_ife() {
        assert!(condition_passes(5, 5, "IFE A, B"));
        assert!(!condition_passes(5, 6, "IFE A, B"));
    }

    #[test]
    fn test_ifn() {
        assert!(condition_passes(5, 6, "IFN A, B"));
        assert!(!condition_passes(5, 5, "IFN A, B"));
    }

    #[test]
    fn test_ifb_and_ifc() {
        assert!(condition_passes(0x0f, 0x01, "IFB A, B"));
        assert!(!condition_passes(0x0f, 0x10, "IFB A, B"));
        assert!(condition_passes(0x0f, 0x10, "IFC A, B"));
        assert!(!condition_passes(0x0f, 0x01, "IFC A, B"));
    }

    #[test]
    fn test_ifg_is_unsigned() {
        assert!(condition_passes(0xfff6, 5, "IFG A, B"));
        assert!(!condition_passes(5, 5, "IFG A, B"));
    }

    #[test]
    fn test_ifa_is_signed() {
        assert!(!condition_passes(0xfff6, 5, "IFA A, B"));
        assert!(condition_passes(5, 0xfff6, "IFA A, B"));
    }

    #[test]
    fn test_ifl_is_unsigned() {
        assert!(condition_passes(5, 0xfff6, "IFL A, B"));
        assert!(!condition_passes(0xfff6, 5, "IFL A, B"));
    }

    #[test]
    fn test_ifu_is_signed() {
        assert!(condition_passes(0xfff6, 5, "IFU A, B"));
        assert!(!condition_passes(5, 0xfff6, "IFU A, B"));
    }

    #[test]
    fn test_skip_consumes_trailing_words() {
        let mut cpu = engine_with("SET A, 1\nIFE A, 2\nSET [0x1000], 0x2000\nSET B, 3");
        run_steps(&mut cpu, 3);
        assert_eq!(cpu.read_memory(0x1000), 0);
        assert_eq!(cpu.register(Register::B), 3);
    }

    #[test]
    fn test_skip_chain_cascades() {
        // the failing IFE skips the IFN and the SET it guards
        let mut cpu = engine_with("IFE A, 1\nIFN A, 2\nSET A, 2\nSET A, 1");
        run_steps(&mut cpu, 2);
        assert_eq!(cpu.register(Register::A), 1);
    }

    #[test]
    fn test_chained_conditions_all_pass() {
        let mut cpu = engine_with("SET A, 1\nIFE A, 1\nIFN A, 2\nSET A, 3\nSET B, 1");
        run_steps(&mut cpu, 5);
        assert_eq!(cpu.register(Register::A), 3);
        assert_eq!(cpu.register(Register::B), 1);
    }

    #[test]
    fn test_chained_conditions_last_fails() {
        let mut cpu = engine_with("SET A, 1\nIFE A, 1\nIFN A, 1\nSET A, 3\nSET B, 1");
        run_steps(&mut cpu, 4);
        assert_eq!(cpu.register(Register::A), 1);
        assert_eq!(cpu.register(Register::B), 1);
    }

    #[test]
    fn test_skipped_push_does_not_move_sp() {
        let mut cpu = engine_with("SET A, 1\nIFE A, 2\nSET PUSH, 5\nSET B, 1");
        run_steps(&mut cpu, 3);
        assert_eq!(cpu.sp(), 0);
        assert_eq!(cpu.read_memory(0xffff), 0);
        assert_eq!(cpu.register(Register::B), 1);
    }

    #[test]
    fn test_skipped_pop_does_not_move_sp() {
        let mut cpu = engine_with("SET PUSH, 7\nIFE A, 1\nSET B, POP\nSET C, POP");
        run_steps(&mut cpu, 3);
        assert_eq!(cpu.register(Register::B), 0);
        assert_eq!(cpu.register(Register::C), 7);
        assert_eq!(cpu.sp(), 0);
    }

    #[test]
    fn test_skipping_an_undecodable_word_is_not_an_error() {
        let mut cpu = engine_with_words(&[
            word(0x12, 0x00, 0x22), // IFE A, 1 with A == 0
            0x0018,
            word(0x01, 0x01, 0x22), // SET B, 1
        ]);
        run_steps(&mut cpu, 2);
        assert_eq!(cpu.register(Register::B), 1);
        assert_eq!(cpu.pc(), 3);
    }

    #[test]
    fn test_conditional_never_writes_literal_operands() {
        let mut cpu = engine_with("IFE 0x1234, 0x1234\nSET A, 1");
        run_steps(&mut cpu, 2);
        assert_eq!(cpu.register(Register::A), 1);
    }
}
