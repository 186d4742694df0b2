// Debugger stepping, history and breakpoint management

#[cfg(test)]
mod tests {
    use crate::debugger::{Debugger, StopReason};
    use crate::test_utils::engine_with;
    use crate::vm::Register;
    use test_log::test;

    const PROGRAM: &str = "SET A, 1\nSET B, 0x1000\nADD A, B\n:halt SET PC, halt";

    #[test]
    fn test_breakpoint_management() {
        let mut debugger = Debugger::new(engine_with(PROGRAM));
        assert!(debugger.add_breakpoint(3));
        assert!(!debugger.add_breakpoint(3));
        assert_eq!(debugger.list_breakpoints(), vec![3]);
        assert!(debugger.remove_breakpoint(3));
        assert!(!debugger.remove_breakpoint(3));
        assert!(debugger.list_breakpoints().is_empty());
    }

    #[test]
    fn test_run_to_breakpoint() {
        let mut debugger = Debugger::new(engine_with(PROGRAM));
        debugger.add_breakpoint(3);
        let reason = debugger.run(100).unwrap();
        assert_eq!(reason, StopReason::Breakpoint(3));
        assert_eq!(debugger.interpreter.register(Register::B), 0x1000);
        assert_eq!(debugger.interpreter.register(Register::A), 1);
    }

    #[test]
    fn test_run_step_limit() {
        let mut debugger = Debugger::new(engine_with(PROGRAM));
        assert_eq!(debugger.run(10).unwrap(), StopReason::StepLimit);
        assert_eq!(debugger.interpreter.step_count(), 10);
        assert_eq!(debugger.interpreter.register(Register::A), 0x1001);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut debugger = Debugger::new(engine_with(PROGRAM));
        debugger.set_max_history(2);
        for _ in 0..3 {
            debugger.step().unwrap();
        }
        assert_eq!(
            debugger.history(10),
            vec!["0001: SET B, 0x1000".to_string(), "0003: ADD A, B".to_string()]
        );
        assert_eq!(debugger.history(1), vec!["0003: ADD A, B".to_string()]);
    }

    #[test]
    fn test_disassemble_range() {
        let debugger = Debugger::new(engine_with(PROGRAM));
        assert_eq!(
            debugger.disassemble_range(0, 3),
            vec![
                "0000: SET A, 1".to_string(),
                "0001: SET B, 0x1000".to_string(),
                "0003: ADD A, B".to_string(),
            ]
        );
        assert_eq!(debugger.disassemble_current(), "0000: SET A, 1");
    }

    #[test]
    fn test_state_shows_stack() {
        let mut debugger = Debugger::new(engine_with("SET PUSH, 0x4242\nSET A, 1"));
        debugger.set_trace(true);
        debugger.step().unwrap();
        let state = debugger.state();
        assert!(state.contains("SP: ffff"));
        assert!(state.contains("[ffff] 4242"));
        assert!(state.contains("Current: 0002: SET A, 1"));
    }
}
