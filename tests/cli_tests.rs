//! Command line tests for `dcpu-asm` and the `dcpu16` runner
//!
//! Sources are written to a scratch directory under the system temp dir and
//! the built binaries are driven through `std::process::Command`.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dcpu16-{}-{}", name, std::process::id()));
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

#[test]
fn test_assembler_writes_image_and_symbols() {
    let dir = scratch_dir("asm");
    let source = dir.join("prog.dasm");
    let image = dir.join("prog.bin");
    fs::write(&source, ".include \"lib.dasm\"\n:main SET A, 0x30\nJSR main\n").unwrap();
    fs::write(dir.join("lib.dasm"), ":table DAT 1, 2\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_dcpu-asm"))
        .arg(&source)
        .arg("-o")
        .arg(&image)
        .arg("--symbols")
        .output()
        .expect("run dcpu-asm");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("0000 table"));
    assert!(stdout.contains("0002 main"));

    let bytes = fs::read(&image).unwrap();
    assert_eq!(
        bytes,
        vec![0x01, 0x00, 0x02, 0x00, 0x01, 0x7c, 0x30, 0x00, 0x20, 0x7c, 0x02, 0x00]
    );
}

#[test]
fn test_assembler_reports_errors_with_location() {
    let dir = scratch_dir("asm-error");
    let source = dir.join("broken.dasm");
    fs::write(&source, "SET A, 1\nSET PC, nowhere\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_dcpu-asm"))
        .arg(&source)
        .arg("-o")
        .arg(dir.join("broken.bin"))
        .output()
        .expect("run dcpu-asm");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("broken.dasm:2"));
    assert!(stderr.contains("Can't find definition for label \"nowhere\""));
}

#[test]
fn test_runner_stops_at_breakpoint() {
    let dir = scratch_dir("run");
    let source = dir.join("halt.dasm");
    fs::write(&source, "SET A, 0x42\n:halt SET PC, halt\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_dcpu16"))
        .arg(&source)
        .arg("--break")
        .arg("0x2")
        .output()
        .expect("run dcpu16");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Stopped: breakpoint at 0x0002 after 1 steps"));
    assert!(stdout.contains("A=0042"));
}

#[test]
fn test_runner_reads_config() {
    let dir = scratch_dir("config");
    let source = dir.join("spin.dasm");
    let config = dir.join("dcpu16.toml");
    fs::write(&source, ":spin ADD A, 1\nSET PC, spin\n").unwrap();
    fs::write(&config, "[runtime]\nbatch_size = 10\nmax_steps = 25\ntick_interval_ms = 0\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_dcpu16"))
        .arg(&source)
        .arg("--config")
        .arg(&config)
        .output()
        .expect("run dcpu16");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Stopped: step limit reached after 25 steps"), "stdout: {}", stdout);
}

#[test]
fn test_runner_step_cap_is_exact_in_both_modes() {
    let dir = scratch_dir("cap");
    let source = dir.join("loop.dasm");
    fs::write(&source, ":spin ADD A, 1\nSET PC, spin\n").unwrap();

    for trace in [false, true] {
        let mut command = Command::new(env!("CARGO_BIN_EXE_dcpu16"));
        command.arg(&source).arg("--max-steps").arg("5");
        if trace {
            command.arg("--trace");
        }
        let output = command.output().expect("run dcpu16");

        assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(
            stdout.contains("Stopped: step limit reached after 5 steps"),
            "trace={} stdout: {}",
            trace,
            stdout
        );
        // ADD ran at steps 1, 3 and 5
        assert!(stdout.contains("A=0003"), "trace={} stdout: {}", trace, stdout);
    }
}
