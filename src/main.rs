use dcpu16::assembler::{Assembler, FsFileReader};
use dcpu16::config::Config;
use dcpu16::debugger::{Debugger, StopReason};
use dcpu16::interpreter::{Interpreter, RunState};
use dcpu16::observer::ExecutionEvent;
use dcpu16::vm::{Word, VM};
use env_logger::{Builder, Env};
use log::{debug, info};
use std::env;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

const SOURCE_EXTENSIONS: &[&str] = &["dasm", "asm", "dasm16"];

struct Options {
    program: String,
    config: Option<String>,
    base: Option<Word>,
    breakpoints: Vec<Word>,
    max_steps: Option<u64>,
    trace: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();

    // Display help information if no program provided
    if args.len() < 2 || args[1] == "-h" || args[1] == "--help" {
        print_usage(&args[0]);
        return Ok(());
    }

    let options = parse_options(&args)?;
    let mut config = match &options.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(base) = options.base {
        config.assembler.base_address = base;
    }
    if options.max_steps.is_some() {
        config.runtime.max_steps = options.max_steps;
    }
    config.runtime.breakpoints.extend(&options.breakpoints);

    let mut interpreter = Interpreter::with_config(&config.runtime);
    let base = config.assembler.base_address;
    let path = Path::new(&options.program);

    let entry = if is_source(path) {
        debug!("Assembling {}", path.display());
        let output = Assembler::from_config(&config.assembler).assemble_file(path, &FsFileReader)?;
        for warning in &output.warnings {
            eprintln!("{}", warning);
        }
        interpreter.load(&output.bytes(), base);
        output.entry_address
    } else {
        debug!("Loading image {}", path.display());
        let image = fs::read(path).map_err(|e| format!("Cannot read '{}': {}", path.display(), e))?;
        interpreter.load(&image, base);
        base
    };
    interpreter.set_pc(entry);
    info!("Starting at 0x{:04x}", entry);

    let max_steps = config.runtime.max_steps;
    let reason = if options.trace {
        let mut debugger = Debugger::new(interpreter);
        debugger.set_trace(true);
        let reason = debugger.run(max_steps.unwrap_or(u64::MAX))?;
        interpreter = debugger.interpreter;
        match reason {
            StopReason::Breakpoint(addr) => format!("breakpoint at 0x{:04x}", addr),
            StopReason::StepLimit => "step limit reached".to_string(),
        }
    } else {
        run_scheduler(
            &mut interpreter,
            max_steps,
            Duration::from_millis(config.runtime.tick_interval_ms),
        )?
    };

    println!("Stopped: {} after {} steps", reason, interpreter.step_count());
    println!("{}", interpreter.vm());
    Ok(())
}

/// Host scheduler: start, then one batch per tick until the engine stops
fn run_scheduler(
    interpreter: &mut Interpreter,
    max_steps: Option<u64>,
    tick: Duration,
) -> Result<String, Box<dyn std::error::Error>> {
    interpreter.subscribe(Box::new(|event: ExecutionEvent, vm: &VM| {
        if event == ExecutionEvent::Batch {
            debug!("batch done at PC 0x{:04x}", vm.pc);
        }
    }));

    if max_steps == Some(0) {
        return Ok("step limit reached".to_string());
    }

    interpreter.start()?;
    loop {
        // never let a batch run past the step cap
        let budget = match max_steps {
            Some(limit) => {
                let remaining = limit.saturating_sub(interpreter.step_count());
                if remaining == 0 && interpreter.is_running() {
                    interpreter.stop();
                    return Ok("step limit reached".to_string());
                }
                usize::try_from(remaining).unwrap_or(usize::MAX)
            }
            None => usize::MAX,
        };

        if !interpreter.run_slice_limited(budget)? {
            break;
        }
        thread::sleep(tick);
    }

    Ok(match interpreter.run_state() {
        RunState::Breakpoint(addr) => format!("breakpoint at 0x{:04x}", addr),
        RunState::Idle | RunState::Running => "stopped".to_string(),
    })
}

fn is_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SOURCE_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

fn parse_address(text: &str) -> Result<Word, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => Word::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    };
    parsed.ok_or_else(|| format!("Invalid address: {}", text))
}

fn parse_options(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        program: String::new(),
        config: None,
        base: None,
        breakpoints: Vec::new(),
        max_steps: None,
        trace: false,
    };

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "-c" | "--config" => {
                options.config = Some(value.ok_or("--config requires a filename")?.clone());
                i += 2;
            }
            "-b" | "--base" => {
                options.base = Some(parse_address(value.ok_or("--base requires an address")?)?);
                i += 2;
            }
            "--break" => {
                let addr = parse_address(value.ok_or("--break requires an address")?)?;
                options.breakpoints.push(addr);
                i += 2;
            }
            "--max-steps" => {
                let text = value.ok_or("--max-steps requires a count")?;
                let steps = text
                    .parse()
                    .map_err(|_| format!("Invalid step count: {}", text))?;
                options.max_steps = Some(steps);
                i += 2;
            }
            "--trace" => {
                options.trace = true;
                i += 1;
            }
            arg if arg.starts_with('-') => return Err(format!("Unknown option '{}'", arg)),
            arg => {
                if !options.program.is_empty() {
                    return Err("Multiple programs specified".to_string());
                }
                options.program = arg.to_string();
                i += 1;
            }
        }
    }

    if options.program.is_empty() {
        return Err("No program specified".to_string());
    }
    Ok(options)
}

fn print_usage(program_name: &str) {
    println!("dcpu16 - DCPU-16 assembler and emulator");
    println!();
    println!("Usage: {} <program.dasm | image.bin> [options]", program_name);
    println!();
    println!("Options:");
    println!("  -c, --config <file>    TOML configuration file");
    println!("  -b, --base <addr>      Load address (default: 0)");
    println!("  --break <addr>         Set a breakpoint (repeatable)");
    println!("  --max-steps <n>        Stop after n instructions");
    println!("  --trace                Log every executed instruction");
    println!();
    println!("Sources ending in .dasm, .asm or .dasm16 are assembled first;");
    println!("anything else is loaded as a little-endian word image.");
}
