// dcpu-asm - DCPU-16 Assembler
// Assembles source files into little-endian word images

use std::env;
use std::fs;
use std::path::Path;
use std::process;

use dcpu16::assembler::{Assembler, FsFileReader};
use dcpu16::config::Config;
use dcpu16::disassembler::Disassembler;
use env_logger::{Builder, Env};

fn main() {
    Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        process::exit(1);
    }

    let mut input_file = "";
    let mut output_file = String::new();
    let mut config_file: Option<String> = None;
    let mut base_address: Option<u16> = None;
    let mut listing = false;
    let mut symbols = false;
    let mut verbose = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-o" | "--output" => {
                output_file = option_value(&args, i, "-o requires a filename").to_string();
                i += 2;
            }
            "-c" | "--config" => {
                config_file = Some(option_value(&args, i, "--config requires a filename").to_string());
                i += 2;
            }
            "-b" | "--base" => {
                let value = option_value(&args, i, "--base requires an address");
                base_address = Some(parse_address(value).unwrap_or_else(|| {
                    eprintln!("Error: Invalid base address '{}'", value);
                    process::exit(1);
                }));
                i += 2;
            }
            "-l" | "--listing" => {
                listing = true;
                i += 1;
            }
            "-s" | "--symbols" => {
                symbols = true;
                i += 1;
            }
            "-v" | "--verbose" => {
                verbose = true;
                i += 1;
            }
            "-h" | "--help" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option '{}'", arg);
                print_usage(&args[0]);
                process::exit(1);
            }
            _ => {
                if input_file.is_empty() {
                    input_file = &args[i];
                } else {
                    eprintln!("Error: Multiple input files specified");
                    process::exit(1);
                }
                i += 1;
            }
        }
    }

    if input_file.is_empty() {
        eprintln!("Error: No input file specified");
        print_usage(&args[0]);
        process::exit(1);
    }

    let config = match &config_file {
        Some(path) => Config::load(path).unwrap_or_else(|err| {
            eprintln!("Error: {}", err);
            process::exit(1);
        }),
        None => Config::default(),
    };

    let base = base_address.unwrap_or(config.assembler.base_address);

    if output_file.is_empty() {
        let input_path = Path::new(input_file);
        let base_name = input_path.file_stem().unwrap_or_else(|| {
            eprintln!("Error: Invalid input filename");
            process::exit(1);
        });
        output_file = format!("{}.bin", base_name.to_string_lossy());
    }

    if verbose {
        println!(
            "Assembling {} -> {} (base 0x{:04x})",
            input_file, output_file, base
        );
    }

    let assembler = Assembler::with_base_address(base);
    let output = match assembler.assemble_file(Path::new(input_file), &FsFileReader) {
        Ok(output) => output,
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    };

    for warning in &output.warnings {
        eprintln!("{}", warning);
    }

    let bytes = output.bytes();
    if let Err(err) = fs::write(&output_file, &bytes) {
        eprintln!("Error writing '{}': {}", output_file, err);
        process::exit(1);
    }

    if listing {
        let disassembler = Disassembler::new(output.words(), output.base_address);
        print!("{}", disassembler.listing());
    }

    if symbols {
        for (name, address) in &output.labels {
            println!("{:04x} {}", address, name);
        }
    }

    if verbose {
        println!(
            "Wrote {} words ({} bytes) to {}, entry 0x{:04x}",
            output.image.len(),
            bytes.len(),
            output_file,
            output.entry_address
        );
    }
}

fn option_value<'a>(args: &'a [String], i: usize, message: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value,
        None => {
            eprintln!("Error: {}", message);
            process::exit(1);
        }
    }
}

/// Hex with `0x` prefix, otherwise decimal
fn parse_address(text: &str) -> Option<u16> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn print_usage(program_name: &str) {
    println!("Usage: {} [options] <input.dasm>", program_name);
    println!();
    println!("Options:");
    println!("  -o, --output <file>    Output image (default: input.bin)");
    println!("  -b, --base <addr>      Address of the first word (default: 0)");
    println!("  -c, --config <file>    TOML configuration file");
    println!("  -l, --listing          Print a disassembly listing");
    println!("  -s, --symbols          Print the label table");
    println!("  -v, --verbose          Verbose output");
    println!("  -h, --help             Show this help message");
}
