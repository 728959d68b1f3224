//! CLI entry point for the `dmng-asm` binary.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use dmng_asm::{assemble, Assembly, DEFAULT_CAPACITY};
#[cfg(test)]
use rstest as _;
#[cfg(test)]
use tempfile as _;
use thiserror as _;
use vscp_node::dmng::disassemble;

const USAGE_TEXT: &str = "\
Usage: dmng-asm <command> [options]

Commands:
  build <input> [-o <output>] [--capacity <n>] [--verbose]  Assemble rules to byte-code
  dump  <binary>                                            Print a ruleset as rule source

Options:
  -o, --output <file>  Output file path (default: input stem + .bin)
  --capacity <n>       DM-NG storage size in bytes (default: 64)
  -v, --verbose        Print listing to stderr (build only)
  -h, --help           Show this help message

Examples:
  dmng-asm build lamp.rules
  dmng-asm build lamp.rules -o lamp.bin --capacity 128
  dmng-asm dump lamp.bin
";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Build(BuildArgs),
    Dump(DumpArgs),
}

#[derive(Debug, PartialEq, Eq)]
struct BuildArgs {
    input: PathBuf,
    output: Option<PathBuf>,
    capacity: usize,
    verbose: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct DumpArgs {
    input: PathBuf,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    match first.to_string_lossy().as_ref() {
        "build" => parse_build_args(args)
            .map(Command::Build)
            .map(ParseResult::Command),
        "dump" => parse_dump_args(args)
            .map(Command::Dump)
            .map(ParseResult::Command),
        other => Err(format!("unknown command: {other}")),
    }
}

#[allow(clippy::while_let_on_iterator)]
fn parse_build_args(mut args: impl Iterator<Item = OsString>) -> Result<BuildArgs, String> {
    let mut input: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut capacity = DEFAULT_CAPACITY;
    let mut verbose = false;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg == "--verbose" || arg == "-v" {
            verbose = true;
            continue;
        }

        if arg == "-o" || arg == "--output" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for -o".to_string())?;
            output = Some(PathBuf::from(value));
            continue;
        }

        if arg == "--capacity" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for --capacity".to_string())?;
            let text = value.to_string_lossy();
            capacity = text
                .parse()
                .map_err(|_| format!("invalid capacity: {text}"))?;
            continue;
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if input.is_some() {
            return Err("multiple input paths provided".to_string());
        }
        input = Some(PathBuf::from(arg));
    }

    let input = input.ok_or_else(|| "missing input path".to_string())?;
    Ok(BuildArgs {
        input,
        output,
        capacity,
        verbose,
    })
}

fn parse_dump_args(args: impl Iterator<Item = OsString>) -> Result<DumpArgs, String> {
    let mut input: Option<PathBuf> = None;

    for arg in args {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if input.is_some() {
            return Err("multiple input paths provided".to_string());
        }
        input = Some(PathBuf::from(arg));
    }

    let input = input.ok_or_else(|| "missing input path".to_string())?;
    Ok(DumpArgs { input })
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
    let parent = input.parent().unwrap_or_else(|| Path::new(""));
    parent.join(format!("{stem}.bin"))
}

fn run_build(args: BuildArgs) -> Result<(), i32> {
    let assembly = match assemble(&args.input, args.capacity) {
        Ok(assembly) => assembly,
        Err(errors) => {
            eprintln!("{}", errors.format_for_stderr());
            return Err(1);
        }
    };

    let output_path = args
        .output
        .unwrap_or_else(|| default_output_path(&args.input));

    if let Err(e) = fs::write(&output_path, &assembly.binary) {
        eprintln!("error: failed to write output: {e}");
        return Err(1);
    }

    if args.verbose {
        print_listing(&assembly);
    }

    println!(
        "Assembled {} ({} rules, {} of {} bytes) -> {}",
        args.input.display(),
        assembly.rules.len(),
        assembly.binary.len(),
        args.capacity,
        output_path.display()
    );

    Ok(())
}

fn print_listing(assembly: &Assembly) {
    for entry in &assembly.listing {
        let hex_bytes: String = entry
            .bytes
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ");

        eprintln!(
            "{:04X}: {:<40} {} ; line {}",
            entry.offset, hex_bytes, entry.source, entry.line
        );
    }
}

fn run_dump(args: &DumpArgs) -> Result<(), i32> {
    let bytes = match fs::read(&args.input) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("error: {}: {e}", args.input.display());
            return Err(1);
        }
    };

    let rows = disassemble(&bytes);
    println!("; {} rule(s) from {}", rows.len(), args.input.display());
    for row in &rows {
        println!("{} ; @{:04X}", row.text, row.offset);
    }

    if rows.iter().any(|row| row.fault.is_some()) {
        Err(1)
    } else {
        Ok(())
    }
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(Command::Build(args))) => match run_build(args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Ok(ParseResult::Command(Command::Dump(args))) => match run_dump(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Err(error) => {
            if error.starts_with("Usage:") {
                println!("{error}");
            } else {
                eprintln!("error: {error}");
                eprintln!("{USAGE_TEXT}");
            }
            1
        }
    };

    std::process::exit(exit_code);
}
