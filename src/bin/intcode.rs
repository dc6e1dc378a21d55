//! Runs an Intcode program once and prints what it outputs.

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use log::info;

use intcode_vm::{
    ascii::{decode_output, encode_lines},
    memory::PADDING_FACTOR,
    Machine, Program, Result, Status,
};

#[derive(Parser)]
#[command(name = "intcode", version, about = "Run an Intcode program")]
struct Cli {
    /// File holding the comma-separated program
    program: PathBuf,
    /// Input values, repeatable or comma-separated
    #[arg(short, long, value_delimiter = ',', allow_negative_numbers = true)]
    input: Vec<i64>,
    /// Input lines sent as ASCII, each terminated by a newline
    #[arg(long)]
    ascii: Vec<String>,
    /// Zero cells reserved per program cell
    #[arg(long, default_value_t = PADDING_FACTOR)]
    padding: usize,
    /// Print output as ASCII text followed by any non-ASCII value
    #[arg(long)]
    ascii_output: bool,
    /// Patch a program cell before running, as ADDRESS=VALUE
    #[arg(long = "set", value_parser = parse_override)]
    overrides: Vec<(usize, i64)>,
}

fn parse_override(s: &str) -> std::result::Result<(usize, i64), String> {
    let (address, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ADDRESS=VALUE, got {:?}", s))?;
    let address = address.trim().parse().map_err(|e| format!("{}", e))?;
    let value = value.trim().parse().map_err(|e| format!("{}", e))?;
    Ok((address, value))
}

fn run(cli: &Cli) -> Result<()> {
    let mut program = Program::load(&cli.program)?;
    for &(address, value) in &cli.overrides {
        program = program.with_override(address, value)?;
    }

    let mut inputs = cli.input.clone();
    inputs.extend(encode_lines(&cli.ascii));

    let mut vm = Machine::with_padding(&program, cli.padding)?;
    let outputs = vm.run(&inputs)?;

    if cli.ascii_output {
        let decoded = decode_output(&outputs);
        print!("{}", decoded.text);
        if let Some(value) = decoded.value {
            println!("{}", value);
        }
    } else {
        for value in &outputs {
            println!("{}", value);
        }
    }

    match vm.status() {
        Status::Halted => info!("program halted"),
        _ => eprintln!("program is waiting for more input"),
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
