// Copyright (C) 2024 Ethan Uppal. All rights reserved.

use std::{
    io::{self, BufWriter, Write},
    path::PathBuf,
    process::ExitCode,
};

use bci::{run_file, vm::Machine};
use clap::{ArgAction, Parser};
use tracing::subscriber::set_global_default;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

#[derive(Parser)]
#[command(name = "bci", version, about = "Runs a stack machine bytecode file")]
struct Cli {
    /// Bytecode file to execute
    program: PathBuf,
    /// Log more (-v info, -vv debug, -vvv trace); ignored when RUST_LOG is set
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Print the final stack and non-zero registers to stderr
    #[arg(long)]
    dump_state: bool,
}

fn setup_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "error",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    let fmt_layer = fmt::layer().with_target(false).with_writer(io::stderr);
    let sub = Registry::default().with(filter).with(fmt_layer);
    set_global_default(sub).expect("Failed to set tracing subscriber");
}

fn dump_state(machine: &Machine) {
    eprintln!("ip: {:#06x}", machine.ip());
    eprintln!("stack ({}): {:?}", machine.sp(), machine.stack());
    for (index, value) in machine.registers().iter().enumerate() {
        if *value != 0 {
            eprintln!("r{}: {}", index, value);
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let mut machine = Machine::new();
    let mut out = BufWriter::new(io::stdout().lock());
    let result = run_file(&mut machine, &cli.program, &mut out);
    let flushed = out.flush();

    if cli.dump_state {
        dump_state(&machine);
    }

    if let Err(error) = result {
        eprintln!("error: {}", error);
        return ExitCode::FAILURE;
    }
    if let Err(error) = flushed {
        eprintln!("error: failed to write output: {}", error);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
