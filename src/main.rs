//=====================================================
// File: main.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Tether CLI entry point
// Objective: Run a script file or start the REPL, mapping outcomes onto
//            conventional interpreter exit codes
//=====================================================

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tether::{Config, EXIT_IO, build_vm, disassemble, logging, repl, run_file};

#[derive(Parser, Debug)]
#[command(name = "tether", version, about = "Tether compiler and virtual machine")]
pub struct Args {
    /// Script to run. Starts the REPL when omitted.
    pub script: Option<PathBuf>,

    /// Configuration file to use instead of the per-user default.
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Log every executed instruction.
    #[arg(long = "trace")]
    pub trace: bool,

    /// Print the compiled listing instead of running the script.
    #[arg(long = "disassemble", requires = "script")]
    pub disassemble: bool,

    /// Log compiler and VM activity at info level.
    #[arg(short, long = "verbose")]
    pub verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("tether: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let trace = args.trace || logging::trace_from_env();
    logging::init(args.verbose, trace);

    let config = Config::load(args.config.as_deref())?;
    let mut vm = build_vm(&config, trace)?;

    let Some(script) = args.script else {
        repl::run(&mut vm)?;
        return Ok(ExitCode::SUCCESS);
    };

    if args.disassemble {
        let source = match fs::read_to_string(&script) {
            Ok(source) => source,
            Err(error) => return Ok(io_failure(&script, error)),
        };
        return Ok(match disassemble(&mut vm, &source) {
            Ok(listing) => {
                print!("{listing}");
                ExitCode::SUCCESS
            }
            Err(error) => {
                for diagnostic in &error.diagnostics {
                    eprintln!("{diagnostic}");
                }
                ExitCode::from(tether_core::InterpretResult::CompileError.exit_code())
            }
        });
    }

    match run_file(&mut vm, &script) {
        Ok(outcome) => Ok(ExitCode::from(outcome.exit_code())),
        Err(error) => Ok(io_failure(&script, error)),
    }
}

fn io_failure(script: &std::path::Path, error: std::io::Error) -> ExitCode {
    let error = anyhow::Error::new(error).context(format!("reading {}", script.display()));
    eprintln!("tether: {error:#}");
    ExitCode::from(EXIT_IO)
}

//=====================================================
// End of file
//=====================================================
