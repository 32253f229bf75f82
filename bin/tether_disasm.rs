use anyhow::{Context, Result, anyhow};
use std::{env, fs};
use tether::{Config, build_vm, disassemble};

fn main() -> Result<()> {
    let input = env::args()
        .nth(1)
        .ok_or_else(|| anyhow!("no input file provided"))?;
    let source = fs::read_to_string(&input).with_context(|| format!("reading {input}"))?;
    let mut vm = build_vm(&Config::load(None)?, false)?;
    match disassemble(&mut vm, &source) {
        Ok(listing) => {
            print!("{listing}");
            Ok(())
        }
        Err(error) => {
            for diagnostic in &error.diagnostics {
                eprintln!("{diagnostic}");
            }
            Err(anyhow!("{error}"))
        }
    }
}
