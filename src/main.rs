//! `alc` -- a thin demo CLI around the arenalang compiler and VM.
//!
//! This binary exists to exercise the library end to end; it is not a
//! general-purpose language tool (there is no source-file parser here).
//! It compiles one of a small set of built-in demo programs, prints its
//! disassembly, runs it, and reports the outcome.

mod demos;

use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;

use arenalang::config::ArenalangConfig;
use arenalang::disasm::Disassembler;
use arenalang::{Compiler, Vm};

#[derive(Parser)]
#[command(name = "alc", about = "Compile and run an arenalang demo program")]
struct Cli {
    /// Which built-in demo to run.
    #[arg(value_name = "DEMO")]
    demo: Option<String>,

    /// List available demos and exit.
    #[arg(long)]
    list: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("alc: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = ArenalangConfig::load_from_cwd().unwrap_or_default();
    let all = demos::all();

    if cli.list || cli.demo.is_none() {
        println!("available demos:");
        for (name, _) in &all {
            println!("  {name}");
        }
        if cli.demo.is_none() && !cli.list {
            bail!("no demo specified; pass a name or --list");
        }
        return Ok(());
    }

    let demo_name = cli.demo.unwrap();
    let program = &all
        .iter()
        .find(|(name, _)| *name == demo_name)
        .with_context(|| format!("unknown demo '{demo_name}'"))?
        .1;

    let mut compiler = Compiler::new();
    let code = compiler.compile(program).map_err(|errors| {
        let joined = errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n");
        anyhow::anyhow!("compile errors:\n{joined}")
    })?;

    println!("{}", Disassembler::disassemble(&code));

    let vm = Vm::new();
    vm.set_max_instructions(Some(config.vm.max_instructions));
    println!("-- running ({} max instructions configured) --", config.vm.max_instructions);
    match vm.run(&code, None) {
        Ok(()) => println!("-- finished ok --"),
        Err(e) => println!("-- runtime error: {e} --"),
    }

    Ok(())
}
