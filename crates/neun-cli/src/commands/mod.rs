//! CLI command implementations for Neun

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use clap::{Parser, Subcommand};
use tracing::info;

use neun_core::SimulationResult;

use crate::error::CliResult;

pub mod demo;
pub mod info;
pub mod models;
pub mod run;

/// Neun - coupled neuron simulator
#[derive(Parser, Debug)]
#[command(
    name = "neun",
    version,
    about = "Coupled neuron ODE simulator",
    long_about = "Neun integrates Hodgkin-Huxley, Hindmarsh-Rose and Izhikevich neurons \
                  with Runge-Kutta methods and couples them through electrical and \
                  diffusion synapses. Simulations are described in TOML files."
)]
pub struct NeunCli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a simulation described by a TOML file
    Run(run::RunCommand),

    /// Run one of the bundled example simulations
    Demo(demo::DemoCommand),

    /// List registered neuron models and composite type names
    #[command(alias = "ls")]
    Models(models::ModelsCommand),

    /// Show variables and parameters of a model or synapse type
    Info(info::InfoCommand),
}

impl NeunCli {
    /// Execute the CLI command
    pub fn execute(self) -> CliResult<()> {
        match self.command {
            Commands::Run(cmd) => cmd.execute(),
            Commands::Demo(cmd) => cmd.execute(),
            Commands::Models(cmd) => cmd.execute(),
            Commands::Info(cmd) => cmd.execute(),
        }
    }
}

/// Write a trace as text or JSON to a file, or to stdout
pub(crate) fn write_result(
    result: &SimulationResult,
    output: Option<&Path>,
    json: bool,
) -> CliResult<()> {
    match output {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            emit(result, &mut out, json)?;
            out.flush()?;
            info!("Wrote {} rows to {}", result.len(), path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            emit(result, &mut out, json)?;
            out.flush()?;
        }
    }
    Ok(())
}

fn emit<W: Write>(result: &SimulationResult, out: &mut W, json: bool) -> CliResult<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, result)?;
        writeln!(out)?;
    } else {
        result.write_text(out)?;
    }
    Ok(())
}
