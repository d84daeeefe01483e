//! `neun demo`: bundled example simulations

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use tracing::info;

use neun_core::ModelRegistry;

use crate::config::SimulationConfig;
use crate::error::CliResult;

/// Bundled simulations
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DemoName {
    /// One Hodgkin-Huxley neuron with constant input
    Basic,
    /// Two Hodgkin-Huxley neurons joined by an electrical synapse
    Synapsis,
    /// Bursting Hindmarsh-Rose neuron
    HindmarshRose,
    /// Regular spiking Izhikevich neuron
    Izhikevich,
    /// Two Hodgkin-Huxley neurons joined by a diffusion synapse
    Diffusion,
}

impl DemoName {
    /// TOML source of the demo
    pub fn source(&self) -> &'static str {
        match self {
            DemoName::Basic => include_str!("../../demos/basic.toml"),
            DemoName::Synapsis => include_str!("../../demos/synapsis.toml"),
            DemoName::HindmarshRose => include_str!("../../demos/hindmarsh-rose.toml"),
            DemoName::Izhikevich => include_str!("../../demos/izhikevich.toml"),
            DemoName::Diffusion => include_str!("../../demos/diffusion.toml"),
        }
    }
}

/// Run one of the bundled example simulations
#[derive(Args, Debug)]
pub struct DemoCommand {
    /// Which demo to run
    #[arg(value_enum)]
    pub name: DemoName,

    /// Output file for the recorded trace (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the simulated duration (ms)
    #[arg(long)]
    pub duration: Option<f64>,

    /// Print the demo's TOML description instead of running it
    #[arg(long)]
    pub show_config: bool,

    /// Emit JSON instead of the column text format
    #[arg(long)]
    pub json: bool,
}

impl DemoCommand {
    /// Execute the demo command
    pub fn execute(self) -> CliResult<()> {
        if self.show_config {
            print!("{}", self.name.source());
            return Ok(());
        }

        let mut config = SimulationConfig::from_toml(self.name.source())?;
        if let Some(duration) = self.duration {
            config.simulation.duration = duration;
            config.simulation.validate()?;
        }
        info!("Running demo {:?}", self.name);

        let mut engine = config.build(&ModelRegistry::builtin())?;
        let result = engine.run()?;
        super::write_result(&result, self.output.as_deref(), self.json)
    }
}
