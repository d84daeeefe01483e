//! `neun run`: execute a simulation file

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use neun_core::ModelRegistry;

use crate::config::SimulationConfig;
use crate::error::CliResult;

/// Run a simulation described by a TOML file
#[derive(Args, Debug)]
pub struct RunCommand {
    /// Simulation description
    pub config: PathBuf,

    /// Output file for the recorded trace (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the simulated duration (ms)
    #[arg(long)]
    pub duration: Option<f64>,

    /// Emit JSON instead of the column text format
    #[arg(long)]
    pub json: bool,
}

impl RunCommand {
    /// Execute the run command
    pub fn execute(self) -> CliResult<()> {
        info!("Loading simulation from {}", self.config.display());
        let mut config = SimulationConfig::load_from_file(&self.config)?;
        if let Some(duration) = self.duration {
            config.simulation.duration = duration;
            config.simulation.validate()?;
        }

        let registry = ModelRegistry::builtin();
        let mut engine = config.build(&registry)?;
        info!(
            "Built network: {} neurons, {} synapses",
            engine.network().neuron_count(),
            engine.network().synapse_count()
        );

        let result = engine.run()?;
        super::write_result(&result, self.output.as_deref(), self.json)
    }
}
