//! `neun models`: registry listing

use clap::Args;
use serde::Serialize;

use neun_core::{ModelInfo, ModelRegistry};

use crate::error::CliResult;

/// List registered neuron models
#[derive(Args, Debug)]
pub struct ModelsCommand {
    /// Also list every composite neuron and synapse type name
    #[arg(long)]
    pub types: bool,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct Listing<'a> {
    models: Vec<&'a ModelInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    neurons: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    synapses: Option<Vec<String>>,
}

impl ModelsCommand {
    /// Execute the models command
    pub fn execute(self) -> CliResult<()> {
        let registry = ModelRegistry::builtin();
        let models: Vec<&ModelInfo> = registry.models().collect();

        if self.json {
            let listing = Listing {
                models,
                neurons: self.types.then(|| registry.available_neurons()),
                synapses: self.types.then(|| registry.available_synapses()),
            };
            println!("{}", serde_json::to_string_pretty(&listing)?);
            return Ok(());
        }

        println!("Registered models:");
        for info in &models {
            println!(
                "  {:<4} {:<20} {} ({} variables, {} parameters)",
                info.short_name,
                info.class_name,
                info.description,
                info.num_variables(),
                info.num_parameters()
            );
        }

        if self.types {
            println!();
            println!("Neuron types:");
            for name in registry.available_neurons() {
                println!("  {}", name);
            }
            println!();
            println!("Synapse types:");
            for name in registry.available_synapses() {
                println!("  {}", name);
            }
        }
        Ok(())
    }
}
