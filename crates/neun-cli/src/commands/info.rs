//! `neun info`: describe one model or synapse type

use clap::Args;
use serde::Serialize;

use neun_core::{
    IntegratorKind, ModelInfo, ModelRegistry, ParameterId, Precision, SynapseKind, VariableId,
};

use crate::error::{CliError, CliResult};

/// Show variables and parameters of a model or synapse type
#[derive(Args, Debug)]
pub struct InfoCommand {
    /// Model short or class name (`HH`, `IzhikevichModel`), or `ESyn`/`DSyn`
    pub name: String,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct Entry {
    name: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<f64>,
}

#[derive(Serialize)]
struct Description {
    class_name: &'static str,
    short_name: &'static str,
    description: &'static str,
    variables: Vec<Entry>,
    parameters: Vec<Entry>,
}

fn describe(registry: &ModelRegistry, name: &str) -> CliResult<Description> {
    if let Some(kind) = SynapseKind::ALL
        .into_iter()
        .find(|k| k.short_name() == name || k.info().class_name == name)
    {
        return Ok(plain(kind.info()));
    }

    let info = registry.model_info(name)?;
    let neuron = registry.create_neuron(name, Precision::Double, IntegratorKind::Rk4)?;
    let variables = info
        .variables
        .iter()
        .enumerate()
        .map(|(i, field)| Entry {
            name: field.name,
            description: field.description,
            default: neuron.get(VariableId(i as u16)).ok(),
        })
        .collect();
    let parameters = info
        .parameters
        .iter()
        .enumerate()
        .map(|(i, field)| Entry {
            name: field.name,
            description: field.description,
            default: neuron.get_param(ParameterId(i as u16)).ok(),
        })
        .collect();
    Ok(Description {
        class_name: info.class_name,
        short_name: info.short_name,
        description: info.description,
        variables,
        parameters,
    })
}

fn plain(info: &'static ModelInfo) -> Description {
    let entries = |fields: &'static [neun_core::Field]| -> Vec<Entry> {
        fields
            .iter()
            .map(|field| Entry {
                name: field.name,
                description: field.description,
                default: None,
            })
            .collect()
    };
    Description {
        class_name: info.class_name,
        short_name: info.short_name,
        description: info.description,
        variables: entries(info.variables),
        parameters: entries(info.parameters),
    }
}

impl InfoCommand {
    /// Execute the info command
    pub fn execute(self) -> CliResult<()> {
        let registry = ModelRegistry::builtin();
        let description = describe(&registry, &self.name).map_err(|e| match e {
            CliError::Core(neun_core::NeunError::UnknownModel { name }) => CliError::invalid_args(
                format!("unknown model '{}' (see `neun models`)", name),
            ),
            other => other,
        })?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&description)?);
            return Ok(());
        }

        println!(
            "{} ({}): {}",
            description.short_name, description.class_name, description.description
        );
        for (title, entries) in [
            ("Variables", &description.variables),
            ("Parameters", &description.parameters),
        ] {
            println!("{}:", title);
            for entry in entries {
                match entry.default {
                    Some(value) => println!(
                        "  {:<6} {:>12} {}",
                        entry.name, value, entry.description
                    ),
                    None => println!("  {:<6} {}", entry.name, entry.description),
                }
            }
        }
        Ok(())
    }
}
