//! Simulation description files
//!
//! A TOML file names its neurons and synapses and refers to them by name:
//!
//! ```toml
//! [simulation]
//! dt = 0.001
//! duration = 100.0
//!
//! [[neuron]]
//! name = "h1"
//! model = "HH"
//! initial = { v = -75.0 }
//!
//! [[neuron]]
//! name = "h2"
//! model = "HH"
//!
//! [[synapse]]
//! name = "s1"
//! kind = "electrical"
//! a = "h1"
//! b = "h2"
//! g_ab = -0.002
//! g_ba = -0.002
//!
//! [[stimulus]]
//! neuron = "h1"
//! amplitude = 0.1
//!
//! [[probe]]
//! neuron = "h1"
//! variable = "v"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use neun_core::{
    IntegratorKind, ModelRegistry, Network, NeuronId, Precision, Probe, SimulationEngine,
    SimulationParams, StimulusPattern, SynapseId, SynapseKind,
};

use crate::error::{CliError, CliResult};

/// Complete simulation description
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Time grid
    pub simulation: SimulationParams,
    /// Neurons, in insertion order
    #[serde(default, rename = "neuron")]
    pub neurons: Vec<NeuronConfig>,
    /// Synapses, stepped in file order
    #[serde(default, rename = "synapse")]
    pub synapses: Vec<SynapseConfig>,
    /// External currents
    #[serde(default, rename = "stimulus")]
    pub stimuli: Vec<StimulusConfig>,
    /// Recorded columns
    #[serde(default, rename = "probe")]
    pub probes: Vec<ProbeConfig>,
}

/// One neuron
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NeuronConfig {
    /// Name used by synapses, stimuli and probes
    pub name: String,
    /// Model short or class name
    pub model: String,
    /// Numeric precision
    #[serde(default = "default_precision")]
    pub precision: Precision,
    /// Integrator
    #[serde(default)]
    pub integrator: IntegratorKind,
    /// Parameter overrides by name
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
    /// Initial variable values by name
    #[serde(default)]
    pub initial: BTreeMap<String, f64>,
}

fn default_precision() -> Precision {
    Precision::Double
}

fn default_coupling_variable() -> String {
    "v".to_string()
}

/// One synapse
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SynapseConfig {
    /// Name used by probes
    #[serde(default)]
    pub name: Option<String>,
    /// Synapse flavour
    pub kind: SynapseKind,
    /// Endpoint a
    pub a: String,
    /// Variable read on endpoint a
    #[serde(default = "default_coupling_variable")]
    pub var_a: String,
    /// Endpoint b
    pub b: String,
    /// Variable read on endpoint b
    #[serde(default = "default_coupling_variable")]
    pub var_b: String,
    /// Coupling strength a to b
    pub g_ab: f64,
    /// Coupling strength b to a
    pub g_ba: f64,
    /// Diffusion time constant
    #[serde(default)]
    pub tau: Option<f64>,
    /// Integrator for the diffusion state
    #[serde(default)]
    pub integrator: IntegratorKind,
}

/// One stimulus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StimulusConfig {
    /// Target neuron
    pub neuron: String,
    /// Current per tick
    pub amplitude: f64,
    /// Onset (ms)
    #[serde(default)]
    pub start: f64,
    /// Window length for constant stimuli (ms)
    #[serde(default)]
    pub duration: Option<f64>,
    /// Pulse width (ms), turns the stimulus into a pulse train
    #[serde(default)]
    pub width: Option<f64>,
    /// Pulse period (ms)
    #[serde(default)]
    pub period: Option<f64>,
    /// Number of pulses
    #[serde(default)]
    pub count: Option<usize>,
}

/// One recorded column
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    /// Column label, derived from the target if absent
    #[serde(default)]
    pub label: Option<String>,
    /// Probed neuron
    #[serde(default)]
    pub neuron: Option<String>,
    /// Probed variable
    #[serde(default)]
    pub variable: Option<String>,
    /// Probed synapse (current into endpoint b)
    #[serde(default)]
    pub synapse: Option<String>,
}

impl SimulationConfig {
    /// Load a simulation description from a TOML file
    pub fn load_from_file(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read simulation file {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Parse a simulation description
    pub fn from_toml(content: &str) -> CliResult<Self> {
        let config: Self = toml::from_str(content)?;
        config
            .simulation
            .validate()
            .map_err(|e| CliError::config(format!("[simulation]: {}", e)))?;
        Ok(config)
    }

    /// Instantiate the network and engine
    pub fn build(&self, registry: &ModelRegistry) -> CliResult<SimulationEngine> {
        let mut network = Network::new();
        let mut neurons: HashMap<&str, NeuronId> = HashMap::new();

        for spec in &self.neurons {
            if neurons.contains_key(spec.name.as_str()) {
                return Err(CliError::config(format!("neuron '{}' defined twice", spec.name)));
            }
            let mut neuron = registry.create_neuron(&spec.model, spec.precision, spec.integrator)?;
            for (name, value) in &spec.params {
                let id = neuron.parameter_id(name)?;
                neuron.set_param(id, *value)?;
            }
            for (name, value) in &spec.initial {
                let id = neuron.variable_id(name)?;
                neuron.set(id, *value)?;
            }
            tracing::debug!("neuron {} = {}", spec.name, neuron.type_name());
            neurons.insert(&spec.name, network.add_neuron(neuron));
        }

        let lookup = |name: &str| -> CliResult<NeuronId> {
            neurons
                .get(name)
                .copied()
                .ok_or_else(|| CliError::config(format!("neuron '{}' is not defined", name)))
        };

        let mut synapses: HashMap<&str, SynapseId> = HashMap::new();
        for spec in &self.synapses {
            let a = lookup(&spec.a)?;
            let b = lookup(&spec.b)?;
            let var_a = network.neuron(a)?.variable_id(&spec.var_a)?;
            let var_b = network.neuron(b)?.variable_id(&spec.var_b)?;
            let id = match spec.kind {
                SynapseKind::Electrical => {
                    network.add_electrical_synapse(a, var_a, b, var_b, spec.g_ab, spec.g_ba)?
                }
                SynapseKind::Diffusion => {
                    let tau = spec.tau.ok_or_else(|| {
                        CliError::config(format!(
                            "diffusion synapse {} -> {} needs tau",
                            spec.a, spec.b
                        ))
                    })?;
                    network.add_diffusion_synapse(
                        a,
                        var_a,
                        b,
                        var_b,
                        spec.g_ab,
                        spec.g_ba,
                        tau,
                        spec.integrator,
                    )?
                }
            };
            if let Some(name) = &spec.name {
                if synapses.insert(name, id).is_some() {
                    return Err(CliError::config(format!("synapse '{}' defined twice", name)));
                }
            }
        }

        let stimuli = self
            .stimuli
            .iter()
            .map(|spec| spec.to_pattern(lookup(&spec.neuron)?))
            .collect::<CliResult<Vec<_>>>()?;

        let mut probes = Vec::new();
        for spec in &self.probes {
            let probe = match (&spec.neuron, &spec.variable, &spec.synapse) {
                (Some(neuron), Some(variable), None) => {
                    let id = lookup(neuron)?;
                    let var = network.neuron(id)?.variable_id(variable)?;
                    let label = spec
                        .label
                        .clone()
                        .unwrap_or_else(|| format!("{}.{}", neuron, variable));
                    Probe::variable(label, id, var)
                }
                (None, None, Some(synapse)) => {
                    let id = synapses.get(synapse.as_str()).copied().ok_or_else(|| {
                        CliError::config(format!("synapse '{}' is not defined", synapse))
                    })?;
                    let label = spec.label.clone().unwrap_or_else(|| synapse.clone());
                    Probe::synapse_current(label, id)
                }
                _ => {
                    return Err(CliError::config(
                        "a probe needs either `neuron` and `variable` or `synapse`",
                    ))
                }
            };
            probes.push(probe);
        }

        let mut engine = SimulationEngine::new(network, self.simulation.clone())?;
        for stimulus in stimuli {
            engine.add_stimulus(stimulus)?;
        }
        for probe in probes {
            engine.add_probe(probe)?;
        }
        Ok(engine)
    }
}

impl StimulusConfig {
    fn to_pattern(&self, neuron: NeuronId) -> CliResult<StimulusPattern> {
        match (self.width, self.period) {
            (None, None) => Ok(StimulusPattern::Constant {
                neuron,
                amplitude: self.amplitude,
                start: self.start,
                duration: self.duration,
            }),
            (Some(width), Some(period)) => Ok(StimulusPattern::PulseTrain {
                neuron,
                amplitude: self.amplitude,
                start: self.start,
                width,
                period,
                count: self.count,
            }),
            _ => Err(CliError::config(format!(
                "stimulus on '{}' needs both width and period for a pulse train",
                self.neuron
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIR: &str = r#"
        [simulation]
        dt = 0.01
        duration = 1.0
        record_every = 1

        [[neuron]]
        name = "a"
        model = "HH"
        initial = { v = -75.0 }

        [[neuron]]
        name = "b"
        model = "HodgkinHuxleyModel"
        params = { gl = 0.3 }

        [[synapse]]
        name = "s"
        kind = "electrical"
        a = "a"
        b = "b"
        g_ab = -0.002
        g_ba = -0.002

        [[stimulus]]
        neuron = "a"
        amplitude = 0.1

        [[probe]]
        neuron = "a"
        variable = "v"

        [[probe]]
        label = "I"
        synapse = "s"
    "#;

    #[test]
    fn test_parse_and_run() {
        let config = SimulationConfig::from_toml(PAIR).unwrap();
        assert_eq!(config.neurons.len(), 2);
        assert_eq!(config.neurons[0].precision, Precision::Double);
        assert_eq!(config.synapses[0].var_a, "v");

        let mut engine = config.build(&ModelRegistry::builtin()).unwrap();
        let result = engine.run().unwrap();
        assert_eq!(result.labels, vec!["a.v".to_string(), "I".to_string()]);
        assert_eq!(result.len(), 100);
        // First row: the synapse saw -75 vs -65 with g = -0.002
        assert!((result.column("I").unwrap()[0] - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_undefined_neuron() {
        let text = PAIR.replace("b = \"b\"", "b = \"c\"");
        let config = SimulationConfig::from_toml(&text).unwrap();
        let err = config.build(&ModelRegistry::builtin()).unwrap_err();
        assert!(err.to_string().contains("'c' is not defined"));
    }

    #[test]
    fn test_unknown_parameter() {
        let text = PAIR.replace("params = { gl = 0.3 }", "params = { gz = 0.3 }");
        let config = SimulationConfig::from_toml(&text).unwrap();
        assert!(matches!(
            config.build(&ModelRegistry::builtin()),
            Err(CliError::Core(neun_core::NeunError::InvalidParameter { .. }))
        ));
    }

    #[test]
    fn test_invalid_time_grid() {
        let text = PAIR.replace("dt = 0.01", "dt = 0.0");
        assert!(matches!(
            SimulationConfig::from_toml(&text),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_mixed_precision_rejected() {
        let text = PAIR.replace(
            "model = \"HodgkinHuxleyModel\"",
            "model = \"HodgkinHuxleyModel\"\n        precision = \"float\"",
        );
        let config = SimulationConfig::from_toml(&text).unwrap();
        assert!(matches!(
            config.build(&ModelRegistry::builtin()),
            Err(CliError::Core(neun_core::NeunError::MismatchedPrecision { .. }))
        ));
    }

    #[test]
    fn test_missing_file_names_path() {
        let path = Path::new("/definitely/not/here.toml");
        let err = SimulationConfig::load_from_file(path).unwrap_err();
        assert!(matches!(err, CliError::Generic(_)));
        let message = err.to_string();
        assert!(message.contains("failed to read simulation file /definitely/not/here.toml"));
        assert!(message.contains("No such file"));
    }

    #[test]
    fn test_diffusion_needs_tau() {
        let text = PAIR.replace("kind = \"electrical\"", "kind = \"diffusion\"");
        let config = SimulationConfig::from_toml(&text).unwrap();
        assert!(config.build(&ModelRegistry::builtin()).is_err());

        let text = text.replace("g_ba = -0.002", "g_ba = -0.002\n        tau = 2.0");
        let config = SimulationConfig::from_toml(&text).unwrap();
        assert!(config.build(&ModelRegistry::builtin()).is_ok());
    }
}
