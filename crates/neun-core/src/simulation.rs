//! Fixed-step simulation engine
//!
//! Wraps a [`Network`] with a time grid, external stimuli and probes, and
//! collects the probed values into a column table.

use std::io;
use std::time::Instant;

use crate::error::{check_dt, NeunError, Result};
use crate::model::VariableId;
use crate::network::{Network, NeuronId, SynapseId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Simulation parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimulationParams {
    /// Integration step (ms)
    pub dt: f64,
    /// Total simulated time (ms)
    pub duration: f64,
    /// Record one row every this many ticks
    pub record_every: usize,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            dt: 0.001,
            duration: 100.0,
            record_every: 1,
        }
    }
}

impl SimulationParams {
    /// Create new simulation parameters with validation
    pub fn new(dt: f64, duration: f64) -> Result<Self> {
        let params = Self {
            dt,
            duration,
            ..Default::default()
        };
        params.validate()?;
        Ok(params)
    }

    /// Record every `n`-th tick only
    pub fn with_record_every(mut self, n: usize) -> Self {
        self.record_every = n;
        self
    }

    /// Number of ticks covering `duration`
    pub fn num_steps(&self) -> usize {
        (self.duration / self.dt).round() as usize
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        check_dt(self.dt)?;
        if !self.duration.is_finite() || self.duration < self.dt {
            return Err(NeunError::invalid_config(format!(
                "duration {} must be finite and at least dt={}",
                self.duration, self.dt
            )));
        }
        if self.record_every == 0 {
            return Err(NeunError::invalid_config("record_every must be > 0"));
        }
        Ok(())
    }
}

/// External current injected into a neuron
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StimulusPattern {
    /// Constant current over a window
    Constant {
        /// Target neuron
        neuron: NeuronId,
        /// Current added every tick
        amplitude: f64,
        /// Window start (ms)
        start: f64,
        /// Window length (ms), unbounded if `None`
        duration: Option<f64>,
    },
    /// Rectangular pulses repeating with a fixed period
    PulseTrain {
        /// Target neuron
        neuron: NeuronId,
        /// Current added every tick inside a pulse
        amplitude: f64,
        /// First pulse onset (ms)
        start: f64,
        /// Pulse width (ms)
        width: f64,
        /// Onset to onset (ms)
        period: f64,
        /// Number of pulses, unbounded if `None`
        count: Option<usize>,
    },
}

impl StimulusPattern {
    /// Constant current for the whole run
    pub fn constant(neuron: NeuronId, amplitude: f64) -> Self {
        StimulusPattern::Constant {
            neuron,
            amplitude,
            start: 0.0,
            duration: None,
        }
    }

    /// Target neuron
    pub fn neuron(&self) -> NeuronId {
        match self {
            StimulusPattern::Constant { neuron, .. } | StimulusPattern::PulseTrain { neuron, .. } => {
                *neuron
            }
        }
    }

    /// Current to inject for the tick starting at `t`
    pub fn current_at(&self, t: f64) -> f64 {
        match *self {
            StimulusPattern::Constant {
                amplitude,
                start,
                duration,
                ..
            } => {
                let inside = t >= start && duration.map_or(true, |d| t < start + d);
                if inside {
                    amplitude
                } else {
                    0.0
                }
            }
            StimulusPattern::PulseTrain {
                amplitude,
                start,
                width,
                period,
                count,
                ..
            } => {
                if t < start {
                    return 0.0;
                }
                let elapsed = t - start;
                let pulse = (elapsed / period).floor();
                if count.map_or(false, |c| pulse >= c as f64) {
                    return 0.0;
                }
                if elapsed - pulse * period < width {
                    amplitude
                } else {
                    0.0
                }
            }
        }
    }

    fn validate(&self) -> Result<()> {
        match *self {
            StimulusPattern::Constant { start, duration, .. } => {
                if !start.is_finite() || duration.map_or(false, |d| !(d >= 0.0)) {
                    return Err(NeunError::invalid_config("constant stimulus window is invalid"));
                }
            }
            StimulusPattern::PulseTrain {
                start,
                width,
                period,
                ..
            } => {
                if !start.is_finite() || !(period > 0.0) || !(width >= 0.0) || width > period {
                    return Err(NeunError::invalid_config(format!(
                        "pulse train needs 0 <= width <= period and period > 0 (width={}, period={})",
                        width, period
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Recorded quantity
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Probe {
    /// A neuron state variable
    Variable {
        /// Column label
        label: String,
        /// Probed neuron
        neuron: NeuronId,
        /// Probed variable
        variable: VariableId,
    },
    /// Current a synapse injects into its b endpoint
    SynapseCurrent {
        /// Column label
        label: String,
        /// Probed synapse
        synapse: SynapseId,
    },
}

impl Probe {
    /// Probe a neuron variable
    pub fn variable(label: impl Into<String>, neuron: NeuronId, variable: VariableId) -> Self {
        Probe::Variable {
            label: label.into(),
            neuron,
            variable,
        }
    }

    /// Probe a synaptic current
    pub fn synapse_current(label: impl Into<String>, synapse: SynapseId) -> Self {
        Probe::SynapseCurrent {
            label: label.into(),
            synapse,
        }
    }

    /// Column label
    pub fn label(&self) -> &str {
        match self {
            Probe::Variable { label, .. } | Probe::SynapseCurrent { label, .. } => label,
        }
    }

    fn sample(&self, network: &Network) -> Result<f64> {
        match self {
            Probe::Variable {
                neuron, variable, ..
            } => network.get(*neuron, *variable),
            Probe::SynapseCurrent { synapse, .. } => network.synaptic_current(*synapse),
        }
    }
}

/// Column table produced by a run
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationResult {
    /// Probe labels, one per column
    pub labels: Vec<String>,
    /// Start time of each recorded tick
    pub time: Vec<f64>,
    /// Probed values, `columns[probe][row]`
    pub columns: Vec<Vec<f64>>,
    /// Ticks executed
    pub steps_executed: usize,
}

impl SimulationResult {
    fn with_labels(labels: Vec<String>) -> Self {
        Self {
            columns: vec![Vec::new(); labels.len()],
            labels,
            ..Default::default()
        }
    }

    /// Number of recorded rows
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Column for a probe label
    pub fn column(&self, label: &str) -> Option<&[f64]> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.columns[i].as_slice())
    }

    /// Write `# time label...` followed by one space-separated row per
    /// recorded tick, six decimals per value
    pub fn write_text<W: io::Write>(&self, mut out: W) -> io::Result<()> {
        write!(out, "# time")?;
        for label in &self.labels {
            write!(out, " {}", label)?;
        }
        writeln!(out)?;

        for (row, t) in self.time.iter().enumerate() {
            write!(out, "{:.6}", t)?;
            for column in &self.columns {
                write!(out, " {:.6}", column[row])?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// Text rendering of [`SimulationResult::write_text`]
    pub fn to_text(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_text(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// Simulation engine
#[derive(Debug)]
pub struct SimulationEngine {
    network: Network,
    params: SimulationParams,
    stimuli: Vec<StimulusPattern>,
    probes: Vec<Probe>,
}

impl SimulationEngine {
    /// Create a new simulation engine
    pub fn new(network: Network, params: SimulationParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            network,
            params,
            stimuli: Vec::new(),
            probes: Vec::new(),
        })
    }

    /// Add an input stimulus
    pub fn add_stimulus(&mut self, stimulus: StimulusPattern) -> Result<()> {
        stimulus.validate()?;
        self.network.neuron(stimulus.neuron())?;
        self.stimuli.push(stimulus);
        Ok(())
    }

    /// Add a recorded column
    pub fn add_probe(&mut self, probe: Probe) -> Result<()> {
        probe.sample(&self.network)?;
        self.probes.push(probe);
        Ok(())
    }

    /// Run the full duration from the network's current state
    ///
    /// Each tick injects stimuli, runs [`Network::tick`] and then samples
    /// every probe. Rows are stamped with the time at which the tick began.
    pub fn run(&mut self) -> Result<SimulationResult> {
        let num_steps = self.params.num_steps();
        let dt = self.params.dt;
        log::info!(
            "Starting simulation: {}ms with {}ms timestep ({} ticks, {} probes)",
            self.params.duration,
            dt,
            num_steps,
            self.probes.len()
        );

        let started = Instant::now();
        let t0 = self.network.time();
        let mut results =
            SimulationResult::with_labels(self.probes.iter().map(|p| p.label().to_string()).collect());

        for step in 0..num_steps {
            let t = t0 + step as f64 * dt;

            for stimulus in &self.stimuli {
                let current = stimulus.current_at(t);
                if current != 0.0 {
                    self.network.apply_input(stimulus.neuron(), current)?;
                }
            }

            self.network.tick(dt).map_err(|e| match e {
                NeunError::NumericalInstability { model, reason, .. } => {
                    NeunError::NumericalInstability { model, time: t, reason }
                }
                other => other,
            })?;

            if step % self.params.record_every == 0 {
                results.time.push(t);
                for (probe, column) in self.probes.iter().zip(results.columns.iter_mut()) {
                    column.push(probe.sample(&self.network)?);
                }
            }

            if step % (num_steps / 10).max(1) == 0 {
                let progress = (step as f64 / num_steps as f64) * 100.0;
                log::debug!("Simulation progress: {:.1}%", progress);
            }
        }

        results.steps_executed = num_steps;
        log::info!(
            "Simulation completed: {} ticks, {} rows in {:?}",
            num_steps,
            results.len(),
            started.elapsed()
        );
        Ok(results)
    }

    /// Network being simulated
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Mutable access to the network
    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    /// Simulation parameters
    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Hand the network back
    pub fn into_network(self) -> Network {
        self.network
    }
}

/// Advance a network by `steps` ticks of `dt` without recording anything
pub fn run_fixed_step(network: &mut Network, dt: f64, steps: usize) -> Result<()> {
    check_dt(dt)?;
    for _ in 0..steps {
        network.tick(dt)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrator::IntegratorKind;
    use crate::models::{hodgkin_huxley as hh, izhikevich as iz};
    use crate::registry::ModelRegistry;
    use crate::scalar::Precision;

    fn single(model: &str) -> (Network, NeuronId) {
        let registry = ModelRegistry::builtin();
        let mut network = Network::new();
        let id = network.add_neuron(
            registry
                .create_neuron(model, Precision::Double, IntegratorKind::Rk4)
                .unwrap(),
        );
        (network, id)
    }

    #[test]
    fn test_simulation_params_validation() {
        assert!(SimulationParams::new(0.01, 1.0).is_ok());
        assert!(matches!(
            SimulationParams::new(0.0, 1.0),
            Err(NeunError::InvalidStep { .. })
        ));
        assert!(SimulationParams::new(0.1, 0.01).is_err());
        assert!(SimulationParams::new(0.1, f64::INFINITY).is_err());
        let params = SimulationParams::new(0.1, 1.0).unwrap().with_record_every(0);
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_num_steps() {
        let params = SimulationParams::new(0.1, 300.0).unwrap();
        assert_eq!(params.num_steps(), 3000);
        let params = SimulationParams::new(0.001, 100.0).unwrap();
        assert_eq!(params.num_steps(), 100_000);
    }

    #[test]
    fn test_stimulus_patterns() {
        let (_, id) = single("Iz");
        let window = StimulusPattern::Constant {
            neuron: id,
            amplitude: 2.0,
            start: 1.0,
            duration: Some(2.0),
        };
        assert_eq!(window.current_at(0.5), 0.0);
        assert_eq!(window.current_at(1.0), 2.0);
        assert_eq!(window.current_at(2.9), 2.0);
        assert_eq!(window.current_at(3.0), 0.0);

        let pulses = StimulusPattern::PulseTrain {
            neuron: id,
            amplitude: 5.0,
            start: 10.0,
            width: 1.0,
            period: 4.0,
            count: Some(2),
        };
        assert_eq!(pulses.current_at(9.0), 0.0);
        assert_eq!(pulses.current_at(10.5), 5.0);
        assert_eq!(pulses.current_at(12.0), 0.0);
        assert_eq!(pulses.current_at(14.2), 5.0);
        assert_eq!(pulses.current_at(18.2), 0.0);

        let bad = StimulusPattern::PulseTrain {
            neuron: id,
            amplitude: 1.0,
            start: 0.0,
            width: 2.0,
            period: 1.0,
            count: None,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_probe_validation() {
        let (mut network, id) = single("HH");
        let ghost = network.add_neuron(
            ModelRegistry::builtin()
                .create_neuron("HH", Precision::Double, IntegratorKind::Rk4)
                .unwrap(),
        );
        network.remove_neuron(ghost).unwrap();

        let mut engine = SimulationEngine::new(network, SimulationParams::new(0.01, 1.0).unwrap()).unwrap();
        assert!(engine.add_probe(Probe::variable("v", id, hh::V)).is_ok());
        assert!(matches!(
            engine.add_probe(Probe::variable("x", id, VariableId(42))),
            Err(NeunError::InvalidVariable { .. })
        ));
        assert!(matches!(
            engine.add_probe(Probe::variable("g", ghost, hh::V)),
            Err(NeunError::DanglingEndpoint { .. })
        ));
        assert!(engine
            .add_stimulus(StimulusPattern::constant(ghost, 1.0))
            .is_err());
    }

    #[test]
    fn test_izhikevich_run() {
        let (network, id) = single("Iz");
        let params = SimulationParams::new(0.1, 300.0).unwrap();
        let mut engine = SimulationEngine::new(network, params).unwrap();
        engine.add_stimulus(StimulusPattern::constant(id, 20.0)).unwrap();
        engine.add_probe(Probe::variable("v", id, iz::V)).unwrap();

        let result = engine.run().unwrap();
        assert_eq!(result.len(), 3000);
        assert_eq!(result.steps_executed, 3000);
        let v = result.column("v").unwrap();
        assert!(v.iter().all(|x| x.is_finite() && *x < iz::SPIKE_PEAK));
        let resets = v.windows(2).filter(|w| w[1] < w[0] - 40.0).count();
        assert!(resets >= 3, "expected repeated spiking, saw {} resets", resets);
        assert!((engine.network().time() - 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_record_every_and_text_output() {
        let (network, id) = single("HH");
        let params = SimulationParams::new(0.01, 0.05).unwrap().with_record_every(2);
        let mut engine = SimulationEngine::new(network, params).unwrap();
        engine.add_probe(Probe::variable("v", id, hh::V)).unwrap();
        let result = engine.run().unwrap();
        assert_eq!(result.steps_executed, 5);
        assert_eq!(result.len(), 3);
        assert_eq!(result.time[1], 0.02);

        let text = result.to_text();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "# time v");
        assert_eq!(lines.len(), 4);
        let fields: Vec<_> = lines[1].split(' ').collect();
        assert_eq!(fields[0], "0.000000");
        assert_eq!(fields[1].split('.').nth(1).map(str::len), Some(6));
    }

    #[test]
    fn test_run_fixed_step() {
        let (mut network, _) = single("HH");
        run_fixed_step(&mut network, 0.01, 10).unwrap();
        assert!((network.time() - 0.1).abs() < 1e-12);
        assert!(run_fixed_step(&mut network, -0.01, 1).is_err());
    }
}
