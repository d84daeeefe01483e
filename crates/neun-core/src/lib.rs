//! Coupled-neuron ODE simulation core
//!
//! Neuron models are described once ([`Model`]) and instantiated at either
//! precision with either integrator ([`Neuron`]). Synapses couple one
//! variable of two neurons by injecting currents into their input
//! accumulators, and the [`Network`] driver advances everything in the
//! required synapse-then-neuron order.
//!
//! ```
//! use neun_core::models::{hodgkin_huxley as hh, HodgkinHuxleyModel};
//! use neun_core::{ElectricalSynapse, Neuron, Synapse};
//!
//! let mut a: Neuron<f64> = Neuron::new(HodgkinHuxleyModel);
//! let mut b: Neuron<f64> = Neuron::new(HodgkinHuxleyModel);
//! a.set(hh::V, -75.0).unwrap();
//!
//! let mut syn = ElectricalSynapse::new(&a, hh::V, &b, hh::V, -0.002, -0.002).unwrap();
//! for _ in 0..100 {
//!     syn.step(&mut a, &mut b, 0.001).unwrap();
//!     a.add_input(0.1);
//!     a.step(0.001).unwrap();
//!     b.step(0.001).unwrap();
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod integrator;
pub mod model;
pub mod models;
pub mod network;
pub mod neuron;
pub mod registry;
pub mod scalar;
pub mod simulation;
pub mod synapse;

pub use error::{NeunError, Result};
pub use integrator::{Integrator, IntegratorKind, RungeKutta4, RungeKutta6};
pub use model::{Field, Model, ModelInfo, ParameterId, VariableId};
pub use network::{Network, NeuronId, SynapseId, SynapseLink};
pub use neuron::{AnyNeuron, DynNeuron, Endpoint, Neuron};
pub use registry::{ModelEntry, ModelRegistry};
pub use scalar::{Precision, Scalar};
pub use simulation::{
    run_fixed_step, Probe, SimulationEngine, SimulationParams, SimulationResult, StimulusPattern,
};
pub use synapse::{AnySynapse, DiffusionSynapse, ElectricalSynapse, Synapse, SynapseKind};

/// Crate version reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
