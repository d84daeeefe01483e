//! Izhikevich quadratic integrate-and-fire model

use crate::model::{Field, Model, ModelInfo, ParameterId, VariableId};
use crate::scalar::{lit, Scalar};

/// Membrane potential (mV)
pub const V: VariableId = VariableId(0);
/// Recovery variable
pub const U: VariableId = VariableId(1);

/// Recovery time scale
pub const A: ParameterId = ParameterId(0);
/// Recovery sensitivity
pub const B: ParameterId = ParameterId(1);
/// Reset potential
pub const C: ParameterId = ParameterId(2);
/// Recovery increment after a spike
pub const D: ParameterId = ParameterId(3);

/// Spike cutoff (mV)
pub const SPIKE_PEAK: f64 = 30.0;

static INFO: ModelInfo = ModelInfo {
    class_name: "IzhikevichModel",
    short_name: "Iz",
    description: "Izhikevich simple spiking neuron",
    variables: &[
        Field::new("v", "Membrane potential"),
        Field::new("u", "Membrane recovery variable"),
    ],
    parameters: &[
        Field::new("a", "Recovery time scale"),
        Field::new("b", "Recovery sensitivity to v"),
        Field::new("c", "After-spike reset potential"),
        Field::new("d", "After-spike recovery increment"),
    ],
};

/// Izhikevich neuron (2 variables, 4 parameters), regular spiking defaults
#[derive(Debug, Default, Clone, Copy)]
pub struct IzhikevichModel;

impl<S: Scalar> Model<S> for IzhikevichModel {
    fn info(&self) -> &'static ModelInfo {
        &INFO
    }

    fn default_variables(&self) -> Vec<S> {
        vec![lit(-65.0), lit(-13.0)]
    }

    fn default_parameters(&self) -> Vec<S> {
        vec![lit(0.02), lit(0.2), lit(-65.0), lit(8.0)]
    }

    fn derivative(&self, vars: &[S], params: &[S], input: S, _t: S, out: &mut [S]) {
        let v = vars[V.index()];
        let u = vars[U.index()];
        out[V.index()] = lit::<S>(0.04) * v * v + lit::<S>(5.0) * v + lit(140.0) - u + input;
        out[U.index()] = params[A.index()] * (params[B.index()] * v - u);
    }

    fn post_step(&self, vars: &mut [S], params: &[S]) {
        if vars[V.index()] >= lit(SPIKE_PEAK) {
            vars[V.index()] = params[C.index()];
            vars[U.index()] += params[D.index()];
        }
    }
}
