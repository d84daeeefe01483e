//! Hodgkin-Huxley squid axon model

use crate::model::{Field, Model, ModelInfo, ParameterId, VariableId};
use crate::scalar::{lit, Scalar};

/// Membrane potential (mV)
pub const V: VariableId = VariableId(0);
/// Sodium activation
pub const M: VariableId = VariableId(1);
/// Potassium activation
pub const N: VariableId = VariableId(2);
/// Sodium inactivation
pub const H: VariableId = VariableId(3);

/// Membrane capacitance
pub const CM: ParameterId = ParameterId(0);
/// Sodium reversal potential
pub const VNA: ParameterId = ParameterId(1);
/// Potassium reversal potential
pub const VK: ParameterId = ParameterId(2);
/// Leak reversal potential
pub const VL: ParameterId = ParameterId(3);
/// Sodium conductance
pub const GNA: ParameterId = ParameterId(4);
/// Potassium conductance
pub const GK: ParameterId = ParameterId(5);
/// Leak conductance
pub const GL: ParameterId = ParameterId(6);

static INFO: ModelInfo = ModelInfo {
    class_name: "HodgkinHuxleyModel",
    short_name: "HH",
    description: "Hodgkin-Huxley conductance-based neuron",
    variables: &[
        Field::new("v", "Membrane potential"),
        Field::new("m", "Sodium activation gate"),
        Field::new("n", "Potassium activation gate"),
        Field::new("h", "Sodium inactivation gate"),
    ],
    parameters: &[
        Field::new("cm", "Membrane capacitance"),
        Field::new("vna", "Sodium reversal potential"),
        Field::new("vk", "Potassium reversal potential"),
        Field::new("vl", "Leak reversal potential"),
        Field::new("gna", "Maximal sodium conductance"),
        Field::new("gk", "Maximal potassium conductance"),
        Field::new("gl", "Leak conductance"),
    ],
};

/// Hodgkin-Huxley neuron (4 variables, 7 parameters)
#[derive(Debug, Default, Clone, Copy)]
pub struct HodgkinHuxleyModel;

/// `x / (exp(x / y) - 1)` with the removable singularity at `x = 0` filled in
fn vtrap<S: Scalar>(x: S, y: S) -> S {
    let r = x / y;
    if r.abs() < lit(1e-6) {
        y * (S::ONE - r * lit(0.5))
    } else {
        x / (r.exp() - S::ONE)
    }
}

impl<S: Scalar> Model<S> for HodgkinHuxleyModel {
    fn info(&self) -> &'static ModelInfo {
        &INFO
    }

    fn default_variables(&self) -> Vec<S> {
        vec![lit(-65.0), lit(0.0529), lit(0.3177), lit(0.5961)]
    }

    fn default_parameters(&self) -> Vec<S> {
        vec![
            lit(1.0),
            lit(50.0),
            lit(-77.0),
            lit(-54.387),
            lit(120.0),
            lit(36.0),
            lit(0.3),
        ]
    }

    fn derivative(&self, vars: &[S], params: &[S], input: S, _t: S, out: &mut [S]) {
        let v = vars[V.index()];
        let m = vars[M.index()];
        let n = vars[N.index()];
        let h = vars[H.index()];

        let alpha_m = lit::<S>(0.1) * vtrap(-(v + lit(40.0)), lit(10.0));
        let beta_m = lit::<S>(4.0) * (-(v + lit(65.0)) / lit(18.0)).exp();
        let alpha_h = lit::<S>(0.07) * (-(v + lit(65.0)) / lit(20.0)).exp();
        let beta_h = S::ONE / (S::ONE + (-(v + lit(35.0)) / lit(10.0)).exp());
        let alpha_n = lit::<S>(0.01) * vtrap(-(v + lit(55.0)), lit(10.0));
        let beta_n = lit::<S>(0.125) * (-(v + lit(65.0)) / lit(80.0)).exp();

        let i_na = params[GNA.index()] * m.powi(3) * h * (v - params[VNA.index()]);
        let i_k = params[GK.index()] * n.powi(4) * (v - params[VK.index()]);
        let i_l = params[GL.index()] * (v - params[VL.index()]);

        out[V.index()] = (input - i_na - i_k - i_l) / params[CM.index()];
        out[M.index()] = alpha_m * (S::ONE - m) - beta_m * m;
        out[N.index()] = alpha_n * (S::ONE - n) - beta_n * n;
        out[H.index()] = alpha_h * (S::ONE - h) - beta_h * h;
    }
}
