//! Hindmarsh-Rose bursting neuron

use crate::model::{Field, Model, ModelInfo, ParameterId, VariableId};
use crate::scalar::{lit, Scalar};

/// Membrane potential
pub const X: VariableId = VariableId(0);
/// Fast recovery current
pub const Y: VariableId = VariableId(1);
/// Slow adaptation current
pub const Z: VariableId = VariableId(2);

/// Cubic coefficient
pub const A: ParameterId = ParameterId(0);
/// Quadratic coefficient
pub const B: ParameterId = ParameterId(1);
/// Recovery offset
pub const C: ParameterId = ParameterId(2);
/// Recovery quadratic coefficient
pub const D: ParameterId = ParameterId(3);
/// Intrinsic drive current
pub const E: ParameterId = ParameterId(4);
/// Slow time scale
pub const MU: ParameterId = ParameterId(5);
/// Adaptation coupling
pub const S: ParameterId = ParameterId(6);
/// Adaptation reference potential
pub const XR: ParameterId = ParameterId(7);
/// Global time scale factor
pub const VH: ParameterId = ParameterId(8);

static INFO: ModelInfo = ModelInfo {
    class_name: "HindmarshRoseModel",
    short_name: "HR",
    description: "Hindmarsh-Rose three-variable bursting neuron",
    variables: &[
        Field::new("x", "Membrane potential"),
        Field::new("y", "Fast recovery variable"),
        Field::new("z", "Slow adaptation variable"),
    ],
    parameters: &[
        Field::new("a", "Cubic term coefficient"),
        Field::new("b", "Quadratic term coefficient"),
        Field::new("c", "Recovery offset"),
        Field::new("d", "Recovery quadratic coefficient"),
        Field::new("e", "Intrinsic drive current"),
        Field::new("mu", "Slow adaptation rate"),
        Field::new("S", "Adaptation coupling strength"),
        Field::new("xr", "Adaptation reference potential"),
        Field::new("vh", "Time scale factor"),
    ],
};

/// Hindmarsh-Rose neuron (3 variables, 9 parameters)
///
/// ```text
/// dx/dt = vh (y + b x^2 - a x^3 - z + e + I)
/// dy/dt = vh (c - d x^2 - y)
/// dz/dt = vh mu (S (x - xr) - z)
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct HindmarshRoseModel;

impl<T: Scalar> Model<T> for HindmarshRoseModel {
    fn info(&self) -> &'static ModelInfo {
        &INFO
    }

    fn default_variables(&self) -> Vec<T> {
        vec![lit(-1.6), lit(-10.0), lit(0.0)]
    }

    fn default_parameters(&self) -> Vec<T> {
        vec![
            lit(1.0),
            lit(3.0),
            lit(1.0),
            lit(5.0),
            lit(3.281),
            lit(0.0029),
            lit(4.0),
            lit(-1.6),
            lit(1.0),
        ]
    }

    fn derivative(&self, vars: &[T], params: &[T], input: T, _t: T, out: &mut [T]) {
        let x = vars[X.index()];
        let y = vars[Y.index()];
        let z = vars[Z.index()];
        let vh = params[VH.index()];

        let x2 = x * x;
        out[X.index()] = vh
            * (y + params[B.index()] * x2 - params[A.index()] * x2 * x - z
                + params[E.index()]
                + input);
        out[Y.index()] = vh * (params[C.index()] - params[D.index()] * x2 - y);
        out[Z.index()] =
            vh * params[MU.index()] * (params[S.index()] * (x - params[XR.index()]) - z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivative_at_defaults() {
        let model = HindmarshRoseModel;
        let vars: Vec<f64> = vec![0.0, 0.0, 0.0];
        let params: Vec<f64> = model.default_parameters();
        let mut out = vec![0.0; 3];
        model.derivative(&vars[..], &params[..], 1.0, 0.0, &mut out[..]);
        assert!((out[0] - 4.281).abs() < 1e-12);
        assert!((out[1] - 1.0).abs() < 1e-12);
        assert!((out[2] - 0.0029 * 4.0 * 1.6).abs() < 1e-12);
    }

    #[test]
    fn test_time_scale() {
        let model = HindmarshRoseModel;
        let vars: Vec<f64> = model.default_variables();
        let mut params: Vec<f64> = model.default_parameters();
        let mut slow = vec![0.0; 3];
        let mut fast = vec![0.0; 3];
        model.derivative(&vars[..], &params[..], 0.0, 0.0, &mut slow[..]);
        params[VH.index()] = 2.0;
        model.derivative(&vars[..], &params[..], 0.0, 0.0, &mut fast[..]);
        for (s, f) in slow.iter().zip(&fast) {
            assert!((2.0 * s - f).abs() < 1e-12);
        }
    }
}
