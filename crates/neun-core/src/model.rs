//! Model descriptors
//!
//! A model supplies the fixed variable and parameter sets of a neuron type,
//! their defaults, and the derivative function. Everything else (state
//! storage, integration, input accumulation) lives in [`crate::Neuron`].

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::scalar::Scalar;

/// Index of a state variable within a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VariableId(pub u16);

impl VariableId {
    /// Create a new variable ID
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Get the index into the variable vector
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "var#{}", self.0)
    }
}

/// Index of a parameter within a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParameterId(pub u16);

impl ParameterId {
    /// Create a new parameter ID
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Get the index into the parameter vector
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "param#{}", self.0)
    }
}

/// A named, documented entry in a model's variable or parameter list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Field {
    /// Identifier used in configs and lookups
    pub name: &'static str,
    /// Human readable description
    pub description: &'static str,
}

impl Field {
    /// Create a field entry
    pub const fn new(name: &'static str, description: &'static str) -> Self {
        Self { name, description }
    }
}

/// Static description of a model type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ModelInfo {
    /// Full model name, e.g. `HodgkinHuxleyModel`
    pub class_name: &'static str,
    /// Short prefix used in composite names, e.g. `HH`
    pub short_name: &'static str,
    /// One-line description
    pub description: &'static str,
    /// Ordered state variables
    pub variables: &'static [Field],
    /// Ordered parameters
    pub parameters: &'static [Field],
}

impl ModelInfo {
    /// Resolve a variable by name
    pub fn variable_id(&self, name: &str) -> Option<VariableId> {
        self.variables
            .iter()
            .position(|field| field.name == name)
            .map(|i| VariableId(i as u16))
    }

    /// Resolve a parameter by name
    pub fn parameter_id(&self, name: &str) -> Option<ParameterId> {
        self.parameters
            .iter()
            .position(|field| field.name == name)
            .map(|i| ParameterId(i as u16))
    }

    /// Name of a variable, if the index is in range
    pub fn variable_name(&self, id: VariableId) -> Option<&'static str> {
        self.variables.get(id.index()).map(|field| field.name)
    }

    /// Name of a parameter, if the index is in range
    pub fn parameter_name(&self, id: ParameterId) -> Option<&'static str> {
        self.parameters.get(id.index()).map(|field| field.name)
    }

    /// Number of state variables
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Number of parameters
    pub fn num_parameters(&self) -> usize {
        self.parameters.len()
    }
}

/// Dynamics of one neuron type at a given precision
///
/// `derivative` must be a pure function of its arguments. The integrator may
/// call it several times per step with intermediate states.
pub trait Model<S: Scalar>: fmt::Debug + Send + Sync {
    /// Static description of the model
    fn info(&self) -> &'static ModelInfo;

    /// Initial state variables, one per [`ModelInfo::variables`] entry
    fn default_variables(&self) -> Vec<S>;

    /// Initial parameters, one per [`ModelInfo::parameters`] entry
    fn default_parameters(&self) -> Vec<S>;

    /// Write `d(vars)/dt` into `out`
    fn derivative(&self, vars: &[S], params: &[S], input: S, t: S, out: &mut [S]);

    /// Discrete update applied after each accepted integration step
    ///
    /// Continuous models leave this empty; threshold models reset here.
    fn post_step(&self, _vars: &mut [S], _params: &[S]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: [Field; 2] = [Field::new("v", "Membrane potential"), Field::new("u", "Recovery")];
    const INFO: ModelInfo = ModelInfo {
        class_name: "TestModel",
        short_name: "T",
        description: "test",
        variables: &FIELDS,
        parameters: &[],
    };

    #[test]
    fn test_lookup() {
        assert_eq!(INFO.variable_id("u"), Some(VariableId(1)));
        assert_eq!(INFO.variable_id("w"), None);
        assert_eq!(INFO.variable_name(VariableId(0)), Some("v"));
        assert_eq!(INFO.variable_name(VariableId(2)), None);
        assert_eq!(INFO.parameter_id("a"), None);
        assert_eq!(INFO.num_variables(), 2);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(VariableId::new(3).to_string(), "var#3");
        assert_eq!(ParameterId::new(1).index(), 1);
    }
}
