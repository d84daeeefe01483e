//! Model registry
//!
//! Holds every neuron model available to the network driver and the CLI,
//! keyed by short name. A registry is an ordinary value built at startup;
//! there is no process-wide table.

use std::sync::Arc;

use crate::error::{NeunError, Result};
use crate::integrator::IntegratorKind;
use crate::model::{Model, ModelInfo};
use crate::models::{HindmarshRoseModel, HodgkinHuxleyModel, IzhikevichModel};
use crate::neuron::AnyNeuron;
use crate::scalar::{Precision, Scalar};
use crate::synapse::SynapseKind;

/// A model with descriptors for both precisions
#[derive(Debug, Clone)]
pub struct ModelEntry {
    info: &'static ModelInfo,
    single: Arc<dyn Model<f32>>,
    double: Arc<dyn Model<f64>>,
}

impl ModelEntry {
    /// Static description of the model
    pub fn info(&self) -> &'static ModelInfo {
        self.info
    }

    /// Build a neuron of this model
    pub fn instantiate(&self, precision: Precision, integrator: IntegratorKind) -> AnyNeuron {
        AnyNeuron::build(self.single.clone(), self.double.clone(), precision, integrator)
    }
}

fn check_shape<S: Scalar, M: Model<S>>(model: &M) -> Result<()> {
    let info = model.info();
    let variables = model.default_variables().len();
    let parameters = model.default_parameters().len();
    if variables != info.num_variables() || parameters != info.num_parameters() {
        return Err(NeunError::invalid_config(format!(
            "model {} declares {} variables and {} parameters but its {} defaults have {} and {}",
            info.short_name,
            info.num_variables(),
            info.num_parameters(),
            S::PRECISION,
            variables,
            parameters
        )));
    }
    Ok(())
}

/// Registry of neuron models
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    entries: Vec<ModelEntry>,
}

impl ModelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the Hodgkin-Huxley, Hindmarsh-Rose and Izhikevich models
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        // Short names are distinct, registration cannot fail here.
        let _ = registry.register(HodgkinHuxleyModel);
        let _ = registry.register(HindmarshRoseModel);
        let _ = registry.register(IzhikevichModel);
        registry
    }

    /// Add a model usable at both precisions
    ///
    /// Fails if a model with the same short or class name is already present,
    /// or if its defaults do not match its declared variables and parameters.
    pub fn register<M>(&mut self, model: M) -> Result<()>
    where
        M: Model<f32> + Model<f64> + Clone + 'static,
    {
        check_shape::<f32, M>(&model)?;
        check_shape::<f64, M>(&model)?;
        let info = <M as Model<f64>>::info(&model);
        if self.get(info.short_name).is_some() || self.get(info.class_name).is_some() {
            return Err(NeunError::invalid_config(format!(
                "model {} is already registered",
                info.short_name
            )));
        }
        log::debug!("registered model {} ({})", info.short_name, info.class_name);
        self.entries.push(ModelEntry {
            info,
            single: Arc::new(model.clone()),
            double: Arc::new(model),
        });
        Ok(())
    }

    /// Look up a model by short name or class name
    pub fn get(&self, name: &str) -> Option<&ModelEntry> {
        self.entries
            .iter()
            .find(|e| e.info.short_name == name || e.info.class_name == name)
    }

    /// All registered models in registration order
    pub fn models(&self) -> impl Iterator<Item = &'static ModelInfo> + '_ {
        self.entries.iter().map(|e| e.info)
    }

    /// Description of a registered model
    pub fn model_info(&self, name: &str) -> Result<&'static ModelInfo> {
        self.get(name)
            .map(ModelEntry::info)
            .ok_or_else(|| NeunError::UnknownModel { name: name.to_string() })
    }

    /// Composite names of every neuron type, e.g. `HHDoubleRK4`
    pub fn available_neurons(&self) -> Vec<String> {
        let mut names = Vec::new();
        for info in self.models() {
            for precision in Precision::ALL {
                for integrator in IntegratorKind::ALL {
                    names.push(format!(
                        "{}{}{}",
                        info.short_name,
                        precision.type_suffix(),
                        integrator.short_name()
                    ));
                }
            }
        }
        names
    }

    /// Composite names of every synapse type, e.g. `ESynHHIzFloatRK6`
    pub fn available_synapses(&self) -> Vec<String> {
        let mut names = Vec::new();
        for kind in SynapseKind::ALL {
            for a in self.models() {
                for b in self.models() {
                    for precision in Precision::ALL {
                        for integrator in IntegratorKind::ALL {
                            names.push(format!(
                                "{}{}{}{}{}",
                                kind.short_name(),
                                a.short_name,
                                b.short_name,
                                precision.type_suffix(),
                                integrator.short_name()
                            ));
                        }
                    }
                }
            }
        }
        names
    }

    /// Build a neuron of a registered model with default state
    pub fn create_neuron(
        &self,
        name: &str,
        precision: Precision,
        integrator: IntegratorKind,
    ) -> Result<AnyNeuron> {
        let entry = self
            .get(name)
            .ok_or_else(|| NeunError::UnknownModel { name: name.to_string() })?;
        Ok(entry.instantiate(precision, integrator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::lit;

    #[test]
    fn test_builtin_models() {
        let registry = ModelRegistry::builtin();
        let names: Vec<_> = registry.models().map(|m| m.short_name).collect();
        assert_eq!(names, vec!["HH", "HR", "Iz"]);
        assert_eq!(registry.model_info("HodgkinHuxleyModel").unwrap().short_name, "HH");
        assert!(matches!(
            registry.model_info("LIF"),
            Err(NeunError::UnknownModel { .. })
        ));
    }

    #[test]
    fn test_available_names() {
        let registry = ModelRegistry::builtin();
        let neurons = registry.available_neurons();
        assert_eq!(neurons.len(), 3 * 2 * 2);
        assert!(neurons.contains(&"HHDoubleRK4".to_string()));
        assert!(neurons.contains(&"IzFloatRK6".to_string()));

        let synapses = registry.available_synapses();
        assert_eq!(synapses.len(), 2 * 3 * 3 * 2 * 2);
        assert!(synapses.contains(&"ESynHHHHDoubleRK4".to_string()));
        assert!(synapses.contains(&"DSynHRIzFloatRK6".to_string()));
    }

    #[test]
    fn test_create_neuron() {
        let registry = ModelRegistry::builtin();
        let neuron = registry
            .create_neuron("HR", Precision::Single, IntegratorKind::Rk6)
            .unwrap();
        assert_eq!(neuron.type_name(), "HRFloatRK6");
        assert!(registry
            .create_neuron("Nope", Precision::Double, IntegratorKind::Rk4)
            .is_err());
    }

    #[test]
    fn test_register_custom_model() {
        use crate::model::{Field, ParameterId, VariableId};

        static LEAK: ModelInfo = ModelInfo {
            class_name: "LeakModel",
            short_name: "Leak",
            description: "Passive leak",
            variables: &[Field::new("v", "Potential")],
            parameters: &[Field::new("tau", "Time constant")],
        };

        #[derive(Debug, Clone)]
        struct Leak;

        impl<S: Scalar> Model<S> for Leak {
            fn info(&self) -> &'static ModelInfo {
                &LEAK
            }
            fn default_variables(&self) -> Vec<S> {
                vec![S::ZERO]
            }
            fn default_parameters(&self) -> Vec<S> {
                vec![lit(10.0)]
            }
            fn derivative(&self, vars: &[S], params: &[S], input: S, _t: S, out: &mut [S]) {
                out[0] = (input - vars[0]) / params[0];
            }
        }

        let mut registry = ModelRegistry::builtin();
        registry.register(Leak).unwrap();
        assert!(registry.register(Leak).is_err());
        assert!(registry.register(HodgkinHuxleyModel).is_err());

        let mut neuron = registry
            .create_neuron("Leak", Precision::Double, IntegratorKind::Rk4)
            .unwrap();
        neuron.add_input(10.0);
        neuron.step(1.0).unwrap();
        assert!(neuron.get(VariableId(0)).unwrap() > 0.0);
        assert_eq!(neuron.get_param(ParameterId(0)).unwrap(), 10.0);
    }

    #[test]
    fn test_register_rejects_mismatched_defaults() {
        static LOPSIDED: ModelInfo = ModelInfo {
            class_name: "LopsidedModel",
            short_name: "Lop",
            description: "Declares one variable, defaults two",
            variables: &[crate::model::Field::new("v", "Potential")],
            parameters: &[],
        };

        #[derive(Debug, Clone)]
        struct Lopsided;

        impl<S: Scalar> Model<S> for Lopsided {
            fn info(&self) -> &'static ModelInfo {
                &LOPSIDED
            }
            fn default_variables(&self) -> Vec<S> {
                vec![S::ZERO, S::ZERO]
            }
            fn default_parameters(&self) -> Vec<S> {
                Vec::new()
            }
            fn derivative(&self, _vars: &[S], _params: &[S], _input: S, _t: S, out: &mut [S]) {
                for d in out.iter_mut() {
                    *d = S::ZERO;
                }
            }
        }

        let mut registry = ModelRegistry::builtin();
        let err = registry.register(Lopsided).unwrap_err();
        assert!(matches!(err, NeunError::InvalidConfiguration { .. }));
        assert!(err.to_string().contains("Lop"));
        assert!(registry.get("Lop").is_none());
        assert_eq!(registry.models().count(), 3);
    }
}
