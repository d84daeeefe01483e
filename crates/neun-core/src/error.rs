//! Error types for the simulation core

use thiserror::Error;

use crate::scalar::Precision;

/// Result type for simulation operations
pub type Result<T> = std::result::Result<T, NeunError>;

/// Errors that can occur while building or stepping a simulation
///
/// Every variant is a contract violation reported to the immediate caller.
/// None of them leave a neuron or synapse partially updated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NeunError {
    /// Variable identifier not recognized by a model
    #[error("Invalid variable {variable} for model {model}")]
    InvalidVariable {
        /// Model short name
        model: String,
        /// Offending identifier (index or name)
        variable: String,
    },

    /// Parameter identifier not recognized by a model
    #[error("Invalid parameter {parameter} for model {model}")]
    InvalidParameter {
        /// Model short name
        model: String,
        /// Offending identifier (index or name)
        parameter: String,
    },

    /// Non-positive or non-finite step size
    #[error("Invalid integration step dt={dt} (expected finite and > 0)")]
    InvalidStep {
        /// Rejected step size
        dt: f64,
    },

    /// Synapse endpoints use different numeric precision
    #[error("Mismatched precision: endpoint a is {a}, endpoint b is {b}")]
    MismatchedPrecision {
        /// Precision of endpoint a
        a: Precision,
        /// Precision of endpoint b
        b: Precision,
    },

    /// A synapse or lookup refers to a neuron that no longer exists
    #[error("Dangling endpoint: neuron {neuron} no longer exists")]
    DanglingEndpoint {
        /// Display form of the stale neuron handle
        neuron: String,
    },

    /// Synapse handle not present in the network
    #[error("Synapse {synapse} not found")]
    SynapseNotFound {
        /// Display form of the synapse handle
        synapse: String,
    },

    /// Model name not present in the registry
    #[error("Unknown model: {name}")]
    UnknownModel {
        /// Requested short or class name
        name: String,
    },

    /// Invalid simulation or network configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Reason for invalid configuration
        reason: String,
    },

    /// Integration produced a non-finite state
    #[error("Numerical instability in {model} at t={time}: {reason}")]
    NumericalInstability {
        /// Model short name
        model: String,
        /// Simulation time of the rejected step
        time: f64,
        /// Reason for the failure
        reason: String,
    },
}

impl NeunError {
    /// Create an invalid variable error
    pub fn invalid_variable(model: impl Into<String>, variable: impl ToString) -> Self {
        Self::InvalidVariable {
            model: model.into(),
            variable: variable.to_string(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(model: impl Into<String>, parameter: impl ToString) -> Self {
        Self::InvalidParameter {
            model: model.into(),
            parameter: parameter.to_string(),
        }
    }

    /// Create an invalid step error
    pub fn invalid_step(dt: f64) -> Self {
        Self::InvalidStep { dt }
    }

    /// Create a dangling endpoint error
    pub fn dangling(neuron: impl ToString) -> Self {
        Self::DanglingEndpoint {
            neuron: neuron.to_string(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// Create a numerical instability error
    pub fn numerical(model: impl Into<String>, time: f64, reason: impl Into<String>) -> Self {
        Self::NumericalInstability {
            model: model.into(),
            time,
            reason: reason.into(),
        }
    }
}

/// Reject `dt` unless it is finite and strictly positive
pub(crate) fn check_dt(dt: f64) -> Result<()> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(NeunError::invalid_step(dt))
    }
}

/// Like [`check_dt`], but also rejects a `dt` that stops being finite and
/// positive once narrowed to `precision`
pub(crate) fn check_dt_at(dt: f64, precision: Precision) -> Result<()> {
    check_dt(dt)?;
    let narrowed = match precision {
        Precision::Single => dt as f32 as f64,
        Precision::Double => dt,
    };
    if narrowed.is_finite() && narrowed > 0.0 {
        Ok(())
    } else {
        Err(NeunError::invalid_step(dt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = NeunError::invalid_variable("HH", "w");
        assert!(matches!(err, NeunError::InvalidVariable { .. }));

        let err = NeunError::invalid_config("no neurons");
        assert!(matches!(err, NeunError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = NeunError::MismatchedPrecision {
            a: Precision::Single,
            b: Precision::Double,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("float"));
        assert!(msg.contains("double"));

        let err = NeunError::invalid_step(-1.0);
        assert!(format!("{}", err).contains("dt=-1"));
    }

    #[test]
    fn test_check_dt() {
        assert!(check_dt(0.001).is_ok());
        assert!(check_dt(0.0).is_err());
        assert!(check_dt(-1.0).is_err());
        assert!(check_dt(f64::NAN).is_err());
        assert!(check_dt(f64::INFINITY).is_err());
    }

    #[test]
    fn test_check_dt_at_precision() {
        assert!(check_dt_at(1e-50, Precision::Double).is_ok());
        assert_eq!(
            check_dt_at(1e-50, Precision::Single),
            Err(NeunError::InvalidStep { dt: 1e-50 })
        );
        assert!(check_dt_at(1e300, Precision::Single).is_err());
        assert!(check_dt_at(0.01, Precision::Single).is_ok());
    }
}
