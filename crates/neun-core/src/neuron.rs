//! Neuron state machine
//!
//! A [`Neuron`] owns the variable and parameter vectors of one model
//! instance, accumulates injected current between steps, and advances its
//! state with the integrator chosen by its type parameter.

use core::fmt;
use core::marker::PhantomData;
use std::sync::Arc;

use crate::error::{check_dt, check_dt_at, NeunError, Result};
use crate::integrator::{Integrator, IntegratorKind, RungeKutta4};
use crate::model::{Model, ModelInfo, ParameterId, VariableId};
use crate::scalar::{Precision, Scalar};

/// Read access to coupling variables plus an input accumulator
///
/// This is all a synapse needs from the neurons it couples.
pub trait Endpoint<S: Scalar> {
    /// Static description of the endpoint's model
    fn model_info(&self) -> &'static ModelInfo;

    /// Read one state variable
    fn get(&self, id: VariableId) -> Result<S>;

    /// Add to the pending input current
    fn add_input(&mut self, current: S);
}

/// One neuron of a given model, precision and integrator
pub struct Neuron<S: Scalar, I: Integrator = RungeKutta4> {
    model: Arc<dyn Model<S>>,
    variables: Vec<S>,
    parameters: Vec<S>,
    pending_input: S,
    time: S,
    scratch: Vec<S>,
    staged: Option<S>,
    _integrator: PhantomData<I>,
}

impl<S: Scalar, I: Integrator> Neuron<S, I> {
    /// Create a neuron with the model's default variables and parameters
    pub fn new<M: Model<S> + 'static>(model: M) -> Self {
        Self::from_shared(Arc::new(model))
    }

    /// Create a neuron from a shared model descriptor
    pub fn from_shared(model: Arc<dyn Model<S>>) -> Self {
        let variables = model.default_variables();
        let parameters = model.default_parameters();
        debug_assert_eq!(variables.len(), model.info().num_variables());
        debug_assert_eq!(parameters.len(), model.info().num_parameters());

        let scratch = vec![S::ZERO; variables.len()];
        Self {
            model,
            variables,
            parameters,
            pending_input: S::ZERO,
            time: S::ZERO,
            scratch,
            staged: None,
            _integrator: PhantomData,
        }
    }

    /// Static description of the model
    pub fn model_info(&self) -> &'static ModelInfo {
        self.model.info()
    }

    /// Numeric precision of this neuron
    pub fn precision(&self) -> Precision {
        S::PRECISION
    }

    /// Integrator used by [`Neuron::step`]
    pub fn integrator(&self) -> IntegratorKind {
        I::KIND
    }

    /// Composite type name, e.g. `HHDoubleRK4`
    pub fn type_name(&self) -> String {
        format!(
            "{}{}{}",
            self.model_info().short_name,
            S::PRECISION.type_suffix(),
            I::SHORT_NAME
        )
    }

    /// Full integrator name, e.g. `RungeKutta6`
    pub fn integrator_name(&self) -> &'static str {
        I::NAME
    }

    /// Resolve a variable identifier by name
    pub fn variable_id(&self, name: &str) -> Result<VariableId> {
        let info = self.model_info();
        info.variable_id(name)
            .ok_or_else(|| NeunError::invalid_variable(info.short_name, name))
    }

    /// Resolve a parameter identifier by name
    pub fn parameter_id(&self, name: &str) -> Result<ParameterId> {
        let info = self.model_info();
        info.parameter_id(name)
            .ok_or_else(|| NeunError::invalid_parameter(info.short_name, name))
    }

    /// Read a state variable
    pub fn get(&self, id: VariableId) -> Result<S> {
        self.variables
            .get(id.index())
            .copied()
            .ok_or_else(|| NeunError::invalid_variable(self.model_info().short_name, id))
    }

    /// Overwrite a state variable
    pub fn set(&mut self, id: VariableId, value: S) -> Result<()> {
        let short_name = self.model.info().short_name;
        let slot = self
            .variables
            .get_mut(id.index())
            .ok_or_else(|| NeunError::invalid_variable(short_name, id))?;
        *slot = value;
        Ok(())
    }

    /// Read a parameter
    pub fn get_param(&self, id: ParameterId) -> Result<S> {
        self.parameters
            .get(id.index())
            .copied()
            .ok_or_else(|| NeunError::invalid_parameter(self.model_info().short_name, id))
    }

    /// Overwrite a parameter
    pub fn set_param(&mut self, id: ParameterId, value: S) -> Result<()> {
        let short_name = self.model.info().short_name;
        let slot = self
            .parameters
            .get_mut(id.index())
            .ok_or_else(|| NeunError::invalid_parameter(short_name, id))?;
        *slot = value;
        Ok(())
    }

    /// All state variables in model order
    pub fn variables(&self) -> &[S] {
        &self.variables
    }

    /// All parameters in model order
    pub fn parameters(&self) -> &[S] {
        &self.parameters
    }

    /// Add input current; consumed and cleared by the next [`Neuron::step`]
    pub fn add_input(&mut self, current: S) {
        self.pending_input += current;
    }

    /// Input accumulated since the last step
    pub fn pending_input(&self) -> S {
        self.pending_input
    }

    /// Simulation clock of this neuron
    pub fn time(&self) -> S {
        self.time
    }

    /// Rewind the clock to zero without touching state
    pub fn reset_time(&mut self) {
        self.time = S::ZERO;
    }

    /// Advance the neuron by `dt`
    ///
    /// Synapses feeding this neuron must be stepped first: the pending input
    /// is consumed here and cleared. On error nothing is modified.
    pub fn step(&mut self, dt: S) -> Result<()> {
        self.stage_step(dt)?;
        self.commit_step();
        Ok(())
    }

    /// Integrate one step of `dt` without changing observable state
    ///
    /// The result is held until [`Neuron::commit_step`]. Staging again, or a
    /// failed stage, discards it.
    pub fn stage_step(&mut self, dt: S) -> Result<()> {
        self.staged = None;
        check_dt(dt.to_f64())?;

        let model = &*self.model;
        let params = &self.parameters;
        let input = self.pending_input;
        I::integrate::<S, _>(
            |y: &[S], t: S, dydt: &mut [S]| model.derivative(y, params, input, t, dydt),
            &self.variables[..],
            self.time,
            dt,
            &mut self.scratch[..],
        );

        if let Some(index) = self.scratch.iter().position(|x| !x.is_finite()) {
            let info = model.info();
            let name = info.variables.get(index).map_or("?", |field| field.name);
            return Err(NeunError::numerical(
                info.short_name,
                self.time.to_f64(),
                format!("variable '{}' became non-finite", name),
            ));
        }

        self.staged = Some(dt);
        Ok(())
    }

    /// Apply the step held by [`Neuron::stage_step`]
    ///
    /// Runs the model's post-step rule, clears the pending input and advances
    /// the clock. Does nothing when no step is staged.
    pub fn commit_step(&mut self) {
        let Some(dt) = self.staged.take() else {
            return;
        };
        core::mem::swap(&mut self.variables, &mut self.scratch);
        self.model.post_step(&mut self.variables, &self.parameters);
        self.pending_input = S::ZERO;
        self.time += dt;
    }
}

impl<S: Scalar, I: Integrator> Clone for Neuron<S, I> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            variables: self.variables.clone(),
            parameters: self.parameters.clone(),
            pending_input: self.pending_input,
            time: self.time,
            scratch: self.scratch.clone(),
            staged: self.staged,
            _integrator: PhantomData,
        }
    }
}

impl<S: Scalar, I: Integrator> fmt::Debug for Neuron<S, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Neuron")
            .field("type", &self.type_name())
            .field("variables", &self.variables)
            .field("parameters", &self.parameters)
            .field("pending_input", &self.pending_input)
            .field("time", &self.time)
            .finish()
    }
}

impl<S: Scalar, I: Integrator> Endpoint<S> for Neuron<S, I> {
    fn model_info(&self) -> &'static ModelInfo {
        self.model.info()
    }

    fn get(&self, id: VariableId) -> Result<S> {
        Neuron::get(self, id)
    }

    fn add_input(&mut self, current: S) {
        Neuron::add_input(self, current)
    }
}

/// Object-safe view of a [`Neuron`] with its integrator erased
pub trait DynNeuron<S: Scalar>: Endpoint<S> + fmt::Debug + Send + Sync {
    /// Overwrite a state variable
    fn set(&mut self, id: VariableId, value: S) -> Result<()>;
    /// Read a parameter
    fn get_param(&self, id: ParameterId) -> Result<S>;
    /// Overwrite a parameter
    fn set_param(&mut self, id: ParameterId, value: S) -> Result<()>;
    /// Input accumulated since the last step
    fn pending_input(&self) -> S;
    /// Replace the accumulated input
    fn set_pending_input(&mut self, current: S);
    /// Advance by `dt`
    fn step(&mut self, dt: S) -> Result<()>;
    /// Integrate one step without changing observable state
    fn stage_step(&mut self, dt: S) -> Result<()>;
    /// Apply the staged step, if any
    fn commit_step(&mut self);
    /// Simulation clock
    fn time(&self) -> S;
    /// Integrator used by `step`
    fn integrator(&self) -> IntegratorKind;
}

impl<S: Scalar, I: Integrator> DynNeuron<S> for Neuron<S, I> {
    fn set(&mut self, id: VariableId, value: S) -> Result<()> {
        Neuron::set(self, id, value)
    }

    fn get_param(&self, id: ParameterId) -> Result<S> {
        Neuron::get_param(self, id)
    }

    fn set_param(&mut self, id: ParameterId, value: S) -> Result<()> {
        Neuron::set_param(self, id, value)
    }

    fn pending_input(&self) -> S {
        self.pending_input
    }

    fn set_pending_input(&mut self, current: S) {
        self.pending_input = current;
    }

    fn step(&mut self, dt: S) -> Result<()> {
        Neuron::step(self, dt)
    }

    fn stage_step(&mut self, dt: S) -> Result<()> {
        Neuron::stage_step(self, dt)
    }

    fn commit_step(&mut self) {
        Neuron::commit_step(self)
    }

    fn time(&self) -> S {
        self.time
    }

    fn integrator(&self) -> IntegratorKind {
        I::KIND
    }
}

/// A neuron whose precision and integrator are chosen at runtime
///
/// Values cross this boundary as `f64`; single precision neurons round on
/// the way in.
#[derive(Debug)]
pub enum AnyNeuron {
    /// `f32` state
    Single(Box<dyn DynNeuron<f32>>),
    /// `f64` state
    Double(Box<dyn DynNeuron<f64>>),
}

macro_rules! dispatch {
    ($self:expr, $n:ident => $body:expr) => {
        match $self {
            AnyNeuron::Single($n) => $body,
            AnyNeuron::Double($n) => $body,
        }
    };
}

impl AnyNeuron {
    /// Build a neuron for the given model descriptors and integrator
    pub fn build(
        single: Arc<dyn Model<f32>>,
        double: Arc<dyn Model<f64>>,
        precision: Precision,
        integrator: IntegratorKind,
    ) -> Self {
        use crate::integrator::RungeKutta6;

        match (precision, integrator) {
            (Precision::Single, IntegratorKind::Rk4) => {
                AnyNeuron::Single(Box::new(Neuron::<f32, RungeKutta4>::from_shared(single)))
            }
            (Precision::Single, IntegratorKind::Rk6) => {
                AnyNeuron::Single(Box::new(Neuron::<f32, RungeKutta6>::from_shared(single)))
            }
            (Precision::Double, IntegratorKind::Rk4) => {
                AnyNeuron::Double(Box::new(Neuron::<f64, RungeKutta4>::from_shared(double)))
            }
            (Precision::Double, IntegratorKind::Rk6) => {
                AnyNeuron::Double(Box::new(Neuron::<f64, RungeKutta6>::from_shared(double)))
            }
        }
    }

    /// Numeric precision
    pub fn precision(&self) -> Precision {
        match self {
            AnyNeuron::Single(_) => Precision::Single,
            AnyNeuron::Double(_) => Precision::Double,
        }
    }

    /// Integrator used by `step`
    pub fn integrator(&self) -> IntegratorKind {
        dispatch!(self, n => n.integrator())
    }

    /// Static description of the model
    pub fn model_info(&self) -> &'static ModelInfo {
        dispatch!(self, n => n.model_info())
    }

    /// Composite type name, e.g. `HHDoubleRK4`
    pub fn type_name(&self) -> String {
        format!(
            "{}{}{}",
            self.model_info().short_name,
            self.precision().type_suffix(),
            self.integrator().short_name()
        )
    }

    /// Resolve a variable identifier by name
    pub fn variable_id(&self, name: &str) -> Result<VariableId> {
        let info = self.model_info();
        info.variable_id(name)
            .ok_or_else(|| NeunError::invalid_variable(info.short_name, name))
    }

    /// Resolve a parameter identifier by name
    pub fn parameter_id(&self, name: &str) -> Result<ParameterId> {
        let info = self.model_info();
        info.parameter_id(name)
            .ok_or_else(|| NeunError::invalid_parameter(info.short_name, name))
    }

    /// Read a state variable
    pub fn get(&self, id: VariableId) -> Result<f64> {
        dispatch!(self, n => n.get(id).map(Scalar::to_f64))
    }

    /// Overwrite a state variable
    pub fn set(&mut self, id: VariableId, value: f64) -> Result<()> {
        dispatch!(self, n => n.set(id, Scalar::from_f64(value)))
    }

    /// Read a parameter
    pub fn get_param(&self, id: ParameterId) -> Result<f64> {
        dispatch!(self, n => n.get_param(id).map(Scalar::to_f64))
    }

    /// Overwrite a parameter
    pub fn set_param(&mut self, id: ParameterId, value: f64) -> Result<()> {
        dispatch!(self, n => n.set_param(id, Scalar::from_f64(value)))
    }

    /// Add input current
    pub fn add_input(&mut self, current: f64) {
        dispatch!(self, n => n.add_input(Scalar::from_f64(current)))
    }

    /// Input accumulated since the last step
    pub fn pending_input(&self) -> f64 {
        dispatch!(self, n => n.pending_input().to_f64())
    }

    /// Replace the accumulated input
    pub fn set_pending_input(&mut self, current: f64) {
        dispatch!(self, n => n.set_pending_input(Scalar::from_f64(current)))
    }

    /// Advance by `dt`
    pub fn step(&mut self, dt: f64) -> Result<()> {
        check_dt_at(dt, self.precision())?;
        dispatch!(self, n => n.step(Scalar::from_f64(dt)))
    }

    /// Integrate one step of `dt` without changing observable state
    pub fn stage_step(&mut self, dt: f64) -> Result<()> {
        check_dt_at(dt, self.precision())?;
        dispatch!(self, n => n.stage_step(Scalar::from_f64(dt)))
    }

    /// Apply the step held by [`AnyNeuron::stage_step`]
    pub fn commit_step(&mut self) {
        dispatch!(self, n => n.commit_step())
    }

    /// Simulation clock
    pub fn time(&self) -> f64 {
        dispatch!(self, n => n.time().to_f64())
    }
}
