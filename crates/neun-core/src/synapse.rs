//! Synaptic coupling between two neurons
//!
//! A synapse reads one variable from each endpoint, computes a coupling
//! current and pushes it into both endpoints' input accumulators. It must be
//! stepped before the neurons it couples, since a neuron's `step` consumes
//! and clears its pending input.
//!
//! Synapses never own their endpoints. The typed API takes the endpoints by
//! reference on every call; [`crate::Network`] binds them by handle.

use core::fmt;
use core::marker::PhantomData;

use crate::error::{check_dt, NeunError, Result};
use crate::integrator::{Integrator, RungeKutta4};
use crate::model::{Field, ModelInfo, ParameterId, VariableId};
use crate::neuron::{DynNeuron, Endpoint};
use crate::scalar::{Precision, Scalar};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Current injected into endpoint b
pub const I1: VariableId = VariableId(0);
/// Current injected into endpoint a
pub const I2: VariableId = VariableId(1);
/// Filtered voltage difference of a diffusion synapse
pub const DIFFUSION_STATE: VariableId = VariableId(2);

/// Coupling strength from a to b
pub const G1: ParameterId = ParameterId(0);
/// Coupling strength from b to a
pub const G2: ParameterId = ParameterId(1);
/// Relaxation time constant of a diffusion synapse
pub const TAU: ParameterId = ParameterId(2);

static ELECTRICAL_INFO: ModelInfo = ModelInfo {
    class_name: "ElectricalSynapsis",
    short_name: "ESyn",
    description: "Instantaneous gap-junction coupling",
    variables: &[
        Field::new("i1", "Current injected into endpoint b"),
        Field::new("i2", "Current injected into endpoint a"),
    ],
    parameters: &[
        Field::new("g1", "Coupling strength a to b"),
        Field::new("g2", "Coupling strength b to a"),
    ],
};

static DIFFUSION_INFO: ModelInfo = ModelInfo {
    class_name: "DiffusionSynapsis",
    short_name: "DSyn",
    description: "Coupling through a low-pass filtered voltage difference",
    variables: &[
        Field::new("i1", "Current injected into endpoint b"),
        Field::new("i2", "Current injected into endpoint a"),
        Field::new("s", "Filtered voltage difference"),
    ],
    parameters: &[
        Field::new("g1", "Coupling strength a to b"),
        Field::new("g2", "Coupling strength b to a"),
        Field::new("tau", "Relaxation time constant"),
    ],
};

/// Synapse flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SynapseKind {
    /// [`ElectricalSynapse`]
    Electrical,
    /// [`DiffusionSynapse`]
    Diffusion,
}

impl SynapseKind {
    /// All synapse kinds
    pub const ALL: [SynapseKind; 2] = [SynapseKind::Electrical, SynapseKind::Diffusion];

    /// Static description of the synapse type
    pub fn info(&self) -> &'static ModelInfo {
        match self {
            SynapseKind::Electrical => &ELECTRICAL_INFO,
            SynapseKind::Diffusion => &DIFFUSION_INFO,
        }
    }

    /// Prefix used in composite type names
    pub fn short_name(&self) -> &'static str {
        self.info().short_name
    }
}

impl fmt::Display for SynapseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Coupling unit between two endpoints of the same precision
pub trait Synapse<S: Scalar>: fmt::Debug + Send + Sync {
    /// Synapse flavour
    fn kind(&self) -> SynapseKind;

    /// Variables read from endpoint a and endpoint b
    fn coupling_variables(&self) -> (VariableId, VariableId);

    /// Compute coupling currents and add them to both endpoints
    ///
    /// Nothing is written unless both endpoint reads succeed.
    fn step(&mut self, a: &mut dyn Endpoint<S>, b: &mut dyn Endpoint<S>, dt: S) -> Result<()> {
        self.stage(&*a, &*b, dt)?;
        self.inject_staged(a, b);
        self.commit();
        Ok(())
    }

    /// Compute the next currents and internal state from the endpoints
    ///
    /// The result is held aside: readers keep seeing the previous values
    /// until [`Synapse::commit`]. A failed stage discards any earlier one.
    fn stage(&mut self, a: &dyn Endpoint<S>, b: &dyn Endpoint<S>, dt: S) -> Result<()>;

    /// Add the staged currents to both endpoints
    fn inject_staged(&self, a: &mut dyn Endpoint<S>, b: &mut dyn Endpoint<S>);

    /// Make the staged currents and state current
    fn commit(&mut self);

    /// Most recent current injected into endpoint b
    fn synaptic_current(&self) -> S;

    /// Most recent current injected into endpoint a
    fn current_b_to_a(&self) -> S;

    /// Read a synapse variable (`i1`, `i2`, ...)
    fn get(&self, id: VariableId) -> Result<S>;

    /// Overwrite a synapse variable
    fn set(&mut self, id: VariableId, value: S) -> Result<()>;

    /// Read a synapse parameter (`g1`, `g2`, ...)
    fn get_param(&self, id: ParameterId) -> Result<S>;

    /// Overwrite a synapse parameter
    fn set_param(&mut self, id: ParameterId, value: S) -> Result<()>;

    /// Static description of the synapse type
    fn info(&self) -> &'static ModelInfo {
        self.kind().info()
    }
}

fn check_coupling_variable<S: Scalar>(endpoint: &dyn Endpoint<S>, id: VariableId) -> Result<()> {
    endpoint.get(id).map(|_| ())
}

/// Gap junction: current proportional to the instantaneous difference
#[derive(Debug, Clone, PartialEq)]
pub struct ElectricalSynapse<S: Scalar> {
    var_a: VariableId,
    var_b: VariableId,
    g_ab: S,
    g_ba: S,
    current_ab: S,
    current_ba: S,
    staged: Option<(S, S)>,
}

impl<S: Scalar> ElectricalSynapse<S> {
    /// Couple `var_a` on `a` with `var_b` on `b`
    ///
    /// `g_ab` scales the current delivered to b, `g_ba` the current delivered
    /// to a. Either may be zero for one-way coupling.
    pub fn new(
        a: &dyn Endpoint<S>,
        var_a: VariableId,
        b: &dyn Endpoint<S>,
        var_b: VariableId,
        g_ab: S,
        g_ba: S,
    ) -> Result<Self> {
        check_coupling_variable(a, var_a)?;
        check_coupling_variable(b, var_b)?;
        log::debug!(
            "electrical synapse {}.{} <-> {}.{} (g1={}, g2={})",
            a.model_info().short_name,
            a.model_info().variable_name(var_a).unwrap_or("?"),
            b.model_info().short_name,
            b.model_info().variable_name(var_b).unwrap_or("?"),
            g_ab,
            g_ba
        );
        Ok(Self {
            var_a,
            var_b,
            g_ab,
            g_ba,
            current_ab: S::ZERO,
            current_ba: S::ZERO,
            staged: None,
        })
    }

    /// Coupling strength a to b
    pub fn g_ab(&self) -> S {
        self.g_ab
    }

    /// Coupling strength b to a
    pub fn g_ba(&self) -> S {
        self.g_ba
    }
}

impl<S: Scalar> Synapse<S> for ElectricalSynapse<S> {
    fn kind(&self) -> SynapseKind {
        SynapseKind::Electrical
    }

    fn coupling_variables(&self) -> (VariableId, VariableId) {
        (self.var_a, self.var_b)
    }

    fn stage(&mut self, a: &dyn Endpoint<S>, b: &dyn Endpoint<S>, dt: S) -> Result<()> {
        self.staged = None;
        check_dt(dt.to_f64())?;
        let v_a = a.get(self.var_a)?;
        let v_b = b.get(self.var_b)?;

        self.staged = Some((self.g_ab * (v_a - v_b), self.g_ba * (v_b - v_a)));
        Ok(())
    }

    fn inject_staged(&self, a: &mut dyn Endpoint<S>, b: &mut dyn Endpoint<S>) {
        if let Some((current_ab, current_ba)) = self.staged {
            b.add_input(current_ab);
            a.add_input(current_ba);
        }
    }

    fn commit(&mut self) {
        if let Some((current_ab, current_ba)) = self.staged.take() {
            self.current_ab = current_ab;
            self.current_ba = current_ba;
        }
    }

    fn synaptic_current(&self) -> S {
        self.current_ab
    }

    fn current_b_to_a(&self) -> S {
        self.current_ba
    }

    fn get(&self, id: VariableId) -> Result<S> {
        match id {
            I1 => Ok(self.current_ab),
            I2 => Ok(self.current_ba),
            _ => Err(NeunError::invalid_variable(ELECTRICAL_INFO.short_name, id)),
        }
    }

    fn set(&mut self, id: VariableId, value: S) -> Result<()> {
        match id {
            I1 => self.current_ab = value,
            I2 => self.current_ba = value,
            _ => return Err(NeunError::invalid_variable(ELECTRICAL_INFO.short_name, id)),
        }
        Ok(())
    }

    fn get_param(&self, id: ParameterId) -> Result<S> {
        match id {
            G1 => Ok(self.g_ab),
            G2 => Ok(self.g_ba),
            _ => Err(NeunError::invalid_parameter(ELECTRICAL_INFO.short_name, id)),
        }
    }

    fn set_param(&mut self, id: ParameterId, value: S) -> Result<()> {
        match id {
            G1 => self.g_ab = value,
            G2 => self.g_ba = value,
            _ => return Err(NeunError::invalid_parameter(ELECTRICAL_INFO.short_name, id)),
        }
        Ok(())
    }
}

/// Coupling through an internal state that relaxes toward `v_a - v_b`
///
/// `ds/dt = ((v_a - v_b) - s) / tau`, advanced with `I` before the currents
/// `g_ab * s` (into b) and `-g_ba * s` (into a) are injected.
pub struct DiffusionSynapse<S: Scalar, I: Integrator = RungeKutta4> {
    var_a: VariableId,
    var_b: VariableId,
    g_ab: S,
    g_ba: S,
    tau: S,
    state: S,
    current_ab: S,
    current_ba: S,
    time: S,
    staged: Option<DiffusionStage<S>>,
    _integrator: PhantomData<I>,
}

#[derive(Debug, Clone, Copy)]
struct DiffusionStage<S> {
    state: S,
    current_ab: S,
    current_ba: S,
    dt: S,
}

impl<S: Scalar, I: Integrator> DiffusionSynapse<S, I> {
    /// Couple `var_a` on `a` with `var_b` on `b` through a filter with time
    /// constant `tau`
    pub fn new(
        a: &dyn Endpoint<S>,
        var_a: VariableId,
        b: &dyn Endpoint<S>,
        var_b: VariableId,
        g_ab: S,
        g_ba: S,
        tau: S,
    ) -> Result<Self> {
        check_coupling_variable(a, var_a)?;
        check_coupling_variable(b, var_b)?;
        check_tau(tau)?;
        log::debug!(
            "diffusion synapse {} <-> {} (g1={}, g2={}, tau={}, {})",
            a.model_info().short_name,
            b.model_info().short_name,
            g_ab,
            g_ba,
            tau,
            I::SHORT_NAME
        );
        Ok(Self {
            var_a,
            var_b,
            g_ab,
            g_ba,
            tau,
            state: S::ZERO,
            current_ab: S::ZERO,
            current_ba: S::ZERO,
            time: S::ZERO,
            staged: None,
            _integrator: PhantomData,
        })
    }

    /// Filtered voltage difference
    pub fn internal_state(&self) -> S {
        self.state
    }

    /// Relaxation time constant
    pub fn tau(&self) -> S {
        self.tau
    }
}

fn check_tau<S: Scalar>(tau: S) -> Result<()> {
    if tau.is_finite() && tau > S::ZERO {
        Ok(())
    } else {
        Err(NeunError::invalid_parameter(
            DIFFUSION_INFO.short_name,
            format!("tau={}", tau),
        ))
    }
}

impl<S: Scalar, I: Integrator> fmt::Debug for DiffusionSynapse<S, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffusionSynapse")
            .field("integrator", &I::SHORT_NAME)
            .field("g_ab", &self.g_ab)
            .field("g_ba", &self.g_ba)
            .field("tau", &self.tau)
            .field("state", &self.state)
            .finish()
    }
}

impl<S: Scalar, I: Integrator> Synapse<S> for DiffusionSynapse<S, I> {
    fn kind(&self) -> SynapseKind {
        SynapseKind::Diffusion
    }

    fn coupling_variables(&self) -> (VariableId, VariableId) {
        (self.var_a, self.var_b)
    }

    fn stage(&mut self, a: &dyn Endpoint<S>, b: &dyn Endpoint<S>, dt: S) -> Result<()> {
        self.staged = None;
        check_dt(dt.to_f64())?;
        let drive = a.get(self.var_a)? - b.get(self.var_b)?;

        let tau = self.tau;
        let mut next = [S::ZERO];
        let current = [self.state];
        I::integrate::<S, _>(
            |s: &[S], _t: S, ds: &mut [S]| ds[0] = (drive - s[0]) / tau,
            &current[..],
            self.time,
            dt,
            &mut next[..],
        );
        if !next[0].is_finite() {
            return Err(NeunError::numerical(
                DIFFUSION_INFO.short_name,
                self.time.to_f64(),
                "internal state became non-finite",
            ));
        }

        let state = next[0];
        self.staged = Some(DiffusionStage {
            state,
            current_ab: self.g_ab * state,
            current_ba: -(self.g_ba * state),
            dt,
        });
        Ok(())
    }

    fn inject_staged(&self, a: &mut dyn Endpoint<S>, b: &mut dyn Endpoint<S>) {
        if let Some(stage) = &self.staged {
            b.add_input(stage.current_ab);
            a.add_input(stage.current_ba);
        }
    }

    fn commit(&mut self) {
        if let Some(stage) = self.staged.take() {
            self.state = stage.state;
            self.current_ab = stage.current_ab;
            self.current_ba = stage.current_ba;
            self.time += stage.dt;
        }
    }

    fn synaptic_current(&self) -> S {
        self.current_ab
    }

    fn current_b_to_a(&self) -> S {
        self.current_ba
    }

    fn get(&self, id: VariableId) -> Result<S> {
        match id {
            I1 => Ok(self.current_ab),
            I2 => Ok(self.current_ba),
            DIFFUSION_STATE => Ok(self.state),
            _ => Err(NeunError::invalid_variable(DIFFUSION_INFO.short_name, id)),
        }
    }

    fn set(&mut self, id: VariableId, value: S) -> Result<()> {
        match id {
            I1 => self.current_ab = value,
            I2 => self.current_ba = value,
            DIFFUSION_STATE => self.state = value,
            _ => return Err(NeunError::invalid_variable(DIFFUSION_INFO.short_name, id)),
        }
        Ok(())
    }

    fn get_param(&self, id: ParameterId) -> Result<S> {
        match id {
            G1 => Ok(self.g_ab),
            G2 => Ok(self.g_ba),
            TAU => Ok(self.tau),
            _ => Err(NeunError::invalid_parameter(DIFFUSION_INFO.short_name, id)),
        }
    }

    fn set_param(&mut self, id: ParameterId, value: S) -> Result<()> {
        match id {
            G1 => self.g_ab = value,
            G2 => self.g_ba = value,
            TAU => {
                check_tau(value)?;
                self.tau = value;
            }
            _ => return Err(NeunError::invalid_parameter(DIFFUSION_INFO.short_name, id)),
        }
        Ok(())
    }
}

// Lets boxed network neurons be passed where a synapse expects an endpoint.
impl<S: Scalar> Endpoint<S> for Box<dyn DynNeuron<S>> {
    fn model_info(&self) -> &'static ModelInfo {
        (**self).model_info()
    }

    fn get(&self, id: VariableId) -> Result<S> {
        (**self).get(id)
    }

    fn add_input(&mut self, current: S) {
        (**self).add_input(current)
    }
}

/// A synapse whose precision is chosen at runtime
///
/// Values cross this boundary as `f64`, like [`crate::AnyNeuron`].
#[derive(Debug)]
pub enum AnySynapse {
    /// `f32` synapse
    Single(Box<dyn Synapse<f32>>),
    /// `f64` synapse
    Double(Box<dyn Synapse<f64>>),
}

macro_rules! dispatch {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            AnySynapse::Single($s) => $body,
            AnySynapse::Double($s) => $body,
        }
    };
}

impl AnySynapse {
    /// Numeric precision
    pub fn precision(&self) -> Precision {
        match self {
            AnySynapse::Single(_) => Precision::Single,
            AnySynapse::Double(_) => Precision::Double,
        }
    }

    /// Synapse flavour
    pub fn kind(&self) -> SynapseKind {
        dispatch!(self, s => s.kind())
    }

    /// Static description of the synapse type
    pub fn info(&self) -> &'static ModelInfo {
        self.kind().info()
    }

    /// Variables read from endpoint a and endpoint b
    pub fn coupling_variables(&self) -> (VariableId, VariableId) {
        dispatch!(self, s => s.coupling_variables())
    }

    /// Make the staged currents and state current
    pub fn commit(&mut self) {
        dispatch!(self, s => s.commit())
    }

    /// Most recent current injected into endpoint b
    pub fn synaptic_current(&self) -> f64 {
        dispatch!(self, s => s.synaptic_current().to_f64())
    }

    /// Most recent current injected into endpoint a
    pub fn current_b_to_a(&self) -> f64 {
        dispatch!(self, s => s.current_b_to_a().to_f64())
    }

    /// Read a synapse variable
    pub fn get(&self, id: VariableId) -> Result<f64> {
        dispatch!(self, s => s.get(id).map(Scalar::to_f64))
    }

    /// Overwrite a synapse variable
    pub fn set(&mut self, id: VariableId, value: f64) -> Result<()> {
        dispatch!(self, s => s.set(id, Scalar::from_f64(value)))
    }

    /// Read a synapse parameter
    pub fn get_param(&self, id: ParameterId) -> Result<f64> {
        dispatch!(self, s => s.get_param(id).map(Scalar::to_f64))
    }

    /// Overwrite a synapse parameter
    pub fn set_param(&mut self, id: ParameterId, value: f64) -> Result<()> {
        dispatch!(self, s => s.set_param(id, Scalar::from_f64(value)))
    }
}
