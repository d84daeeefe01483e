//! Explicit Runge-Kutta integrators
//!
//! An integrator advances a state vector by one step given a derivative
//! function. Integrators carry no state between calls; the caller owns both
//! the input state and the output buffer.

use core::fmt;
use smallvec::SmallVec;

use crate::scalar::{lit, Scalar};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stage buffer; inline for the state sizes of the built-in models
pub(crate) type StageBuf<S> = SmallVec<[S; 8]>;

/// Numerical stepping strategy
pub trait Integrator: fmt::Debug + Default + Copy + Send + Sync + 'static {
    /// Full name, e.g. `RungeKutta4`
    const NAME: &'static str;
    /// Suffix used in composite type names, e.g. `RK4`
    const SHORT_NAME: &'static str;
    /// Derivative evaluations per step
    const STAGES: usize;
    /// Global order of accuracy
    const ORDER: u32;
    /// Runtime tag for this integrator
    const KIND: IntegratorKind;

    /// Advance `state` from `t` to `t + dt` into `out`.
    ///
    /// `f(y, t, dydt)` writes the derivative of `y` at time `t` into `dydt`.
    /// `out` must have the same length as `state`.
    fn integrate<S, F>(f: F, state: &[S], t: S, dt: S, out: &mut [S])
    where
        S: Scalar,
        F: FnMut(&[S], S, &mut [S]);
}

/// Classic fourth-order Runge-Kutta
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RungeKutta4;

impl Integrator for RungeKutta4 {
    const NAME: &'static str = "RungeKutta4";
    const SHORT_NAME: &'static str = "RK4";
    const STAGES: usize = 4;
    const ORDER: u32 = 4;
    const KIND: IntegratorKind = IntegratorKind::Rk4;

    fn integrate<S, F>(mut f: F, state: &[S], t: S, dt: S, out: &mut [S])
    where
        S: Scalar,
        F: FnMut(&[S], S, &mut [S]),
    {
        let n = state.len();
        let half: S = lit(0.5);
        let sixth: S = lit(1.0 / 6.0);
        let two: S = lit(2.0);

        let mut k1: StageBuf<S> = SmallVec::from_elem(S::ZERO, n);
        let mut k2: StageBuf<S> = SmallVec::from_elem(S::ZERO, n);
        let mut k3: StageBuf<S> = SmallVec::from_elem(S::ZERO, n);
        let mut k4: StageBuf<S> = SmallVec::from_elem(S::ZERO, n);
        let mut tmp: StageBuf<S> = SmallVec::from_elem(S::ZERO, n);

        f(state, t, &mut k1[..]);

        for i in 0..n {
            tmp[i] = state[i] + half * dt * k1[i];
        }
        f(&tmp[..], t + half * dt, &mut k2[..]);

        for i in 0..n {
            tmp[i] = state[i] + half * dt * k2[i];
        }
        f(&tmp[..], t + half * dt, &mut k3[..]);

        for i in 0..n {
            tmp[i] = state[i] + dt * k3[i];
        }
        f(&tmp[..], t + dt, &mut k4[..]);

        for i in 0..n {
            out[i] = state[i] + dt * sixth * (k1[i] + two * k2[i] + two * k3[i] + k4[i]);
        }
    }
}

/// Sixth-order Runge-Kutta (Butcher's seven-stage method)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RungeKutta6;

// Butcher tableau, lower-triangular rows of A
const RK6_C: [f64; 7] = [0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0 / 3.0, 0.5, 0.5, 1.0];
const RK6_A: [[f64; 6]; 7] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 3.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [0.0, 2.0 / 3.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 12.0, 1.0 / 3.0, -1.0 / 12.0, 0.0, 0.0, 0.0],
    [-1.0 / 16.0, 9.0 / 8.0, -3.0 / 16.0, -3.0 / 8.0, 0.0, 0.0],
    [0.0, 9.0 / 8.0, -3.0 / 8.0, -3.0 / 4.0, 0.5, 0.0],
    [9.0 / 44.0, -9.0 / 11.0, 63.0 / 44.0, 18.0 / 11.0, 0.0, -16.0 / 11.0],
];
const RK6_B: [f64; 7] = [
    11.0 / 120.0,
    0.0,
    27.0 / 40.0,
    27.0 / 40.0,
    -4.0 / 15.0,
    -4.0 / 15.0,
    11.0 / 120.0,
];

impl Integrator for RungeKutta6 {
    const NAME: &'static str = "RungeKutta6";
    const SHORT_NAME: &'static str = "RK6";
    const STAGES: usize = 7;
    const ORDER: u32 = 6;
    const KIND: IntegratorKind = IntegratorKind::Rk6;

    fn integrate<S, F>(mut f: F, state: &[S], t: S, dt: S, out: &mut [S])
    where
        S: Scalar,
        F: FnMut(&[S], S, &mut [S]),
    {
        let n = state.len();
        let mut k: SmallVec<[StageBuf<S>; 7]> = (0..Self::STAGES)
            .map(|_| SmallVec::from_elem(S::ZERO, n))
            .collect();
        let mut tmp: StageBuf<S> = SmallVec::from_elem(S::ZERO, n);

        for stage in 0..Self::STAGES {
            for i in 0..n {
                let mut acc = S::ZERO;
                for (j, a) in RK6_A[stage].iter().enumerate().take(stage) {
                    if *a != 0.0 {
                        acc += lit::<S>(*a) * k[j][i];
                    }
                }
                tmp[i] = state[i] + dt * acc;
            }
            let ts = t + lit::<S>(RK6_C[stage]) * dt;
            f(&tmp[..], ts, &mut k[stage][..]);
        }

        for i in 0..n {
            let mut acc = S::ZERO;
            for (stage, b) in RK6_B.iter().enumerate() {
                if *b != 0.0 {
                    acc += lit::<S>(*b) * k[stage][i];
                }
            }
            out[i] = state[i] + dt * acc;
        }
    }
}

/// Runtime selector for an integrator type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum IntegratorKind {
    /// [`RungeKutta4`]
    #[default]
    Rk4,
    /// [`RungeKutta6`]
    Rk6,
}

impl IntegratorKind {
    /// All supported integrators
    pub const ALL: [IntegratorKind; 2] = [IntegratorKind::Rk4, IntegratorKind::Rk6];

    /// Full integrator name
    pub const fn name(&self) -> &'static str {
        match self {
            IntegratorKind::Rk4 => RungeKutta4::NAME,
            IntegratorKind::Rk6 => RungeKutta6::NAME,
        }
    }

    /// Suffix used in composite type names
    pub const fn short_name(&self) -> &'static str {
        match self {
            IntegratorKind::Rk4 => RungeKutta4::SHORT_NAME,
            IntegratorKind::Rk6 => RungeKutta6::SHORT_NAME,
        }
    }
}

impl fmt::Display for IntegratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl core::str::FromStr for IntegratorKind {
    type Err = crate::NeunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rk4" | "rungekutta4" => Ok(IntegratorKind::Rk4),
            "rk6" | "rungekutta6" => Ok(IntegratorKind::Rk6),
            other => Err(crate::NeunError::invalid_config(format!(
                "unknown integrator '{}'",
                other
            ))),
        }
    }
}
