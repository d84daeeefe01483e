//! Floating point precision abstraction
//!
//! Neurons, synapses and integrators are generic over [`Scalar`], which is
//! implemented for `f32` and `f64`. The runtime [`Precision`] tag is what the
//! network driver compares when two neurons are coupled.

use core::fmt;
use core::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Numeric precision of a neuron or synapse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Precision {
    /// 32-bit floating point
    #[cfg_attr(feature = "serde", serde(alias = "float", alias = "f32"))]
    Single,
    /// 64-bit floating point
    #[cfg_attr(feature = "serde", serde(alias = "f64"))]
    Double,
}

impl Precision {
    /// Suffix used in composite type names (`HHDoubleRK4`)
    pub const fn type_suffix(&self) -> &'static str {
        match self {
            Precision::Single => "Float",
            Precision::Double => "Double",
        }
    }

    /// All supported precisions
    pub const ALL: [Precision; 2] = [Precision::Single, Precision::Double];
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Single => write!(f, "float"),
            Precision::Double => write!(f, "double"),
        }
    }
}

impl core::str::FromStr for Precision {
    type Err = crate::NeunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "float" | "single" | "f32" => Ok(Precision::Single),
            "double" | "f64" => Ok(Precision::Double),
            other => Err(crate::NeunError::invalid_config(format!(
                "unknown precision '{}'",
                other
            ))),
        }
    }
}

/// Floating point type usable as neuron state
pub trait Scalar:
    Copy
    + Clone
    + Default
    + PartialOrd
    + fmt::Debug
    + fmt::Display
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
{
    /// Runtime tag for this type
    const PRECISION: Precision;
    /// Additive identity
    const ZERO: Self;
    /// Multiplicative identity
    const ONE: Self;

    /// Lossy conversion from `f64`
    fn from_f64(value: f64) -> Self;
    /// Widening conversion to `f64`
    fn to_f64(self) -> f64;
    /// Natural exponential
    fn exp(self) -> Self;
    /// Integer power
    fn powi(self, n: i32) -> Self;
    /// Absolute value
    fn abs(self) -> Self;
    /// Neither NaN nor infinite
    fn is_finite(self) -> bool;
}

macro_rules! impl_scalar {
    ($t:ty, $precision:expr) => {
        impl Scalar for $t {
            const PRECISION: Precision = $precision;
            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;

            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $t
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn exp(self) -> Self {
                <$t>::exp(self)
            }

            #[inline]
            fn powi(self, n: i32) -> Self {
                <$t>::powi(self, n)
            }

            #[inline]
            fn abs(self) -> Self {
                <$t>::abs(self)
            }

            #[inline]
            fn is_finite(self) -> bool {
                <$t>::is_finite(self)
            }
        }
    };
}

impl_scalar!(f32, Precision::Single);
impl_scalar!(f64, Precision::Double);

/// Shorthand for `S::from_f64` on literals inside model equations
#[inline]
pub fn lit<S: Scalar>(value: f64) -> S {
    S::from_f64(value)
}
