//! The core module
pub mod estimators;

use crate::core::estimators::BasicEstimators;
use crate::error::{Error, Result};
use num_traits::{Float, FromPrimitive};
use rand::distributions::{Distribution, Open01, Standard, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Floating point types the integrators work with.
///
/// Besides the arithmetic of `Float` the integrators need uniform random variates of the same
/// type, which is what this trait adds.
pub trait Real: Float + FromPrimitive + Debug + Send + Sync + 'static {
    /// Uniform random number in $[0,1)$.
    fn uniform<R: Rng + ?Sized>(rng: &mut R) -> Self;

    /// Uniform random number in $(0,1)$, used to place sampling points strictly inside a box.
    fn uniform_pos<R: Rng + ?Sized>(rng: &mut R) -> Self;
}

macro_rules! impl_real {
    ($($t:ty),*) => {
        $(
            impl Real for $t {
                fn uniform<R: Rng + ?Sized>(rng: &mut R) -> Self {
                    Standard.sample(rng)
                }

                fn uniform_pos<R: Rng + ?Sized>(rng: &mut R) -> Self {
                    Open01.sample(rng)
                }
            }
        )*
    };
}

impl_real!(f32, f64);

/// Uniform random index in $[0,n)$. `n` must be positive.
pub fn uniform_int<R: Rng + ?Sized>(rng: &mut R, n: usize) -> usize {
    Uniform::new(0, n).sample(rng)
}

/// Conversion of counts into the floating point type, which is total for all `Float` types.
pub(crate) fn from_usize<T: Float + FromPrimitive>(n: usize) -> T {
    T::from_usize(n).unwrap_or_else(T::infinity)
}

/// Trait which every integrand must implement.
///
/// An integrand is a pure function of the point `x`; everything else it needs is fixed when it
/// is constructed and read-only during an integration.
pub trait Integrand<T>: Send + Sync {
    /// Calculates the value of the integrand at the point `x`.
    fn call(&self, x: &[T]) -> T;

    /// Returns the number of dimensions the integrand requires, or `None` if it can be
    /// evaluated in any number of dimensions.
    fn dim(&self) -> Option<usize> {
        None
    }
}

impl<T, F> Integrand<T> for F
where
    F: Fn(&[T]) -> T + Send + Sync,
{
    fn call(&self, x: &[T]) -> T {
        self(x)
    }
}

/// An axis-aligned box, the integration domain.
///
/// Every dimension satisfies `lower < upper` and the extents as well as the volume are finite.
#[derive(Clone, Debug, PartialEq)]
pub struct Hyperrectangle<T> {
    lower: Vec<T>,
    upper: Vec<T>,
}

impl<T: Real> Hyperrectangle<T> {
    /// Constructs the box $[l_1, u_1] \times \cdots \times [l_d, u_d]$ from its lower and upper
    /// bounds.
    pub fn new(lower: Vec<T>, upper: Vec<T>) -> Result<Self> {
        if lower.len() != upper.len() {
            return Err(Error::InputMalformed(format!(
                "number of minimum ({}) and maximum ({}) extents differs",
                lower.len(),
                upper.len()
            )));
        }

        if lower.is_empty() {
            return Err(Error::InputMalformed(
                "at least one dimension is required".to_string(),
            ));
        }

        for (i, (&l, &u)) in lower.iter().zip(&upper).enumerate() {
            if !(l < u) {
                return Err(Error::InputMalformed(format!(
                    "starting coordinate of dimension {} is not smaller than ending coordinate: \
                     {:?} >= {:?}",
                    i + 1,
                    l,
                    u
                )));
            }

            if !(u - l).is_finite() {
                return Err(Error::InputMalformed(format!(
                    "range of integration of dimension {} is too large, please rescale",
                    i + 1
                )));
            }
        }

        let domain = Self { lower, upper };

        if !domain.volume().is_finite() {
            return Err(Error::InputMalformed(
                "volume of the integration region is too large, please rescale".to_string(),
            ));
        }

        Ok(domain)
    }

    /// Returns the number of dimensions.
    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    /// Returns the lower bounds.
    pub fn lower(&self) -> &[T] {
        &self.lower
    }

    /// Returns the upper bounds.
    pub fn upper(&self) -> &[T] {
        &self.upper
    }

    /// Returns $\prod_i (u_i - l_i)$.
    pub fn volume(&self) -> T {
        volume(&self.lower, &self.upper)
    }
}

/// Volume of the box spanned by `lower` and `upper`.
pub(crate) fn volume<T: Float>(lower: &[T], upper: &[T]) -> T {
    lower
        .iter()
        .zip(upper)
        .fold(T::one(), |vol, (&l, &u)| vol * (u - l))
}

/// Counts, for every dimension, how often an integrator found it to be the best one to split.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SplitTally {
    counts: Vec<usize>,
}

impl SplitTally {
    /// An empty tally for `dim` dimensions.
    pub fn new(dim: usize) -> Self {
        Self {
            counts: vec![0; dim],
        }
    }

    /// Adds one piece of evidence for splitting `dim`.
    pub fn record(&mut self, dim: usize) {
        self.counts[dim] += 1;
    }

    /// Returns the evidence collected for each dimension.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Returns the dimension with the most evidence; the first one wins ties and `0` is
    /// returned when there is no evidence at all.
    pub fn best(&self) -> usize {
        self.counts
            .iter()
            .enumerate()
            .fold((0, 0), |(best, max), (dim, &count)| {
                if count > max {
                    (dim, count)
                } else {
                    (best, max)
                }
            })
            .0
    }
}

/// The outcome of one integration.
///
/// Serialized, an error that could not be estimated is `null`, which is read back as infinite.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(bound(
    serialize = "T: Float + Serialize",
    deserialize = "T: Float + Deserialize<'de>"
))]
pub struct IntegrationResult<T> {
    estimate: T,
    #[serde(with = "finite_or_null")]
    abs_error: T,
    split_dim: usize,
    calls: usize,
}

mod finite_or_null {
    use num_traits::Float;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Float + Serialize,
        S: Serializer,
    {
        Some(*value).filter(|v| v.is_finite()).serialize(serializer)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: Float + Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Ok(Option::deserialize(deserializer)?.unwrap_or_else(T::infinity))
    }
}

impl<T: Copy> IntegrationResult<T> {
    /// Constructor.
    pub const fn new(estimate: T, abs_error: T, split_dim: usize, calls: usize) -> Self {
        Self {
            estimate,
            abs_error,
            split_dim,
            calls,
        }
    }

    /// Returns the estimate of the integral.
    pub fn estimate(&self) -> T {
        self.estimate
    }

    /// Returns the absolute error of the estimate, infinite if it could not be estimated.
    pub fn abs_error(&self) -> T {
        self.abs_error
    }

    /// Returns the (zero-based) dimension that should be split next when refining this
    /// integration.
    pub fn split_dim(&self) -> usize {
        self.split_dim
    }

    /// Returns the number of times the integrand has been called.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl<T: Float> BasicEstimators<T> for IntegrationResult<T> {
    fn mean(&self) -> T {
        self.estimate
    }

    fn var(&self) -> T {
        self.abs_error * self.abs_error
    }
}
