//! The Monte Carlo integrators.
//!
//! Every integrator implements [`Integrator`] on a state object holding its scratch space for a
//! fixed number of dimensions. [`EngineState`] owns the state of the [`Method`] chosen at runtime
//! and reallocates it whenever the dimension of the integration domain changes.
pub mod miser;
pub mod plain;

pub use miser::{MiserOptions, MiserParams, MiserState};
pub use plain::PlainState;

use crate::core::*;
use crate::error::{Error, Result};

use clap::ValueEnum;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Common interface of all integration methods.
pub trait Integrator<T> {
    /// The number of dimensions the scratch space has been allocated for.
    fn dim(&self) -> usize;

    /// Integrate `integrand` over `domain` using `calls` evaluations of the integrand.
    ///
    /// The dimension of `domain` must agree with [`dim`](Self::dim).
    fn integrate<I, R>(
        &mut self,
        domain: &Hyperrectangle<T>,
        integrand: &I,
        calls: usize,
        rng: &mut R,
    ) -> Result<IntegrationResult<T>>
    where
        I: Integrand<T> + ?Sized,
        R: Rng + ?Sized;
}

/// Allocates a vector of `len` copies of `value`, reporting allocation failures as errors.
pub(crate) fn try_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut vec = Vec::new();
    vec.try_reserve_exact(len)?;
    vec.resize(len, value);
    Ok(vec)
}

pub(crate) fn check_dim<T: Real>(dim: usize, domain: &Hyperrectangle<T>) -> Result<()> {
    if domain.dim() == dim {
        Ok(())
    } else {
        Err(Error::ConfigInvalid(format!(
            "number of dimensions ({}) must match allocated size ({})",
            domain.dim(),
            dim
        )))
    }
}

/// The available integration methods.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Plain Monte Carlo, see [`plain`].
    Plain,
    /// Recursive stratified sampling, see [`miser`].
    Miser,
}

impl Default for Method {
    fn default() -> Self {
        Self::Miser
    }
}

/// The state of one of the integration methods.
#[derive(Clone, Debug)]
pub enum Estimator<T> {
    /// State of the plain integrator.
    Plain(PlainState<T>),
    /// State of the MISER integrator.
    Miser(MiserState<T>),
}

impl<T: Real> Estimator<T> {
    /// Allocates the state of `method` for `dim` dimensions.
    pub fn new(method: Method, dim: usize, options: &MiserOptions) -> Result<Self> {
        Ok(match method {
            Method::Plain => Self::Plain(PlainState::new(dim)?),
            Method::Miser => Self::Miser(MiserState::new(options.resolve(dim)?)?),
        })
    }

    /// Returns the method this state belongs to.
    pub fn method(&self) -> Method {
        match self {
            Self::Plain(_) => Method::Plain,
            Self::Miser(_) => Method::Miser,
        }
    }
}

impl<T: Real> Integrator<T> for Estimator<T> {
    fn dim(&self) -> usize {
        match self {
            Self::Plain(state) => state.dim(),
            Self::Miser(state) => state.dim(),
        }
    }

    fn integrate<I, R>(
        &mut self,
        domain: &Hyperrectangle<T>,
        integrand: &I,
        calls: usize,
        rng: &mut R,
    ) -> Result<IntegrationResult<T>>
    where
        I: Integrand<T> + ?Sized,
        R: Rng + ?Sized,
    {
        match self {
            Self::Plain(state) => state.integrate(domain, integrand, calls, rng),
            Self::Miser(state) => state.integrate(domain, integrand, calls, rng),
        }
    }
}

/// Scratch space shared by successive integrations.
///
/// The state is allocated lazily for the dimension of the first domain and kept as long as the
/// following domains have the same dimension.
#[derive(Clone, Debug)]
pub struct EngineState<T> {
    method: Method,
    options: MiserOptions,
    estimator: Option<Estimator<T>>,
}

impl<T: Real> EngineState<T> {
    /// Constructor. Nothing is allocated before the first integration.
    pub fn new(method: Method, options: MiserOptions) -> Self {
        Self {
            method,
            options,
            estimator: None,
        }
    }

    /// Returns the selected method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Returns the currently allocated state, if any.
    pub fn estimator(&self) -> Option<&Estimator<T>> {
        self.estimator.as_ref()
    }

    /// Returns a state for `dim` dimensions, reusing the current one if possible.
    pub fn prepare(&mut self, dim: usize) -> Result<&mut Estimator<T>> {
        let reusable = self
            .estimator
            .as_ref()
            .map_or(false, |estimator| estimator.dim() == dim);

        if !reusable {
            debug!(dim, method = ?self.method, "allocating integrator state");
            // release the old buffers before allocating the new ones
            self.estimator = None;
            self.estimator = Some(Estimator::new(self.method, dim, &self.options)?);
        }

        self.estimator
            .as_mut()
            .ok_or_else(|| Error::ConfigInvalid("integrator state is not allocated".to_string()))
    }

    /// Integrate `integrand` over `domain`, (re)allocating the state first if needed.
    pub fn integrate<I, R>(
        &mut self,
        domain: &Hyperrectangle<T>,
        integrand: &I,
        calls: usize,
        rng: &mut R,
    ) -> Result<IntegrationResult<T>>
    where
        I: Integrand<T> + ?Sized,
        R: Rng + ?Sized,
    {
        self.prepare(domain.dim())?
            .integrate(domain, integrand, calls, rng)
    }
}
