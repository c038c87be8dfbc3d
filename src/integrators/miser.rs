//! MISER integrator
//!
//! Recursive stratified sampling as described in W. H. Press and G. R. Farrar, "Recursive
//! Stratified Sampling for Multidimensional Monte Carlo Integration", Computers in Physics 4
//! (1990) 190. Each region spends a fraction of its calls on a pilot run which estimates, for
//! every dimension, the standard deviations of the integrand on both sides of a bisection. The
//! region is bisected along the dimension promising the smallest combined standard deviation and
//! the remaining calls are distributed among the two halves according to their estimated
//! standard deviations. Regions with too few calls are integrated with plain Monte Carlo.
//!
//! Every bisection is recorded in a [`SplitTally`]; the most frequently bisected dimension is
//! the suggested split dimension of the result.
use super::plain;
use super::{check_dim, try_filled, Integrator};
use crate::core::estimators::*;
use crate::core::*;
use crate::error::{Error, Result, Side};

use rand::Rng;
use std::mem;
use std::ops::Add;
use tracing::{debug, trace, warn};

/// User-facing parameters of the MISER integrator. Parameters left out are derived from the
/// number of dimensions, see [`MiserOptions::resolve`].
#[derive(Clone, Debug, PartialEq)]
pub struct MiserOptions {
    /// Minimum number of calls for any region and for the pilot run, by default `16 * dim`.
    pub min_calls: Option<usize>,
    /// Regions with fewer calls are not bisected, by default `32 * min_calls`.
    pub min_calls_per_bisection: Option<usize>,
    /// Fraction of the calls of each region spent on the pilot run.
    pub estimate_fraction: f64,
    /// Relative distance of the bisection point from the midpoint, with random sign.
    pub dither: f64,
    /// Exponent controlling how strongly the calls follow the estimated standard deviations.
    pub alpha: f64,
}

impl Default for MiserOptions {
    fn default() -> Self {
        Self {
            min_calls: None,
            min_calls_per_bisection: None,
            estimate_fraction: 0.1,
            dither: 0.0,
            alpha: 1.0,
        }
    }
}

impl MiserOptions {
    /// Validates the options and fills in the defaults for `dim` dimensions.
    pub fn resolve<T: Real>(&self, dim: usize) -> Result<MiserParams<T>> {
        if dim == 0 {
            return Err(Error::ConfigInvalid(
                "at least one dimension is required".to_string(),
            ));
        }

        let min_calls = self.min_calls.unwrap_or(16 * dim);
        let min_calls_per_bisection = self.min_calls_per_bisection.unwrap_or(32 * min_calls);

        if min_calls < 2 {
            return Err(Error::ConfigInvalid(format!(
                "min_calls must be at least 2, got {}",
                min_calls
            )));
        }

        if min_calls_per_bisection <= min_calls {
            return Err(Error::ConfigInvalid(format!(
                "min_calls_per_bisection ({}) must be larger than min_calls ({})",
                min_calls_per_bisection, min_calls
            )));
        }

        if !(self.estimate_fraction > 0.0 && self.estimate_fraction < 1.0) {
            return Err(Error::ConfigInvalid(format!(
                "estimate_fraction must lie in (0,1), got {}",
                self.estimate_fraction
            )));
        }

        if !(self.dither >= 0.0 && self.dither < 0.5) {
            return Err(Error::ConfigInvalid(format!(
                "dither must lie in [0,0.5), got {}",
                self.dither
            )));
        }

        if !(self.alpha >= 0.0) || !self.alpha.is_finite() {
            return Err(Error::ConfigInvalid(format!(
                "alpha must be non-negative, got {}",
                self.alpha
            )));
        }

        let convert = |value: f64| {
            T::from_f64(value).ok_or_else(|| {
                Error::ConfigInvalid(format!("{} is not representable", value))
            })
        };

        Ok(MiserParams {
            dim,
            min_calls,
            min_calls_per_bisection,
            estimate_fraction: convert(self.estimate_fraction)?,
            dither: convert(self.dither)?,
            alpha: convert(self.alpha)?,
        })
    }
}

/// Validated parameters of the MISER integrator for a fixed number of dimensions.
#[derive(Clone, Debug, PartialEq)]
pub struct MiserParams<T> {
    dim: usize,
    min_calls: usize,
    min_calls_per_bisection: usize,
    estimate_fraction: T,
    dither: T,
    alpha: T,
}

impl<T: Copy> MiserParams<T> {
    /// Returns the number of dimensions.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Returns the minimum number of calls of any region and pilot run.
    pub fn min_calls(&self) -> usize {
        self.min_calls
    }

    /// Returns the number of calls below which regions are not bisected.
    pub fn min_calls_per_bisection(&self) -> usize {
        self.min_calls_per_bisection
    }

    /// Returns the fraction of calls spent on the pilot runs.
    pub fn estimate_fraction(&self) -> T {
        self.estimate_fraction
    }

    /// Returns the dither of the bisection points.
    pub fn dither(&self) -> T {
        self.dither
    }

    /// Returns the exponent $\alpha$.
    pub fn alpha(&self) -> T {
        self.alpha
    }
}

/// Integral, error and calls of a region; the estimates of disjoint regions are independent.
#[derive(Clone, Copy, Debug)]
struct RegionEstimate<T> {
    integral: T,
    error: T,
    calls: usize,
}

impl<T: Real> Add for RegionEstimate<T> {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            integral: self.integral + other.integral,
            error: self.error.hypot(other.error),
            calls: self.calls + other.calls,
        }
    }
}

/// The dimension a region is bisected along and the weights of both halves.
struct Bisection<T> {
    dim: usize,
    weight_l: T,
    weight_r: T,
}

/// Scratch space of the MISER integrator for integrands of a fixed dimension.
#[derive(Clone, Debug)]
pub struct MiserState<T> {
    params: MiserParams<T>,
    x: Vec<T>,
    xmid: Vec<T>,
    sigma_l: Vec<Option<T>>,
    sigma_r: Vec<Option<T>>,
    moments_l: Vec<StreamingMoments<T>>,
    moments_r: Vec<StreamingMoments<T>>,
    /// Bounds of the sub-regions, one pair per recursion depth. Sibling regions are integrated
    /// one after the other, so a single pair per depth suffices.
    bounds: Vec<(Vec<T>, Vec<T>)>,
}

impl<T: Real> MiserState<T> {
    /// Allocates the scratch space for the dimension given in `params`.
    pub fn new(params: MiserParams<T>) -> Result<Self> {
        let dim = params.dim;

        Ok(Self {
            x: try_filled(dim, T::zero())?,
            xmid: try_filled(dim, T::zero())?,
            sigma_l: try_filled(dim, None)?,
            sigma_r: try_filled(dim, None)?,
            moments_l: try_filled(dim, StreamingMoments::new())?,
            moments_r: try_filled(dim, StreamingMoments::new())?,
            bounds: Vec::new(),
            params,
        })
    }

    /// Returns the parameters.
    pub fn params(&self) -> &MiserParams<T> {
        &self.params
    }

    fn integrate_region<I, R>(
        &mut self,
        lower: &[T],
        upper: &[T],
        calls: usize,
        integrand: &I,
        rng: &mut R,
        tally: &mut SplitTally,
        depth: usize,
    ) -> Result<RegionEstimate<T>>
    where
        I: Integrand<T> + ?Sized,
        R: Rng + ?Sized,
    {
        let dim = self.params.dim;
        let min_calls = self.params.min_calls;
        let vol = volume(lower, upper);

        if calls < self.params.min_calls_per_bisection {
            if calls < 2 {
                return Err(Error::InsufficientBudget(format!(
                    "{} calls are not enough to estimate the variance of a subvolume",
                    calls
                )));
            }

            let moments = plain::sample(lower, upper, &mut self.x, integrand, calls, rng, None);

            return Ok(RegionEstimate {
                integral: moments.integral(vol),
                error: moments.integral_error(vol),
                calls,
            });
        }

        let estimate_calls = min_calls.max(
            (from_usize::<T>(calls) * self.params.estimate_fraction)
                .to_usize()
                .unwrap_or(0),
        );

        if estimate_calls < 4 * dim {
            return Err(Error::InsufficientBudget(format!(
                "{} pilot calls are not enough to sample all {} halfspaces",
                estimate_calls,
                2 * dim
            )));
        }

        // flip coins to bisect the integration region with some fuzz
        let half = T::one() / (T::one() + T::one());
        for ((mid, &l), &u) in self.xmid.iter_mut().zip(lower).zip(upper) {
            let s = if T::uniform(rng) - half >= T::zero() {
                self.params.dither
            } else {
                -self.params.dither
            };
            *mid = (half + s) * l + (half - s) * u;
        }

        self.pilot(lower, upper, estimate_calls, integrand, rng, vol);

        let remaining = calls.saturating_sub(estimate_calls);
        let Bisection {
            dim: i,
            weight_l,
            weight_r,
        } = self.select_bisection(rng)?;
        tally.record(i);

        let (l, mid, u) = (lower[i], self.xmid[i], upper[i]);

        // distribute the remaining calls according to the actual sizes of both halves
        let fraction_l = ((mid - l) / (u - l)).abs();
        let fraction_r = T::one() - fraction_l;
        let a = fraction_l * weight_l;
        let b = fraction_r * weight_r;
        let spare = from_usize::<T>(remaining.saturating_sub(2 * min_calls));
        let calls_l = min_calls + (spare * a / (a + b)).to_usize().unwrap_or(0);
        let calls_r = min_calls + (spare * b / (a + b)).to_usize().unwrap_or(0);

        trace!(depth, calls, dim = i, calls_l, calls_r, "bisecting region");

        let (mut child_lower, mut child_upper) = self.take_bounds(depth, lower, upper)?;

        child_upper[i] = mid;
        let left = self.integrate_region(
            &child_lower,
            &child_upper,
            calls_l,
            integrand,
            rng,
            tally,
            depth + 1,
        );

        let right = left.and_then(|left| {
            child_upper[i] = u;
            child_lower[i] = mid;
            self.integrate_region(
                &child_lower,
                &child_upper,
                calls_r,
                integrand,
                rng,
                tally,
                depth + 1,
            )
            .map(|right| {
                let mut region = left + right;
                // pilot calls count as spent even though their values are discarded
                region.calls += estimate_calls;
                region
            })
        });

        self.bounds[depth] = (child_lower, child_upper);

        right
    }

    /// Sample `calls` points, alternating between the halves of all dimensions, and estimate the
    /// standard deviations on both sides of the bisection points `xmid`.
    fn pilot<I, R>(
        &mut self,
        lower: &[T],
        upper: &[T],
        calls: usize,
        integrand: &I,
        rng: &mut R,
        vol: T,
    ) where
        I: Integrand<T> + ?Sized,
        R: Rng + ?Sized,
    {
        let dim = self.params.dim;

        self.moments_l.iter_mut().for_each(StreamingMoments::reset);
        self.moments_r.iter_mut().for_each(StreamingMoments::reset);

        for n in 0..calls {
            let j = (n / 2) % dim;
            let side = n % 2;

            for i in 0..dim {
                let z = T::uniform_pos(rng);

                self.x[i] = if i != j {
                    lower[i] + z * (upper[i] - lower[i])
                } else if side == 0 {
                    self.xmid[i] + z * (upper[i] - self.xmid[i])
                } else {
                    lower[i] + z * (self.xmid[i] - lower[i])
                };
            }

            let value = integrand.call(&self.x);

            for i in 0..dim {
                if self.x[i] <= self.xmid[i] {
                    self.moments_l[i].update(value);
                } else {
                    self.moments_r[i].update(value);
                }
            }
        }

        for i in 0..dim {
            let fraction_l = (self.xmid[i] - lower[i]) / (upper[i] - lower[i]);

            self.sigma_l[i] = sigma(&self.moments_l[i], fraction_l * vol);
            self.sigma_r[i] = sigma(&self.moments_r[i], (T::one() - fraction_l) * vol);
        }
    }

    /// Find the direction with the smallest total "variance".
    fn select_bisection<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Bisection<T>> {
        let dim = self.params.dim;
        let beta = (T::one() + T::one()) / (T::one() + self.params.alpha);

        let mut best_var = T::max_value();
        let mut best = None;

        for i in 0..dim {
            let (sigma_l, sigma_r) = match (self.sigma_l[i], self.sigma_r[i]) {
                (Some(l), Some(r)) => (l, r),
                (None, _) => {
                    return Err(Error::DegenerateStratum {
                        dim: i,
                        side: Side::Left,
                    })
                }
                (_, None) => {
                    return Err(Error::DegenerateStratum {
                        dim: i,
                        side: Side::Right,
                    })
                }
            };

            let weight_l = sigma_l.powf(beta);
            let weight_r = sigma_r.powf(beta);
            let var = weight_l + weight_r;

            if var <= best_var {
                best_var = var;
                best = if weight_l == T::zero() && weight_r == T::zero() {
                    Some((i, T::one(), T::one()))
                } else {
                    Some((i, weight_l, weight_r))
                };
            }
        }

        Ok(match best {
            Some((dim, weight_l, weight_r)) => {
                debug!(dim, variance = ?best_var, "selected bisection");
                Bisection {
                    dim,
                    weight_l,
                    weight_r,
                }
            }
            None => {
                // all estimates were unusable, so choose a direction at random
                let dim = uniform_int(rng, dim);
                warn!(dim, "no finite variance estimate, bisecting a random dimension");
                Bisection {
                    dim,
                    weight_l: T::one(),
                    weight_r: T::one(),
                }
            }
        })
    }

    /// Take the bound buffers of recursion level `depth` and initialize them with a copy of
    /// `lower` and `upper`.
    fn take_bounds(&mut self, depth: usize, lower: &[T], upper: &[T]) -> Result<(Vec<T>, Vec<T>)> {
        debug_assert!(depth <= self.bounds.len());

        if depth == self.bounds.len() {
            self.bounds.try_reserve(1)?;
            self.bounds.push((Vec::new(), Vec::new()));
        }

        let (mut child_lower, mut child_upper) = mem::take(&mut self.bounds[depth]);

        if child_lower.len() != lower.len() {
            child_lower = try_filled(lower.len(), T::zero())?;
            child_upper = try_filled(upper.len(), T::zero())?;
        }

        child_lower.copy_from_slice(lower);
        child_upper.copy_from_slice(upper);

        Ok((child_lower, child_upper))
    }
}

/// Standard deviation of the integral over a half of volume `vol`, `None` if it was not hit.
fn sigma<T: Real>(moments: &StreamingMoments<T>, vol: T) -> Option<T> {
    moments.population_var().map(|var| {
        let hits = from_usize::<T>(moments.count());
        var.sqrt() * vol / hits
    })
}

impl<T: Real> Integrator<T> for MiserState<T> {
    fn dim(&self) -> usize {
        self.params.dim
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
        check_dim(self.dim(), domain)?;

        let mut tally = SplitTally::new(self.dim());
        let estimate = self.integrate_region(
            domain.lower(),
            domain.upper(),
            calls,
            integrand,
            rng,
            &mut tally,
            0,
        )?;

        debug!(bisections = ?tally.counts(), "finished stratified integration");

        Ok(IntegrationResult::new(
            estimate.integral,
            estimate.error,
            tally.best(),
            estimate.calls,
        ))
    }
}
