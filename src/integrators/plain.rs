//! Plain integrator
//!
//! Samples points uniformly in the whole integration domain. Besides the integral it tells which
//! dimension shows the largest difference between the average of the integrand over the half
//! close to its lower bound and the half close to its upper bound.
use super::{check_dim, try_filled, Integrator};
use crate::core::estimators::*;
use crate::core::*;
use crate::error::Result;

use rand::Rng;
use tracing::debug;

/// Running averages of the integrand over the lower and upper half of one dimension.
#[derive(Clone, Debug)]
pub(crate) struct HalfAverages<T> {
    lower: StreamingMoments<T>,
    upper: StreamingMoments<T>,
}

impl<T: Real> Default for HalfAverages<T> {
    fn default() -> Self {
        Self {
            lower: StreamingMoments::new(),
            upper: StreamingMoments::new(),
        }
    }
}

impl<T: Real> HalfAverages<T> {
    /// Absolute difference of both averages, `None` if one half has not been hit.
    fn difference(&self) -> Option<T> {
        if self.lower.count() == 0 || self.upper.count() == 0 {
            None
        } else {
            Some((self.upper.mean() - self.lower.mean()).abs())
        }
    }
}

/// Evaluate `integrand` at `calls` points sampled uniformly in the box spanned by `lower` and
/// `upper`, using `x` as buffer for the sampled points.
///
/// If `halves` is given, it is filled with the averages over the two halves of every dimension.
pub(crate) fn sample<T, I, R>(
    lower: &[T],
    upper: &[T],
    x: &mut [T],
    integrand: &I,
    calls: usize,
    rng: &mut R,
    mut halves: Option<&mut [HalfAverages<T>]>,
) -> StreamingMoments<T>
where
    T: Real,
    I: Integrand<T> + ?Sized,
    R: Rng + ?Sized,
{
    if let Some(halves) = halves.as_mut() {
        halves.iter_mut().for_each(|h| *h = HalfAverages::default());
    }

    (0..calls).fold(StreamingMoments::new(), |mut acc, _| {
        // sample a new point in the integration region
        for ((xi, &l), &u) in x.iter_mut().zip(lower).zip(upper) {
            *xi = l + T::uniform_pos(rng) * (u - l);
        }

        // evaluate the integrand
        let value = integrand.call(x);

        if let Some(halves) = halves.as_mut() {
            for (d, half) in halves.iter_mut().enumerate() {
                // closer to the lower edge than to the upper one
                if x[d] - lower[d] < upper[d] - x[d] {
                    half.lower.update(value);
                } else {
                    half.upper.update(value);
                }
            }
        }

        acc.update(value);
        acc
    })
}

/// The first dimension with the largest difference between its half averages. Dimensions with
/// an empty half or a non-finite difference are skipped.
pub(crate) fn widest_difference<T: Real>(halves: &[HalfAverages<T>]) -> Option<(usize, T)> {
    halves
        .iter()
        .enumerate()
        .filter_map(|(d, half)| half.difference().map(|diff| (d, diff)))
        .filter(|(_, diff)| diff.is_finite())
        .fold(None, |best: Option<(usize, T)>, (d, diff)| match best {
            Some((_, max)) if max >= diff => best,
            _ => Some((d, diff)),
        })
}

/// Scratch space of the plain integrator for integrands of a fixed dimension.
#[derive(Clone, Debug)]
pub struct PlainState<T> {
    x: Vec<T>,
    halves: Vec<HalfAverages<T>>,
}

impl<T: Real> PlainState<T> {
    /// Allocates the scratch space for `dim` dimensions.
    pub fn new(dim: usize) -> Result<Self> {
        Ok(Self {
            x: try_filled(dim, T::zero())?,
            halves: try_filled(dim, HalfAverages::default())?,
        })
    }
}

impl<T: Real> Integrator<T> for PlainState<T> {
    fn dim(&self) -> usize {
        self.x.len()
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

        let moments = sample(
            domain.lower(),
            domain.upper(),
            &mut self.x,
            integrand,
            calls,
            rng,
            Some(self.halves.as_mut_slice()),
        );

        let mut tally = SplitTally::new(self.dim());

        if let Some((d, diff)) = widest_difference(&self.halves) {
            tally.record(d);
            debug!(dim = d, difference = ?diff, "largest difference between halves");
        }

        let volume = domain.volume();

        Ok(IntegrationResult::new(
            moments.integral(volume),
            moments.integral_error(volume),
            tally.best(),
            calls,
        ))
    }
}
