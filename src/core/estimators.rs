//! This module contains everything related to estimators.
use super::from_usize;
use num_traits::{Float, FromPrimitive};
use serde::{Deserialize, Serialize};

/// Basic estimators, like the mean, variance, and the standard deviation.
pub trait BasicEstimators<T: Float> {
    /// Returns the mean value.
    fn mean(&self) -> T;

    /// Returns the variance, $V$.
    fn var(&self) -> T;

    /// Returns the standard deviation, $\sigma = \sqrt{V}$.
    fn std(&self) -> T {
        self.var().sqrt()
    }
}

/// Everything that needs to be updated.
pub trait Updateable<T> {
    /// Update this estimator with `value`.
    fn update(&mut self, value: T);
}

/// Running mean and sum of squared deviations, $M_2$, of a stream of observations.
///
/// After $n$ observations $f_1, \ldots, f_n$ the mean is $\frac{1}{n} \sum_i f_i$ and the unbiased
/// sample variance is $M_2 / (n-1)$. The recurrence never subtracts two large sums, which keeps
/// it accurate for large $n$.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct StreamingMoments<T> {
    mean: T,
    m2: T,
    count: usize,
}

impl<T: Float> Default for StreamingMoments<T> {
    fn default() -> Self {
        Self {
            mean: T::zero(),
            m2: T::zero(),
            count: 0,
        }
    }
}

impl<T: Float + FromPrimitive> Updateable<T> for StreamingMoments<T> {
    fn update(&mut self, value: T) {
        // both updates use the count before this observation
        let n = from_usize::<T>(self.count);
        let d = value - self.mean;
        self.mean = self.mean + d / (n + T::one());
        self.m2 = self.m2 + d * d * (n / (n + T::one()));
        self.count += 1;
    }
}

impl<T: Float + FromPrimitive> StreamingMoments<T> {
    /// Constructor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all observations.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Returns the number of observations.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the sum of squared deviations from the mean, $M_2$.
    pub fn m2(&self) -> T {
        self.m2
    }

    /// Returns the population variance $M_2 / n$, or `None` without observations.
    pub fn population_var(&self) -> Option<T> {
        if self.count == 0 {
            None
        } else {
            Some(self.m2 / from_usize(self.count))
        }
    }

    /// Monte Carlo estimate of the integral over a region of the given `volume` from which the
    /// observations were sampled uniformly.
    pub fn integral(&self, volume: T) -> T {
        volume * self.mean
    }

    /// Absolute error of [`integral`](Self::integral); infinite with fewer than two
    /// observations.
    pub fn integral_error(&self, volume: T) -> T {
        if self.count < 2 {
            return T::infinity();
        }

        let n = from_usize::<T>(self.count);
        volume * (self.m2 / (n * (n - T::one()))).sqrt()
    }
}

impl<T: Float + FromPrimitive> BasicEstimators<T> for StreamingMoments<T> {
    fn mean(&self) -> T {
        self.mean
    }

    fn var(&self) -> T {
        if self.count < 2 {
            T::infinity()
        } else {
            self.m2 / from_usize::<T>(self.count - 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn moments_of(values: &[f64]) -> StreamingMoments<f64> {
        let mut moments = StreamingMoments::new();
        values.iter().for_each(|&v| moments.update(v));
        moments
    }

    #[test]
    fn constant_sequence_has_zero_variance() {
        let moments = moments_of(&[2.0, 2.0, 2.0, 2.0]);

        assert_eq!(moments.count(), 4);
        assert_eq!(moments.mean(), 2.0);
        assert_eq!(moments.var(), 0.0);
    }

    #[test]
    fn sample_variance_is_unbiased() {
        let moments = moments_of(&[1.0, 2.0, 3.0, 4.0]);

        assert_approx_eq!(moments.mean(), 2.5, 1e-15);
        assert_approx_eq!(moments.var(), 5.0 / 3.0, 1e-15);
        assert_approx_eq!(moments.population_var().unwrap(), 1.25, 1e-15);
        assert_approx_eq!(moments.std(), (5.0f64 / 3.0).sqrt(), 1e-15);
    }

    #[test]
    fn large_offset_does_not_cancel() {
        // the naive sum-of-squares formula loses all digits here
        let offset = 1e9;
        let moments = moments_of(&[offset + 4.0, offset + 7.0, offset + 13.0, offset + 16.0]);

        assert_approx_eq!(moments.var(), 30.0, 1e-6);
    }

    #[test]
    fn too_few_observations() {
        let empty = StreamingMoments::<f64>::new();
        assert_eq!(empty.population_var(), None);
        assert!(empty.integral_error(1.0).is_infinite());

        let single = moments_of(&[3.0]);
        assert!(single.var().is_infinite());
        assert!(single.integral_error(2.0).is_infinite());
        assert_eq!(single.integral(2.0), 6.0);
    }

    #[test]
    fn integral_error_scales_with_volume() {
        let moments = moments_of(&[1.0, 2.0, 3.0, 4.0]);

        // sqrt(M2 / (n (n - 1))) = sqrt(5 / 12)
        assert_approx_eq!(moments.integral_error(1.0), (5.0f64 / 12.0).sqrt(), 1e-15);
        assert_approx_eq!(
            moments.integral_error(4.0),
            4.0 * (5.0f64 / 12.0).sqrt(),
            1e-15
        );
    }

    #[test]
    fn reset_forgets_observations() {
        let mut moments = moments_of(&[1.0, 5.0]);
        moments.reset();

        assert_eq!(moments, StreamingMoments::new());
    }
}
