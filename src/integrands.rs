//! Integrands shipped with the command-line program.
use crate::core::{Integrand, Real};
use crate::error::{Error, Result};

/// The function $f(x) = c$.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Constant<T>(pub T);

impl<T: Real> Integrand<T> for Constant<T> {
    fn call(&self, _: &[T]) -> T {
        self.0
    }
}

/// The upper half of the unit sphere, $f(x) = \sqrt{\max(0, 1 - |x|^2)}$.
///
/// Integrated over $[-1,1]^d$ it gives half the volume of the unit ball in $d+1$ dimensions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Hemisphere;

impl<T: Real> Integrand<T> for Hemisphere {
    fn call(&self, x: &[T]) -> T {
        let r2 = x.iter().fold(T::zero(), |acc, &xi| acc + xi * xi);
        (T::one() - r2).max(T::zero()).sqrt()
    }
}

/// Single-time correlation function of the stochastic Burgers equation, discretized on a
/// periodic grid with `nx` points in space and `nt` points in time.
///
/// Each coordinate of the integration domain $(-1,1)^{n_x n_t}$ is mapped to the velocity
/// $v = x / (1 - x^2)$ of one grid point, the Jacobian of which is part of the integrand. The
/// integrand is the likelihood $\exp(-S/2)$ of the discretized equation's residual $S$, times
/// the velocities of the two correlated points at the first time step (if correlation is
/// enabled).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BurgersCorrelation {
    nx: usize,
    nt: usize,
    correlation: Option<(usize, usize)>,
}

impl BurgersCorrelation {
    /// Constructor. Without `correlation` the integrand is the normalization of the
    /// correlation function.
    pub fn new(nx: usize, nt: usize, correlation: Option<(usize, usize)>) -> Result<Self> {
        if nx == 0 || nt == 0 {
            return Err(Error::ConfigInvalid(format!(
                "number of grid points must be positive, got nx = {} and nt = {}",
                nx, nt
            )));
        }

        if let Some((c1, c2)) = correlation {
            if c1.max(c2) >= nx * nt {
                return Err(Error::ConfigInvalid(format!(
                    "correlation dimensions ({}, {}) must be smaller than nx * nt = {}",
                    c1,
                    c2,
                    nx * nt
                )));
            }
        }

        Ok(Self {
            nx,
            nt,
            correlation,
        })
    }

    /// Periodic index of the grid point `(xi, ti)`.
    fn index(&self, xi: usize, ti: usize) -> usize {
        xi % self.nx + (ti % self.nt) * self.nx
    }
}

impl Integrand<f64> for BurgersCorrelation {
    fn call(&self, x: &[f64]) -> f64 {
        let (nx, nt) = (self.nx, self.nt);
        let v = |i: usize| x[i] / (1.0 - x[i] * x[i]);

        let jacobian = x
            .iter()
            .map(|&xi| {
                let x2 = xi * xi;
                (1.0 + x2) / ((1.0 - x2) * (1.0 - x2))
            })
            .product::<f64>();

        let (vel1, vel2) = self.correlation.map_or((1.0, 1.0), |(c1, c2)| {
            (v(self.index(c1, 0)), v(self.index(c2, 0)))
        });

        let mut residual = 0.0;
        for ti in 0..nt {
            for xi in 0..nx {
                let here = v(self.index(xi, ti));
                let right = v(self.index(xi + 1, ti));
                let left = v(self.index(xi + nx - 1, ti));
                let r = v(self.index(xi, ti + 1)) + here - right - left
                    + 0.5 * here * (right - left);
                residual += r * r;
            }
        }

        jacobian * vel1 * vel2 * (-0.5 * residual).exp()
    }

    fn dim(&self) -> Option<usize> {
        Some(self.nx * self.nt)
    }
}
