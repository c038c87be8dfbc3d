#![warn(clippy::all, clippy::cargo, clippy::nursery, clippy::pedantic)]
#![warn(missing_docs)]

//! The crate `hdintegrator` provides [Monte Carlo integration] routines for high-dimensional
//! integrands over boxes, together with a recommendation which dimension of a box should be split
//! when the integration is refined by an adaptive mesh.
//!
//! # Features
//!
//! - **Generic numeric type**. The numeric type used in this library is not fixed, but instead a
//! generic parameter, so that the integration routines can be used with either `f32` or `f64`.
//! - **Generic random number generator**. Every random number generator that implements the `Rng`
//! trait from the `rand` crate can be used with every integrator in this crate.
//! - **Reproducibility**. Results only depend on the random number generator and its seed.
//! - **Split diagnostics**. Every integrator tells which dimension is the most promising one to
//! bisect, see [`IntegrationResult::split_dim`].
//!
//! # Integrators
//!
//! - [`integrators::plain`] samples uniformly in the whole box and compares, for every dimension,
//! the average of the integrand over the lower half with the one over the upper half.
//! - [`integrators::miser`] implements the MISER algorithm of recursive stratified sampling: it
//! bisects the box along the dimension that minimizes the estimated variance after the split and
//! distributes the calls among both halves according to their variances.
//!
//! # What is ...?
//!
//! Given
//!
//! $$ I = \int_{a_1}^{b_1} \mathrm{d} x_1 \cdots \int_{a_d}^{b_d} \mathrm{d} x_d \, f(x_1,
//! \ldots, x_d) $$
//!
//! we approximate $I$ using PLAIN Monte Carlo integration with
//!
//! $$ I \approx \frac{V}{N} \sum_{j=1}^N f \left( x_1^{(j)}, \ldots, x_d^{(j)} \right) $$
//!
//! where $V$ is the volume of the box and for each $j$ the arguments are uniformly distributed in
//! the box. We use the following terms:
//!
//! - the number of *calls* is $N$, which is the number of times the integrand is evaluated. We
//! assume that this is the expensive operation;
//! - the *integrand* is the function, $f(x_1, x_2, \ldots, x_d)$, that is being integrated,
//! - the number of *dimensions*, $d$, is number of dimensions of the integration domain,
//! - a *bisection* splits the box into two halves along one dimension.
//!
//! [Monte Carlo integration]: https://en.wikipedia.org/wiki/Monte_Carlo_integration

pub mod config;
pub mod core;
pub mod driver;
pub mod error;
pub mod integrands;
pub mod integrators;

pub use crate::core::*;
pub use error::{Error, Result};
