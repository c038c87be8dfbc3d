//! The error type shared by all integrators, the driver and the configuration.
use std::collections::TryReserveError;
use std::fmt;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Which half of a bisected dimension an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// The half between the lower bound and the bisection point.
    Left,
    /// The half between the bisection point and the upper bound.
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// Everything that can go wrong. None of these are recovered from: a failed request is not
/// retried and, when it comes from the driver, stops the processing of the stream.
#[derive(Debug, Error)]
pub enum Error {
    /// Request lines or bounds that cannot describe a valid integration.
    #[error("malformed input: {0}")]
    InputMalformed(String),

    /// Invalid parameters, or a scratch state used with the wrong dimensionality.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The call budget cannot produce a variance estimate.
    #[error("insufficient call budget: {0}")]
    InsufficientBudget(String),

    /// One side of a pilot bisection did not receive a single sample.
    #[error("no points in {side}-half space of dimension {dim}")]
    DegenerateStratum {
        /// The dimension whose half is empty.
        dim: usize,
        /// The empty half.
        side: Side,
    },

    /// Scratch buffers could not be allocated.
    #[error("failed to allocate scratch space: {0}")]
    AllocationFailure(#[from] TryReserveError),

    /// Reading requests or writing results failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A configuration file could not be parsed.
    #[error("configuration file: {0}")]
    Json(#[from] serde_json::Error),
}
