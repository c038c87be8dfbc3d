//! Runtime configuration of the command-line program.
//!
//! A configuration starts from [`Config::default`] or a JSON file and is checked with
//! [`Config::validate`] before anything is integrated.
use crate::core::Integrand;
use crate::error::{Error, Result};
use crate::integrands::{BurgersCorrelation, Constant, Hemisphere};
use crate::integrators::{EngineState, Method, MiserOptions};

use clap::ValueEnum;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A dimension to correlate, or none.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Correlation {
    /// Do not correlate.
    Disabled,
    /// Correlate the velocity at this (zero-based) grid point.
    Dim(usize),
}

impl Correlation {
    /// Negative indices disable correlation.
    pub fn from_index(index: i64) -> Self {
        usize::try_from(index).map_or(Self::Disabled, Self::Dim)
    }
}

impl FromStr for Correlation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("disabled") {
            return Ok(Self::Disabled);
        }

        s.parse::<i64>().map(Self::from_index).map_err(|_| {
            Error::ConfigInvalid(format!(
                "correlation dimension must be an integer or \"disabled\", got \"{}\"",
                s
            ))
        })
    }
}

impl fmt::Display for Correlation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::Dim(dim) => write!(f, "{}", dim),
        }
    }
}

impl Serialize for Correlation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Disabled => serializer.serialize_str("disabled"),
            Self::Dim(dim) => serializer.serialize_u64(*dim as u64),
        }
    }
}

impl<'de> Deserialize<'de> for Correlation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Index(i64),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Index(index) => Ok(Self::from_index(index)),
            Repr::Name(name) => name.parse().map_err(de::Error::custom),
        }
    }
}

/// The integrands the program can integrate.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IntegrandKind {
    /// [`BurgersCorrelation`], which needs the grid and correlation options.
    Burgers,
    /// [`Hemisphere`].
    Hemisphere,
    /// [`Constant`] with the value of the `constant` option.
    Constant,
}

/// How results are written.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `<estimate> <abs_error> <split_dim>` per line.
    Text,
    /// One JSON object per line.
    Json,
}

/// All options of the program.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Integration method.
    pub method: Method,
    /// Integrand to integrate.
    pub integrand: IntegrandKind,
    /// First correlated grid point of the Burgers integrand.
    pub correlation_dim_1: Option<Correlation>,
    /// Second correlated grid point of the Burgers integrand.
    pub correlation_dim_2: Option<Correlation>,
    /// Number of grid points in space of the Burgers integrand.
    pub grid_size_x: Option<usize>,
    /// Number of grid points in time of the Burgers integrand.
    pub grid_size_t: Option<usize>,
    /// See [`MiserOptions::min_calls`].
    pub min_calls: Option<usize>,
    /// See [`MiserOptions::min_calls_per_bisection`].
    pub min_calls_per_bisection: Option<usize>,
    /// See [`MiserOptions::estimate_fraction`].
    pub estimate_fraction: f64,
    /// See [`MiserOptions::dither`].
    pub dither: f64,
    /// See [`MiserOptions::alpha`].
    pub alpha: f64,
    /// Seed of the random number generator.
    pub seed: u64,
    /// Value of the constant integrand.
    pub constant: f64,
    /// Output format.
    pub format: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        let miser = MiserOptions::default();

        Self {
            method: Method::default(),
            integrand: IntegrandKind::Burgers,
            correlation_dim_1: None,
            correlation_dim_2: None,
            grid_size_x: None,
            grid_size_t: None,
            min_calls: miser.min_calls,
            min_calls_per_bisection: miser.min_calls_per_bisection,
            estimate_fraction: miser.estimate_fraction,
            dither: miser.dither,
            alpha: miser.alpha,
            seed: 0,
            constant: 1.0,
            format: OutputFormat::Text,
        }
    }
}

impl Config {
    /// Parses a configuration from JSON. Options not given keep their default value.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// The options of the MISER integrator.
    pub fn miser_options(&self) -> MiserOptions {
        MiserOptions {
            min_calls: self.min_calls,
            min_calls_per_bisection: self.min_calls_per_bisection,
            estimate_fraction: self.estimate_fraction,
            dither: self.dither,
            alpha: self.alpha,
        }
    }

    /// Checks that the integrand can be built and the integrator options are valid.
    pub fn validate(&self) -> Result<()> {
        self.build_integrand()?;
        // the dimension-dependent defaults are valid for any dimension
        self.miser_options().resolve::<f64>(1)?;
        Ok(())
    }

    /// A fresh integrator state for the configured method.
    pub fn engine(&self) -> EngineState<f64> {
        EngineState::new(self.method, self.miser_options())
    }

    /// Constructs the configured integrand.
    pub fn build_integrand(&self) -> Result<Box<dyn Integrand<f64>>> {
        Ok(match self.integrand {
            IntegrandKind::Burgers => {
                let nx = required(self.grid_size_x, "grid_size_x")?;
                let nt = required(self.grid_size_t, "grid_size_t")?;
                let c1 = required(self.correlation_dim_1, "correlation_dim_1")?;
                let c2 = required(self.correlation_dim_2, "correlation_dim_2")?;

                let correlation = match (c1, c2) {
                    (Correlation::Dim(c1), Correlation::Dim(c2)) => Some((c1, c2)),
                    _ => None,
                };

                Box::new(BurgersCorrelation::new(nx, nt, correlation)?)
            }
            IntegrandKind::Hemisphere => Box::new(Hemisphere),
            IntegrandKind::Constant => Box::new(Constant(self.constant)),
        })
    }
}

fn required<T>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| Error::ConfigInvalid(format!("missing required option {}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn burgers() -> Config {
        Config {
            correlation_dim_1: Some(Correlation::Dim(0)),
            correlation_dim_2: Some(Correlation::Disabled),
            grid_size_x: Some(2),
            grid_size_t: Some(3),
            ..Config::default()
        }
    }

    #[test]
    fn correlation_from_str() {
        assert_eq!("disabled".parse::<Correlation>().unwrap(), Correlation::Disabled);
        assert_eq!("-1".parse::<Correlation>().unwrap(), Correlation::Disabled);
        assert_eq!("4".parse::<Correlation>().unwrap(), Correlation::Dim(4));
        assert!(matches!(
            "four".parse::<Correlation>(),
            Err(Error::ConfigInvalid(_))
        ));
    }

    #[test]
    fn burgers_needs_grid_options() {
        assert!(burgers().validate().is_ok());
        assert_eq!(burgers().build_integrand().unwrap().dim(), Some(6));

        let missing = Config {
            grid_size_t: None,
            ..burgers()
        };
        assert!(matches!(missing.validate(), Err(Error::ConfigInvalid(_))));

        let empty_grid = Config {
            grid_size_x: Some(0),
            ..burgers()
        };
        assert!(matches!(empty_grid.validate(), Err(Error::ConfigInvalid(_))));
    }

    #[test]
    fn other_integrands_need_no_grid() {
        let config = Config {
            integrand: IntegrandKind::Hemisphere,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.build_integrand().unwrap().dim(), None);
    }

    #[test]
    fn negative_alpha_is_invalid() {
        let config = Config {
            alpha: -0.5,
            ..burgers()
        };
        assert!(matches!(config.validate(), Err(Error::ConfigInvalid(_))));
    }

    #[test]
    fn json_configuration() {
        let config = Config::from_json(
            r#"{
                "method": "plain",
                "correlation_dim_1": 1,
                "correlation_dim_2": "disabled",
                "grid_size_x": 4,
                "grid_size_t": 2,
                "seed": 42
            }"#,
        )
        .unwrap();

        assert_eq!(config.method, Method::Plain);
        assert_eq!(config.correlation_dim_1, Some(Correlation::Dim(1)));
        assert_eq!(config.correlation_dim_2, Some(Correlation::Disabled));
        assert_eq!(config.grid_size_x, Some(4));
        assert_eq!(config.seed, 42);
        assert_eq!(config.estimate_fraction, 0.1);
    }

    #[test]
    fn unknown_options_are_rejected() {
        assert!(matches!(
            Config::from_json(r#"{ "grid_size_y": 3 }"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn configuration_file_round_trip() {
        let mut file = NamedTempFile::new().unwrap();
        let config = burgers();
        write!(file, "{}", serde_json::to_string(&config).unwrap()).unwrap();

        assert_eq!(Config::from_file(file.path()).unwrap(), config);
    }
}
