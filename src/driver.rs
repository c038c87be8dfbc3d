//! Line-oriented integration requests.
//!
//! Every line of the input is one request of the form
//!
//! ```text
//! <calls> <min_1> <max_1> ... <min_d> <max_d>
//! ```
//!
//! and is answered with one line `<estimate> <abs_error> <split_dim>` (or a JSON object, see
//! [`OutputFormat`]). A blank line, or a line without bounds, ends the stream.
//!
//! Numbers are written with Rust's `{:.15e}` format, so exponents have no sign or padding for
//! positive values (`4.000000000000000e0`, `1.250000000000000e-3`) and an infinite error is
//! written as `inf`. In JSON an infinite error is `null`.
use crate::config::OutputFormat;
use crate::core::*;
use crate::error::{Error, Result};
use crate::integrators::EngineState;

use rand::Rng;
use std::io::{BufRead, Write};
use tracing::debug;

/// One integration request.
#[derive(Clone, Debug, PartialEq)]
pub struct Request<T> {
    calls: usize,
    domain: Hyperrectangle<T>,
}

impl<T: Real> Request<T> {
    /// Constructor.
    pub fn new(calls: usize, domain: Hyperrectangle<T>) -> Self {
        Self { calls, domain }
    }

    /// Parses a request line. Returns `None` for lines that end the stream.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut tokens = line.split_whitespace();

        let calls = match tokens.next() {
            Some(token) => parse_number(token)?,
            None => return Ok(None),
        };

        if !calls.is_finite() || calls < 0.0 {
            return Err(Error::InputMalformed(format!(
                "number of calls must be a non-negative number, got {}",
                calls
            )));
        }

        let bounds = tokens
            .map(|token| {
                let value = parse_number(token)?;
                T::from_f64(value).ok_or_else(|| {
                    Error::InputMalformed(format!("bound {} is not representable", token))
                })
            })
            .collect::<Result<Vec<T>>>()?;

        if bounds.is_empty() {
            return Ok(None);
        }

        if bounds.len() % 2 != 0 {
            return Err(Error::InputMalformed(format!(
                "number of minimum ({}) and maximum ({}) extents differs",
                (bounds.len() + 1) / 2,
                bounds.len() / 2
            )));
        }

        let (lower, upper): (Vec<T>, Vec<T>) = bounds
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .unzip();

        // `as` saturates for values beyond `usize::MAX`
        Ok(Some(Self::new(
            calls.round() as usize,
            Hyperrectangle::new(lower, upper)?,
        )))
    }

    /// Returns the number of requested calls.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Returns the integration domain.
    pub fn domain(&self) -> &Hyperrectangle<T> {
        &self.domain
    }
}

fn parse_number(token: &str) -> Result<f64> {
    token
        .parse()
        .map_err(|_| Error::InputMalformed(format!("\"{}\" is not a number", token)))
}

/// Answers integration requests with a fixed integrand, integrator and random number generator.
pub struct Driver<'a, T, I: ?Sized, R> {
    integrand: &'a I,
    engine: EngineState<T>,
    rng: R,
    format: OutputFormat,
}

impl<'a, T, I, R> Driver<'a, T, I, R>
where
    T: Real,
    I: Integrand<T> + ?Sized,
    R: Rng,
{
    /// Constructor.
    pub fn new(integrand: &'a I, engine: EngineState<T>, rng: R, format: OutputFormat) -> Self {
        Self {
            integrand,
            engine,
            rng,
            format,
        }
    }

    /// Returns the integrator state.
    pub fn engine(&self) -> &EngineState<T> {
        &self.engine
    }

    /// Returns the random number generator.
    pub fn rng(&self) -> &R {
        &self.rng
    }

    /// Integrates a single request.
    pub fn process(&mut self, request: &Request<T>) -> Result<IntegrationResult<T>> {
        let dim = request.domain().dim();

        if let Some(required) = self.integrand.dim() {
            if required != dim {
                return Err(Error::InputMalformed(format!(
                    "integrand requires {} dimensions, request has {}",
                    required, dim
                )));
            }
        }

        debug!(dim, calls = request.calls(), "processing request");

        self.engine
            .integrate(request.domain(), self.integrand, request.calls(), &mut self.rng)
    }

    /// Processes requests from `input` until the stream ends, writing one result per request to
    /// `output`. Returns the number of answered requests.
    ///
    /// Processing stops at the first failing request; results written before stay valid.
    pub fn run<B: BufRead, W: Write>(&mut self, input: B, mut output: W) -> Result<usize> {
        let mut answered = 0;

        for line in input.lines() {
            let request = match Request::parse(&line?)? {
                Some(request) => request,
                None => break,
            };

            let result = self.process(&request)?;
            self.write(&mut output, &result)?;
            answered += 1;
        }

        debug!(answered, "end of requests");

        Ok(answered)
    }

    fn write<W: Write>(&self, output: &mut W, result: &IntegrationResult<T>) -> Result<()> {
        let estimate = result.estimate().to_f64().unwrap_or(f64::NAN);
        let abs_error = result.abs_error().to_f64().unwrap_or(f64::NAN);

        match self.format {
            OutputFormat::Text => {
                writeln!(
                    output,
                    "{:.15e} {:.15e} {}",
                    estimate,
                    abs_error,
                    result.split_dim()
                )?;
            }
            OutputFormat::Json => {
                let record =
                    IntegrationResult::new(estimate, abs_error, result.split_dim(), result.calls());
                serde_json::to_writer(&mut *output, &record)?;
                writeln!(output)?;
            }
        }

        output.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrators::{Method, MiserOptions};
    use assert_approx_eq::assert_approx_eq;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn plain_driver<I: Integrand<f64> + ?Sized>(
        integrand: &I,
        format: OutputFormat,
    ) -> Driver<'_, f64, I, Pcg64> {
        let engine = EngineState::new(Method::Plain, MiserOptions::default());
        Driver::new(integrand, engine, Pcg64::seed_from_u64(5), format)
    }

    #[test]
    fn parse_request() {
        let request = Request::<f64>::parse("99.6 -1 1 0 2.5").unwrap().unwrap();

        assert_eq!(request.calls(), 100);
        assert_eq!(request.domain().lower(), &[-1.0, 0.0]);
        assert_eq!(request.domain().upper(), &[1.0, 2.5]);
    }

    #[test]
    fn end_of_stream() {
        assert_eq!(Request::<f64>::parse("").unwrap(), None);
        assert_eq!(Request::<f64>::parse("   \t").unwrap(), None);
        assert_eq!(Request::<f64>::parse("1000").unwrap(), None);
    }

    #[test]
    fn malformed_requests() {
        for line in &[
            "500 -1 1 -1",
            "-5 0 1",
            "inf 0 1",
            "NaN 0 1",
            "ten 0 1",
            "10 0 one",
            "10 1 0",
            "10 0 1 2 2",
        ] {
            assert!(
                matches!(Request::<f64>::parse(line), Err(Error::InputMalformed(_))),
                "{}",
                line
            );
        }
    }

    #[test]
    fn text_output() {
        let f = |_: &[f64]| 1.0;
        let mut driver = plain_driver(&f, OutputFormat::Text);
        let mut output = Vec::new();

        let answered = driver
            .run("1000 -1 1 -1 1\n1 0 1\n\n10 0 1\n".as_bytes(), &mut output)
            .unwrap();
        assert_eq!(answered, 2);

        let output = String::from_utf8(output).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "4.000000000000000e0 0.000000000000000e0 0");
        assert_eq!(lines[1], "1.000000000000000e0 inf 0");
    }

    #[test]
    fn json_output() {
        let f = |x: &[f64]| x[0];
        let mut driver = plain_driver(&f, OutputFormat::Json);
        let mut output = Vec::new();

        driver.run("2000 0 2\n1 0 2\n".as_bytes(), &mut output).unwrap();

        let results: Vec<IntegrationResult<f64>> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].calls(), 2000);
        assert_approx_eq!(results[0].estimate(), 2.0, 5.0 * results[0].abs_error());

        // a single call has no error estimate
        assert_eq!(results[1].calls(), 1);
        assert!(results[1].abs_error().is_infinite());
    }

    #[test]
    fn dimension_is_checked_before_sampling() {
        let f = crate::integrands::BurgersCorrelation::new(2, 2, None).unwrap();
        let mut driver = plain_driver(&f, OutputFormat::Text);
        let mut output = Vec::new();

        assert!(matches!(
            driver.run("100 -1 1 -1 1 -1 1".as_bytes(), &mut output),
            Err(Error::InputMalformed(_))
        ));
        assert!(output.is_empty());
        assert!(driver.engine().estimator().is_none());
    }

    #[test]
    fn stops_at_first_failure() {
        let f = |_: &[f64]| 1.0;
        let mut driver = plain_driver(&f, OutputFormat::Text);
        let mut output = Vec::new();

        assert!(driver
            .run("10 0 1\n500 -1 1 -1\n10 0 1\n".as_bytes(), &mut output)
            .is_err());
        assert_eq!(String::from_utf8(output).unwrap().lines().count(), 1);
    }
}
