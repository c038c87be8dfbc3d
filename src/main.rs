//! Reads integration requests from standard input and writes one result line per request to
//! standard output, see [`hdintegrator::driver`].
use hdintegrator::config::{Config, Correlation, IntegrandKind, OutputFormat};
use hdintegrator::driver::Driver;
use hdintegrator::integrators::Method;
use hdintegrator::Result;

use clap::Parser;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Monte Carlo integration of high-dimensional integrands over boxes read from standard input
#[derive(Debug, Parser)]
#[command(name = "hdintegrator", version, about, long_about = None)]
struct Args {
    /// JSON configuration file; options given on the command line take precedence
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Integration method
    #[arg(long, value_enum)]
    method: Option<Method>,

    /// Integrand
    #[arg(long, value_enum)]
    integrand: Option<IntegrandKind>,

    /// First correlated grid point, `disabled` or a negative number turns correlation off
    #[arg(long, allow_hyphen_values = true)]
    corr1: Option<Correlation>,

    /// Second correlated grid point, `disabled` or a negative number turns correlation off
    #[arg(long, allow_hyphen_values = true)]
    corr2: Option<Correlation>,

    /// Number of grid points in space
    #[arg(long)]
    nx: Option<usize>,

    /// Number of grid points in time
    #[arg(long)]
    nt: Option<usize>,

    /// Minimum number of calls per region [default: 16 times the dimension]
    #[arg(long)]
    min_calls: Option<usize>,

    /// Minimum number of calls for bisecting a region [default: 32 times min-calls]
    #[arg(long)]
    min_calls_per_bisection: Option<usize>,

    /// Fraction of the calls spent on estimating the variances
    #[arg(long)]
    estimate_fraction: Option<f64>,

    /// Relative displacement of the bisection point from the center
    #[arg(long)]
    dither: Option<f64>,

    /// Exponent of the variance in the allocation of calls
    #[arg(long)]
    alpha: Option<f64>,

    /// Seed of the random number generator
    #[arg(long)]
    seed: Option<u64>,

    /// Value of the constant integrand
    #[arg(long, allow_hyphen_values = true)]
    constant: Option<f64>,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Log what the integrators are doing
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        override_with(&mut config.method, self.method);
        override_with(&mut config.integrand, self.integrand);
        override_with(&mut config.estimate_fraction, self.estimate_fraction);
        override_with(&mut config.dither, self.dither);
        override_with(&mut config.alpha, self.alpha);
        override_with(&mut config.seed, self.seed);
        override_with(&mut config.constant, self.constant);
        override_with(&mut config.format, self.format);

        config.correlation_dim_1 = self.corr1.or(config.correlation_dim_1);
        config.correlation_dim_2 = self.corr2.or(config.correlation_dim_2);
        config.grid_size_x = self.nx.or(config.grid_size_x);
        config.grid_size_t = self.nt.or(config.grid_size_t);
        config.min_calls = self.min_calls.or(config.min_calls);
        config.min_calls_per_bisection = self
            .min_calls_per_bisection
            .or(config.min_calls_per_bisection);

        config.validate()?;

        Ok(config)
    }
}

fn override_with<T>(value: &mut T, flag: Option<T>) {
    if let Some(flag) = flag {
        *value = flag;
    }
}

fn run(args: &Args) -> Result<usize> {
    let config = args.config()?;
    debug!(?config, "configuration");

    let integrand = config.build_integrand()?;
    let rng = Pcg64::seed_from_u64(config.seed);
    let mut driver = Driver::new(integrand.as_ref(), config.engine(), rng, config.format);

    let stdin = io::stdin();
    let stdout = io::stdout();

    driver.run(stdin.lock(), stdout.lock())
}

fn main() -> ExitCode {
    let args = Args::parse();

    // stdout carries the results, everything else goes to stderr
    let level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    match run(&args) {
        Ok(answered) => {
            debug!(answered, "done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
