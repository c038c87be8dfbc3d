use hdintegrator::config::{Config, Correlation, IntegrandKind, OutputFormat};
use hdintegrator::driver::Driver;
use hdintegrator::integrators::Method;
use hdintegrator::Error;

use assert_approx_eq::assert_approx_eq;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use std::io::Write;
use tempfile::NamedTempFile;

fn run(config: &Config, input: &str) -> (hdintegrator::Result<usize>, String) {
    let integrand = config.build_integrand().unwrap();
    let rng = Pcg64::seed_from_u64(config.seed);
    let mut driver = Driver::new(integrand.as_ref(), config.engine(), rng, config.format);
    let mut output = Vec::new();

    let answered = driver.run(input.as_bytes(), &mut output);

    (answered, String::from_utf8(output).unwrap())
}

fn parse_line(line: &str) -> (f64, f64, usize) {
    let fields: Vec<_> = line.split_whitespace().collect();
    assert_eq!(fields.len(), 3);

    (
        fields[0].parse().unwrap(),
        fields[1].parse().unwrap(),
        fields[2].parse().unwrap(),
    )
}

fn constant() -> Config {
    Config {
        integrand: IntegrandKind::Constant,
        ..Config::default()
    }
}

#[test]
fn round_trip() {
    for &method in &[Method::Plain, Method::Miser] {
        let config = Config { method, ..constant() };
        let (answered, output) = run(&config, "1000 -1 1 -1 1\n");

        assert_eq!(answered.unwrap(), 1);
        let (estimate, error, split_dim) = parse_line(output.trim_end());
        assert_approx_eq!(estimate, 4.0, 1e-12);
        assert_approx_eq!(error, 0.0, 1e-12);
        assert!(split_dim < 2);
    }
}

#[test]
fn unequal_bounds_produce_no_output() {
    let (answered, output) = run(&constant(), "500 -1 1 -1\n");

    assert!(matches!(answered, Err(Error::InputMalformed(_))));
    assert!(output.is_empty());
}

#[test]
fn requests_must_match_the_grid() {
    let config = Config {
        correlation_dim_1: Some(Correlation::Dim(0)),
        correlation_dim_2: Some(Correlation::Dim(1)),
        grid_size_x: Some(2),
        grid_size_t: Some(2),
        ..Config::default()
    };

    let (answered, output) = run(&config, "5000 -1 1 -1 1 -1 1\n");

    assert!(matches!(answered, Err(Error::InputMalformed(_))));
    assert!(output.is_empty());
}

#[test]
fn stream_ends_at_blank_line() {
    let config = Config {
        integrand: IntegrandKind::Hemisphere,
        ..Config::default()
    };
    let (answered, output) = run(&config, "2000 -1 1\n4000 -1 1 -1 1\n\n1000 0 1\n");

    assert_eq!(answered.unwrap(), 2);
    assert_eq!(output.lines().count(), 2);

    // half the area of the unit disk
    let (estimate, error, _) = parse_line(output.lines().next().unwrap());
    assert_approx_eq!(estimate, std::f64::consts::PI / 2.0, 5.0 * error);
}

#[test]
fn same_seed_gives_same_output() {
    let config = Config {
        integrand: IntegrandKind::Hemisphere,
        seed: 1234,
        ..Config::default()
    };
    let input = "10000 -1 1 -1 1 -1 1\n20000 -1 0 0 1 -1 1\n";

    let (_, first) = run(&config, input);
    let (_, second) = run(&config, input);

    assert_eq!(first.lines().count(), 2);
    assert_eq!(first, second);

    let (_, other) = run(&Config { seed: 4321, ..config }, input);
    assert_ne!(first, other);
}

#[test]
fn json_output_from_configuration_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "method": "plain", "integrand": "constant", "constant": 2.0, "format": "json" }}"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.format, OutputFormat::Json);

    let (answered, output) = run(&config, "100 0 1 0 3\n");
    assert_eq!(answered.unwrap(), 1);

    let json: serde_json::Value = serde_json::from_str(output.trim_end()).unwrap();
    assert_approx_eq!(json["estimate"].as_f64().unwrap(), 6.0, 1e-12);
    assert_eq!(json["calls"].as_u64(), Some(100));
    assert_eq!(json["split_dim"].as_u64(), Some(0));
}
