use criterion::{criterion_group, criterion_main, Criterion};

use hdintegrator::core::*;
use hdintegrator::integrands::BurgersCorrelation;
use hdintegrator::integrators::{
    EngineState, Integrator, Method, MiserOptions, MiserState, PlainState,
};

use rand_pcg::Pcg64;

struct MyIntegrand;

impl Integrand<f64> for MyIntegrand {
    fn call(&self, args: &[f64]) -> f64 {
        let x = 2.0 * args[0] - 1.0;
        x.abs()
    }

    fn dim(&self) -> Option<usize> {
        Some(1)
    }
}

fn rng() -> Pcg64 {
    Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96)
}

fn benchmark_plain() {
    let domain = Hyperrectangle::new(vec![0.0], vec![1.0]).unwrap();
    let mut state = PlainState::new(1).unwrap();

    let _ = state.integrate(&domain, &MyIntegrand, 1_000_000, &mut rng());
}

fn benchmark_miser() {
    let domain = Hyperrectangle::new(vec![0.0], vec![1.0]).unwrap();
    let mut state = MiserState::new(MiserOptions::default().resolve(1).unwrap()).unwrap();

    let _ = state.integrate(&domain, &MyIntegrand, 1_000_000, &mut rng());
}

fn benchmark_burgers() {
    let integrand = BurgersCorrelation::new(4, 4, Some((0, 1))).unwrap();
    let domain = Hyperrectangle::new(vec![-1.0; 16], vec![1.0; 16]).unwrap();
    let mut engine = EngineState::new(Method::Miser, MiserOptions::default());

    let _ = engine.integrate(&domain, &integrand, 100_000, &mut rng());
}

fn criterion_miser_benchmark(c: &mut Criterion) {
    c.bench_function("plain_univariate", |b| b.iter(|| benchmark_plain()));
    c.bench_function("miser_univariate", |b| b.iter(|| benchmark_miser()));
    c.bench_function("miser_burgers_4x4", |b| b.iter(|| benchmark_burgers()));
}

criterion_group!(benches, criterion_miser_benchmark);
criterion_main!(benches);
