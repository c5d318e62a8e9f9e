use criterion::{black_box, criterion_group, criterion_main, Criterion};
use taylor_ode::test_models::exponential;
use taylor_ode::{integrate, Problem};

fn scalar_exponential_benchmark(c: &mut Criterion) {
    let problem = Problem::<f64, f64>::new(vec![0.5], 0.0, 1.0, 16, 1e-16);
    c.bench_function("scalar exponential, order 16", |b| {
        b.iter(|| {
            integrate(exponential::scalar_rhs::<f64>, black_box(&problem), None).unwrap()
        })
    });
}

fn vector_exponential_benchmark(c: &mut Criterion) {
    let problem = Problem::<f64, f64>::new(vec![0.5; 64], 0.0, 1.0, 16, 1e-16);
    c.bench_function("64-component exponential, order 16", |b| {
        b.iter(|| {
            integrate(exponential::vector_rhs::<f64>, black_box(&problem), None).unwrap()
        })
    });
}

criterion_group!(benches, scalar_exponential_benchmark, vector_exponential_benchmark);
criterion_main!(benches);
