use taylor_ode::test_models::exponential;
use taylor_ode::{integrate, Poly};

#[test]
fn scalar_decay_matches_closed_form() {
    let problem = exponential::scalar_problem();
    let out = integrate(exponential::scalar_rhs::<f64>, &problem, None).unwrap();
    let last = *out.xs.last().unwrap().first().unwrap();
    assert!((last - 0.5 * std::f64::consts::E).abs() < 1e-12, "last={last}");
}

#[test]
fn vector_decay_matches_closed_form_componentwise() {
    let problem = exponential::vector_problem();
    let out = integrate(exponential::vector_rhs::<f64>, &problem, None).unwrap();
    let last = out.xs.last().unwrap();
    assert_eq!(last.len(), 8);
    for &x in last {
        assert!((x - 0.5 * std::f64::consts::E).abs() < 1e-12, "x={x}");
    }
}

#[test]
fn dense_output_reconstructs_trajectory() {
    use taylor_ode::Options;
    let problem = exponential::scalar_problem().with_options(Options {
        dense: true,
        ..Options::default()
    });
    let out = integrate(exponential::scalar_rhs::<f64>, &problem, None).unwrap();
    let dense = out.polys.unwrap();
    let first_step: &Vec<Poly<f64>> = &dense[0];
    assert!((first_step[0].constant() - 0.5).abs() < 1e-12);
}
