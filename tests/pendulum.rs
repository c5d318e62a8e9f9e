use taylor_ode::test_models::pendulum;
use taylor_ode::{integrate_grid, Options, Problem};

/// The pendulum released from `theta0 = 1.0` rad should return to its
/// starting angle (to within the step-size tolerance) after one full period,
/// and the run should need nowhere near the step budget to get there.
#[test]
fn period_matches_elliptic_integral_prediction() {
    let theta0 = 1.0_f64;
    let period = pendulum::period(theta0);

    let problem = Problem::<f64, f64>::new(vec![theta0, 0.0], 0.0, period, 14, 1e-16)
        .with_options(Options {
            max_steps: 500,
            dense: false,
            ..Options::default()
        });
    let grid = [0.0, period];
    let (xs, stats, warnings) = integrate_grid(pendulum::rhs::<f64>, &problem, &grid, None).unwrap();

    assert!(warnings.is_empty());
    assert!(stats.number_of_steps <= 500);
    assert!((xs[1][0] - theta0).abs() < 1e-6, "theta(period)={}", xs[1][0]);
    assert!(xs[1][1].abs() < 1e-5, "omega(period)={}", xs[1][1]);
}
