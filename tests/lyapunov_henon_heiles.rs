use taylor_ode::lyapunov::lyapunov_ad;
use taylor_ode::test_models::henon_heiles::{energy, initial_state, HenonHeiles};
use taylor_ode::Problem;

/// At this chaotic-regime energy the leading exponent should be clearly
/// positive but small in magnitude over the sampled horizon, and the
/// spectrum of a Hamiltonian flow is volume-preserving, so the exponents
/// should sum to (near) zero at every renormalization point.
#[test]
fn spectrum_is_volume_preserving_and_weakly_chaotic() {
    let x0 = initial_state();
    assert!((energy(&x0) - 0.125).abs() < 1e-12, "H={}", energy(&x0));

    let problem = Problem::<f64, f64>::new(x0, 0.0, 2000.0, 12, 1e-13);
    let out = lyapunov_ad(HenonHeiles, &problem, None).unwrap();

    let last = out.lyapunov_exponents.last().unwrap();
    assert_eq!(last.len(), 4);
    assert!(last[0].abs() < 0.1, "lambda1={}", last[0]);

    let sum: f64 = last.iter().sum();
    assert!(sum.abs() < 1e-6, "sum of exponents={sum}");
}
