use crate::integrator::Problem;
use crate::poly::Poly;
use crate::scalar::RealScalar;

/// The simple pendulum `theta'' = -sin(theta)`, written as the first-order
/// pair `theta' = omega`, `omega' = -sin(theta)`, released from rest at an
/// amplitude large enough that the period visibly departs from the
/// small-angle limit `2*pi`.
pub fn problem() -> Problem<f64, f64> {
    Problem::new(vec![1.0, 0.0], 0.0, 10.0, 14, 1e-16)
}

pub fn rhs<T: RealScalar>(x: &[Poly<T>], _t: &Poly<T>, _p: &[T], dx: &mut [Poly<T>]) {
    let (sin_theta, _cos_theta) = x[0].sin_cos();
    dx[0] = x[1].clone();
    dx[1] = -&sin_theta;
}

/// The exact period via the complete elliptic integral of the first kind,
/// `T = 4 K(sin(theta0 / 2))`, evaluated by the arithmetic-geometric mean.
pub fn period(theta0: f64) -> f64 {
    let k = (theta0 / 2.0).sin();
    let mut a = 1.0_f64;
    let mut b = (1.0 - k * k).sqrt();
    for _ in 0..20 {
        let a_next = (a + b) / 2.0;
        let b_next = (a * b).sqrt();
        a = a_next;
        b = b_next;
    }
    2.0 * std::f64::consts::PI / a
}
