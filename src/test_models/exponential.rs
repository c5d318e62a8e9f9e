use crate::integrator::Problem;
use crate::poly::Poly;
use crate::scalar::Scalar;

/// `dx/dt = x`, `x(0) = 0.5`. Closed form `x(t) = 0.5 e^t`.
pub fn scalar_problem() -> Problem<f64, f64> {
    Problem::new(vec![0.5], 0.0, 1.0, 16, 1e-16)
}

pub fn scalar_rhs<T: Scalar>(x: &[Poly<T>], _t: &Poly<T>, _p: &[T], dx: &mut [Poly<T>]) {
    dx[0] = x[0].clone();
}

/// Eight independent copies of the same scalar exponential, exercising the
/// vector path without any coupling between components.
pub fn vector_problem() -> Problem<f64, f64> {
    Problem::new(vec![0.5; 8], 0.0, 1.0, 16, 1e-16)
}

pub fn vector_rhs<T: Scalar>(x: &[Poly<T>], _t: &Poly<T>, _p: &[T], dx: &mut [Poly<T>]) {
    for (dxi, xi) in dx.iter_mut().zip(x.iter()) {
        *dxi = xi.clone();
    }
}
