use crate::mpoly::MPoly;
use crate::poly::Poly;
use crate::scalar::RealScalar;

/// Planar rotation `dx0/dt = -x1`, `dx1/dt = x0`, integrable in closed form.
/// Exercises jet-transport stepping and box splitting without truncation
/// error ever genuinely accumulating on its own.
pub fn rhs<T: RealScalar, const V: usize, const K: usize>(
    x: &[Poly<MPoly<T, V, K>>],
    _t: &Poly<MPoly<T, V, K>>,
    _p: &[MPoly<T, V, K>],
    dx: &mut [Poly<MPoly<T, V, K>>],
) {
    dx[0] = -&x[1];
    dx[1] = x[0].clone();
}
