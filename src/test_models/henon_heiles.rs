use crate::lyapunov::GenericOdeRhs;
use crate::poly::Poly;
use crate::scalar::Scalar;

/// The Henon-Heiles Hamiltonian `H = (px^2 + py^2 + x^2 + y^2)/2 + x^2 y -
/// y^3/3`, state ordered `[x, y, px, py]`. A standard testbed for chaotic
/// dynamics once the energy clears the escape threshold (`H > 1/6`).
pub struct HenonHeiles;

impl GenericOdeRhs for HenonHeiles {
    fn eval<S: Scalar>(&mut self, x: &[Poly<S>], _t: &Poly<S>, _p: &[S], dx: &mut [Poly<S>]) {
        let qx = &x[0];
        let qy = &x[1];
        let px = &x[2];
        let py = &x[3];
        let two = S::one() + S::one();

        dx[0] = px.clone();
        dx[1] = py.clone();
        dx[2] = &(-qx) - &(&(qx * qy) * two);
        dx[3] = &(&(-qy) - &(qx * qx)) + &(qy * qy);
    }
}

/// The seed test's energy-0.125 initial condition: `qx = py = 0`, `qy = 0.2`,
/// and `px` solved from `H(q, p) = 0.125` exactly
/// (`px^2 = 2*(H + qy^3/3) - qy^2`).
pub fn initial_state() -> Vec<f64> {
    let qy = 0.2_f64;
    let target_energy = 0.125_f64;
    let px = (2.0 * (target_energy + qy * qy * qy / 3.0) - qy * qy).sqrt();
    vec![0.0, qy, px, 0.0]
}

pub fn energy(q: &[f64]) -> f64 {
    let (x, y, px, py) = (q[0], q[1], q[2], q[3]);
    0.5 * (px * px + py * py + x * x + y * y) + x * x * y - y * y * y / 3.0
}
