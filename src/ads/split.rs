use crate::mpoly::MPoly;
use crate::scalar::Scalar;

/// Fits `y ~= A * exp(B * k)` to the nonzero `(k, y_k)` pairs by Gauss-Newton
/// least squares, starting from the secant slope through the first and last
/// nonzero points. A handful of iterations is enough: the fit only has to be
/// good enough to extrapolate one order ahead, not to converge to machine
/// precision.
///
/// Returns `(A, B)`. Zero or one nonzero samples make the fit
/// underdetermined; those cases fall back to `(0, 0)` and `(y, 0)`
/// respectively (a flat extrapolation of the single known value).
fn fit_exponential(ys: &[f64]) -> (f64, f64) {
    let points: Vec<(f64, f64)> = ys
        .iter()
        .enumerate()
        .filter(|&(_, &y)| y > 0.0)
        .map(|(k, &y)| (k as f64, y))
        .collect();

    match points.len() {
        0 => return (0.0, 0.0),
        1 => return (points[0].1, 0.0),
        _ => {}
    }

    let (x0, y0) = points[0];
    let (x1, y1) = points[points.len() - 1];
    let mut b = if (x1 - x0).abs() > 1e-12 {
        (y1.ln() - y0.ln()) / (x1 - x0)
    } else {
        0.0
    };
    let mut a = y0 / (b * x0).exp();

    for _ in 0..25 {
        let mut jtj = [[0.0_f64; 2]; 2];
        let mut jtr = [0.0_f64; 2];
        for &(x, y) in &points {
            let e = (b * x).exp();
            let pred = a * e;
            let r = y - pred;
            let d_da = -e;
            let d_db = -x * a * e;
            jtj[0][0] += d_da * d_da;
            jtj[0][1] += d_da * d_db;
            jtj[1][0] += d_db * d_da;
            jtj[1][1] += d_db * d_db;
            jtr[0] += d_da * r;
            jtr[1] += d_db * r;
        }
        let det = jtj[0][0] * jtj[1][1] - jtj[0][1] * jtj[1][0];
        if det.abs() < 1e-18 {
            break;
        }
        let step_a = (jtr[0] * jtj[1][1] - jtr[1] * jtj[0][1]) / det;
        let step_b = (jtj[0][0] * jtr[1] - jtj[1][0] * jtr[0]) / det;
        a -= step_a;
        b -= step_b;
        if step_a.abs() < 1e-14 && step_b.abs() < 1e-14 {
            break;
        }
    }
    (a, b)
}

/// Predicts `y_{K+1}` from the fitted `y ~= A exp(Bk)` over `y[0..=K]`.
fn predict_next(ys: &[f64]) -> f64 {
    let (a, b) = fit_exponential(ys);
    a * (b * ys.len() as f64).exp()
}

/// The per-component estimator: exp-fits the per-order 1-norms
/// `degree_one_norm(0..=K)` and predicts the order-`K+1` value.
pub fn predicted_component_norm<T: Scalar, const V: usize, const K: usize>(
    p: &MPoly<T, V, K>,
) -> f64 {
    let ys: Vec<f64> = (0..=K).map(|k| p.degree_one_norm(k)).collect();
    predict_next(&ys)
}

/// The per-variable estimator `M_v`, summed across state components: for
/// each `v`, exp-fits `variable_degree_weighted_norm(v, 0..=K)` per
/// component and predicts order `K+1`, then sums over components.
pub fn predicted_variable_norms<T: Scalar, const V: usize, const K: usize>(
    components: &[MPoly<T, V, K>],
) -> [f64; V] {
    let mut totals = [0.0_f64; V];
    for p in components {
        for (v, total) in totals.iter_mut().enumerate() {
            let ys: Vec<f64> = (0..=K).map(|k| p.variable_degree_weighted_norm(v, k)).collect();
            *total += predict_next(&ys);
        }
    }
    totals
}

/// Decides whether a leaf should split this iteration and, if so, along
/// which axis. Triggers when any component's predicted per-order-1-norm
/// exceeds `stol`; the axis is the variable with the largest summed
/// predicted norm across components.
pub fn decide_split<T: Scalar, const V: usize, const K: usize>(
    components: &[MPoly<T, V, K>],
    stol: f64,
) -> Option<usize> {
    let triggered = components
        .iter()
        .any(|p| predicted_component_norm(p) > stol);
    if !triggered {
        return None;
    }
    let totals = predicted_variable_norms(components);
    totals
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(axis, _)| axis)
}
