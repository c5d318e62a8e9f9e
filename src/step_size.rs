use crate::poly::Poly;
use crate::scalar::{RealScalar, Scalar};

/// Chooses a step size from the top coefficients of a state's Taylor
/// polynomials against an absolute tolerance.
///
/// `h = min over k in {N-1, N} of (abstol / ||c_k||_inf)^(1/k)`, skipping any
/// `k` whose coefficient is exactly zero. `+inf` means both were zero.
pub fn primary<T: Scalar, R: RealScalar>(poly: &Poly<T>, abstol: R) -> R {
    let n = poly.degree();
    if n < 1 {
        return R::infinity();
    }
    let mut h = R::infinity();
    for &k in &[n - 1, n] {
        if k == 0 {
            continue;
        }
        let norm = poly.coeff_norm(k);
        if norm == 0.0 {
            continue;
        }
        let ratio = abstol / R::from_f64(norm).unwrap();
        let candidate = ratio.powf(R::one() / R::from_usize(k).unwrap());
        if candidate < h {
            h = candidate;
        }
    }
    h
}

/// The Jorba-Zou fallback rule, used only when [`primary`] returns infinity
/// for every component: `h' = max over k in {1..N-2} of (1/||c_k||_inf)^(1/k)`,
/// omitting zero coefficients. Independent of the tolerance; salvages a
/// finite step from lower-order information.
pub fn fallback<T: Scalar, R: RealScalar>(poly: &Poly<T>) -> R {
    let n = poly.degree();
    if n < 3 {
        return R::infinity();
    }
    let mut h = R::zero();
    let mut any = false;
    for k in 1..=(n - 2) {
        let norm = poly.coeff_norm(k);
        if norm == 0.0 {
            continue;
        }
        let candidate = (R::one() / R::from_f64(norm).unwrap()).powf(R::one() / R::from_usize(k).unwrap());
        if candidate > h {
            h = candidate;
        }
        any = true;
    }
    if any {
        h
    } else {
        R::infinity()
    }
}

/// Step size for one component, applying the fallback only where the primary
/// rule is non-finite.
pub fn component_step<T: Scalar, R: RealScalar>(poly: &Poly<T>, abstol: R) -> R {
    let h = primary(poly, abstol);
    if h.is_finite() {
        h
    } else {
        fallback(poly)
    }
}

/// Step size for a vector state: the minimum over components.
pub fn vector_step<T: Scalar, R: RealScalar>(polys: &[Poly<T>], abstol: R) -> R {
    polys
        .iter()
        .map(|p| component_step(p, abstol))
        .fold(R::infinity(), |acc, h| if h < acc { h } else { acc })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_polynomial_gives_infinite_step() {
        let p = Poly::<f64>::zero(5);
        assert_eq!(primary(&p, 1e-10), f64::INFINITY);
        assert_eq!(component_step(&p, 1e-10), f64::INFINITY);
    }

    #[test]
    fn primary_rule_matches_closed_form() {
        let mut p = Poly::<f64>::zero(4);
        p.coeffs_mut()[3] = 2.0;
        p.coeffs_mut()[4] = 4.0;
        let abstol = 1e-6_f64;
        let h = primary(&p, abstol);
        let h3 = (abstol / 2.0_f64).powf(1.0 / 3.0);
        let h4 = (abstol / 4.0_f64).powf(1.0 / 4.0);
        assert_eq!(h, h3.min(h4));
    }

    #[test]
    fn fallback_used_when_top_coefficients_are_zero() {
        let mut p = Poly::<f64>::zero(5);
        p.coeffs_mut()[2] = 3.0;
        // top two coefficients (4, 5) are zero, so primary is infinite
        assert_eq!(primary(&p, 1e-10), f64::INFINITY);
        let h = component_step(&p, 1e-10);
        assert!(h.is_finite());
        assert_eq!(h, (1.0_f64 / 3.0).powf(1.0 / 2.0));
    }

    #[test]
    fn vector_step_is_minimum_over_components() {
        let mut a = Poly::<f64>::zero(4);
        a.coeffs_mut()[4] = 1.0;
        let mut b = Poly::<f64>::zero(4);
        b.coeffs_mut()[4] = 16.0;
        let abstol = 1e-4_f64;
        let ha = component_step(&a, abstol);
        let hb = component_step(&b, abstol);
        assert_eq!(vector_step(&[a, b], abstol), ha.min(hb));
    }
}
