use std::collections::HashMap;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use std::rc::Rc;

use crate::scalar::Scalar;

/// A truncated multivariate polynomial in `V` variables of total degree `K`,
/// the jet-transport representation of a perturbed state component. `V` and
/// `K` are fixed per solver instance, exactly like `D`/`N` are fixed for
/// [`crate::poly::Poly`], so they are carried as const generics rather than
/// runtime fields — this is what lets `MPoly` implement [`Scalar`] (whose
/// `zero()`/`one()` take no arguments).
///
/// Monomials are stored densely as `(exponent vector, coefficient)` pairs
/// for every exponent tuple with `sum(exponents) <= K`; the exponent list is
/// generated once per `(V, K)` and cached in a thread-local so repeated
/// construction (one `MPoly` per Taylor coefficient, per state component)
/// doesn't re-derive it.
#[derive(Debug, Clone)]
pub struct MPoly<T: Scalar, const V: usize, const K: usize> {
    shape: Rc<Shape>,
    coeffs: Vec<T>,
}

#[derive(Debug)]
struct Shape {
    exps: Vec<Vec<u32>>,
    index: HashMap<Vec<u32>, usize>,
}

impl Shape {
    fn new(v: usize, k: usize) -> Self {
        let mut exps = Vec::new();
        let mut current = vec![0u32; v];
        generate(&mut exps, &mut current, 0, v, k as u32);
        exps.sort_by(|a, b| {
            let da: u32 = a.iter().sum();
            let db: u32 = b.iter().sum();
            da.cmp(&db).then_with(|| a.cmp(b))
        });
        let index = exps
            .iter()
            .enumerate()
            .map(|(i, e)| (e.clone(), i))
            .collect();
        Self { exps, index }
    }
}

fn generate(out: &mut Vec<Vec<u32>>, current: &mut Vec<u32>, pos: usize, v: usize, remaining: u32) {
    if pos == v {
        out.push(current.clone());
        return;
    }
    for e in 0..=remaining {
        current[pos] = e;
        generate(out, current, pos + 1, v, remaining - e);
    }
    current[pos] = 0;
}

thread_local! {
    static SHAPES: std::cell::RefCell<HashMap<(usize, usize), Rc<Shape>>> =
        std::cell::RefCell::new(HashMap::new());
}

fn shape_for(v: usize, k: usize) -> Rc<Shape> {
    SHAPES.with(|cache| {
        cache
            .borrow_mut()
            .entry((v, k))
            .or_insert_with(|| Rc::new(Shape::new(v, k)))
            .clone()
    })
}

impl<T: Scalar, const V: usize, const K: usize> MPoly<T, V, K> {
    pub fn zero() -> Self {
        let shape = shape_for(V, K);
        let n = shape.exps.len();
        Self {
            shape,
            coeffs: vec![T::zero(); n],
        }
    }

    pub fn from_constant(c: T) -> Self {
        let mut p = Self::zero();
        p.coeffs[0] = c;
        p
    }

    /// The degree-1 unit perturbation for variable `var`: `base + ε_var`.
    /// Seeds the Lyapunov automatic-differentiation Jacobian path.
    pub fn unit_perturbation(base: T, var: usize) -> Self {
        let mut p = Self::from_constant(base);
        let mut exp = vec![0u32; V];
        exp[var] = 1;
        if let Some(&idx) = p.shape.index.get(&exp) {
            p.coeffs[idx] = T::one();
        }
        p
    }

    pub fn nvars(&self) -> usize {
        V
    }

    pub fn max_degree(&self) -> usize {
        K
    }

    pub fn constant(&self) -> T {
        self.coeffs[0]
    }

    /// Coefficient of the pure power monomial `x_var^deg` (all other
    /// exponents zero). Used by the split-criterion per-variable estimator.
    pub fn pure_power_coeff(&self, var: usize, deg: usize) -> T {
        let mut exp = vec![0u32; V];
        exp[var] = deg as u32;
        match self.shape.index.get(&exp) {
            Some(&idx) => self.coeffs[idx],
            None => T::zero(),
        }
    }

    /// `Σ |coeff|` over monomials of total degree exactly `deg` — the
    /// per-order 1-norm used by the split criterion's component-level
    /// estimator.
    pub fn degree_one_norm(&self, deg: usize) -> f64 {
        self.shape
            .exps
            .iter()
            .zip(self.coeffs.iter())
            .filter(|(e, _)| e.iter().sum::<u32>() as usize == deg)
            .map(|(_, c)| c.norm_inf())
            .sum()
    }

    /// Weighted per-order contribution of variable `var` at total degree
    /// `deg`: `Σ e_var · |coeff|` over monomials of total degree `deg`. Feeds
    /// the split-criterion's per-variable growth estimate `y_v[k]`; a
    /// variable with no influence at order `deg` contributes zero regardless
    /// of how large the other coefficients at that order are.
    pub fn variable_degree_weighted_norm(&self, var: usize, deg: usize) -> f64 {
        self.shape
            .exps
            .iter()
            .zip(self.coeffs.iter())
            .filter(|(e, _)| e.iter().sum::<u32>() as usize == deg)
            .map(|(e, c)| e[var] as f64 * c.norm_inf())
            .sum()
    }

    /// Evaluate at a point (one value per variable).
    pub fn eval(&self, point: &[T; V]) -> T {
        let mut total = T::zero();
        for (exp, &c) in self.shape.exps.iter().zip(self.coeffs.iter()) {
            if c.is_exactly_zero() {
                continue;
            }
            let mut term = c;
            for (var, &e) in exp.iter().enumerate() {
                for _ in 0..e {
                    term = term * point[var];
                }
            }
            total += term;
        }
        total
    }

    /// Substitute `x_var ← scale * x_var + shift`, re-expanding so the
    /// result is again a degree-`K` polynomial in the same `V` variables.
    /// This is the bisection re-parameterization for domain splitting:
    /// mapping the canonical box `[-1, 1]` onto one half of the split box.
    pub fn substitute_affine(&self, var: usize, scale: T, shift: T) -> Self {
        // Precompute (scale*x_var + shift)^e for e = 0..=K as polynomials in
        // x_var alone (binomial expansion), then substitute term by term.
        let mut powers: Vec<Vec<T>> = vec![vec![T::zero(); K + 1]; K + 1];
        powers[0][0] = T::one();
        for e in 1..=K {
            let prev = powers[e - 1].clone();
            let mut cur = vec![T::zero(); K + 1];
            for (d, &coeff) in prev.iter().enumerate() {
                if coeff.is_exactly_zero() {
                    continue;
                }
                cur[d] += coeff * shift;
                if d + 1 <= K {
                    cur[d + 1] += coeff * scale;
                }
            }
            powers[e] = cur;
        }

        let mut out = Self::zero();
        for (exp, &c) in self.shape.exps.iter().zip(self.coeffs.iter()) {
            if c.is_exactly_zero() {
                continue;
            }
            let e_var = exp[var] as usize;
            for (d, &pcoeff) in powers[e_var].iter().enumerate() {
                if pcoeff.is_exactly_zero() {
                    continue;
                }
                let mut new_exp = exp.clone();
                new_exp[var] = d as u32;
                let total_deg: u32 = new_exp.iter().sum();
                if total_deg as usize > K {
                    continue;
                }
                if let Some(&idx) = out.shape.index.get(&new_exp) {
                    out.coeffs[idx] += c * pcoeff;
                }
            }
        }
        out
    }

    fn binop(&self, rhs: &Self, f: impl Fn(T, T) -> T) -> Self {
        let coeffs = self
            .coeffs
            .iter()
            .zip(rhs.coeffs.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Self {
            shape: self.shape.clone(),
            coeffs,
        }
    }
}

impl<T: Scalar, const V: usize, const K: usize> Add for &MPoly<T, V, K> {
    type Output = MPoly<T, V, K>;
    fn add(self, rhs: &MPoly<T, V, K>) -> MPoly<T, V, K> {
        self.binop(rhs, |a, b| a + b)
    }
}

impl<T: Scalar, const V: usize, const K: usize> Sub for &MPoly<T, V, K> {
    type Output = MPoly<T, V, K>;
    fn sub(self, rhs: &MPoly<T, V, K>) -> MPoly<T, V, K> {
        self.binop(rhs, |a, b| a - b)
    }
}

impl<T: Scalar, const V: usize, const K: usize> Neg for &MPoly<T, V, K> {
    type Output = MPoly<T, V, K>;
    fn neg(self) -> MPoly<T, V, K> {
        MPoly {
            shape: self.shape.clone(),
            coeffs: self.coeffs.iter().map(|&c| -c).collect(),
        }
    }
}

impl<T: Scalar, const V: usize, const K: usize> Mul for &MPoly<T, V, K> {
    type Output = MPoly<T, V, K>;
    fn mul(self, rhs: &MPoly<T, V, K>) -> MPoly<T, V, K> {
        let mut out = MPoly::zero();
        for (ea, &ca) in self.shape.exps.iter().zip(self.coeffs.iter()) {
            if ca.is_exactly_zero() {
                continue;
            }
            for (eb, &cb) in rhs.shape.exps.iter().zip(rhs.coeffs.iter()) {
                if cb.is_exactly_zero() {
                    continue;
                }
                let total: u32 = ea.iter().zip(eb.iter()).map(|(&x, &y)| x + y).sum();
                if total as usize > K {
                    continue;
                }
                let combined: Vec<u32> = ea.iter().zip(eb.iter()).map(|(&x, &y)| x + y).collect();
                if let Some(&idx) = out.shape.index.get(&combined) {
                    out.coeffs[idx] += ca * cb;
                }
            }
        }
        out
    }
}

impl<T: Scalar, const V: usize, const K: usize> Mul<T> for &MPoly<T, V, K> {
    type Output = MPoly<T, V, K>;
    fn mul(self, rhs: T) -> MPoly<T, V, K> {
        MPoly {
            shape: self.shape.clone(),
            coeffs: self.coeffs.iter().map(|&c| c * rhs).collect(),
        }
    }
}

impl<T: Scalar, const V: usize, const K: usize> Add for MPoly<T, V, K> {
    type Output = MPoly<T, V, K>;
    fn add(self, rhs: Self) -> MPoly<T, V, K> {
        (&self).add(&rhs)
    }
}
impl<T: Scalar, const V: usize, const K: usize> Sub for MPoly<T, V, K> {
    type Output = MPoly<T, V, K>;
    fn sub(self, rhs: Self) -> MPoly<T, V, K> {
        (&self).sub(&rhs)
    }
}
impl<T: Scalar, const V: usize, const K: usize> Mul for MPoly<T, V, K> {
    type Output = MPoly<T, V, K>;
    fn mul(self, rhs: Self) -> MPoly<T, V, K> {
        (&self).mul(&rhs)
    }
}
impl<T: Scalar, const V: usize, const K: usize> Neg for MPoly<T, V, K> {
    type Output = MPoly<T, V, K>;
    fn neg(self) -> MPoly<T, V, K> {
        (&self).neg()
    }
}
impl<T: Scalar, const V: usize, const K: usize> AddAssign for MPoly<T, V, K> {
    fn add_assign(&mut self, rhs: Self) {
        for (a, b) in self.coeffs.iter_mut().zip(rhs.coeffs.iter()) {
            *a += *b;
        }
    }
}
impl<T: Scalar, const V: usize, const K: usize> SubAssign for MPoly<T, V, K> {
    fn sub_assign(&mut self, rhs: Self) {
        for (a, b) in self.coeffs.iter_mut().zip(rhs.coeffs.iter()) {
            *a -= *b;
        }
    }
}
impl<T: Scalar, const V: usize, const K: usize> MulAssign for MPoly<T, V, K> {
    fn mul_assign(&mut self, rhs: Self) {
        *self = (&*self).mul(&rhs);
    }
}
impl<T: Scalar, const V: usize, const K: usize> num_traits::Zero for MPoly<T, V, K> {
    fn zero() -> Self {
        MPoly::zero()
    }
    fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|c| c.is_exactly_zero())
    }
}

impl<T: Scalar, const V: usize, const K: usize> num_traits::One for MPoly<T, V, K> {
    fn one() -> Self {
        MPoly::from_constant(T::one())
    }
}

impl<T: Scalar, const V: usize, const K: usize> std::iter::Sum for MPoly<T, V, K> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, x| acc + x)
    }
}

/// `MPoly` is itself a field in the sense `Scalar` needs (closed under the
/// four arithmetic operators, with a norm), so it can stand in for `T` in
/// the generic `Integrator` — this is exactly how jet-transport/ADS is run:
/// the state component type becomes `Poly<MPoly<f64, V, K>>`.
impl<T: Scalar, const V: usize, const K: usize> Scalar for MPoly<T, V, K> {
    fn norm_inf(&self) -> f64 {
        self.coeffs.iter().map(|c| c.norm_inf()).fold(0.0, f64::max)
    }
    fn div_usize(self, n: usize) -> Self {
        MPoly {
            shape: self.shape.clone(),
            coeffs: self.coeffs.iter().map(|&c| c.div_usize(n)).collect(),
        }
    }
    fn from_real(x: f64) -> Self {
        MPoly::from_constant(T::from_real(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_matches_monomial() {
        // p = 2 + 3*x0 + x0*x1, V=2, K=2
        let mut p = MPoly::<f64, 2, 2>::zero();
        p.coeffs[p.shape.index[&vec![0, 0]]] = 2.0;
        p.coeffs[p.shape.index[&vec![1, 0]]] = 3.0;
        p.coeffs[p.shape.index[&vec![1, 1]]] = 1.0;
        // at (2, 5): 2 + 6 + 10 = 18
        assert_eq!(p.eval(&[2.0, 5.0]), 18.0);
    }

    #[test]
    fn mul_truncates_at_total_degree() {
        let mut a = MPoly::<f64, 1, 2>::zero();
        a.coeffs[a.shape.index[&vec![1]]] = 1.0; // x
        let prod = &(&a * &a) * &a; // x^3, truncated away at k=2
        assert!(prod.coeffs.iter().all(|&c| c == 0.0));
    }

    #[test]
    fn substitute_affine_matches_direct_eval() {
        // p = x^2, V=1, K=2. Substitute x <- 2x + 1, evaluate at x=3: should
        // equal p(2*3+1) = p(7) = 49.
        let mut p = MPoly::<f64, 1, 2>::zero();
        p.coeffs[p.shape.index[&vec![2]]] = 1.0;
        let q = p.substitute_affine(0, 2.0, 1.0);
        assert!((q.eval(&[3.0]) - 49.0).abs() < 1e-9);
    }

    #[test]
    fn pure_power_and_degree_norm() {
        let mut p = MPoly::<f64, 2, 2>::zero();
        p.coeffs[p.shape.index[&vec![2, 0]]] = 3.0;
        p.coeffs[p.shape.index[&vec![1, 1]]] = 4.0;
        assert_eq!(p.pure_power_coeff(0, 2), 3.0);
        assert_eq!(p.pure_power_coeff(1, 2), 0.0);
        assert_eq!(p.degree_one_norm(2), 7.0);
    }

    #[test]
    fn unit_perturbation_has_linear_coefficient() {
        let p = MPoly::<f64, 3, 2>::unit_perturbation(1.5, 1);
        assert_eq!(p.constant(), 1.5);
        assert_eq!(p.pure_power_coeff(1, 1), 1.0);
        assert_eq!(p.pure_power_coeff(0, 1), 0.0);
    }
}
