use std::ops::{Add, AddAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::scalar::{RealScalar, Scalar};

/// A truncated univariate polynomial in one variable (time), fixed degree
/// `N`, coefficients `c_0..c_N` of type `T`.
///
/// Degree is immutable per instance and every arithmetic operation truncates
/// the result back to `N`. Coefficients `coeffs[ord+1..]` are expected to sit
/// at `T::zero()` until the recursion in `crate::jet` fills them in order by
/// order; because multiplication truncated at `N` only mixes terms whose
/// indices sum to at most the output index, a zero tail behaves exactly like
/// a view truncated to `ord+1` coefficients would, so `Poly` gets away
/// without a separate view type (see DESIGN.md).
#[derive(Debug, Clone, PartialEq)]
pub struct Poly<T: Scalar> {
    coeffs: Vec<T>,
}

impl<T: Scalar> Poly<T> {
    /// A polynomial of degree `n` with constant term `c` and all higher
    /// coefficients zero.
    pub fn from_constant(c: T, n: usize) -> Self {
        let mut coeffs = vec![T::zero(); n + 1];
        coeffs[0] = c;
        Self { coeffs }
    }

    /// The identically-zero polynomial of degree `n`.
    pub fn zero(n: usize) -> Self {
        Self {
            coeffs: vec![T::zero(); n + 1],
        }
    }

    /// `t[0] = t_current, t[1] = 1`, the time polynomial fed to `f`.
    pub fn time(t_current: T, n: usize) -> Self {
        let mut p = Self::zero(n);
        p.coeffs[0] = t_current;
        if n >= 1 {
            p.coeffs[1] = T::one();
        }
        p
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    pub fn coeffs(&self) -> &[T] {
        &self.coeffs
    }

    pub fn coeffs_mut(&mut self) -> &mut [T] {
        &mut self.coeffs
    }

    /// Read the constant term (the current state value).
    pub fn constant(&self) -> T {
        self.coeffs[0]
    }

    /// Overwrite the constant term, e.g. after advancing `x[j][0] ←
    /// evaluate(state[j], δt)`.
    pub fn set_constant(&mut self, c: T) {
        self.coeffs[0] = c;
    }

    /// Zero every coefficient above the constant term, resetting the
    /// derivative scratch for the next step.
    pub fn reset_derivatives(&mut self) {
        for c in self.coeffs[1..].iter_mut() {
            *c = T::zero();
        }
    }

    /// Horner evaluation at a scalar offset `dt`.
    pub fn eval(&self, dt: T) -> T {
        let mut acc = T::zero();
        for c in self.coeffs.iter().rev() {
            acc = acc * dt + *c;
        }
        acc
    }

    /// `‖c_k‖_∞` for the k-th coefficient, or `0.0` out of range.
    pub fn coeff_norm(&self, k: usize) -> f64 {
        self.coeffs.get(k).map(|c| c.norm_inf()).unwrap_or(0.0)
    }

    fn binop_truncated(&self, rhs: &Self, f: impl Fn(T, T) -> T) -> Self {
        debug_assert_eq!(self.degree(), rhs.degree());
        let coeffs = self
            .coeffs
            .iter()
            .zip(rhs.coeffs.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Self { coeffs }
    }
}

impl<T: Scalar> Index<usize> for Poly<T> {
    type Output = T;
    fn index(&self, k: usize) -> &T {
        &self.coeffs[k]
    }
}

impl<T: Scalar> IndexMut<usize> for Poly<T> {
    fn index_mut(&mut self, k: usize) -> &mut T {
        &mut self.coeffs[k]
    }
}

impl<T: Scalar> Add for &Poly<T> {
    type Output = Poly<T>;
    fn add(self, rhs: &Poly<T>) -> Poly<T> {
        self.binop_truncated(rhs, |a, b| a + b)
    }
}

impl<T: Scalar> Sub for &Poly<T> {
    type Output = Poly<T>;
    fn sub(self, rhs: &Poly<T>) -> Poly<T> {
        self.binop_truncated(rhs, |a, b| a - b)
    }
}

impl<T: Scalar> Neg for &Poly<T> {
    type Output = Poly<T>;
    fn neg(self) -> Poly<T> {
        Poly {
            coeffs: self.coeffs.iter().map(|&c| -c).collect(),
        }
    }
}

impl<T: Scalar> AddAssign<&Poly<T>> for Poly<T> {
    fn add_assign(&mut self, rhs: &Poly<T>) {
        for (a, &b) in self.coeffs.iter_mut().zip(rhs.coeffs.iter()) {
            *a += b;
        }
    }
}

impl<T: Scalar> SubAssign<&Poly<T>> for Poly<T> {
    fn sub_assign(&mut self, rhs: &Poly<T>) {
        for (a, &b) in self.coeffs.iter_mut().zip(rhs.coeffs.iter()) {
            *a -= b;
        }
    }
}

/// Cauchy product truncated at `N` — the one operation that genuinely mixes
/// coefficients, so it gets its own `Mul` impl rather than `binop_truncated`.
impl<T: Scalar> Mul for &Poly<T> {
    type Output = Poly<T>;
    fn mul(self, rhs: &Poly<T>) -> Poly<T> {
        debug_assert_eq!(self.degree(), rhs.degree());
        let n = self.degree();
        let mut coeffs = vec![T::zero(); n + 1];
        for k in 0..=n {
            let mut acc = T::zero();
            for i in 0..=k {
                acc += self.coeffs[i] * rhs.coeffs[k - i];
            }
            coeffs[k] = acc;
        }
        Poly { coeffs }
    }
}

impl<T: Scalar> Mul<T> for &Poly<T> {
    type Output = Poly<T>;
    fn mul(self, rhs: T) -> Poly<T> {
        Poly {
            coeffs: self.coeffs.iter().map(|&c| c * rhs).collect(),
        }
    }
}

impl<T: Scalar> MulAssign<T> for Poly<T> {
    fn mul_assign(&mut self, rhs: T) {
        for c in self.coeffs.iter_mut() {
            *c *= rhs;
        }
    }
}

/// Elementary transcendental functions of a Taylor series, computed via the
/// classical coupled recurrences (Moore 1966; see e.g. TaylorSeries.jl):
/// writing `x` for the argument series, `e = exp(x)` satisfies `e' = x'
/// e`, so `k·e_k = Σ_{i=1}^{k} i·x_i·e_{k-i}`; `s = sin(x)`, `c = cos(x)`
/// satisfy the coupled pair `s' = x'c`, `c' = -x's`.
impl<T: RealScalar> Poly<T> {
    pub fn exp(&self) -> Poly<T> {
        let n = self.degree();
        let mut e = vec![T::zero(); n + 1];
        e[0] = self.coeffs[0].exp();
        for k in 1..=n {
            let mut acc = T::zero();
            for i in 1..=k {
                acc = acc + self.coeffs[i] * e[k - i] * T::from_usize(i).unwrap();
            }
            e[k] = acc / T::from_usize(k).unwrap();
        }
        Poly { coeffs: e }
    }

    /// Returns `(sin(self), cos(self))` computed together, since each needs
    /// the other's lower-order coefficients.
    pub fn sin_cos(&self) -> (Poly<T>, Poly<T>) {
        let n = self.degree();
        let mut s = vec![T::zero(); n + 1];
        let mut c = vec![T::zero(); n + 1];
        s[0] = self.coeffs[0].sin();
        c[0] = self.coeffs[0].cos();
        for k in 1..=n {
            let mut acc_s = T::zero();
            let mut acc_c = T::zero();
            for i in 1..=k {
                let i_x = self.coeffs[i] * T::from_usize(i).unwrap();
                acc_s = acc_s + i_x * c[k - i];
                acc_c = acc_c - i_x * s[k - i];
            }
            s[k] = acc_s / T::from_usize(k).unwrap();
            c[k] = acc_c / T::from_usize(k).unwrap();
        }
        (Poly { coeffs: s }, Poly { coeffs: c })
    }
}
