use num_traits::{Float, FromPrimitive, One, ToPrimitive, Zero};
use std::fmt::Debug;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// Coefficient type accepted by [`crate::poly::Poly`] and every engine built
/// on top of it: a field supporting `+`, `-`, `*`, unary negation, division
/// by a positive integer, an infinity norm, and additive/multiplicative
/// identities.
///
/// `f64` is the concrete real implementation; [`crate::mpoly::MPoly`]
/// implements it too so the same generic machinery (`JetSolver`,
/// `Integrator`) runs unmodified in jet-transport mode with `T =
/// MPoly<f64, V, K>`. Time itself is always a plain `f64`-like value (see
/// [`RealScalar`]) — only the *state* coefficients are polymorphic.
pub trait Scalar:
    Clone
    + Copy
    + Debug
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + Sum
    + 'static
{
    /// The infinity norm `‖·‖_∞`. For plain scalars this is just `abs()`;
    /// for [`crate::mpoly::MPoly`] it is the max-abs over all coefficients.
    fn norm_inf(&self) -> f64;

    /// Divide by a positive integer (the `(ord+1)` divisor of the Taylor
    /// recurrence).
    fn div_usize(self, n: usize) -> Self;

    /// Embed a real number as the "constant" element: identity for `f64`,
    /// the zero-perturbation constant polynomial for `MPoly`. Used to seed
    /// the time polynomial from the integrator's real-valued clock.
    fn from_real(x: f64) -> Self;

    fn is_exactly_zero(&self) -> bool {
        self.norm_inf() == 0.0
    }
}

impl Scalar for f64 {
    fn norm_inf(&self) -> f64 {
        self.abs()
    }
    fn div_usize(self, n: usize) -> Self {
        self / (n as f64)
    }
    fn from_real(x: f64) -> Self {
        x
    }
}

/// Bound for scalars that are genuinely real numbers: time, tolerances, box
/// coordinates, and the transcendental right-hand sides of the seed tests
/// (`exp`, `sin`, `cos`, ...) all live in this trait rather than in
/// [`Scalar`], since [`crate::mpoly::MPoly`] implements `Scalar` but is not a
/// real number.
pub trait RealScalar: Scalar + Float + FromPrimitive + ToPrimitive + PartialOrd {}
impl<T: Scalar + Float + FromPrimitive + ToPrimitive + PartialOrd> RealScalar for T {}
