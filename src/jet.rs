use crate::poly::Poly;
use crate::scalar::Scalar;

/// A specialized, externally-generated coefficient routine for one
/// particular right-hand side, keyed by the caller's `f`. When present it
/// fills every coefficient `1..=N` in one pass instead of the generic
/// order-by-order recursion; [`JetSolver`] probes it once at setup and falls
/// back transparently on any failure.
pub trait ParsedOde<T: Scalar> {
    /// Attempt to fill `state[j].coeffs[1..=N]` directly. `false` means the
    /// routine is unusable for this state/time/parameter combination; the
    /// caller must re-run the generic recursion and should not call this
    /// again for the remainder of the run.
    fn try_fill(&mut self, state: &mut [Poly<T>], t0: T, p: &[T]) -> bool;
}

/// Owns the scratch buffer used by the generic Taylor recursion and tracks
/// whether a [`ParsedOde`] routine has failed and been abandoned for the
/// run. One instance per solver (or per ADS leaf); never shared or aliased.
pub struct JetSolver<T: Scalar> {
    dx: Vec<Poly<T>>,
    parsed_failed: bool,
}

impl<T: Scalar> JetSolver<T> {
    pub fn new(dim: usize, order: usize) -> Self {
        Self {
            dx: (0..dim).map(|_| Poly::zero(order)).collect(),
            parsed_failed: false,
        }
    }

    pub fn parsed_failed(&self) -> bool {
        self.parsed_failed
    }

    /// Fills `state[j].coeffs[1..=N]` via the classical recurrence: for
    /// `ord = 0..N-1`, evaluate `f!` on `state` (whose coefficients above
    /// `ord` are still zero, making the result causal up to index `ord`) and
    /// assign `state[j][ord+1] <- dx[j][ord] / (ord+1)`.
    pub fn step_vector<F>(&mut self, state: &mut [Poly<T>], t: &Poly<T>, p: &[T], mut f: F)
    where
        F: FnMut(&[Poly<T>], &Poly<T>, &[T], &mut [Poly<T>]),
    {
        let n = state.first().map(|s| s.degree()).unwrap_or(0);
        for ord in 0..n {
            f(state, t, p, &mut self.dx);
            for (s, d) in state.iter_mut().zip(self.dx.iter()) {
                s.coeffs_mut()[ord + 1] = d.coeffs()[ord].div_usize(ord + 1);
            }
        }
    }

    /// Scalar-state counterpart of [`Self::step_vector`] for `f(x, t, p) ->
    /// dx`.
    pub fn step_scalar<F>(&mut self, state: &mut Poly<T>, t: &Poly<T>, p: &[T], f: F)
    where
        F: Fn(&Poly<T>, &Poly<T>, &[T]) -> Poly<T>,
    {
        let n = state.degree();
        for ord in 0..n {
            self.dx[0] = f(state, t, p);
            state.coeffs_mut()[ord + 1] = self.dx[0].coeffs()[ord].div_usize(ord + 1);
        }
    }

    /// Probe the parsed routine once. Returns `true` if it filled the state
    /// successfully; on `false`, the caller must use [`Self::step_vector`]
    /// or [`Self::step_scalar`] instead, and this solver records that the
    /// parsed path is no longer trustworthy for the rest of the run.
    pub fn try_parsed(
        &mut self,
        parsed: &mut dyn ParsedOde<T>,
        state: &mut [Poly<T>],
        t0: T,
        p: &[T],
    ) -> bool {
        let ok = parsed.try_fill(state, t0, p);
        if !ok {
            self.parsed_failed = true;
        }
        ok
    }
}
