pub mod gram_schmidt;

use nalgebra::{DMatrix, RealField};
use num_traits::Float;

use crate::errors::{Result, TaylorError, TaylorWarning};
use crate::integrator::{Problem, Statistics};
use crate::jet::JetSolver;
use crate::mpoly::MPoly;
use crate::poly::Poly;
use crate::scalar::{RealScalar, Scalar};

/// Trajectory plus the accumulated Lyapunov spectrum at every accepted step.
#[derive(Debug, Clone)]
pub struct LyapOutput<T: RealScalar> {
    pub ts: Vec<T>,
    pub xs: Vec<Vec<T>>,
    /// `lyapunov_exponents[k][i]` is `lambda_i` evaluated at `ts[k]`.
    pub lyapunov_exponents: Vec<Vec<T>>,
    pub statistics: Statistics,
    pub warnings: Vec<TaylorWarning>,
}

/// Right-hand side generic over the coefficient type, required for the
/// automatic-differentiation Jacobian path: the same `f` is run once with
/// `T` and once per state dimension with an internal dual type to read off
/// linear parts, so it cannot be a plain monomorphic closure.
pub trait GenericOdeRhs {
    fn eval<S: Scalar>(&mut self, x: &[Poly<S>], t: &Poly<S>, p: &[S], dx: &mut [Poly<S>]);
}

/// A user-supplied Jacobian, evaluated once per step against the current
/// Taylor-expanded state: `J_{ac}` as a degree-N polynomial in time.
pub trait JacobianFn<T: Scalar> {
    fn eval(&mut self, x: &[Poly<T>], t: &Poly<T>, p: &[T]) -> Vec<Vec<Poly<T>>>;
}

impl<T, F> JacobianFn<T> for F
where
    T: Scalar,
    F: FnMut(&[Poly<T>], &Poly<T>, &[T]) -> Vec<Vec<Poly<T>>>,
{
    fn eval(&mut self, x: &[Poly<T>], t: &Poly<T>, p: &[T]) -> Vec<Vec<Poly<T>>> {
        (self)(x, t, p)
    }
}

fn embed_constant<T: Scalar>(p: &Poly<T>) -> Poly<MPoly<T, 1, 1>> {
    let mut out = Poly::zero(p.degree());
    for k in 0..=p.degree() {
        out.coeffs_mut()[k] = MPoly::from_constant(p.coeffs()[k]);
    }
    out
}

fn embed_perturbed<T: Scalar>(p: &Poly<T>) -> Poly<MPoly<T, 1, 1>> {
    let mut out = Poly::zero(p.degree());
    out.coeffs_mut()[0] = MPoly::unit_perturbation(p.coeffs()[0], 0);
    for k in 1..=p.degree() {
        out.coeffs_mut()[k] = MPoly::from_constant(p.coeffs()[k]);
    }
    out
}

/// Builds the time-polynomial Jacobian one column at a time: perturb state
/// dimension `b` with a unit first-order perturbation, evaluate `f` in the
/// lifted coefficient type `MPoly<T, 1, 1>`, and read the linear part of
/// component `a`'s result as `J_{ab}`.
///
/// `MPoly`'s perturbation count is a compile-time const generic, while `D`
/// is a runtime solver parameter, so a single batched `MPoly<T, D, 1>` call
/// (as a literal reading of the automatic-differentiation contract would
/// suggest) is not expressible; differentiating one column per call is
/// mathematically equivalent and still `O(D)` evaluations of `f`.
fn ad_jacobian<T, F>(
    f: &mut F,
    state: &[Poly<T>],
    t: &Poly<T>,
    p: &[T],
    order: usize,
) -> Vec<Vec<Poly<T>>>
where
    T: Scalar,
    F: GenericOdeRhs,
{
    let d = state.len();
    let t_lifted = embed_constant(t);
    let p_lifted: Vec<MPoly<T, 1, 1>> = p.iter().map(|&c| MPoly::from_constant(c)).collect();
    let mut jac = vec![vec![Poly::<T>::zero(order); d]; d];

    for b in 0..d {
        let lifted: Vec<Poly<MPoly<T, 1, 1>>> = state
            .iter()
            .enumerate()
            .map(|(i, s)| {
                if i == b {
                    embed_perturbed(s)
                } else {
                    embed_constant(s)
                }
            })
            .collect();
        let mut dx = vec![Poly::<MPoly<T, 1, 1>>::zero(order); d];
        f.eval(&lifted, &t_lifted, &p_lifted, &mut dx);
        for (a, dxa) in dx.iter().enumerate() {
            for k in 0..=order {
                jac[a][b].coeffs_mut()[k] = dxa.coeffs()[k].pure_power_coeff(0, 1);
            }
        }
    }
    jac
}

/// Fills `phi[a][b].coeffs[1..=N]` from the variational recurrence
/// `Phi'_{ab}[ord] = sum_c J_{ac} (x) Phi_{cb}` truncated at `ord`,
/// `Phi_{ab}[ord+1] <- Phi'_{ab}[ord] / (ord+1)`. `scratch` is a
/// preallocated `D*D*D` array of Polys, one entry per `(a, c, b)` triple,
/// reused across steps: entry `(a, c, b)` accumulates order-by-order the
/// truncated product `J_{ac} (x) Phi_{cb}` whose sum over `c` is
/// `Phi'_{ab}`, so the buffer holds the actual per-triple terms the
/// accumulation reads back rather than a write-only side channel.
fn propagate_variational<T: Scalar>(
    jac: &[Vec<Poly<T>>],
    phi: &mut [Vec<Poly<T>>],
    scratch: &mut [Poly<T>],
    order: usize,
) {
    let d = jac.len();
    for ord in 0..order {
        for a in 0..d {
            for b in 0..d {
                let mut acc = T::zero();
                for c in 0..d {
                    let mut term = T::zero();
                    for i in 0..=ord {
                        term += jac[a][c].coeffs()[i] * phi[c][b].coeffs()[ord - i];
                    }
                    let idx = (a * d + c) * d + b;
                    scratch[idx].coeffs_mut()[ord] = term;
                    acc += scratch[idx].coeffs()[ord];
                }
                phi[a][b].coeffs_mut()[ord + 1] = acc.div_usize(ord + 1);
            }
        }
    }
}

fn identity_phi<T: Scalar>(d: usize, order: usize) -> Vec<Vec<Poly<T>>> {
    let mut phi = vec![vec![Poly::<T>::zero(order); d]; d];
    for i in 0..d {
        phi[i][i].coeffs_mut()[0] = T::one();
    }
    phi
}

fn phi_to_matrix<T: RealScalar + RealField>(phi: &[Vec<Poly<T>>]) -> DMatrix<T> {
    let d = phi.len();
    let mut m = DMatrix::<T>::zeros(d, d);
    for a in 0..d {
        for b in 0..d {
            m[(a, b)] = phi[a][b].constant();
        }
    }
    m
}

fn matrix_to_phi<T: Scalar>(m: &DMatrix<T>, order: usize) -> Vec<Vec<Poly<T>>> {
    let d = m.nrows();
    let mut phi = vec![vec![Poly::<T>::zero(order); d]; d];
    for a in 0..d {
        for b in 0..d {
            phi[a][b].set_constant(m[(a, b)]);
        }
    }
    phi
}

struct LyapState<T: Scalar> {
    state: Vec<Poly<T>>,
    phi: Vec<Vec<Poly<T>>>,
    log_sums: Vec<T>,
}

fn run_step<T, R>(
    lyap: &mut LyapState<T>,
    jac: Vec<Vec<Poly<T>>>,
    solver_scratch: &mut [Poly<T>],
    order: usize,
    t_current: R,
    t0: R,
    delta: R,
) -> Vec<T>
where
    T: RealScalar + RealField,
    R: RealScalar,
{
    propagate_variational(&jac, &mut lyap.phi, solver_scratch, order);

    for s in lyap.state.iter_mut() {
        let new_val = s.eval(T::from_real(delta.to_f64().unwrap_or(0.0)));
        s.reset_derivatives();
        s.set_constant(new_val);
    }
    let delta_t = T::from_real(delta.to_f64().unwrap_or(0.0));
    for row in lyap.phi.iter_mut() {
        for p in row.iter_mut() {
            let new_val = p.eval(delta_t);
            p.reset_derivatives();
            p.set_constant(new_val);
        }
    }

    let phi_num = phi_to_matrix(&lyap.phi);
    let (q, r) = gram_schmidt::modified_gram_schmidt(&phi_num);
    let d = lyap.state.len();
    let elapsed = T::from_real((t_current + delta - t0).to_f64().unwrap_or(0.0));
    let mut exponents = Vec::with_capacity(d);
    for i in 0..d {
        lyap.log_sums[i] += Float::ln(r[(i, i)]);
        exponents.push(lyap.log_sums[i] / elapsed);
    }
    lyap.phi = matrix_to_phi(&q, order);
    exponents
}

/// Integrates the joint system of the original ODE plus the variational
/// equation using a user-supplied Jacobian, renormalizing via modified
/// Gram-Schmidt after every accepted step.
pub fn lyapunov_with_jacobian<T, F, J>(
    mut f: F,
    mut jac: J,
    problem: &Problem<T, T>,
) -> Result<LyapOutput<T>>
where
    T: RealScalar + RealField,
    F: crate::integrator::VectorRhs<T>,
    J: JacobianFn<T>,
{
    problem.options.validate()?;
    let d = problem.x0.len();
    let n = problem.order;
    let direction = problem.direction();

    let mut lyap = LyapState {
        state: problem
            .x0
            .iter()
            .map(|&c| Poly::from_constant(c, n))
            .collect(),
        phi: identity_phi(d, n),
        log_sums: vec![T::zero(); d],
    };
    let mut solver = JetSolver::new(d, n);
    let mut scratch = vec![Poly::<T>::zero(n); d * d * d];
    let mut t_current = problem.t0;
    let mut stats = Statistics::default();
    let mut warnings = Vec::new();

    let mut ts = vec![t_current];
    let mut xs = vec![problem.x0.clone()];
    let mut lambdas = vec![vec![T::zero(); d]];

    let mut step_count = 0usize;
    loop {
        if direction * (t_current - problem.t_max) >= T::zero() {
            break;
        }
        let t_poly = Poly::time(t_current, n);
        solver.step_vector(&mut lyap.state, &t_poly, &problem.params, |x, t, p, dx| {
            f.eval(x, t, p, dx)
        });
        stats.number_of_rhs_evals += n;

        let j = jac.eval(&lyap.state, &t_poly, &problem.params);

        let raw = crate::step_size::vector_step(&lyap.state, problem.abstol);
        let remaining = (problem.t_max - t_current) * direction;
        let dt = if raw.is_infinite() || raw > remaining {
            remaining
        } else {
            raw
        };
        let delta = dt * direction;
        if step_count == 0 {
            stats.initial_step_size = dt.to_f64().unwrap_or(0.0);
        }

        let exponents = run_step(&mut lyap, j, &mut scratch, n, t_current, problem.t0, delta);

        t_current = t_current + delta;
        step_count += 1;
        stats.number_of_steps = step_count;
        stats.final_step_size = dt.to_f64().unwrap_or(0.0);

        ts.push(t_current);
        xs.push(lyap.state.iter().map(|s| s.constant()).collect());
        lambdas.push(exponents);

        if step_count > problem.options.max_steps {
            warnings.push(TaylorWarning::StepLimitReached { steps: step_count });
            break;
        }
    }

    Ok(LyapOutput {
        ts,
        xs,
        lyapunov_exponents: lambdas,
        statistics: stats,
        warnings,
    })
}

/// Same as [`lyapunov_with_jacobian`] but derives the Jacobian by
/// automatic differentiation of `f` instead of taking one explicitly.
/// `perturbation_vars`, when the caller's own coefficient type is itself
/// jet-transport-valued (`MPoly<_, V, K>`), must equal `D`; pass `None` for
/// a plain real coefficient type.
pub fn lyapunov_ad<T, F>(
    mut f: F,
    problem: &Problem<T, T>,
    perturbation_vars: Option<usize>,
) -> Result<LyapOutput<T>>
where
    T: RealScalar + RealField,
    F: GenericOdeRhs,
{
    problem.options.validate()?;
    let d = problem.x0.len();
    if let Some(v) = perturbation_vars {
        if v != d {
            return Err(TaylorError::VariablesStateMismatch { v, d });
        }
    }
    let n = problem.order;
    let direction = problem.direction();

    let mut lyap = LyapState {
        state: problem
            .x0
            .iter()
            .map(|&c| Poly::from_constant(c, n))
            .collect(),
        phi: identity_phi(d, n),
        log_sums: vec![T::zero(); d],
    };
    let mut scratch = vec![Poly::<T>::zero(n); d * d * d];
    let mut plain_solver = JetSolver::new(d, n);
    let mut t_current = problem.t0;
    let mut stats = Statistics::default();
    let mut warnings = Vec::new();

    let mut ts = vec![t_current];
    let mut xs = vec![problem.x0.clone()];
    let mut lambdas = vec![vec![T::zero(); d]];

    let mut step_count = 0usize;
    loop {
        if direction * (t_current - problem.t_max) >= T::zero() {
            break;
        }
        let t_poly = Poly::time(t_current, n);

        plain_solver.step_vector(&mut lyap.state, &t_poly, &problem.params, |x, t, p, dx| {
            f.eval(x, t, p, dx)
        });
        stats.number_of_rhs_evals += n;

        let j = ad_jacobian(&mut f, &lyap.state, &t_poly, &problem.params, n);

        let raw = crate::step_size::vector_step(&lyap.state, problem.abstol);
        let remaining = (problem.t_max - t_current) * direction;
        let dt = if raw.is_infinite() || raw > remaining {
            remaining
        } else {
            raw
        };
        let delta = dt * direction;
        if step_count == 0 {
            stats.initial_step_size = dt.to_f64().unwrap_or(0.0);
        }

        let exponents = run_step(&mut lyap, j, &mut scratch, n, t_current, problem.t0, delta);

        t_current = t_current + delta;
        step_count += 1;
        stats.number_of_steps = step_count;
        stats.final_step_size = dt.to_f64().unwrap_or(0.0);

        ts.push(t_current);
        xs.push(lyap.state.iter().map(|s| s.constant()).collect());
        lambdas.push(exponents);

        if step_count > problem.options.max_steps {
            warnings.push(TaylorWarning::StepLimitReached { steps: step_count });
            break;
        }
    }

    Ok(LyapOutput {
        ts,
        xs,
        lyapunov_exponents: lambdas,
        statistics: stats,
        warnings,
    })
}

/// Prescribed-grid counterpart of [`lyapunov_with_jacobian`]: samples the
/// trajectory at a user-supplied, consistently-sorted time grid the way
/// `integrator::integrate_grid` does, reporting alongside each in-range grid
/// point the Lyapunov-exponent estimate as of the step that covers it (the
/// spectrum is only well-defined at renormalization points, so it cannot be
/// interpolated the way the state polynomial can).
pub fn lyapunov_with_jacobian_grid<T, F, J>(
    mut f: F,
    mut jac: J,
    problem: &Problem<T, T>,
    grid: &[T],
) -> Result<(Vec<Vec<T>>, Vec<Vec<T>>, Statistics, Vec<TaylorWarning>)>
where
    T: RealScalar + RealField,
    F: crate::integrator::VectorRhs<T>,
    J: JacobianFn<T>,
{
    problem.options.validate()?;
    let d = problem.x0.len();
    let n = problem.order;
    let direction = problem.direction();
    crate::integrator::validate_grid(grid, direction)?;
    let nan = T::from_real(f64::NAN);

    let mut lyap = LyapState {
        state: problem
            .x0
            .iter()
            .map(|&c| Poly::from_constant(c, n))
            .collect(),
        phi: identity_phi(d, n),
        log_sums: vec![T::zero(); d],
    };
    let mut solver = JetSolver::new(d, n);
    let mut scratch = vec![Poly::<T>::zero(n); d * d * d];
    let mut t_current = problem.t0;
    let mut stats = Statistics::default();
    let mut warnings = Vec::new();

    let mut xs_out: Vec<Vec<T>> = vec![vec![nan; d]; grid.len()];
    let mut lambdas_out: Vec<Vec<T>> = vec![vec![T::zero(); d]; grid.len()];
    let inside = |t: T| -> bool {
        direction * (t - problem.t0) >= T::zero() && direction * (problem.t_max - t) >= T::zero()
    };
    for (i, &g) in grid.iter().enumerate() {
        if g == problem.t0 {
            xs_out[i] = problem.x0.clone();
        }
    }

    let mut step_count = 0usize;
    loop {
        if direction * (t_current - problem.t_max) >= T::zero() {
            break;
        }
        let t_poly = Poly::time(t_current, n);
        solver.step_vector(&mut lyap.state, &t_poly, &problem.params, |x, t, p, dx| {
            f.eval(x, t, p, dx)
        });
        stats.number_of_rhs_evals += n;

        let j = jac.eval(&lyap.state, &t_poly, &problem.params);

        let raw = crate::step_size::vector_step(&lyap.state, problem.abstol);
        let remaining = (problem.t_max - t_current) * direction;
        let dt = if raw.is_infinite() || raw > remaining {
            remaining
        } else {
            raw
        };
        let delta = dt * direction;
        if step_count == 0 {
            stats.initial_step_size = dt.to_f64().unwrap_or(0.0);
        }

        let t_next = t_current + delta;
        for (i, &g) in grid.iter().enumerate() {
            if inside(g)
                && direction * (g - t_current) > T::zero()
                && direction * (t_next - g) >= T::zero()
            {
                xs_out[i] = lyap.state.iter().map(|s| s.eval(g - t_current)).collect();
            }
        }

        let exponents = run_step(&mut lyap, j, &mut scratch, n, t_current, problem.t0, delta);

        for (i, &g) in grid.iter().enumerate() {
            if inside(g)
                && direction * (g - t_current) > T::zero()
                && direction * (t_next - g) >= T::zero()
            {
                lambdas_out[i] = exponents.clone();
            }
        }

        t_current = t_next;
        step_count += 1;
        stats.number_of_steps = step_count;
        stats.final_step_size = dt.to_f64().unwrap_or(0.0);

        if step_count > problem.options.max_steps {
            warnings.push(TaylorWarning::StepLimitReached { steps: step_count });
            break;
        }
    }

    Ok((xs_out, lambdas_out, stats, warnings))
}

/// Prescribed-grid counterpart of [`lyapunov_ad`]; see
/// [`lyapunov_with_jacobian_grid`] for the grid-sampling convention.
pub fn lyapunov_ad_grid<T, F>(
    mut f: F,
    problem: &Problem<T, T>,
    perturbation_vars: Option<usize>,
    grid: &[T],
) -> Result<(Vec<Vec<T>>, Vec<Vec<T>>, Statistics, Vec<TaylorWarning>)>
where
    T: RealScalar + RealField,
    F: GenericOdeRhs,
{
    problem.options.validate()?;
    let d = problem.x0.len();
    if let Some(v) = perturbation_vars {
        if v != d {
            return Err(TaylorError::VariablesStateMismatch { v, d });
        }
    }
    let n = problem.order;
    let direction = problem.direction();
    crate::integrator::validate_grid(grid, direction)?;
    let nan = T::from_real(f64::NAN);

    let mut lyap = LyapState {
        state: problem
            .x0
            .iter()
            .map(|&c| Poly::from_constant(c, n))
            .collect(),
        phi: identity_phi(d, n),
        log_sums: vec![T::zero(); d],
    };
    let mut scratch = vec![Poly::<T>::zero(n); d * d * d];
    let mut plain_solver = JetSolver::new(d, n);
    let mut t_current = problem.t0;
    let mut stats = Statistics::default();
    let mut warnings = Vec::new();

    let mut xs_out: Vec<Vec<T>> = vec![vec![nan; d]; grid.len()];
    let mut lambdas_out: Vec<Vec<T>> = vec![vec![T::zero(); d]; grid.len()];
    let inside = |t: T| -> bool {
        direction * (t - problem.t0) >= T::zero() && direction * (problem.t_max - t) >= T::zero()
    };
    for (i, &g) in grid.iter().enumerate() {
        if g == problem.t0 {
            xs_out[i] = problem.x0.clone();
        }
    }

    let mut step_count = 0usize;
    loop {
        if direction * (t_current - problem.t_max) >= T::zero() {
            break;
        }
        let t_poly = Poly::time(t_current, n);

        plain_solver.step_vector(&mut lyap.state, &t_poly, &problem.params, |x, t, p, dx| {
            f.eval(x, t, p, dx)
        });
        stats.number_of_rhs_evals += n;

        let j = ad_jacobian(&mut f, &lyap.state, &t_poly, &problem.params, n);

        let raw = crate::step_size::vector_step(&lyap.state, problem.abstol);
        let remaining = (problem.t_max - t_current) * direction;
        let dt = if raw.is_infinite() || raw > remaining {
            remaining
        } else {
            raw
        };
        let delta = dt * direction;
        if step_count == 0 {
            stats.initial_step_size = dt.to_f64().unwrap_or(0.0);
        }

        let t_next = t_current + delta;
        for (i, &g) in grid.iter().enumerate() {
            if inside(g)
                && direction * (g - t_current) > T::zero()
                && direction * (t_next - g) >= T::zero()
            {
                xs_out[i] = lyap.state.iter().map(|s| s.eval(g - t_current)).collect();
            }
        }

        let exponents = run_step(&mut lyap, j, &mut scratch, n, t_current, problem.t0, delta);

        for (i, &g) in grid.iter().enumerate() {
            if inside(g)
                && direction * (g - t_current) > T::zero()
                && direction * (t_next - g) >= T::zero()
            {
                lambdas_out[i] = exponents.clone();
            }
        }

        t_current = t_next;
        step_count += 1;
        stats.number_of_steps = step_count;
        stats.final_step_size = dt.to_f64().unwrap_or(0.0);

        if step_count > problem.options.max_steps {
            warnings.push(TaylorWarning::StepLimitReached { steps: step_count });
            break;
        }
    }

    Ok((xs_out, lambdas_out, stats, warnings))
}
