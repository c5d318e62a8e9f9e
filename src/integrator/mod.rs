pub mod problem;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TaylorError, TaylorWarning};
use crate::jet::{JetSolver, ParsedOde};
use crate::poly::Poly;
use crate::scalar::{RealScalar, Scalar};

pub use problem::Problem;

/// Run counters, serializable for snapshot tests the way the rest of this
/// crate's collaborators expose their own statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub number_of_steps: usize,
    pub number_of_rhs_evals: usize,
    pub initial_step_size: f64,
    pub final_step_size: f64,
}

/// Natural-grid output: sampled trajectory plus, optionally, the per-step
/// polynomials (dense output) and run diagnostics.
#[derive(Debug, Clone)]
pub struct RunOutput<T: Scalar, R: RealScalar> {
    pub ts: Vec<R>,
    pub xs: Vec<Vec<T>>,
    pub polys: Option<Vec<Vec<Poly<T>>>>,
    pub statistics: Statistics,
    pub warnings: Vec<TaylorWarning>,
}

pub(crate) fn validate_grid<R: RealScalar>(grid: &[R], direction: R) -> Result<()> {
    for w in grid.windows(2) {
        if (w[1] - w[0]) * direction < R::zero() {
            return Err(TaylorError::NonMonotonicGrid);
        }
    }
    Ok(())
}

/// Vector right-hand side in mutating form: `f!(dx, x, p, t)`.
pub trait VectorRhs<T: Scalar> {
    fn eval(&mut self, x: &[Poly<T>], t: &Poly<T>, p: &[T], dx: &mut [Poly<T>]);
}

impl<T, F> VectorRhs<T> for F
where
    T: Scalar,
    F: FnMut(&[Poly<T>], &Poly<T>, &[T], &mut [Poly<T>]),
{
    fn eval(&mut self, x: &[Poly<T>], t: &Poly<T>, p: &[T], dx: &mut [Poly<T>]) {
        (self)(x, t, p, dx)
    }
}

/// Coordinates [`JetSolver`] and the step-size rule into the state machine:
/// INIT (validate, probe the parsed routine) -> STEP (compute coefficients,
/// derive and clamp `delta_t`, advance) -> DONE.
///
/// Natural-grid entry point: returns every accepted `(t_k, x_k)`, optionally
/// with the per-step polynomials when `options.dense` is set.
pub fn integrate<T, R, F>(
    mut f: F,
    problem: &Problem<T, R>,
    mut parsed: Option<&mut dyn ParsedOde<T>>,
) -> Result<RunOutput<T, R>>
where
    T: Scalar,
    R: RealScalar,
    F: VectorRhs<T>,
{
    problem.options.validate()?;
    let direction = problem.direction();
    let d = problem.x0.len();
    let n = problem.order;

    let mut state: Vec<Poly<T>> = problem
        .x0
        .iter()
        .map(|&c| Poly::from_constant(c, n))
        .collect();
    let mut solver = JetSolver::new(d, n);
    let mut t_current = problem.t0;
    let mut stats = Statistics::default();
    let mut warnings = Vec::new();

    let mut ts = vec![t_current];
    let mut xs = vec![problem.x0.clone()];
    let mut polys: Option<Vec<Vec<Poly<T>>>> = if problem.options.dense {
        Some(Vec::new())
    } else {
        None
    };

    let use_parsed = problem.options.parse_eqs && parsed.is_some();

    let mut step_count = 0usize;
    loop {
        if direction * (t_current - problem.t_max) >= R::zero() {
            break;
        }

        let t0_embedded = T::from_real(t_current.to_f64().unwrap_or(0.0));
        let t_poly = Poly::time(t0_embedded, n);

        let mut filled_by_parsed = false;
        if use_parsed {
            let p = parsed.as_deref_mut().unwrap();
            if !solver.parsed_failed() {
                filled_by_parsed = solver.try_parsed(p, &mut state, t0_embedded, &problem.params);
                if !filled_by_parsed {
                    warnings.push(TaylorWarning::ParsedFallback {
                        at_step: step_count,
                    });
                }
            }
        }
        if !filled_by_parsed {
            solver.step_vector(&mut state, &t_poly, &problem.params, |x, t, p, dx| {
                f.eval(x, t, p, dx)
            });
            stats.number_of_rhs_evals += n;
        }

        let raw = crate::step_size::vector_step(&state, problem.abstol);
        let remaining = (problem.t_max - t_current) * direction;
        let dt = if raw.is_infinite() || raw > remaining {
            remaining
        } else {
            raw
        };
        let delta = dt * direction;
        let delta_embedded = T::from_real(delta.to_f64().unwrap_or(0.0));

        if step_count == 0 {
            stats.initial_step_size = dt.to_f64().unwrap_or(0.0);
        }

        if problem.options.dense {
            polys.as_mut().unwrap().push(state.clone());
        }

        for s in state.iter_mut() {
            let new_val = s.eval(delta_embedded);
            s.reset_derivatives();
            s.set_constant(new_val);
        }
        t_current = t_current + delta;
        step_count += 1;
        stats.number_of_steps = step_count;
        stats.final_step_size = dt.to_f64().unwrap_or(0.0);

        ts.push(t_current);
        xs.push(state.iter().map(|s| s.constant()).collect());

        if step_count > problem.options.max_steps {
            warnings.push(TaylorWarning::StepLimitReached { steps: step_count });
            break;
        }
    }

    Ok(RunOutput {
        ts,
        xs,
        polys,
        statistics: stats,
        warnings,
    })
}

/// Prescribed-grid entry point: evaluates the trajectory at a user-supplied,
/// consistently-sorted time grid. Points strictly outside `[t0, t_max]` are
/// NaN-filled; points inside are evaluated from the step polynomial holding
/// at the time they fall in, re-centered at the step's start time.
pub fn integrate_grid<T, R, F>(
    mut f: F,
    problem: &Problem<T, R>,
    grid: &[R],
    mut parsed: Option<&mut dyn ParsedOde<T>>,
) -> Result<(Vec<Vec<T>>, Statistics, Vec<TaylorWarning>)>
where
    T: Scalar,
    R: RealScalar,
    F: VectorRhs<T>,
{
    problem.options.validate()?;
    let direction = problem.direction();
    validate_grid(grid, direction)?;

    let d = problem.x0.len();
    let n = problem.order;
    let nan = T::from_real(f64::NAN);

    let mut state: Vec<Poly<T>> = problem
        .x0
        .iter()
        .map(|&c| Poly::from_constant(c, n))
        .collect();
    let mut solver = JetSolver::new(d, n);
    let mut t_current = problem.t0;
    let mut stats = Statistics::default();
    let mut warnings = Vec::new();
    let mut out: Vec<Vec<T>> = vec![vec![nan; d]; grid.len()];

    let inside = |t: R| -> bool { direction * (t - problem.t0) >= R::zero() && direction * (problem.t_max - t) >= R::zero() };
    for (i, &g) in grid.iter().enumerate() {
        if g == problem.t0 {
            out[i] = problem.x0.clone();
        }
    }

    let use_parsed = problem.options.parse_eqs && parsed.is_some();
    let mut step_count = 0usize;
    loop {
        if direction * (t_current - problem.t_max) >= R::zero() {
            break;
        }

        let t0_embedded = T::from_real(t_current.to_f64().unwrap_or(0.0));
        let t_poly = Poly::time(t0_embedded, n);

        let mut filled_by_parsed = false;
        if use_parsed {
            let p = parsed.as_deref_mut().unwrap();
            if !solver.parsed_failed() {
                filled_by_parsed = solver.try_parsed(p, &mut state, t0_embedded, &problem.params);
                if !filled_by_parsed {
                    warnings.push(TaylorWarning::ParsedFallback {
                        at_step: step_count,
                    });
                }
            }
        }
        if !filled_by_parsed {
            solver.step_vector(&mut state, &t_poly, &problem.params, |x, t, p, dx| {
                f.eval(x, t, p, dx)
            });
            stats.number_of_rhs_evals += n;
        }

        let raw = crate::step_size::vector_step(&state, problem.abstol);
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
            if inside(g) && direction * (g - t_current) > R::zero() && direction * (t_next - g) >= R::zero() {
                let local = T::from_real((g - t_current).to_f64().unwrap_or(0.0));
                out[i] = state.iter().map(|s| s.eval(local)).collect();
            }
        }

        let delta_embedded = T::from_real(delta.to_f64().unwrap_or(0.0));
        for s in state.iter_mut() {
            let new_val = s.eval(delta_embedded);
            s.reset_derivatives();
            s.set_constant(new_val);
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

    Ok((out, stats, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;

    #[test]
    fn exponential_scalar_matches_closed_form() {
        let problem = Problem::<f64, f64>::new(vec![0.5], 0.0, 1.0, 50, 1e-20)
            .with_options(Options {
                dense: false,
                ..Options::default()
            });
        let out = integrate(
            |x: &[Poly<f64>], _t: &Poly<f64>, _p: &[f64], dx: &mut [Poly<f64>]| {
                dx[0] = x[0].clone();
            },
            &problem,
            None,
        )
        .unwrap();
        let last = *out.xs.last().unwrap().first().unwrap();
        assert!((last - 0.5 * std::f64::consts::E).abs() < 1e-12);
    }

    #[test]
    fn backward_integration_round_trips() {
        let forward = Problem::<f64, f64>::new(vec![0.5], 0.0, 1.0, 40, 1e-18);
        let fwd = integrate(
            |x: &[Poly<f64>], _t: &Poly<f64>, _p: &[f64], dx: &mut [Poly<f64>]| {
                dx[0] = x[0].clone();
            },
            &forward,
            None,
        )
        .unwrap();
        let x1 = fwd.xs.last().unwrap()[0];

        let backward = Problem::<f64, f64>::new(vec![x1], 1.0, 0.0, 40, 1e-18);
        let bwd = integrate(
            |x: &[Poly<f64>], _t: &Poly<f64>, _p: &[f64], dx: &mut [Poly<f64>]| {
                dx[0] = x[0].clone();
            },
            &backward,
            None,
        )
        .unwrap();
        let x0_back = bwd.xs.last().unwrap()[0];
        assert!((x0_back - 0.5).abs() < 1e-10);
    }

    #[test]
    fn step_limit_emits_warning() {
        let problem = Problem::<f64, f64>::new(vec![0.5], 0.0, 1.0, 4, 1e-20).with_options(
            Options {
                max_steps: 2,
                dense: false,
                ..Options::default()
            },
        );
        let out = integrate(
            |x: &[Poly<f64>], _t: &Poly<f64>, _p: &[f64], dx: &mut [Poly<f64>]| {
                dx[0] = x[0].clone();
            },
            &problem,
            None,
        )
        .unwrap();
        assert!(out
            .warnings
            .iter()
            .any(|w| matches!(w, TaylorWarning::StepLimitReached { .. })));
    }

    #[test]
    fn grid_mode_nan_fills_outside_points() {
        let problem = Problem::<f64, f64>::new(vec![0.5], 0.0, 1.0, 30, 1e-18);
        let grid = [0.0, 0.5, 1.0, 1.5];
        let (xs, _stats, _warnings) = integrate_grid(
            |x: &[Poly<f64>], _t: &Poly<f64>, _p: &[f64], dx: &mut [Poly<f64>]| {
                dx[0] = x[0].clone();
            },
            &problem,
            &grid,
            None,
        )
        .unwrap();
        assert!(xs[3][0].is_nan());
        assert!((xs[0][0] - 0.5).abs() < 1e-12);
        assert!((xs[2][0] - 0.5 * std::f64::consts::E).abs() < 1e-10);
    }
}
