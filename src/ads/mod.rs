pub mod node;
pub mod split;

pub use node::{AdsNode, NodeRef};

use crate::errors::{Result, TaylorWarning};
use crate::integrator::Statistics;
use crate::jet::JetSolver;
use crate::mpoly::MPoly;
use crate::options::Options;
use crate::poly::Poly;
use crate::scalar::RealScalar;

/// Run statistics plus any non-fatal conditions encountered. The tree itself
/// (mutated in place) carries the trajectory and, when `Options::dense` is
/// set, the per-leaf dense output.
#[derive(Debug, Clone, Default)]
pub struct AdsOutput {
    pub statistics: Statistics,
    pub warnings: Vec<TaylorWarning>,
}

/// Right-hand side for jet-transport state: `f!(dx, x, t, p)` over
/// `MPoly`-valued Taylor polynomials. A blanket impl accepts any closure of
/// matching shape, mirroring [`crate::integrator::VectorRhs`].
pub trait AdsRhs<T: RealScalar, const V: usize, const K: usize> {
    fn eval(
        &mut self,
        x: &[Poly<MPoly<T, V, K>>],
        t: &Poly<MPoly<T, V, K>>,
        p: &[MPoly<T, V, K>],
        dx: &mut [Poly<MPoly<T, V, K>>],
    );
}

impl<T, F, const V: usize, const K: usize> AdsRhs<T, V, K> for F
where
    T: RealScalar,
    F: FnMut(
        &[Poly<MPoly<T, V, K>>],
        &Poly<MPoly<T, V, K>>,
        &[MPoly<T, V, K>],
        &mut [Poly<MPoly<T, V, K>>],
    ),
{
    fn eval(
        &mut self,
        x: &[Poly<MPoly<T, V, K>>],
        t: &Poly<MPoly<T, V, K>>,
        p: &[MPoly<T, V, K>],
        dx: &mut [Poly<MPoly<T, V, K>>],
    ) {
        (self)(x, t, p, dx)
    }
}

/// Integrates a jet-transport system in place on `root`'s tree: every
/// outer iteration advances each currently active leaf by one Taylor step
/// (via the same [`JetSolver`] used by the scalar/vector integrator, here
/// instantiated with `T = MPoly<T, V, K>`) and then either bisects the leaf
/// along the variable [`split::decide_split`] names, or extends it with a
/// single same-box child.
///
/// The leaf list is snapshotted at the start of each iteration
/// ([`AdsNode::collect_active_leaves`]), so children created by a split are
/// only visited starting the next iteration.
pub fn ads<T, F, const V: usize, const K: usize>(
    mut f: F,
    root: &NodeRef<T, V, K>,
    t0: T,
    t_max: T,
    order: usize,
    stol: f64,
    abstol: T,
    params: &[T],
    options: &Options,
) -> Result<AdsOutput>
where
    T: RealScalar,
    F: AdsRhs<T, V, K>,
{
    options.validate()?;
    let direction = if t_max >= t0 { T::one() } else { -T::one() };
    let params_lifted: Vec<MPoly<T, V, K>> =
        params.iter().map(|&c| MPoly::from_constant(c)).collect();

    let mut stats = Statistics::default();
    let mut warnings = Vec::new();
    let mut step_count = 0usize;
    let mut split_limit_warned = false;

    loop {
        let mut leaves = Vec::new();
        AdsNode::collect_active_leaves(root, &mut leaves);
        if leaves.is_empty() {
            break;
        }

        let mut any_progressed = false;
        for leaf in &leaves {
            let (t_current, state) = {
                let node = leaf.borrow();
                (node.t, node.state.clone())
            };
            if direction * (t_current - t_max) >= T::zero() {
                leaf.borrow_mut().active = false;
                continue;
            }
            any_progressed = true;

            let d = state.len();
            let mut polys: Vec<Poly<MPoly<T, V, K>>> = state
                .into_iter()
                .map(|c| Poly::from_constant(c, order))
                .collect();
            let t_lifted = MPoly::<T, V, K>::from_constant(t_current);
            let t_poly = Poly::time(t_lifted, order);

            let mut solver = JetSolver::new(d, order);
            solver.step_vector(&mut polys, &t_poly, &params_lifted, |x, t, p, dx| {
                f.eval(x, t, p, dx)
            });
            stats.number_of_rhs_evals += order;

            let raw = crate::step_size::vector_step(&polys, abstol);
            let remaining = (t_max - t_current) * direction;
            let dt = if raw.is_infinite() || raw > remaining {
                remaining
            } else {
                raw
            };
            let delta = dt * direction;
            let delta_lifted = MPoly::<T, V, K>::from_constant(delta);

            let new_state: Vec<MPoly<T, V, K>> =
                polys.iter().map(|p| p.eval(delta_lifted)).collect();
            let new_t = t_current + delta;

            let dense_snapshot = if options.dense { Some(polys.clone()) } else { None };

            let total_leaves = AdsNode::count_leaves(root);
            let decision = if total_leaves < options.max_splits {
                split::decide_split(&new_state, stol)
            } else {
                None
            };

            match decision {
                Some(axis) => {
                    let left_state: Vec<MPoly<T, V, K>> = new_state
                        .iter()
                        .map(|p| p.substitute_affine(axis, T::from_real(0.5), T::from_real(-0.5)))
                        .collect();
                    let right_state: Vec<MPoly<T, V, K>> = new_state
                        .iter()
                        .map(|p| p.substitute_affine(axis, T::from_real(0.5), T::from_real(0.5)))
                        .collect();
                    let (left_dense, right_dense) = if options.dense {
                        (dense_snapshot.clone(), dense_snapshot)
                    } else {
                        (None, None)
                    };
                    AdsNode::split_at(
                        leaf,
                        axis,
                        new_t,
                        left_state,
                        right_state,
                        left_dense,
                        right_dense,
                    );
                }
                None => {
                    AdsNode::extend_same_box(leaf, new_t, new_state, dense_snapshot);
                }
            }
        }

        step_count += 1;
        stats.number_of_steps = step_count;
        if !any_progressed {
            break;
        }
        if step_count > options.max_steps {
            warnings.push(TaylorWarning::StepLimitReached { steps: step_count });
            break;
        }
        let live_leaves = AdsNode::count_leaves(root);
        if live_leaves > options.max_splits && !split_limit_warned {
            warnings.push(TaylorWarning::SplitLimitReached { live_leaves });
            split_limit_warned = true;
        }
    }

    Ok(AdsOutput {
        statistics: stats,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A pure rotation in the two perturbation variables: `dx0/dt = -x1`,
    /// `dx1/dt = x0`. Integrable in closed form, so it exercises the tree
    /// machinery without truncation error ever forcing a split on its own;
    /// tests drive splitting explicitly via a tiny `stol`.
    fn rotation_rhs(
        x: &[Poly<MPoly<f64, 2, 3>>],
        _t: &Poly<MPoly<f64, 2, 3>>,
        _p: &[MPoly<f64, 2, 3>],
        dx: &mut [Poly<MPoly<f64, 2, 3>>],
    ) {
        dx[0] = -&x[1];
        dx[1] = x[0].clone();
    }

    fn root_state() -> Vec<MPoly<f64, 2, 3>> {
        vec![
            MPoly::unit_perturbation(1.0, 0),
            MPoly::unit_perturbation(0.0, 1),
        ]
    }

    /// Every accepted step (split or not) attaches at least one child, so
    /// neither the root nor an intermediate split node is ever the node
    /// whose state reflects `t_max`; follow the tree down to find it.
    fn deepest_leaf(node: &NodeRef<f64, 2, 3>) -> NodeRef<f64, 2, 3> {
        let child = node.borrow().children().first().cloned();
        match child {
            Some(c) => deepest_leaf(&c),
            None => node.clone(),
        }
    }

    #[test]
    fn baseline_run_without_split_advances_to_t_max() {
        let root = AdsNode::<f64, 2, 3>::new_root(root_state(), [-1.0, -1.0], [1.0, 1.0], 0.0)
            .unwrap();
        let options = Options {
            dense: false,
            ..Options::default()
        };
        let out = ads(
            rotation_rhs,
            &root,
            0.0,
            0.25,
            8,
            1e6, // effectively disables splitting
            1e-14,
            &[],
            &options,
        )
        .unwrap();
        assert!(out.warnings.is_empty());
        let leaf = deepest_leaf(&root);
        assert!(leaf.borrow().is_leaf());
        assert!((leaf.borrow().t - 0.25).abs() < 1e-9);
    }

    #[test]
    fn tight_tolerance_triggers_a_split() {
        let root = AdsNode::<f64, 2, 3>::new_root(root_state(), [-1.0, -1.0], [1.0, 1.0], 0.0)
            .unwrap();
        // max_splits = 2 bounds this to exactly one split: the first
        // trigger takes the leaf count from 1 to 2, and the next check
        // (2 < 2) forbids any further split.
        let options = Options {
            max_splits: 2,
            ..Options::default()
        };
        ads(rotation_rhs, &root, 0.0, 0.1, 8, 1e-10, 1e-14, &[], &options).unwrap();
        assert_eq!(AdsNode::count_leaves(&root), 2);
    }

    #[test]
    fn split_leaf_centers_agree_with_unsplit_baseline() {
        let baseline_root =
            AdsNode::<f64, 2, 3>::new_root(root_state(), [-1.0, -1.0], [1.0, 1.0], 0.0).unwrap();
        let options_no_split = Options {
            dense: false,
            ..Options::default()
        };
        ads(
            rotation_rhs,
            &baseline_root,
            0.0,
            0.1,
            8,
            1e6,
            1e-14,
            &[],
            &options_no_split,
        )
        .unwrap();
        let baseline_leaf = deepest_leaf(&baseline_root);
        let baseline_node = baseline_leaf.borrow();
        let baseline_state = &baseline_node.state;

        let split_root =
            AdsNode::<f64, 2, 3>::new_root(root_state(), [-1.0, -1.0], [1.0, 1.0], 0.0).unwrap();
        let options_split = Options {
            max_splits: 2,
            ..Options::default()
        };
        ads(
            rotation_rhs,
            &split_root,
            0.0,
            0.1,
            8,
            1e-10,
            1e-14,
            &[],
            &options_split,
        )
        .unwrap();

        // Find the node where the single split happened, to read off its
        // axis and which immediate child is the left (-0.5) vs right
        // (+0.5) half; then follow each half down to its own t_max leaf.
        let mut splitter = split_root.clone();
        loop {
            let axis = splitter.borrow().split_axis;
            if axis.is_some() {
                break;
            }
            let next = splitter.borrow().children().first().cloned().unwrap();
            splitter = next;
        }
        let splitter_node = splitter.borrow();
        let axis = splitter_node.split_axis.unwrap();
        let children = splitter_node.children().to_vec();
        drop(splitter_node);

        // The two branches generally don't take identical step sequences
        // after the split (coefficient norms feeding `step_size` shift
        // slightly under the re-parameterization), so this checks
        // structural agreement at a coarse tolerance rather than the
        // tight round-trip bound a fixed, single-step run would allow.
        for (child, shift) in [(&children[0], -0.5_f64), (&children[1], 0.5_f64)] {
            let leaf = deepest_leaf(child);
            let leaf_node = leaf.borrow();
            let mut point = [0.0_f64; 2];
            point[axis] = shift;
            for (component_baseline, component_leaf) in
                baseline_state.iter().zip(leaf_node.state.iter())
            {
                let expected = component_baseline.eval(&point);
                let actual = component_leaf.constant();
                assert!(
                    (expected - actual).abs() < 1e-6,
                    "expected={expected} actual={actual}"
                );
            }
        }
    }
}
