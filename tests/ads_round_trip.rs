use taylor_ode::test_models::rotation;
use taylor_ode::{run_ads, AdsNode, MPoly, Options};

/// A single forced full step (`t_max` reachable in one accepted step from
/// both branches) sidesteps step-size divergence between the split and
/// unsplit branches entirely, so this can assert the round-trip identity at
/// a tight tolerance: evaluating the unsplit trajectory at the split box's
/// physical center must match the split branch's constant term exactly (up
/// to floating-point roundoff), since `substitute_affine` is an exact
/// re-expansion, not an approximation.
#[test]
fn split_branch_center_matches_unsplit_trajectory_to_tight_tolerance() {
    let root_state = |seed: f64| {
        vec![
            MPoly::<f64, 2, 3>::unit_perturbation(seed, 0),
            MPoly::<f64, 2, 3>::unit_perturbation(0.0, 1),
        ]
    };

    // abstol large enough, and the time span short enough, that a single
    // step from the generous step-size rule covers the whole run for both
    // the baseline and the split leaves.
    let t_max = 1e-3;
    let abstol = 1e-2;

    let baseline_root =
        AdsNode::<f64, 2, 3>::new_root(root_state(1.0), [-1.0, -1.0], [1.0, 1.0], 0.0).unwrap();
    run_ads(
        rotation::rhs::<f64, 2, 3>,
        &baseline_root,
        0.0,
        t_max,
        6,
        1e6,
        abstol,
        &[],
        &Options {
            dense: false,
            ..Options::default()
        },
    )
    .unwrap();

    let split_root =
        AdsNode::<f64, 2, 3>::new_root(root_state(1.0), [-1.0, -1.0], [1.0, 1.0], 0.0).unwrap();
    run_ads(
        rotation::rhs::<f64, 2, 3>,
        &split_root,
        0.0,
        t_max,
        6,
        1e-14, // forces the split on the very first (and only) step
        abstol,
        &[],
        &Options {
            max_splits: 2,
            dense: false,
            ..Options::default()
        },
    )
    .unwrap();

    assert_eq!(AdsNode::count_leaves(&baseline_root), 1);
    assert_eq!(AdsNode::count_leaves(&split_root), 2);

    let baseline_state = baseline_root.borrow().children()[0].borrow().state.clone();
    let split_node = split_root.borrow();
    let axis = split_node.split_axis.expect("first step must have split");
    let children = split_node.children().to_vec();
    drop(split_node);

    for (child, shift) in [(&children[0], -0.5_f64), (&children[1], 0.5_f64)] {
        let child_node = child.borrow();
        let child_state = &child_node.state;
        let mut point = [0.0_f64; 2];
        point[axis] = shift;
        for (expected_poly, actual_poly) in baseline_state.iter().zip(child_state.iter()) {
            let expected = expected_poly.eval(&point);
            let actual = actual_poly.constant();
            assert!((expected - actual).abs() < 1e-10, "expected={expected} actual={actual}");
        }
    }
}
