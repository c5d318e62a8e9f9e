use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::errors::{Result, TaylorError};
use crate::mpoly::MPoly;
use crate::poly::Poly;
use crate::scalar::RealScalar;

/// Owning handle to a node. Cloning an `Rc` is how the tree shares a child
/// between its own storage and a caller's leaf snapshot; the node itself is
/// never cloned.
pub type NodeRef<T, const V: usize, const K: usize> = Rc<RefCell<AdsNode<T, V, K>>>;

/// One sub-domain of perturbation space: a box `[lo, hi]`, the polynomial
/// state at the node's current time, and its place in the split tree.
///
/// Children own their subtrees; the parent link is a [`Weak`] so the tree
/// has no reference cycles and drops cleanly from the root down. A leaf
/// (`children` empty) is replaced either by a single same-box child (no
/// split this iteration) or by two children holding the bisected state
/// (split triggered) — both cases are "extend the leaf," so `children` is a
/// `Vec` rather than a fixed pair.
pub struct AdsNode<T: RealScalar, const V: usize, const K: usize> {
    pub depth: usize,
    pub t: T,
    pub lo: [T; V],
    pub hi: [T; V],
    pub state: Vec<MPoly<T, V, K>>,
    /// The just-completed step's time-polynomial solution, kept only when
    /// `Options::dense` is set.
    pub dense: Option<Vec<Poly<MPoly<T, V, K>>>>,
    pub active: bool,
    pub split_axis: Option<usize>,
    parent: Weak<RefCell<AdsNode<T, V, K>>>,
    children: Vec<NodeRef<T, V, K>>,
}

impl<T: RealScalar, const V: usize, const K: usize> AdsNode<T, V, K> {
    /// Builds the root from the user's initial box and polynomial state.
    pub fn new_root(
        state: Vec<MPoly<T, V, K>>,
        lo: [T; V],
        hi: [T; V],
        t0: T,
    ) -> Result<NodeRef<T, V, K>> {
        for axis in 0..V {
            if !(hi[axis] > lo[axis]) {
                return Err(TaylorError::InvalidBox { axis });
            }
        }
        Ok(Rc::new(RefCell::new(AdsNode {
            depth: 0,
            t: t0,
            lo,
            hi,
            state,
            dense: None,
            active: true,
            split_axis: None,
            parent: Weak::new(),
            children: Vec::new(),
        })))
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn parent(&self) -> Option<NodeRef<T, V, K>> {
        self.parent.upgrade()
    }

    pub fn children(&self) -> &[NodeRef<T, V, K>] {
        &self.children
    }

    /// The box midpoint, i.e. the physical point the canonical origin `0`
    /// always evaluates to, by construction of [`Self::bisect_axis`].
    pub fn center(&self) -> [T; V] {
        let mut c = [T::zero(); V];
        for i in 0..V {
            c[i] = (self.lo[i] + self.hi[i]).div_usize(2);
        }
        c
    }

    /// Walks the tree collecting currently-active leaves into `out`,
    /// snapshotting the list up front so a split performed mid-iteration
    /// does not make its new children visible to the same pass.
    pub fn collect_active_leaves(root: &NodeRef<T, V, K>, out: &mut Vec<NodeRef<T, V, K>>) {
        let node = root.borrow();
        if node.children.is_empty() {
            if node.active {
                out.push(root.clone());
            }
        } else {
            for child in &node.children {
                Self::collect_active_leaves(child, out);
            }
        }
    }

    /// Every current tree leaf, active or not — for post-run inspection,
    /// where [`Self::collect_active_leaves`] would see an empty tree once
    /// every leaf has reached `t_max`.
    pub fn collect_leaves(root: &NodeRef<T, V, K>, out: &mut Vec<NodeRef<T, V, K>>) {
        let node = root.borrow();
        if node.children.is_empty() {
            out.push(root.clone());
        } else {
            for child in &node.children {
                Self::collect_leaves(child, out);
            }
        }
    }

    pub fn count_leaves(root: &NodeRef<T, V, K>) -> usize {
        let node = root.borrow();
        if node.children.is_empty() {
            1
        } else {
            node.children.iter().map(Self::count_leaves).sum()
        }
    }

    fn attach_child(
        parent: &NodeRef<T, V, K>,
        lo: [T; V],
        hi: [T; V],
        t: T,
        state: Vec<MPoly<T, V, K>>,
        dense: Option<Vec<Poly<MPoly<T, V, K>>>>,
    ) -> NodeRef<T, V, K> {
        let depth = parent.borrow().depth + 1;
        Rc::new(RefCell::new(AdsNode {
            depth,
            t,
            lo,
            hi,
            state,
            dense,
            active: true,
            split_axis: None,
            parent: Rc::downgrade(parent),
            children: Vec::new(),
        }))
    }

    /// Case (b): no split triggered this iteration. Replaces the leaf with a
    /// single same-box child carrying the new time and state.
    pub fn extend_same_box(
        this: &NodeRef<T, V, K>,
        t: T,
        state: Vec<MPoly<T, V, K>>,
        dense: Option<Vec<Poly<MPoly<T, V, K>>>>,
    ) {
        let (lo, hi) = {
            let node = this.borrow();
            (node.lo, node.hi)
        };
        let child = Self::attach_child(this, lo, hi, t, state, dense);
        this.borrow_mut().children = vec![child];
    }

    /// Case (a): bisects the box along `axis` and replaces the leaf with two
    /// children holding the recomposed state on each half.
    pub fn split_at(
        this: &NodeRef<T, V, K>,
        axis: usize,
        t: T,
        left_state: Vec<MPoly<T, V, K>>,
        right_state: Vec<MPoly<T, V, K>>,
        left_dense: Option<Vec<Poly<MPoly<T, V, K>>>>,
        right_dense: Option<Vec<Poly<MPoly<T, V, K>>>>,
    ) {
        let (lo, hi) = {
            let node = this.borrow();
            (node.lo, node.hi)
        };
        let mid = (lo[axis] + hi[axis]).div_usize(2);
        let mut lo_left = lo;
        let mut hi_left = hi;
        hi_left[axis] = mid;
        let mut lo_right = lo;
        lo_right[axis] = mid;
        let hi_right = hi;

        let left = Self::attach_child(this, lo_left, hi_left, t, left_state, left_dense);
        let right = Self::attach_child(this, lo_right, hi_right, t, right_state, right_dense);
        {
            let mut node = this.borrow_mut();
            node.split_axis = Some(axis);
            node.children = vec![left, right];
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_state() -> Vec<MPoly<f64, 1, 2>> {
        vec![MPoly::from_constant(1.0)]
    }

    #[test]
    fn rejects_degenerate_box() {
        let err = AdsNode::<f64, 1, 2>::new_root(leaf_state(), [1.0], [1.0], 0.0).unwrap_err();
        assert!(matches!(err, TaylorError::InvalidBox { axis: 0 }));
    }

    #[test]
    fn split_produces_two_disjoint_halves() {
        let root = AdsNode::<f64, 1, 2>::new_root(leaf_state(), [-1.0], [1.0], 0.0).unwrap();
        AdsNode::split_at(&root, 0, 1.0, leaf_state(), leaf_state(), None, None);
        let node = root.borrow();
        assert!(!node.is_leaf());
        let children = node.children();
        assert_eq!(children[0].borrow().lo[0], -1.0);
        assert_eq!(children[0].borrow().hi[0], 0.0);
        assert_eq!(children[1].borrow().lo[0], 0.0);
        assert_eq!(children[1].borrow().hi[0], 1.0);
        assert!(Rc::ptr_eq(&children[0].borrow().parent().unwrap(), &root));
    }

    #[test]
    fn leaf_snapshot_excludes_just_created_children() {
        let root = AdsNode::<f64, 1, 2>::new_root(leaf_state(), [-1.0], [1.0], 0.0).unwrap();
        let mut leaves = Vec::new();
        AdsNode::collect_active_leaves(&root, &mut leaves);
        assert_eq!(leaves.len(), 1);
        AdsNode::split_at(&root, 0, 1.0, leaf_state(), leaf_state(), None, None);
        assert_eq!(AdsNode::count_leaves(&root), 2);
    }
}
