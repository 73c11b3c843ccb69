//! Tree storage and quickselect construction.

use cline_space::PositionSnapshot;
use smallvec::SmallVec;
use tracing::debug;

/// One tree node: packed coordinates, the originating individual index,
/// and index links into the arena.
#[derive(Clone, Copy, Debug)]
pub(crate) struct KdNode {
    pub(crate) coord: [f64; 3],
    pub(crate) index: u32,
    pub(crate) left: Option<u32>,
    pub(crate) right: Option<u32>,
}

/// A balanced k-d tree over an (optionally replicated) position set.
#[derive(Clone, Debug)]
pub struct KdTree {
    pub(crate) nodes: Vec<KdNode>,
    pub(crate) root: Option<u32>,
    pub(crate) dims: usize,
}

impl KdTree {
    /// Build a tree over the snapshot's positions.
    ///
    /// `periodic` flags packed dimensions that wrap; for `p` wrapping
    /// dimensions the node set is the snapshot replicated 3^p times with
    /// offsets in `{-B, 0, +B}` along each wrapping dimension.
    pub fn build(snapshot: &PositionSnapshot, periodic: [bool; 3]) -> Self {
        let dims = snapshot.dims();
        let n = snapshot.count();

        let periodic_slots: SmallVec<[usize; 3]> =
            (0..dims).filter(|&k| periodic[k]).collect();
        let replicate_count = 3usize.pow(periodic_slots.len() as u32);
        let bounds = snapshot.bounds();

        let mut nodes = Vec::with_capacity(n * replicate_count);
        for replicate in 0..replicate_count {
            let mut offset = [0.0; 3];
            for (j, &slot) in periodic_slots.iter().enumerate() {
                let factor = ((replicate / 3usize.pow(j as u32)) % 3) as f64 - 1.0;
                offset[slot] = bounds[slot] * factor;
            }
            for i in 0..n {
                let p = snapshot.point(i);
                let mut coord = [0.0; 3];
                for (k, c) in coord.iter_mut().enumerate().take(dims) {
                    *c = p[k] + offset[k];
                }
                nodes.push(KdNode {
                    coord,
                    index: i as u32,
                    left: None,
                    right: None,
                });
            }
        }

        let mut tree = Self {
            nodes,
            root: None,
            dims,
        };
        let len = tree.nodes.len();
        tree.root = tree.build_range(0, len, 0);

        debug!(
            individuals = n,
            replicates = replicate_count,
            nodes = len,
            dims,
            "built k-d tree"
        );

        tree
    }

    /// Number of packed dimensions the tree splits over.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Total node count, replicates included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Build the subtree over `nodes[start..end]`, splitting on `phase`.
    ///
    /// Returns the arena index of the subtree root. Quickselect leaves the
    /// median at its final slot, so the returned index stays valid while
    /// the recursion permutes the two halves.
    fn build_range(&mut self, start: usize, end: usize, phase: usize) -> Option<u32> {
        if start == end {
            return None;
        }
        let median = if end - start == 1 {
            start
        } else {
            self.select_median(start, end, phase)
        };
        let next = (phase + 1) % self.dims;
        let left = self.build_range(start, median, next);
        let right = self.build_range(median + 1, end, next);
        let node = &mut self.nodes[median];
        node.left = left;
        node.right = right;
        Some(median as u32)
    }

    /// Quickselect: partition `nodes[start..end]` around successive pivots
    /// until the median element sits at the midpoint slot.
    fn select_median(&mut self, start: usize, end: usize, phase: usize) -> usize {
        let md = start + (end - start) / 2;
        let mut lo = start;
        let mut hi = end;

        loop {
            if hi == lo + 1 {
                // The window has narrowed to the median slot itself.
                return md;
            }

            let pivot = self.nodes[md].coord[phase];
            self.nodes.swap(md, hi - 1);
            let mut store = lo;
            for p in lo..hi {
                if self.nodes[p].coord[phase] < pivot {
                    if p != store {
                        self.nodes.swap(p, store);
                    }
                    store += 1;
                }
            }
            self.nodes.swap(store, hi - 1);

            if store == md {
                return md;
            } else if store > md {
                hi = store;
            } else {
                lo = store + 1;
            }
        }
    }

    /// Walk the whole tree verifying the split invariant, returning the
    /// number of nodes visited.
    ///
    /// For every node splitting on axis `a`, all left descendants must
    /// have `coord[a] <= split` and all right descendants
    /// `coord[a] >= split`. Debug tooling: callers compare the return
    /// value against [`node_count`](Self::node_count) to confirm every
    /// node is reachable.
    ///
    /// # Panics
    ///
    /// Panics if the invariant is violated.
    pub fn check_invariant(&self) -> usize {
        match self.root {
            None => 0,
            Some(root) => self.check_node(root, 0, &mut |_| true),
        }
    }

    /// Recursive invariant walk: `admissible` accumulates the ancestor
    /// constraints that apply to every node of the current subtree.
    fn check_node(
        &self,
        node: u32,
        phase: usize,
        admissible: &mut dyn FnMut(&[f64; 3]) -> bool,
    ) -> usize {
        let n = &self.nodes[node as usize];
        assert!(
            admissible(&n.coord),
            "k-d split invariant violated at node {node}"
        );

        let split = n.coord[phase];
        let next = (phase + 1) % self.dims;
        let mut count = 1;

        if let Some(left) = n.left {
            let mut constrained = |c: &[f64; 3]| c[phase] <= split && admissible(c);
            count += self.check_node(left, next, &mut constrained);
        }
        if let Some(right) = n.right {
            let mut constrained = |c: &[f64; 3]| c[phase] >= split && admissible(c);
            count += self.check_node(right, next, &mut constrained);
        }
        count
    }
}
