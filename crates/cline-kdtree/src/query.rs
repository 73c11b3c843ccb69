//! Neighbor queries: single nearest, all-within-radius, top-k.
//!
//! The three flavors share the same pruning skeleton: descend into the
//! side of the splitting plane containing the query point, then enter the
//! far side only if the squared gap along the split axis could still beat
//! the current threshold. What the threshold is — the best distance so
//! far, the fixed search radius, or the worst of the current roster —
//! is the only difference between them.

use crate::tree::KdTree;
use cline_space::dist_sq;

/// One query result: an individual and its squared distance to the query
/// point.
///
/// Distances are squared because every query prunes on squared values;
/// callers take the square root only when they need the metric distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NeighborHit {
    /// Subpopulation-local index of the individual found.
    pub individual: usize,
    /// Squared distance from the query point to the node that matched.
    pub dist_sq: f64,
}

/// Top-k candidate roster with worst-of-best tracking.
///
/// Entries only ever hold distances within the search radius, so in the
/// periodic case at most one image per individual can occupy a slot and
/// no deduplication is needed.
struct Roster {
    entries: Vec<NeighborHit>,
    cap: usize,
    worst: f64,
    worst_slot: usize,
}

impl Roster {
    fn new(cap: usize) -> Self {
        Self {
            entries: Vec::with_capacity(cap),
            cap,
            worst: -1.0,
            worst_slot: 0,
        }
    }

    fn full(&self) -> bool {
        self.entries.len() == self.cap
    }

    /// Consider a candidate; `radius_sq` gates admission while the roster
    /// is not yet full.
    fn offer(&mut self, hit: NeighborHit, radius_sq: f64) {
        if self.full() {
            if hit.dist_sq < self.worst {
                self.entries[self.worst_slot] = hit;
                // Rescan for the new worst of the best.
                self.worst = -1.0;
                for (slot, entry) in self.entries.iter().enumerate() {
                    if entry.dist_sq > self.worst {
                        self.worst = entry.dist_sq;
                        self.worst_slot = slot;
                    }
                }
            }
        } else if hit.dist_sq <= radius_sq {
            if hit.dist_sq > self.worst {
                self.worst = hit.dist_sq;
                self.worst_slot = self.entries.len();
            }
            self.entries.push(hit);
        }
    }
}

impl KdTree {
    /// Find the single nearest node to `point`, excluding nodes whose
    /// individual index equals `exclude`.
    ///
    /// No radius filter is applied during the descent; callers that only
    /// want neighbors within the interaction distance discard the result
    /// if it lands beyond it.
    pub fn nearest(&self, point: &[f64], exclude: Option<usize>) -> Option<NeighborHit> {
        let root = self.root?;
        let exclude = exclude.map(|i| i as u32);
        let mut best: Option<(u32, f64)> = None;
        self.nearest_rec(root, point, exclude, 0, &mut best);
        best.map(|(node, dist_sq)| NeighborHit {
            individual: self.nodes[node as usize].index as usize,
            dist_sq,
        })
    }

    fn nearest_rec(
        &self,
        node: u32,
        point: &[f64],
        exclude: Option<u32>,
        phase: usize,
        best: &mut Option<(u32, f64)>,
    ) {
        let n = &self.nodes[node as usize];
        let d = dist_sq(&n.coord, point, self.dims);
        let dx = n.coord[phase] - point[phase];
        let dx2 = dx * dx;

        if exclude != Some(n.index) && best.map_or(true, |(_, bd)| d < bd) {
            *best = Some((node, d));
        }

        let next = (phase + 1) % self.dims;
        let (near, far) = if dx > 0.0 {
            (n.left, n.right)
        } else {
            (n.right, n.left)
        };

        if let Some(child) = near {
            self.nearest_rec(child, point, exclude, next, best);
        }
        if let Some((_, bd)) = *best {
            if dx2 >= bd {
                return;
            }
        }
        if let Some(child) = far {
            self.nearest_rec(child, point, exclude, next, best);
        }
    }

    /// Visit every node within `radius_sq` of `point`, excluding the
    /// focal individual.
    ///
    /// In the periodic case the visitor fires once per qualifying node,
    /// and replicate nodes of one individual are distinct; callers that
    /// aggregate per individual are responsible for once-per-individual
    /// discipline.
    pub fn visit_within(
        &self,
        point: &[f64],
        radius_sq: f64,
        exclude: Option<usize>,
        visitor: &mut dyn FnMut(NeighborHit),
    ) {
        if let Some(root) = self.root {
            let exclude = exclude.map(|i| i as u32);
            self.visit_rec(root, point, radius_sq, exclude, 0, visitor);
        }
    }

    fn visit_rec(
        &self,
        node: u32,
        point: &[f64],
        radius_sq: f64,
        exclude: Option<u32>,
        phase: usize,
        visitor: &mut dyn FnMut(NeighborHit),
    ) {
        let n = &self.nodes[node as usize];
        let d = dist_sq(&n.coord, point, self.dims);
        let dx = n.coord[phase] - point[phase];
        let dx2 = dx * dx;

        if d <= radius_sq && exclude != Some(n.index) {
            visitor(NeighborHit {
                individual: n.index as usize,
                dist_sq: d,
            });
        }

        let next = (phase + 1) % self.dims;
        let (near, far) = if dx > 0.0 {
            (n.left, n.right)
        } else {
            (n.right, n.left)
        };

        if let Some(child) = near {
            self.visit_rec(child, point, radius_sq, exclude, next, visitor);
        }
        if dx2 > radius_sq {
            return;
        }
        if let Some(child) = far {
            self.visit_rec(child, point, radius_sq, exclude, next, visitor);
        }
    }

    /// Find up to `count` nearest nodes within `radius_sq` of `point`.
    ///
    /// While the roster is not yet full the pruning threshold is the
    /// search radius; once full, it tightens to the worst distance on the
    /// roster. Results are in roster order, not sorted by distance.
    pub fn nearest_k(
        &self,
        point: &[f64],
        count: usize,
        radius_sq: f64,
        exclude: Option<usize>,
    ) -> Vec<NeighborHit> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        if count == 0 {
            return Vec::new();
        }
        let exclude = exclude.map(|i| i as u32);
        let mut roster = Roster::new(count);
        self.nearest_k_rec(root, point, radius_sq, exclude, 0, &mut roster);
        roster.entries
    }

    fn nearest_k_rec(
        &self,
        node: u32,
        point: &[f64],
        radius_sq: f64,
        exclude: Option<u32>,
        phase: usize,
        roster: &mut Roster,
    ) {
        let n = &self.nodes[node as usize];
        let d = dist_sq(&n.coord, point, self.dims);
        let dx = n.coord[phase] - point[phase];
        let dx2 = dx * dx;

        if exclude != Some(n.index) {
            roster.offer(
                NeighborHit {
                    individual: n.index as usize,
                    dist_sq: d,
                },
                radius_sq,
            );
        }

        let next = (phase + 1) % self.dims;
        let (near, far) = if dx > 0.0 {
            (n.left, n.right)
        } else {
            (n.right, n.left)
        };

        if let Some(child) = near {
            self.nearest_k_rec(child, point, radius_sq, exclude, next, roster);
        }
        if roster.full() {
            if dx2 >= roster.worst {
                return;
            }
        } else if dx2 > radius_sq {
            return;
        }
        if let Some(child) = far {
            self.nearest_k_rec(child, point, radius_sq, exclude, next, roster);
        }
    }
}
