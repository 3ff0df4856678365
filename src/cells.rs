//! Per-line connectivity of one realization of a defective lattice.
//!
//! For every `(orientation, line, segment)` the cache stores two track bitsets:
//! - `present`: tracks whose qubit exists;
//! - `linked`: tracks whose external coupler to `segment + 1` exists.
//!
//! Internal couplers are not stored. Instead, any crossing of two present qubits whose internal
//! coupler is missing is reported as a [`Conflict`], and a realization deletes one endpoint of
//! each conflict. After that, every crossing of two present qubits is coupled.

use crate::topology::{CouplerKind, Orientation, Qubit, TopoSpec};
use std::collections::HashSet;

#[inline(always)]
const fn bit(v: usize) -> u64 {
    1u64 << v
}

/// A crossing of two present qubits whose internal coupler is missing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Conflict {
    /// The vertical endpoint.
    pub vertical: Qubit,
    /// The horizontal endpoint.
    pub horizontal: Qubit,
}

/// One realization's per-line presence and link bitsets.
#[derive(Clone, Debug)]
pub struct CellCache<'a, T: TopoSpec> {
    /// Topology the cache was built for.
    pub topo: &'a T,
    lines: usize,
    stride: usize,
    present: Vec<u64>,
    linked: Vec<u64>,
}

impl<'a, T: TopoSpec> CellCache<'a, T> {
    /// Builds the cache and applies the default realization: for each unresolved conflict the
    /// vertical endpoint is deleted.
    ///
    /// Labels and edges that are not part of the lattice are ignored.
    pub fn new(topo: &'a T, nodes: &[usize], edges: &[(usize, usize)]) -> Self {
        let (mut cells, conflicts) = Self::unresolved(topo, nodes, edges);
        for q in conflict_cover(&conflicts, |_| false) {
            cells.remove(q);
        }
        cells
    }

    /// Builds the cache without resolving conflicts; returns the conflicts in scan order.
    pub(crate) fn unresolved(
        topo: &'a T,
        nodes: &[usize],
        edges: &[(usize, usize)],
    ) -> (Self, Vec<Conflict>) {
        let [rows, cols] = topo.dim();
        let lines = rows.max(cols);
        let stride = topo.max_segments();
        let mut cells = Self {
            topo,
            lines,
            stride,
            present: vec![0; 2 * lines * stride],
            linked: vec![0; 2 * lines * stride],
        };

        for q in nodes.iter().filter_map(|&label| topo.coordinates(label)) {
            let idx = cells.index(q.u, q.line, q.segment);
            cells.present[idx] |= bit(q.track);
        }

        let mut internal = HashSet::new();
        for &(a, b) in edges {
            let (Some(qa), Some(qb)) = (topo.coordinates(a), topo.coordinates(b)) else {
                continue;
            };
            if !cells.is_present(qa) || !cells.is_present(qb) {
                continue;
            }
            match topo.coupler_kind(qa, qb) {
                Some(CouplerKind::External) => {
                    let lo = if qa.segment < qb.segment { qa } else { qb };
                    let idx = cells.index(lo.u, lo.line, lo.segment);
                    cells.linked[idx] |= bit(lo.track);
                }
                Some(CouplerKind::Internal) => {
                    internal.insert((a.min(b), a.max(b)));
                }
                Some(CouplerKind::Odd) | None => {}
            }
        }

        let mut conflicts = Vec::new();
        for y in 0..rows {
            for x in 0..cols {
                let sv = topo.segment(Orientation::Vertical, x, y);
                let sh = topo.segment(Orientation::Horizontal, y, x);
                let mut mv = cells.tracks(Orientation::Vertical, x, sv);
                while mv != 0 {
                    let tv = mv.trailing_zeros() as usize;
                    mv &= mv - 1;
                    let vertical =
                        Qubit { u: Orientation::Vertical, line: x, track: tv, segment: sv };
                    let lv = topo.label(vertical);
                    let mut mh = cells.tracks(Orientation::Horizontal, y, sh);
                    while mh != 0 {
                        let th = mh.trailing_zeros() as usize;
                        mh &= mh - 1;
                        let horizontal =
                            Qubit { u: Orientation::Horizontal, line: y, track: th, segment: sh };
                        let lh = topo.label(horizontal);
                        if !internal.contains(&(lv.min(lh), lv.max(lh))) {
                            conflicts.push(Conflict { vertical, horizontal });
                        }
                    }
                }
            }
        }

        (cells, conflicts)
    }

    /// Deletes a qubit from this realization.
    pub(crate) fn remove(&mut self, q: Qubit) {
        let idx = self.index(q.u, q.line, q.segment);
        self.present[idx] &= !bit(q.track);
        self.linked[idx] &= !bit(q.track);
        if q.segment > 0 {
            self.linked[idx - 1] &= !bit(q.track);
        }
    }

    #[inline(always)]
    fn index(&self, u: Orientation, line: usize, segment: usize) -> usize {
        debug_assert!(line < self.lines && segment < self.stride);
        (u.index() * self.lines + line) * self.stride + segment
    }

    /// Bitset of present tracks at `(u, line, segment)`.
    #[inline]
    pub fn tracks(&self, u: Orientation, line: usize, segment: usize) -> u64 {
        self.present[self.index(u, line, segment)]
    }

    /// Bitset of tracks at `(u, line, segment)` coupled to `segment + 1`.
    #[inline]
    pub fn links(&self, u: Orientation, line: usize, segment: usize) -> u64 {
        self.linked[self.index(u, line, segment)]
    }

    /// Returns whether a qubit is present in this realization.
    #[inline]
    pub fn is_present(&self, q: Qubit) -> bool {
        (self.tracks(q.u, q.line, q.segment) & bit(q.track)) != 0
    }

    /// Number of present qubits.
    pub fn qubit_count(&self) -> usize {
        self.present.iter().map(|m| m.count_ones() as usize).sum()
    }
}

/// Chooses qubits to delete so that every conflict loses an endpoint.
///
/// Conflicts are visited in order; one whose endpoints are both still present deletes the
/// endpoint chosen by `pick_horizontal(i)`. Deletions made redundant by later ones are then
/// dropped, so the result is a minimal cover. Returned in deletion order.
pub(crate) fn conflict_cover(
    conflicts: &[Conflict],
    mut pick_horizontal: impl FnMut(usize) -> bool,
) -> Vec<Qubit> {
    let mut deleted: HashSet<Qubit> = HashSet::new();
    let mut order = Vec::new();
    for (i, c) in conflicts.iter().enumerate() {
        if deleted.contains(&c.vertical) || deleted.contains(&c.horizontal) {
            continue;
        }
        let victim = if pick_horizontal(i) { c.horizontal } else { c.vertical };
        deleted.insert(victim);
        order.push(victim);
    }

    order.retain(|&q| {
        let redundant = conflicts.iter().all(|c| {
            let other = if c.vertical == q {
                c.horizontal
            } else if c.horizontal == q {
                c.vertical
            } else {
                return true;
            };
            deleted.contains(&other)
        });
        if redundant {
            deleted.remove(&q);
        }
        !redundant
    });
    order
}

// ============================================================================
// Tests
// ============================================================================
