//! Realization cache: steps through structurally distinct defect-avoidance choices.
//!
//! Realization `r` is described by a choice bit per conflict (bit `i` of `r` set: delete the
//! horizontal endpoint of conflict `i`). Bits beyond the 63rd are always clear. Choice vectors
//! are visited by increasing number of set bits, so every conflict is flipped on its own before
//! any pair is. Different choice vectors often produce the same deletion set, so sets already
//! produced are skipped.

use crate::cells::{conflict_cover, CellCache, Conflict};
use crate::topology::TopoSpec;
use std::collections::HashSet;
use tracing::trace;

/// Candidate choice vectors examined per realization budget unit before giving up.
const ATTEMPTS_PER_REALIZATION: usize = 16;

/// Wraps a cell cache and advances it through alternate realizations.
#[derive(Debug)]
pub struct TopoCache<'a, T: TopoSpec> {
    raw: CellCache<'a, T>,
    conflicts: Vec<Conflict>,
    cells: CellCache<'a, T>,
    choice: u64,
    bits: u32,
    seen: HashSet<Vec<usize>>,
    produced: usize,
    attempts: usize,
    max_realizations: usize,
}

impl<'a, T: TopoSpec> TopoCache<'a, T> {
    /// Builds the cache positioned at the first realization.
    ///
    /// At most `max_realizations` distinct realizations are produced (at least one).
    pub fn new(
        topo: &'a T,
        nodes: &[usize],
        edges: &[(usize, usize)],
        max_realizations: usize,
    ) -> Self {
        let (raw, conflicts) = CellCache::unresolved(topo, nodes, edges);
        let bits = conflicts.len().min(63) as u32;
        let (cells, key) = realize(&raw, &conflicts, 0);
        let mut seen = HashSet::new();
        seen.insert(key);
        trace!(conflicts = conflicts.len(), "built realization cache");
        Self {
            raw,
            conflicts,
            cells,
            choice: 0,
            bits,
            seen,
            produced: 1,
            attempts: 0,
            max_realizations: max_realizations.max(1),
        }
    }

    /// The current realization.
    #[inline]
    pub fn cells(&self) -> &CellCache<'a, T> {
        &self.cells
    }

    /// Missing internal couplers between present qubits, in scan order.
    #[inline]
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    /// Number of realizations produced so far (including the current one).
    #[inline]
    pub fn realizations(&self) -> usize {
        self.produced
    }

    /// Moves to the next distinct realization; returns `false` once none remain.
    pub fn advance(&mut self) -> bool {
        let budget = self.max_realizations.saturating_mul(ATTEMPTS_PER_REALIZATION);
        while self.produced < self.max_realizations && self.attempts < budget {
            let Some(choice) = next_choice(self.choice, self.bits) else {
                return false;
            };
            self.choice = choice;
            self.attempts += 1;
            let (cells, key) = realize(&self.raw, &self.conflicts, choice);
            if self.seen.insert(key) {
                self.cells = cells;
                self.produced += 1;
                return true;
            }
        }
        false
    }
}

/// Next `bits`-bit vector after `x`: the same number of set bits in increasing order, then the
/// smallest vector with one more bit. `None` once all `2^bits` vectors were visited.
fn next_choice(x: u64, bits: u32) -> Option<u64> {
    debug_assert!(bits < 64);
    if x != 0 {
        // Gosper's hack.
        let low = x & x.wrapping_neg();
        let ripple = x + low;
        let next = (((ripple ^ x) >> 2) / low) | ripple;
        if next < (1u64 << bits) {
            return Some(next);
        }
    }
    let ones = x.count_ones() + 1;
    (ones <= bits).then(|| (1u64 << ones) - 1)
}

/// Applies choice vector `choice`; returns the cells and the sorted deleted labels.
fn realize<'a, T: TopoSpec>(
    raw: &CellCache<'a, T>,
    conflicts: &[Conflict],
    choice: u64,
) -> (CellCache<'a, T>, Vec<usize>) {
    let mut cells = raw.clone();
    let deleted = conflict_cover(conflicts, |i| i < 63 && (choice >> i) & 1 == 1);
    let mut key: Vec<usize> = deleted.iter().map(|&q| raw.topo.label(q)).collect();
    key.sort_unstable();
    for q in deleted {
        cells.remove(q);
    }
    (cells, key)
}

// ============================================================================
// Tests
// ============================================================================
