//! Clique search orchestration: width selection, bound tightening and realization sweeps.
//!
//! There is one strategy per lattice family:
//! - **Chimera** grows the width from the coverage lower bound and takes the first width whose
//!   best placement holds enough chains. Every chain of a width-`w` placement has length
//!   `w + 1`, so that value is the bound carried between realizations, and later realizations
//!   only search strictly narrower widths.
//! - **Pegasus** first discovers an embedding at the smallest workable width, then refines it:
//!   the clique cache is rebuilt with a predicate that only admits ells strictly shorter than
//!   the current bound, and the same width is retried after every improvement.
//!
//! The running embedding and bound live in a [`SearchState`] threaded through every realization
//! of the defective lattice. Strategies only write it when they accept a candidate.

use crate::bundles::{BundleCache, Ell};
use crate::cells::CellCache;
use crate::clique_cache::CliqueCache;
use crate::small_cliques::{find_generic_1, find_generic_2, find_generic_3, find_generic_4};
use crate::topo_cache::TopoCache;
use crate::topology::{ChimeraSpec, PegasusSpec, TopoSpec, Topology};
use crate::{Chain, Embedding};
use tracing::{debug, info, trace};

// ============================================================================
// Configuration
// ============================================================================

/// Search budget parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CliqueSearchConfig {
    /// Maximum number of distinct realizations searched per call.
    pub max_realizations: usize,
    /// Pegasus: after an acceptance at width `w`, widths above `w + refine_window` are skipped.
    pub refine_window: usize,
    /// Pegasus: with a bound carried in from an earlier realization, widths up to
    /// `bound * bound_width_factor` are searched.
    pub bound_width_factor: usize,
}

impl Default for CliqueSearchConfig {
    fn default() -> Self {
        Self {
            max_realizations: 64,
            refine_window: 6,
            bound_width_factor: 6,
        }
    }
}

// ============================================================================
// Chain-length helpers
// ============================================================================

/// Length of the `size`-th shortest chain of `emb`.
///
/// Keeping only the `size` shortest chains yields an embedding whose longest chain has exactly
/// this length. `emb` itself is not modified. Returns 0 for `size == 0`.
///
/// # Panics
/// Panics if `emb` has fewer than `size` chains.
pub fn truncated_max_length(emb: &[Chain], size: usize) -> usize {
    let Some(last) = size.checked_sub(1) else {
        return 0;
    };
    let mut lengths: Vec<usize> = emb.iter().map(Vec::len).collect();
    lengths.sort_unstable();
    lengths[last]
}

/// Keeps the `size` shortest chains of `emb` (stable with respect to equal lengths).
pub fn trim_to_shortest(emb: &mut Embedding, size: usize) {
    emb.sort_by_key(Vec::len);
    emb.truncate(size);
}

// ============================================================================
// Search state
// ============================================================================

/// Running best embedding and chain-length bound for one call.
///
/// `max_length == 0` means no bound has been established yet. Otherwise it is the longest
/// relevant chain of `embedding` (Chimera: `width + 1` of the accepted width) and only ever
/// decreases.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchState {
    /// Best embedding accepted so far; may hold more chains than requested.
    pub embedding: Embedding,
    /// Current bound (0 = unknown).
    pub max_length: usize,
}

impl SearchState {
    /// Empty state with no bound.
    pub fn new() -> Self {
        Self::default()
    }

    fn accept(&mut self, embedding: Embedding, max_length: usize) {
        debug_assert!(self.max_length == 0 || max_length <= self.max_length);
        self.embedding = embedding;
        self.max_length = max_length;
    }

    /// Moves the result into `out`: the `size` shortest chains on success, nothing on failure.
    pub fn finish(mut self, size: usize, out: &mut Embedding) -> bool {
        if self.embedding.len() >= size {
            trim_to_shortest(&mut self.embedding, size);
            *out = self.embedding;
            true
        } else {
            out.clear();
            false
        }
    }
}

// ============================================================================
// Strategies
// ============================================================================

/// Outcome of the degenerate-size check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shortcut {
    /// Solved directly; the embedding is final.
    Solved,
    /// The size is handled directly and no embedding exists.
    Failed,
    /// Run the general search.
    Search,
}

/// Family-specific search policy.
pub trait CliqueStrategy: TopoSpec {
    /// Searches one realization, updating `state` only on acceptance.
    ///
    /// Returns `true` if the family's success criterion holds after this realization.
    fn search(
        cells: &CellCache<'_, Self>,
        size: usize,
        state: &mut SearchState,
        cfg: &CliqueSearchConfig,
    ) -> bool;

    /// Routes sizes with a direct construction. The default handles sizes 0 to 2.
    fn shortcut(
        nodes: &[usize],
        edges: &[(usize, usize)],
        size: usize,
        emb: &mut Embedding,
    ) -> Shortcut {
        trivial_shortcut(nodes, edges, size, emb)
    }
}

fn trivial_shortcut(
    nodes: &[usize],
    edges: &[(usize, usize)],
    size: usize,
    emb: &mut Embedding,
) -> Shortcut {
    let solved = match size {
        0 => {
            emb.clear();
            true
        }
        1 => find_generic_1(nodes, emb),
        2 => find_generic_2(edges, emb),
        _ => return Shortcut::Search,
    };
    if solved {
        Shortcut::Solved
    } else {
        Shortcut::Failed
    }
}

impl CliqueStrategy for ChimeraSpec {
    fn search(
        cells: &CellCache<'_, Self>,
        size: usize,
        state: &mut SearchState,
        _cfg: &CliqueSearchConfig,
    ) -> bool {
        let bundles = BundleCache::new(cells);
        let shore = cells.topo.shore();
        let [rows, cols] = cells.topo.dim();

        if size <= shore {
            for y in 0..rows {
                for x in 0..cols {
                    let ell = Ell::cell(y, x);
                    if bundles.score(&ell) >= size {
                        let mut emb = Vec::new();
                        bundles.inflate(&ell, &mut emb);
                        debug!(y, x, chains = emb.len(), "clique fits in a single cell");
                        state.accept(emb, 2);
                        return true;
                    }
                }
            }
        }

        let minw = size.div_ceil(shore).max(1);
        let mut maxw = rows.min(cols);
        if state.max_length > 0 {
            // Only widths strictly narrower than the accepted one can improve on it.
            maxw = maxw.min(state.max_length.saturating_sub(2));
        }

        for width in minw..=maxw {
            let rects = CliqueCache::new(&bundles, width);
            let Some(emb) = rects.iter().next() else {
                trace!(width, "no placement");
                continue;
            };
            if emb.len() < size {
                trace!(width, chains = emb.len(), "too few chains");
                continue;
            }
            debug!(width, chains = emb.len(), "accepted width");
            state.accept(emb, width + 1);
            return true;
        }
        false
    }
}

impl CliqueStrategy for PegasusSpec {
    fn search(
        cells: &CellCache<'_, Self>,
        size: usize,
        state: &mut SearchState,
        cfg: &CliqueSearchConfig,
    ) -> bool {
        let bundles = BundleCache::new(cells);
        let [rows, cols] = cells.topo.dim();
        let extent = rows.min(cols);
        let mut minw = size.div_ceil(2).max(1);
        let mut maxw = extent;

        if state.max_length == 0 {
            // Discovery: the first width with enough chains, whatever their length.
            loop {
                if minw > maxw {
                    return false;
                }
                let rects = CliqueCache::new(&bundles, minw);
                let mut emb = Vec::new();
                if rects.extract_solution(&mut emb) && emb.len() >= size {
                    let bound = truncated_max_length(&emb, size);
                    debug!(width = minw, max_length = bound, "discovered first embedding");
                    state.accept(emb, bound);
                    maxw = maxw.min(minw.saturating_add(cfg.refine_window));
                    break;
                }
                minw += 1;
            }
        } else {
            maxw = extent.min(state.max_length.saturating_mul(cfg.bound_width_factor));
        }

        // Refinement: only ells strictly shorter than the bound may carry chains.
        let mut w = minw;
        while w <= maxw {
            let bound = state.max_length;
            let lengths = &bundles;
            let rects =
                CliqueCache::with_filter(&bundles, w, move |ell: &Ell| lengths.length(ell) < bound);
            let mut emb = Vec::new();
            if rects.extract_solution(&mut emb) && emb.len() >= size {
                let tlen = truncated_max_length(&emb, size);
                if tlen < bound {
                    debug!(width = w, max_length = tlen, "tightened bound");
                    state.accept(emb, tlen);
                    maxw = maxw.min(w.saturating_add(cfg.refine_window));
                    // The tighter bound may unlock more at this same width.
                    continue;
                }
            }
            trace!(width = w, max_length = bound, "no improvement");
            w += 1;
        }
        state.embedding.len() >= size
    }

    fn shortcut(
        nodes: &[usize],
        edges: &[(usize, usize)],
        size: usize,
        emb: &mut Embedding,
    ) -> Shortcut {
        let solved = match size {
            3 => find_generic_3(edges, emb),
            4 => find_generic_4(edges, emb),
            _ => return trivial_shortcut(nodes, edges, size, emb),
        };
        if solved {
            Shortcut::Solved
        } else {
            Shortcut::Search
        }
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Finds a clique minor of `size` chains in the graph `(nodes, edges)` of `topology`.
///
/// Searches every realization of the defective lattice (up to the default budget), keeping the
/// embedding with the shortest chains. On success `emb` holds exactly `size` chains; on failure
/// it is empty.
pub fn find_clique(
    topology: &Topology,
    nodes: &[usize],
    edges: &[(usize, usize)],
    size: usize,
    emb: &mut Embedding,
) -> bool {
    find_clique_with_config(topology, nodes, edges, size, emb, &CliqueSearchConfig::default())
}

/// [`find_clique`] with an explicit configuration.
pub fn find_clique_with_config(
    topology: &Topology,
    nodes: &[usize],
    edges: &[(usize, usize)],
    size: usize,
    emb: &mut Embedding,
    cfg: &CliqueSearchConfig,
) -> bool {
    match topology {
        Topology::Chimera(spec) => find_clique_in(spec, nodes, edges, size, emb, cfg),
        Topology::Pegasus(spec) => find_clique_in(spec, nodes, edges, size, emb, cfg),
    }
}

/// Generic form of [`find_clique_with_config`] for one family.
pub fn find_clique_in<T: CliqueStrategy>(
    topo: &T,
    nodes: &[usize],
    edges: &[(usize, usize)],
    size: usize,
    emb: &mut Embedding,
    cfg: &CliqueSearchConfig,
) -> bool {
    match T::shortcut(nodes, edges, size, emb) {
        Shortcut::Solved => return true,
        Shortcut::Failed => {
            emb.clear();
            return false;
        }
        Shortcut::Search => {}
    }

    let mut realizations = TopoCache::new(topo, nodes, edges, cfg.max_realizations);
    let mut state = SearchState::new();
    loop {
        let ok = T::search(realizations.cells(), size, &mut state, cfg);
        trace!(
            realization = realizations.realizations(),
            ok,
            max_length = state.max_length,
            "searched realization"
        );
        if !realizations.advance() {
            break;
        }
    }

    info!(
        size,
        realizations = realizations.realizations(),
        max_length = state.max_length,
        found = state.embedding.len() >= size,
        "clique search finished"
    );
    state.finish(size, emb)
}

/// Like [`find_clique`] but searches only the default realization, once.
pub fn find_clique_single_realization(
    topology: &Topology,
    nodes: &[usize],
    edges: &[(usize, usize)],
    size: usize,
    emb: &mut Embedding,
) -> bool {
    let cfg = CliqueSearchConfig::default();
    match topology {
        Topology::Chimera(spec) => single_realization_in(spec, nodes, edges, size, emb, &cfg),
        Topology::Pegasus(spec) => single_realization_in(spec, nodes, edges, size, emb, &cfg),
    }
}

fn single_realization_in<T: CliqueStrategy>(
    topo: &T,
    nodes: &[usize],
    edges: &[(usize, usize)],
    size: usize,
    emb: &mut Embedding,
    cfg: &CliqueSearchConfig,
) -> bool {
    if size == 0 {
        emb.clear();
        return true;
    }
    let cells = CellCache::new(topo, nodes, edges);
    let mut state = SearchState::new();
    T::search(&cells, size, &mut state, cfg);
    state.finish(size, emb)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{Orientation, Qubit};
    use crate::validate::{max_chain_length, verify_clique};

    fn chains_of_lengths(lengths: &[usize]) -> Embedding {
        let mut next = 0;
        lengths
            .iter()
            .map(|&len| {
                let chain = (next..next + len).collect();
                next += len;
                chain
            })
            .collect()
    }

    #[test]
    fn truncated_max_length_picks_size_th_shortest() {
        let emb = chains_of_lengths(&[5, 2, 9, 1]);
        assert_eq!(truncated_max_length(&emb, 3), 5);
        assert_eq!(truncated_max_length(&emb, 4), 9);
        assert_eq!(truncated_max_length(&emb, 1), 1);
        assert_eq!(truncated_max_length(&emb, 0), 0);
        // Input order is untouched.
        assert_eq!(emb[0].len(), 5);
    }

    #[test]
    fn trim_keeps_shortest_chains() {
        let mut emb = chains_of_lengths(&[5, 2, 9, 1]);
        trim_to_shortest(&mut emb, 3);
        let lengths: Vec<usize> = emb.iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![1, 2, 5]);
        let original = chains_of_lengths(&[5, 2, 9, 1]);
        assert_eq!(max_chain_length(&emb), truncated_max_length(&original, 3));
    }

    #[test]
    fn finish_clears_on_failure() {
        let state = SearchState { embedding: chains_of_lengths(&[1, 1]), max_length: 1 };
        let mut out = vec![vec![42]];
        assert!(!state.finish(3, &mut out));
        assert!(out.is_empty());
    }

    #[test]
    fn chimera_prefers_single_cell() {
        let spec = ChimeraSpec::new(2, 2, 4).unwrap();
        let (nodes, edges) = spec.graph();
        let cells = CellCache::new(&spec, &nodes, &edges);
        let mut state = SearchState::new();
        assert!(ChimeraSpec::search(&cells, 3, &mut state, &CliqueSearchConfig::default()));
        assert_eq!(state.max_length, 2);

        let mut emb = Vec::new();
        assert!(state.finish(3, &mut emb));
        assert_eq!(emb.len(), 3);
        let cell_of = |q: usize| {
            let c = spec.coordinates(q).unwrap();
            match c.u {
                Orientation::Vertical => (c.segment, c.line),
                Orientation::Horizontal => (c.line, c.segment),
            }
        };
        let home = cell_of(emb[0][0]);
        assert!(emb.iter().flatten().all(|&q| cell_of(q) == home));
        verify_clique(&nodes, &edges, &emb, 3).unwrap();
    }

    #[test]
    fn chimera_takes_first_sufficient_width() {
        let spec = ChimeraSpec::new(4, 4, 4).unwrap();
        let (nodes, edges) = spec.graph();
        let cells = CellCache::new(&spec, &nodes, &edges);
        let mut state = SearchState::new();
        assert!(ChimeraSpec::search(&cells, 9, &mut state, &CliqueSearchConfig::default()));
        assert_eq!(state.max_length, 4);
        assert_eq!(state.embedding.len(), 12);
        assert!(state.embedding.iter().all(|c| c.len() == 4));
    }

    #[test]
    fn chimera_never_researches_accepted_width() {
        let spec = ChimeraSpec::new(4, 4, 4).unwrap();
        let (nodes, edges) = spec.graph();
        let cells = CellCache::new(&spec, &nodes, &edges);
        let prior = chains_of_lengths(&[4; 9]);
        let mut state = SearchState { embedding: prior.clone(), max_length: 4 };
        // Width 3 was accepted before; only widths below 3 are searched and 9 chains need 3.
        assert!(!ChimeraSpec::search(&cells, 9, &mut state, &CliqueSearchConfig::default()));
        assert_eq!(state.embedding, prior);
        assert_eq!(state.max_length, 4);
    }

    #[test]
    fn chimera_too_large_fails_cleanly() {
        let topology = Topology::chimera(2, 2, 4).unwrap();
        let (nodes, edges) = topology.graph();
        let mut emb = vec![vec![0]];
        assert!(!find_clique(&topology, &nodes, &edges, 9, &mut emb));
        assert!(emb.is_empty());
    }

    #[test]
    fn pegasus_discovers_then_refines() {
        let spec = PegasusSpec::new(3).unwrap();
        let (nodes, edges) = spec.graph();
        let cells = CellCache::new(&spec, &nodes, &edges);
        let mut state = SearchState::new();
        assert!(PegasusSpec::search(&cells, 8, &mut state, &CliqueSearchConfig::default()));
        let bound = state.max_length;
        assert!(bound > 0);

        let mut emb = Vec::new();
        assert!(state.finish(8, &mut emb));
        assert_eq!(emb.len(), 8);
        assert_eq!(max_chain_length(&emb), bound);
        verify_clique(&nodes, &edges, &emb, 8).unwrap();
    }

    /// Bound reached by discovery alone: the first width with enough chains, truncated.
    fn discovery_bound<T: TopoSpec>(cells: &CellCache<'_, T>, size: usize) -> usize {
        let bundles = BundleCache::new(cells);
        let [rows, cols] = cells.topo.dim();
        for width in size.div_ceil(2)..=rows.min(cols) {
            let mut emb = Vec::new();
            if CliqueCache::new(&bundles, width).extract_solution(&mut emb) && emb.len() >= size {
                return truncated_max_length(&emb, size);
            }
        }
        0
    }

    #[test]
    fn pegasus_refinement_beats_discovery() {
        for (m, size) in [(3, 8), (4, 24)] {
            let spec = PegasusSpec::new(m).unwrap();
            let (nodes, edges) = spec.graph();
            let cells = CellCache::new(&spec, &nodes, &edges);
            let first = discovery_bound(&cells, size);
            assert!(first > 0);

            let mut state = SearchState::new();
            assert!(PegasusSpec::search(&cells, size, &mut state, &CliqueSearchConfig::default()));
            assert!(state.max_length < first, "m={m} size={size}: {} vs {first}", state.max_length);

            let mut emb = Vec::new();
            assert!(state.finish(size, &mut emb));
            verify_clique(&nodes, &edges, &emb, size).unwrap();
        }
    }

    #[test]
    fn pegasus_tightens_carried_bound() {
        let spec = PegasusSpec::new(3).unwrap();
        let (nodes, edges) = spec.graph();
        let cells = CellCache::new(&spec, &nodes, &edges);
        let stale = chains_of_lengths(&[6; 8]);
        let mut state = SearchState { embedding: stale.clone(), max_length: 6 };

        assert!(PegasusSpec::search(&cells, 8, &mut state, &CliqueSearchConfig::default()));
        assert!(state.max_length < 6);
        assert!(state.max_length <= discovery_bound(&cells, 8));
        assert_ne!(state.embedding, stale);

        let bound = state.max_length;
        let mut emb = Vec::new();
        assert!(state.finish(8, &mut emb));
        assert_eq!(max_chain_length(&emb), bound);
        verify_clique(&nodes, &edges, &emb, 8).unwrap();
    }

    #[test]
    fn huge_refine_window_saturates() {
        let spec = PegasusSpec::new(3).unwrap();
        let (nodes, edges) = spec.graph();
        let cfg = CliqueSearchConfig {
            refine_window: usize::MAX,
            bound_width_factor: usize::MAX,
            ..CliqueSearchConfig::default()
        };
        let mut emb = Vec::new();
        assert!(find_clique_in(&spec, &nodes, &edges, 8, &mut emb, &cfg));
        verify_clique(&nodes, &edges, &emb, 8).unwrap();
    }

    #[test]
    fn pegasus_bound_never_loosens_across_realizations() {
        let spec = PegasusSpec::new(3).unwrap();
        let (nodes, edges) = spec.graph();
        let cfg = CliqueSearchConfig::default();
        let mut state = SearchState::new();

        let full = CellCache::new(&spec, &nodes, &edges);
        assert!(PegasusSpec::search(&full, 10, &mut state, &cfg));
        let mut last = state.max_length;

        // A damaged realization cannot do better, and must not loosen the bound.
        let gone = spec.label(Qubit { u: Orientation::Vertical, line: 5, track: 0, segment: 1 });
        let fewer: Vec<usize> = nodes.iter().copied().filter(|&n| n != gone).collect();
        let damaged = CellCache::new(&spec, &fewer, &edges);
        for cells in [&damaged, &full] {
            assert!(PegasusSpec::search(cells, 10, &mut state, &cfg));
            assert!(state.max_length <= last);
            last = state.max_length;
        }
    }

    #[test]
    fn degenerate_sizes_bypass_search() {
        let topology = Topology::chimera(2, 2, 4).unwrap();
        let (nodes, _) = topology.graph();
        let mut emb = vec![vec![7]];

        assert!(find_clique(&topology, &nodes, &[], 0, &mut emb));
        assert!(emb.is_empty());

        assert!(find_clique(&topology, &nodes, &[], 1, &mut emb));
        assert_eq!(emb, vec![vec![nodes[0]]]);

        assert!(find_clique(&topology, &[], &[(3, 12)], 2, &mut emb));
        assert_eq!(emb, vec![vec![3], vec![12]]);

        assert!(!find_clique(&topology, &[], &[], 1, &mut emb));
        assert!(emb.is_empty());
        assert!(!find_clique(&topology, &nodes, &[], 3, &mut emb));
        assert!(emb.is_empty());
    }

    #[test]
    fn pegasus_small_sizes_use_direct_cliques() {
        let topology = Topology::pegasus(3).unwrap();
        let (nodes, edges) = topology.graph();
        for size in [3, 4] {
            let mut emb = Vec::new();
            assert!(find_clique(&topology, &nodes, &edges, size, &mut emb));
            assert_eq!(emb.len(), size);
            assert_eq!(max_chain_length(&emb), 1);
            verify_clique(&nodes, &edges, &emb, size).unwrap();
        }
    }

    #[test]
    fn pegasus_small_size_falls_through_without_odd_couplers() {
        let topology = Topology::pegasus(3).unwrap();
        let Topology::Pegasus(spec) = &topology else { unreachable!() };
        let (nodes, edges) = topology.graph();
        // Without odd couplers the graph is bipartite, so the general search must take over.
        let bipartite: Vec<(usize, usize)> = edges
            .iter()
            .copied()
            .filter(|&(a, b)| {
                let (qa, qb) = (spec.coordinates(a).unwrap(), spec.coordinates(b).unwrap());
                spec.coupler_kind(qa, qb) != Some(crate::topology::CouplerKind::Odd)
            })
            .collect();
        let mut emb = Vec::new();
        assert!(find_clique(&topology, &nodes, &bipartite, 4, &mut emb));
        assert_eq!(emb.len(), 4);
        assert!(max_chain_length(&emb) >= 2);
        verify_clique(&nodes, &bipartite, &emb, 4).unwrap();
    }

    #[test]
    fn single_realization_handles_size_zero() {
        let topology = Topology::pegasus(2).unwrap();
        let (nodes, edges) = topology.graph();
        let mut emb = vec![vec![1]];
        assert!(find_clique_single_realization(&topology, &nodes, &edges, 0, &mut emb));
        assert!(emb.is_empty());
    }

    #[test]
    fn default_config_matches_documented_constants() {
        let cfg = CliqueSearchConfig::default();
        assert_eq!(cfg.refine_window, 6);
        assert_eq!(cfg.bound_width_factor, 6);
        assert!(cfg.max_realizations >= 1);
    }
}
