//! Per-width dynamic program that packs nested ell bundles into a clique.
//!
//! A width-`W` clique lives in a `W x W` block of cells and is built from `W` nested regions
//! `R_0, ..., R_{W-1}`. Region `R_k` has height `k + 1` and width `W - k`; `R_{k+1}` is `R_k`
//! with one row added (top or bottom) and one column dropped (left or right).
//!
//! Family `k` is the ell in `R_k` whose horizontal run is the row added to form `R_k` (across
//! the full width of `R_k`) and whose vertical run is the column dropped to form `R_{k+1}`
//! (across the full height of `R_k`). Rows only grow and columns only shrink, so for `k < l`
//! the vertical run of family `l` crosses the horizontal run of family `k`: every pair of chains
//! is coupled, and no row or column is used twice.
//!
//! The program maximizes the total bundle score over all placements. Ells rejected by the
//! optional predicate contribute no chains.

use crate::bundles::{BundleCache, Ell};
use crate::topology::TopoSpec;
use crate::Embedding;
use std::cmp::Reverse;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RowSide {
    Top,
    Bottom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ColSide {
    Left,
    Right,
}

const ROW_SIDES: [RowSide; 2] = [RowSide::Top, RowSide::Bottom];
const COL_SIDES: [ColSide; 2] = [ColSide::Left, ColSide::Right];

/// Best partial clique ending in one region; `from` records the transition into it.
#[derive(Clone, Copy, Debug)]
struct Entry {
    score: usize,
    from: Option<(RowSide, ColSide)>,
}

/// All regions of one height. Entries are indexed by `(y, x, added-row side)`.
#[derive(Clone, Debug)]
struct Layer {
    h: usize,
    wd: usize,
    ny: usize,
    nx: usize,
    entries: Vec<Option<Entry>>,
}

impl Layer {
    fn new(rows: usize, cols: usize, h: usize, wd: usize) -> Self {
        let ny = rows + 1 - h;
        let nx = cols + 1 - wd;
        Self { h, wd, ny, nx, entries: vec![None; ny * nx * 2] }
    }

    #[inline(always)]
    fn index(&self, y: usize, x: usize, side: RowSide) -> usize {
        (y * self.nx + x) * 2 + side as usize
    }

    #[inline]
    fn get(&self, y: usize, x: usize, side: RowSide) -> Option<Entry> {
        self.entries[self.index(y, x, side)]
    }

    /// The family ell of the region at `(y, x)` with the given corner.
    #[inline]
    fn ell(&self, y: usize, x: usize, side: RowSide, col: ColSide) -> Ell {
        let (y1, x1) = (y + self.h - 1, x + self.wd - 1);
        Ell {
            yc: if side == RowSide::Top { y } else { y1 },
            xc: if col == ColSide::Left { x } else { x1 },
            y0: y,
            y1,
            x0: x,
            x1,
        }
    }
}

/// A complete placement: the last region and its added-row side.
#[derive(Clone, Copy, Debug)]
struct Terminal {
    score: usize,
    y: usize,
    x: usize,
    side: RowSide,
}

/// Search structure for cliques confined to one width.
pub struct CliqueCache<'a, T: TopoSpec> {
    bundles: &'a BundleCache<'a, T>,
    width: usize,
    layers: Vec<Layer>,
    terminals: Vec<Terminal>,
    filter: Box<dyn Fn(&Ell) -> bool + 'a>,
}

impl<'a, T: TopoSpec> CliqueCache<'a, T> {
    /// Runs the program for `width` with every ell allowed.
    pub fn new(bundles: &'a BundleCache<'a, T>, width: usize) -> Self {
        Self::with_filter(bundles, width, |_: &Ell| true)
    }

    /// Runs the program for `width`; ells for which `filter` returns `false` carry no chains.
    ///
    /// A width of zero or one exceeding the grid yields an empty cache.
    pub fn with_filter(
        bundles: &'a BundleCache<'a, T>,
        width: usize,
        filter: impl Fn(&Ell) -> bool + 'a,
    ) -> Self {
        let mut cache = Self {
            bundles,
            width,
            layers: Vec::new(),
            terminals: Vec::new(),
            filter: Box::new(filter),
        };
        let [rows, cols] = bundles.cells().topo.dim();
        if width > 0 && width <= rows.min(cols) {
            cache.fill(rows, cols);
        }
        cache
    }

    /// The width this cache was built for.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of chains in the best placement (0 if there is none).
    pub fn best_score(&self) -> usize {
        self.best().map_or(0, |t| t.score)
    }

    #[inline]
    fn family_score(&self, ell: &Ell) -> usize {
        if (self.filter)(ell) {
            self.bundles.score(ell)
        } else {
            0
        }
    }

    fn fill(&mut self, rows: usize, cols: usize) {
        let w = self.width;

        let mut first = Layer::new(rows, cols, 1, w);
        for y in 0..first.ny {
            for x in 0..first.nx {
                // A single row: top and bottom coincide.
                let idx = first.index(y, x, RowSide::Top);
                first.entries[idx] = Some(Entry { score: 0, from: None });
            }
        }
        self.layers.push(first);

        for k in 0..(w - 1) {
            let cur = &self.layers[k];
            let mut next = Layer::new(rows, cols, cur.h + 1, cur.wd - 1);
            for y in 0..cur.ny {
                for x in 0..cur.nx {
                    for side in ROW_SIDES {
                        let Some(entry) = cur.get(y, x, side) else {
                            continue;
                        };
                        for col in COL_SIDES {
                            let score = entry.score + self.family_score(&cur.ell(y, x, side, col));
                            let nx = if col == ColSide::Left { x + 1 } else { x };
                            for nside in ROW_SIDES {
                                let ny = match nside {
                                    RowSide::Top => match y.checked_sub(1) {
                                        Some(ny) => ny,
                                        None => continue,
                                    },
                                    RowSide::Bottom => y,
                                };
                                if ny >= next.ny {
                                    continue;
                                }
                                let idx = next.index(ny, nx, nside);
                                if next.entries[idx].is_none_or(|e| score > e.score) {
                                    next.entries[idx] =
                                        Some(Entry { score, from: Some((side, col)) });
                                }
                            }
                        }
                    }
                }
            }
            self.layers.push(next);
        }

        let last = &self.layers[w - 1];
        let mut terminals = Vec::new();
        for y in 0..last.ny {
            for x in 0..last.nx {
                for side in ROW_SIDES {
                    if let Some(entry) = last.get(y, x, side) {
                        // One column left: both corners coincide.
                        let ell = last.ell(y, x, side, ColSide::Left);
                        let score = entry.score + self.family_score(&ell);
                        terminals.push(Terminal { score, y, x, side });
                    }
                }
            }
        }
        self.terminals = terminals;
    }

    fn best(&self) -> Option<Terminal> {
        let mut best: Option<Terminal> = None;
        for &t in &self.terminals {
            if best.is_none_or(|b| t.score > b.score) {
                best = Some(t);
            }
        }
        best.filter(|t| t.score > 0)
    }

    /// Walks the recorded transitions back from a terminal; returns families in order.
    fn families(&self, t: Terminal) -> Vec<Ell> {
        let w = self.width;
        let mut ells = Vec::with_capacity(w);
        let (mut y, mut x, mut side) = (t.y, t.x, t.side);
        ells.push(self.layers[w - 1].ell(y, x, side, ColSide::Left));
        for k in (1..w).rev() {
            let Some(Entry { from: Some((prev_side, col)), .. }) = self.layers[k].get(y, x, side)
            else {
                break;
            };
            if side == RowSide::Top {
                y += 1;
            }
            if col == ColSide::Left {
                x -= 1;
            }
            side = prev_side;
            ells.push(self.layers[k - 1].ell(y, x, side, col));
        }
        ells.reverse();
        ells
    }

    fn inflate(&self, t: Terminal, emb: &mut Embedding) {
        for ell in self.families(t) {
            if (self.filter)(&ell) {
                self.bundles.inflate(&ell, emb);
            }
        }
    }

    /// Writes the best placement into `emb` (replacing its contents).
    ///
    /// Returns `false`, leaving `emb` empty, if no placement carries any chain.
    pub fn extract_solution(&self, emb: &mut Embedding) -> bool {
        emb.clear();
        match self.best() {
            Some(t) => {
                self.inflate(t, emb);
                true
            }
            None => false,
        }
    }

    /// Iterates over all placements carrying at least one chain, best first.
    pub fn iter(&self) -> CliqueIterator<'_, 'a, T> {
        let mut order: Vec<usize> = (0..self.terminals.len())
            .filter(|&i| self.terminals[i].score > 0)
            .collect();
        order.sort_by_key(|&i| Reverse(self.terminals[i].score));
        CliqueIterator { cache: self, order: order.into_iter() }
    }
}

/// Finite, non-restartable sequence of candidate embeddings from a [`CliqueCache`].
pub struct CliqueIterator<'c, 'a, T: TopoSpec> {
    cache: &'c CliqueCache<'a, T>,
    order: std::vec::IntoIter<usize>,
}

impl<T: TopoSpec> Iterator for CliqueIterator<'_, '_, T> {
    type Item = Embedding;

    fn next(&mut self) -> Option<Embedding> {
        let i = self.order.next()?;
        let mut emb = Vec::new();
        self.cache.inflate(self.cache.terminals[i], &mut emb);
        Some(emb)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::CellCache;
    use crate::topology::{ChimeraSpec, Orientation, PegasusSpec, Qubit};
    use crate::validate::{max_chain_length, verify_clique, verify_embedding};

    #[test]
    fn full_chimera_block_gives_native_clique() {
        let spec = ChimeraSpec::new(4, 4, 4).unwrap();
        let (nodes, edges) = spec.graph();
        let cells = CellCache::new(&spec, &nodes, &edges);
        let bundles = BundleCache::new(&cells);
        let rects = CliqueCache::new(&bundles, 4);
        let mut emb = Vec::new();
        assert!(rects.extract_solution(&mut emb));
        assert_eq!(emb.len(), 16);
        assert!(emb.iter().all(|c| c.len() == 5));
        verify_clique(&nodes, &edges, &emb, 16).unwrap();
    }

    #[test]
    fn narrow_width_on_wide_grid() {
        let spec = ChimeraSpec::new(3, 5, 2).unwrap();
        let (nodes, edges) = spec.graph();
        let cells = CellCache::new(&spec, &nodes, &edges);
        let bundles = BundleCache::new(&cells);
        let rects = CliqueCache::new(&bundles, 2);
        assert_eq!(rects.width(), 2);
        assert_eq!(rects.best_score(), 4);
        let mut emb = Vec::new();
        assert!(rects.extract_solution(&mut emb));
        assert_eq!(max_chain_length(&emb), 3);
        verify_embedding(&nodes, &edges, &emb).unwrap();
    }

    #[test]
    fn oversized_width_is_empty() {
        let spec = ChimeraSpec::new(2, 3, 4).unwrap();
        let (nodes, edges) = spec.graph();
        let cells = CellCache::new(&spec, &nodes, &edges);
        let bundles = BundleCache::new(&cells);
        for width in [0, 3] {
            let rects = CliqueCache::new(&bundles, width);
            let mut emb = vec![vec![1]];
            assert!(!rects.extract_solution(&mut emb));
            assert!(emb.is_empty());
            assert_eq!(rects.iter().count(), 0);
        }
    }

    #[test]
    fn iterator_is_best_first_and_valid() {
        let spec = ChimeraSpec::new(3, 3, 4).unwrap();
        let (mut nodes, edges) = spec.graph();
        let gone = spec.label(Qubit { u: Orientation::Horizontal, line: 1, track: 0, segment: 1 });
        nodes.retain(|&n| n != gone);
        let cells = CellCache::new(&spec, &nodes, &edges);
        let bundles = BundleCache::new(&cells);
        let rects = CliqueCache::new(&bundles, 2);

        let mut best = Vec::new();
        assert!(rects.extract_solution(&mut best));
        let all: Vec<Embedding> = rects.iter().collect();
        assert!(!all.is_empty());
        assert_eq!(all[0].len(), best.len());
        for pair in all.windows(2) {
            assert!(pair[0].len() >= pair[1].len());
        }
        for emb in &all {
            verify_embedding(&nodes, &edges, emb).unwrap();
        }
    }

    #[test]
    fn filter_can_reject_everything() {
        let spec = ChimeraSpec::new(2, 2, 4).unwrap();
        let (nodes, edges) = spec.graph();
        let cells = CellCache::new(&spec, &nodes, &edges);
        let bundles = BundleCache::new(&cells);
        let rects = CliqueCache::with_filter(&bundles, 2, |_: &Ell| false);
        let mut emb = Vec::new();
        assert!(!rects.extract_solution(&mut emb));
        assert_eq!(rects.best_score(), 0);
    }

    #[test]
    fn length_filter_prunes_long_ells() {
        let spec = PegasusSpec::new(3).unwrap();
        let (nodes, edges) = spec.graph();
        let cells = CellCache::new(&spec, &nodes, &edges);
        let bundles = BundleCache::new(&cells);
        let open = CliqueCache::new(&bundles, 4);
        let mut emb = Vec::new();
        assert!(open.extract_solution(&mut emb));
        assert_eq!(emb.len(), 8);
        verify_embedding(&nodes, &edges, &emb).unwrap();
        let longest = max_chain_length(&emb);

        let b = &bundles;
        let tight = CliqueCache::with_filter(&bundles, 4, move |ell: &Ell| b.length(ell) < longest);
        let mut short = Vec::new();
        if tight.extract_solution(&mut short) {
            assert!(max_chain_length(&short) < longest);
            verify_embedding(&nodes, &edges, &short).unwrap();
        }
    }
}
