//! Scoring and realization of ell-shaped chain bundles over rectangular cell spans.

use crate::cells::CellCache;
use crate::topology::{Orientation, Qubit, TopoSpec};
use crate::Embedding;

/// An ell: a vertical run in column `xc` over rows `y0..=y1` joined to a horizontal run in row
/// `yc` over columns `x0..=x1` at the corner cell `(yc, xc)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Ell {
    /// Corner row; the row of the horizontal run.
    pub yc: usize,
    /// Corner column; the column of the vertical run.
    pub xc: usize,
    /// First row of the vertical run.
    pub y0: usize,
    /// Last row of the vertical run.
    pub y1: usize,
    /// First column of the horizontal run.
    pub x0: usize,
    /// Last column of the horizontal run.
    pub x1: usize,
}

impl Ell {
    /// The 1x1 ell at cell `(y, x)`.
    #[inline]
    pub const fn cell(y: usize, x: usize) -> Self {
        Self { yc: y, xc: x, y0: y, y1: y, x0: x, x1: x }
    }
}

/// Precomputed usable-track bitsets for every segment interval of every line.
#[derive(Clone, Debug)]
pub struct BundleCache<'a, T: TopoSpec> {
    cells: &'a CellCache<'a, T>,
    /// `spans[u][line][s0 * nseg + s1]` for `s0 <= s1`.
    spans: [Vec<Vec<u64>>; 2],
}

impl<'a, T: TopoSpec> BundleCache<'a, T> {
    /// Precomputes span masks from a cell cache.
    pub fn new(cells: &'a CellCache<'a, T>) -> Self {
        let topo = cells.topo;
        let spans = Orientation::ALL.map(|u| {
            (0..topo.num_lines(u))
                .map(|line| {
                    let nseg = topo.num_segments(u, line);
                    let mut table = vec![0u64; nseg * nseg];
                    for s0 in 0..nseg {
                        let mut mask = cells.tracks(u, line, s0);
                        table[s0 * nseg + s0] = mask;
                        for s1 in (s0 + 1)..nseg {
                            mask &= cells.links(u, line, s1 - 1) & cells.tracks(u, line, s1);
                            table[s0 * nseg + s1] = mask;
                        }
                    }
                    table
                })
                .collect()
        });
        Self { cells, spans }
    }

    /// The underlying cell cache.
    #[inline]
    pub fn cells(&self) -> &'a CellCache<'a, T> {
        self.cells
    }

    /// Segment interval touched by cell positions `p0..=p1` of a line.
    #[inline(always)]
    fn segments(&self, u: Orientation, line: usize, p0: usize, p1: usize) -> (usize, usize) {
        let topo = self.cells.topo;
        (topo.segment(u, line, p0), topo.segment(u, line, p1))
    }

    /// Tracks of `line` that are unbroken across cell positions `p0..=p1`.
    #[inline]
    pub fn line_mask(&self, u: Orientation, line: usize, p0: usize, p1: usize) -> u64 {
        let (s0, s1) = self.segments(u, line, p0, p1);
        let nseg = self.cells.topo.num_segments(u, line);
        self.spans[u.index()][line][s0 * nseg + s1]
    }

    #[inline]
    fn masks(&self, ell: &Ell) -> (u64, u64) {
        debug_assert!(ell.y0 <= ell.yc && ell.yc <= ell.y1);
        debug_assert!(ell.x0 <= ell.xc && ell.xc <= ell.x1);
        (
            self.line_mask(Orientation::Vertical, ell.xc, ell.y0, ell.y1),
            self.line_mask(Orientation::Horizontal, ell.yc, ell.x0, ell.x1),
        )
    }

    /// Number of chains the ell can carry.
    #[inline]
    pub fn score(&self, ell: &Ell) -> usize {
        let (vm, hm) = self.masks(ell);
        vm.count_ones().min(hm.count_ones()) as usize
    }

    /// Number of qubits in each chain of the ell.
    #[inline]
    pub fn length(&self, ell: &Ell) -> usize {
        let (v0, v1) = self.segments(Orientation::Vertical, ell.xc, ell.y0, ell.y1);
        let (h0, h1) = self.segments(Orientation::Horizontal, ell.yc, ell.x0, ell.x1);
        (v1 - v0 + 1) + (h1 - h0 + 1)
    }

    /// Appends the ell's [`score`](Self::score) chains to `emb`.
    ///
    /// The i-th usable vertical track is paired with the i-th usable horizontal track; the two
    /// meet at the corner cell.
    pub fn inflate(&self, ell: &Ell, emb: &mut Embedding) {
        let topo = self.cells.topo;
        let (mut vm, mut hm) = self.masks(ell);
        let (v0, v1) = self.segments(Orientation::Vertical, ell.xc, ell.y0, ell.y1);
        let (h0, h1) = self.segments(Orientation::Horizontal, ell.yc, ell.x0, ell.x1);
        while vm != 0 && hm != 0 {
            let tv = vm.trailing_zeros() as usize;
            let th = hm.trailing_zeros() as usize;
            vm &= vm - 1;
            hm &= hm - 1;
            let mut chain = Vec::with_capacity((v1 - v0 + 1) + (h1 - h0 + 1));
            chain.extend((v0..=v1).map(|segment| {
                topo.label(Qubit { u: Orientation::Vertical, line: ell.xc, track: tv, segment })
            }));
            chain.extend((h0..=h1).map(|segment| {
                topo.label(Qubit { u: Orientation::Horizontal, line: ell.yc, track: th, segment })
            }));
            emb.push(chain);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{ChimeraSpec, PegasusSpec};
    use crate::validate::verify_embedding;

    #[test]
    fn chimera_single_cell_bundle() {
        let spec = ChimeraSpec::new(2, 2, 4).unwrap();
        let (nodes, edges) = spec.graph();
        let cells = CellCache::new(&spec, &nodes, &edges);
        let bundles = BundleCache::new(&cells);
        let ell = Ell::cell(1, 0);
        assert_eq!(bundles.score(&ell), 4);
        assert_eq!(bundles.length(&ell), 2);

        let mut emb = Vec::new();
        bundles.inflate(&ell, &mut emb);
        assert_eq!(emb.len(), 4);
        assert!(emb.iter().all(|c| c.len() == 2));
    }

    #[test]
    fn chimera_ell_length_is_height_plus_width() {
        let spec = ChimeraSpec::new(4, 4, 2).unwrap();
        let (nodes, edges) = spec.graph();
        let cells = CellCache::new(&spec, &nodes, &edges);
        let bundles = BundleCache::new(&cells);
        let ell = Ell { yc: 3, xc: 0, y0: 1, y1: 3, x0: 0, x1: 3 };
        assert_eq!(bundles.length(&ell), 7);
        assert_eq!(bundles.score(&ell), 2);

        let mut emb = Vec::new();
        bundles.inflate(&ell, &mut emb);
        verify_embedding(&nodes, &edges, &emb).unwrap();
    }

    #[test]
    fn broken_line_lowers_score() {
        let spec = ChimeraSpec::new(3, 3, 4).unwrap();
        let (mut nodes, edges) = spec.graph();
        let gone = spec.label(Qubit { u: Orientation::Vertical, line: 1, track: 2, segment: 1 });
        nodes.retain(|&n| n != gone);
        let cells = CellCache::new(&spec, &nodes, &edges);
        let bundles = BundleCache::new(&cells);
        assert_eq!(bundles.line_mask(Orientation::Vertical, 1, 0, 2), 0b1011);
        assert_eq!(bundles.line_mask(Orientation::Vertical, 1, 0, 0), 0b1111);
        assert_eq!(bundles.score(&Ell { yc: 0, xc: 1, y0: 0, y1: 2, x0: 0, x1: 2 }), 3);
    }

    #[test]
    fn pegasus_length_counts_segments() {
        let spec = PegasusSpec::new(3).unwrap();
        let (nodes, edges) = spec.graph();
        let cells = CellCache::new(&spec, &nodes, &edges);
        let bundles = BundleCache::new(&cells);
        // Column 0 (offset 1): rows 1..=6 are one segment; row 0 is a truncated segment.
        let inside = Ell { yc: 1, xc: 0, y0: 1, y1: 6, x0: 0, x1: 0 };
        let across = Ell { yc: 1, xc: 0, y0: 0, y1: 6, x0: 0, x1: 0 };
        assert_eq!(bundles.length(&inside), 2);
        assert_eq!(bundles.length(&across), 3);
        assert_eq!(bundles.score(&across), 2);

        let mut emb = Vec::new();
        bundles.inflate(&across, &mut emb);
        verify_embedding(&nodes, &edges, &emb).unwrap();
    }
}
