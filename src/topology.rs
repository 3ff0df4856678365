//! Lattice topologies (Chimera and Pegasus) described as grids of cells crossed by qubit lines.
//!
//! Both families share one coordinate model. The hardware is a `rows x cols` grid of cells.
//! Every qubit is either a **vertical** segment lying in one column or a **horizontal** segment
//! lying in one row, and covers a contiguous run of cells along that line. Each line carries
//! `shore` parallel tracks, so a qubit is addressed as `(orientation, line, track, segment)`.
//!
//! - Chimera `C(m, n, t)`: every segment covers exactly one cell.
//! - Pegasus `P(m)`: a `6(m-1) x 6(m-1)` grid with two tracks per line; each segment covers six
//!   cells and segment boundaries are staggered per line by an offset table.
//!
//! Couplers come in three kinds:
//! - **internal**: a vertical and a horizontal qubit whose segments cover a common cell;
//! - **external**: consecutive segments of the same track;
//! - **odd** (Pegasus only): the two tracks of one line at the same segment.

use std::fmt;
use thiserror::Error;

/// Largest supported shore; track masks are stored in a `u64`.
pub const MAX_SHORE: usize = 64;

/// Number of cells covered by one Pegasus qubit.
const PEGASUS_SPAN: usize = 6;

/// Default Pegasus offsets (in cells), indexed by `[orientation][line % 6]`.
pub const PEGASUS_DEFAULT_OFFSETS: [[u8; 6]; 2] = [[1, 1, 5, 3, 3, 1], [3, 3, 1, 1, 5, 3]];

// ============================================================================
// Coordinates
// ============================================================================

/// Orientation of a qubit segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Orientation {
    /// Lies in a column; its position along the line is a row index.
    Vertical,
    /// Lies in a row; its position along the line is a column index.
    Horizontal,
}

impl Orientation {
    /// Both orientations, vertical first.
    pub const ALL: [Orientation; 2] = [Orientation::Vertical, Orientation::Horizontal];

    /// `0` for vertical, `1` for horizontal.
    #[inline(always)]
    pub const fn index(self) -> usize {
        match self {
            Orientation::Vertical => 0,
            Orientation::Horizontal => 1,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Vertical => write!(f, "vertical"),
            Orientation::Horizontal => write!(f, "horizontal"),
        }
    }
}

/// Lattice coordinates of one qubit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Qubit {
    /// Orientation of the segment.
    pub u: Orientation,
    /// Column (vertical) or row (horizontal) the segment lies in.
    pub line: usize,
    /// Parallel track within the line, `< shore`.
    pub track: usize,
    /// Segment index along the line.
    pub segment: usize,
}

/// Kind of a lattice coupler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CouplerKind {
    /// Vertical/horizontal crossing inside a cell.
    Internal,
    /// Consecutive segments of one track.
    External,
    /// The two tracks of one line at the same segment.
    Odd,
}

// ============================================================================
// Topology trait
// ============================================================================

/// Static description of a lattice family.
///
/// Implementors only describe geometry and labelling; everything else (couplers, generators)
/// is derived from [`TopoSpec::segment`] and the label maps.
pub trait TopoSpec: Clone + fmt::Debug + Send + Sync {
    /// Grid extents `[rows, cols]` in cells.
    fn dim(&self) -> [usize; 2];

    /// Number of parallel tracks per line.
    fn shore(&self) -> usize;

    /// Segment index covering cell position `pos` on `line` of orientation `u`.
    fn segment(&self, u: Orientation, line: usize, pos: usize) -> usize;

    /// Upper bound on [`TopoSpec::num_segments`] over all lines.
    fn max_segments(&self) -> usize;

    /// Linear label of a qubit.
    fn label(&self, q: Qubit) -> usize;

    /// Inverse of [`TopoSpec::label`]; `None` for labels outside the lattice.
    fn coordinates(&self, label: usize) -> Option<Qubit>;

    /// Whether the family has odd couplers.
    fn has_odd_couplers(&self) -> bool {
        false
    }

    /// Number of lines of orientation `u`.
    #[inline]
    fn num_lines(&self, u: Orientation) -> usize {
        match u {
            Orientation::Vertical => self.dim()[1],
            Orientation::Horizontal => self.dim()[0],
        }
    }

    /// Number of cells along a line of orientation `u`.
    #[inline]
    fn line_extent(&self, u: Orientation) -> usize {
        match u {
            Orientation::Vertical => self.dim()[0],
            Orientation::Horizontal => self.dim()[1],
        }
    }

    /// Number of segments on `line` of orientation `u`.
    #[inline]
    fn num_segments(&self, u: Orientation, line: usize) -> usize {
        match self.line_extent(u) {
            0 => 0,
            extent => self.segment(u, line, extent - 1) + 1,
        }
    }

    /// Classifies the coupler between two qubits, if the lattice has one.
    fn coupler_kind(&self, a: Qubit, b: Qubit) -> Option<CouplerKind> {
        if a.u == b.u {
            if a.line != b.line {
                return None;
            }
            if a.track == b.track && a.segment.abs_diff(b.segment) == 1 {
                return Some(CouplerKind::External);
            }
            if self.has_odd_couplers() && a.segment == b.segment && (a.track ^ b.track) == 1 {
                return Some(CouplerKind::Odd);
            }
            return None;
        }
        let (v, h) = if a.u == Orientation::Vertical { (a, b) } else { (b, a) };
        // The vertical qubit lies in column v.line and the horizontal one in row h.line.
        let covers_v = self.segment(Orientation::Vertical, v.line, h.line) == v.segment;
        let covers_h = self.segment(Orientation::Horizontal, h.line, v.line) == h.segment;
        (covers_v && covers_h).then_some(CouplerKind::Internal)
    }

    /// Total number of qubits of the defect-free lattice.
    fn num_qubits(&self) -> usize {
        Orientation::ALL
            .iter()
            .map(|&u| {
                (0..self.num_lines(u))
                    .map(|line| self.num_segments(u, line))
                    .sum::<usize>()
                    * self.shore()
            })
            .sum()
    }

    /// Generates the node and edge lists of the defect-free lattice.
    ///
    /// Edges are emitted with the smaller label first.
    fn graph(&self) -> (Vec<usize>, Vec<(usize, usize)>) {
        let shore = self.shore();
        let [rows, cols] = self.dim();
        let mut nodes = Vec::with_capacity(self.num_qubits());
        let mut edges = Vec::new();
        let mut push_edge = |a: usize, b: usize| edges.push((a.min(b), a.max(b)));

        for u in Orientation::ALL {
            for line in 0..self.num_lines(u) {
                let nseg = self.num_segments(u, line);
                for segment in 0..nseg {
                    for track in 0..shore {
                        let q = self.label(Qubit { u, line, track, segment });
                        nodes.push(q);
                        if segment + 1 < nseg {
                            let next = Qubit { u, line, track, segment: segment + 1 };
                            push_edge(q, self.label(next));
                        }
                        if self.has_odd_couplers() && track % 2 == 0 && track + 1 < shore {
                            push_edge(q, self.label(Qubit { u, line, track: track + 1, segment }));
                        }
                    }
                }
            }
        }

        // A vertical segment lies in one column and a horizontal one in one row, so each pair
        // crosses in at most one cell and every internal coupler is visited exactly once.
        for y in 0..rows {
            for x in 0..cols {
                let sv = self.segment(Orientation::Vertical, x, y);
                let sh = self.segment(Orientation::Horizontal, y, x);
                for tv in 0..shore {
                    let qv = self.label(Qubit {
                        u: Orientation::Vertical,
                        line: x,
                        track: tv,
                        segment: sv,
                    });
                    for th in 0..shore {
                        let qh = self.label(Qubit {
                            u: Orientation::Horizontal,
                            line: y,
                            track: th,
                            segment: sh,
                        });
                        push_edge(qv, qh);
                    }
                }
            }
        }

        (nodes, edges)
    }
}

// ============================================================================
// Chimera
// ============================================================================

/// Chimera `C(m, n, t)`: `m x n` cells, each a complete bipartite `K_{t,t}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChimeraSpec {
    rows: usize,
    cols: usize,
    shore: usize,
}

impl ChimeraSpec {
    /// Creates a Chimera descriptor with `m` rows, `n` columns and shore `t`.
    ///
    /// # Errors
    /// Returns an error if the grid is empty or `t` is not in `1..=64`.
    pub fn new(m: usize, n: usize, t: usize) -> Result<Self, TopologyError> {
        if m == 0 || n == 0 {
            return Err(TopologyError::EmptyGrid { rows: m, cols: n });
        }
        if t == 0 || t > MAX_SHORE {
            return Err(TopologyError::ShoreOutOfRange(t));
        }
        Ok(Self { rows: m, cols: n, shore: t })
    }
}

impl TopoSpec for ChimeraSpec {
    #[inline]
    fn dim(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    #[inline]
    fn shore(&self) -> usize {
        self.shore
    }

    #[inline(always)]
    fn segment(&self, _u: Orientation, _line: usize, pos: usize) -> usize {
        pos
    }

    fn max_segments(&self) -> usize {
        self.rows.max(self.cols)
    }

    fn label(&self, q: Qubit) -> usize {
        let (y, x) = match q.u {
            Orientation::Vertical => (q.segment, q.line),
            Orientation::Horizontal => (q.line, q.segment),
        };
        ((y * self.cols + x) * 2 + q.u.index()) * self.shore + q.track
    }

    fn coordinates(&self, label: usize) -> Option<Qubit> {
        if label >= self.rows * self.cols * 2 * self.shore {
            return None;
        }
        let track = label % self.shore;
        let rest = label / self.shore;
        let cell = rest / 2;
        let (y, x) = (cell / self.cols, cell % self.cols);
        Some(if rest % 2 == 0 {
            Qubit { u: Orientation::Vertical, line: x, track, segment: y }
        } else {
            Qubit { u: Orientation::Horizontal, line: y, track, segment: x }
        })
    }
}

// ============================================================================
// Pegasus
// ============================================================================

/// Pegasus `P(m)` in cell coordinates: a `6(m-1)` square grid, shore 2, six-cell qubits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PegasusSpec {
    m: usize,
    offsets: [[u8; 6]; 2],
}

impl PegasusSpec {
    /// Creates a Pegasus descriptor with the default offset table.
    ///
    /// # Errors
    /// Returns an error if `m < 2`.
    pub fn new(m: usize) -> Result<Self, TopologyError> {
        Self::with_offsets(m, PEGASUS_DEFAULT_OFFSETS)
    }

    /// Creates a Pegasus descriptor with an explicit offset table.
    ///
    /// # Errors
    /// Returns an error if `m < 2` or any offset is not in `0..6`.
    pub fn with_offsets(m: usize, offsets: [[u8; 6]; 2]) -> Result<Self, TopologyError> {
        if m < 2 {
            return Err(TopologyError::PegasusTooSmall(m));
        }
        for u in Orientation::ALL {
            for (index, &value) in offsets[u.index()].iter().enumerate() {
                if usize::from(value) >= PEGASUS_SPAN {
                    return Err(TopologyError::OffsetOutOfRange { orientation: u, index, value });
                }
            }
        }
        Ok(Self { m, offsets })
    }

    /// The `m` parameter.
    #[inline]
    pub fn m(&self) -> usize {
        self.m
    }

    #[inline(always)]
    fn side(&self) -> usize {
        PEGASUS_SPAN * (self.m - 1)
    }
}

impl TopoSpec for PegasusSpec {
    #[inline]
    fn dim(&self) -> [usize; 2] {
        [self.side(), self.side()]
    }

    #[inline]
    fn shore(&self) -> usize {
        2
    }

    #[inline(always)]
    fn segment(&self, u: Orientation, line: usize, pos: usize) -> usize {
        let offset = usize::from(self.offsets[u.index()][line % PEGASUS_SPAN]);
        (pos + (PEGASUS_SPAN - offset) % PEGASUS_SPAN) / PEGASUS_SPAN
    }

    fn max_segments(&self) -> usize {
        self.m
    }

    fn label(&self, q: Qubit) -> usize {
        ((q.u.index() * self.side() + q.line) * 2 + q.track) * self.m + q.segment
    }

    fn coordinates(&self, label: usize) -> Option<Qubit> {
        let side = self.side();
        if label >= 2 * side * 2 * self.m {
            return None;
        }
        let segment = label % self.m;
        let rest = label / self.m;
        let track = rest % 2;
        let rest = rest / 2;
        let line = rest % side;
        let u = Orientation::ALL[rest / side];
        (segment < self.num_segments(u, line)).then_some(Qubit { u, line, track, segment })
    }

    fn has_odd_couplers(&self) -> bool {
        true
    }
}

// ============================================================================
// Topology
// ============================================================================

/// Closed set of supported lattice families.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    /// Sparse family: grid of `K_{t,t}` cells.
    Chimera(ChimeraSpec),
    /// Denser family.
    Pegasus(PegasusSpec),
}

impl Topology {
    /// Shorthand for `Topology::Chimera(ChimeraSpec::new(m, n, t)?)`.
    ///
    /// # Errors
    /// See [`ChimeraSpec::new`].
    pub fn chimera(m: usize, n: usize, t: usize) -> Result<Self, TopologyError> {
        ChimeraSpec::new(m, n, t).map(Topology::Chimera)
    }

    /// Shorthand for `Topology::Pegasus(PegasusSpec::new(m)?)`.
    ///
    /// # Errors
    /// See [`PegasusSpec::new`].
    pub fn pegasus(m: usize) -> Result<Self, TopologyError> {
        PegasusSpec::new(m).map(Topology::Pegasus)
    }

    /// Generates the defect-free node and edge lists.
    pub fn graph(&self) -> (Vec<usize>, Vec<(usize, usize)>) {
        match self {
            Topology::Chimera(spec) => spec.graph(),
            Topology::Pegasus(spec) => spec.graph(),
        }
    }

    /// Grid extents `[rows, cols]` in cells.
    pub fn dim(&self) -> [usize; 2] {
        match self {
            Topology::Chimera(spec) => spec.dim(),
            Topology::Pegasus(spec) => spec.dim(),
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::Chimera(spec) => {
                write!(f, "chimera({}, {}, {})", spec.rows, spec.cols, spec.shore)
            }
            Topology::Pegasus(spec) => write!(f, "pegasus({})", spec.m),
        }
    }
}

/// Invalid lattice parameters.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// The cell grid has no rows or no columns.
    #[error("cell grid must be non-empty (got {rows} x {cols})")]
    EmptyGrid {
        /// Requested rows.
        rows: usize,
        /// Requested columns.
        cols: usize,
    },
    /// Shore outside `1..=64`.
    #[error("shore must be in 1..={MAX_SHORE} (got {0})")]
    ShoreOutOfRange(usize),
    /// Pegasus requires `m >= 2`.
    #[error("pegasus size must be at least 2 (got {0})")]
    PegasusTooSmall(usize),
    /// A Pegasus offset is not in `0..6`.
    #[error("{orientation} offset {index} must be below 6 (got {value})")]
    OffsetOutOfRange {
        /// Orientation of the offending table row.
        orientation: Orientation,
        /// Position in the table row.
        index: usize,
        /// Offending value.
        value: u8,
    },
}

// ============================================================================
// Tests
// ============================================================================
