//! Direct constructions for tiny cliques (sizes 0 through 4).
//!
//! Sizes 3 and 4 look for a `K_3` / `K_4` subgraph so that every chain is a single qubit. For
//! each vertex `v` the search packs the neighbours of `v` with larger labels into `u64` bitsets
//! and runs a branch-and-bound clique search with a greedy-coloring bound (Tomita-style).

use crate::Embedding;
use std::collections::{BTreeMap, HashSet};

/// Local neighbourhoods are truncated to this many vertices.
const LOCAL_LIMIT: usize = 64;

#[inline(always)]
const fn bit(v: usize) -> u64 {
    1u64 << v
}

#[inline(always)]
const fn low_bits(n: usize) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

// ============================================================================
// Public API
// ============================================================================

/// One chain holding the first node.
pub fn find_generic_1(nodes: &[usize], emb: &mut Embedding) -> bool {
    emb.clear();
    match nodes.first() {
        Some(&q) => {
            emb.push(vec![q]);
            true
        }
        None => false,
    }
}

/// Two chains holding the endpoints of the first edge that is not a self-loop.
pub fn find_generic_2(edges: &[(usize, usize)], emb: &mut Embedding) -> bool {
    emb.clear();
    match edges.iter().find(|(a, b)| a != b) {
        Some(&(a, b)) => {
            emb.extend([vec![a], vec![b]]);
            true
        }
        None => false,
    }
}

/// A triangle of single-qubit chains.
pub fn find_generic_3(edges: &[(usize, usize)], emb: &mut Embedding) -> bool {
    find_generic_clique(edges, 3, emb)
}

/// A `K_4` of single-qubit chains.
pub fn find_generic_4(edges: &[(usize, usize)], emb: &mut Embedding) -> bool {
    find_generic_clique(edges, 4, emb)
}

/// Finds a `K_k` subgraph and writes it as `k` single-qubit chains.
///
/// Vertices are tried in increasing label order, so results are deterministic. Only the first
/// 64 larger-labelled neighbours of each vertex are searched.
pub fn find_generic_clique(edges: &[(usize, usize)], k: usize, emb: &mut Embedding) -> bool {
    emb.clear();
    if k == 0 {
        return true;
    }

    let mut adj: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut edge_set: HashSet<(usize, usize)> = HashSet::with_capacity(edges.len());
    for &(a, b) in edges {
        if a == b || !edge_set.insert((a.min(b), a.max(b))) {
            continue;
        }
        adj.entry(a).or_default().push(b);
        adj.entry(b).or_default().push(a);
    }

    let mut search = LocalCliqueSearch::default();
    let mut local_adj = Vec::with_capacity(LOCAL_LIMIT);
    let mut found = Vec::with_capacity(k);

    for (&v, neighbors) in &adj {
        let mut higher: Vec<usize> = neighbors.iter().copied().filter(|&n| n > v).collect();
        higher.sort_unstable();
        higher.truncate(LOCAL_LIMIT);
        if higher.len() + 1 < k {
            continue;
        }

        local_adj.clear();
        for &a in &higher {
            let mut row = 0u64;
            for (j, &b) in higher.iter().enumerate() {
                if a != b && edge_set.contains(&(a.min(b), a.max(b))) {
                    row |= bit(j);
                }
            }
            local_adj.push(row);
        }

        if search.find(&local_adj, k - 1, low_bits(higher.len()), &mut found) {
            emb.push(vec![v]);
            emb.extend(found.iter().map(|&i| vec![higher[i]]));
            return true;
        }
    }
    false
}

// ============================================================================
// Local clique search
// ============================================================================

/// Branch-and-bound search over a bitset graph of at most 64 vertices.
#[derive(Clone, Debug, Default)]
struct LocalCliqueSearch {
    stack: Vec<usize>,
}

impl LocalCliqueSearch {
    /// Writes one clique of size `k` within `candidates` to `out` if it exists.
    fn find(&mut self, adj: &[u64], k: usize, candidates: u64, out: &mut Vec<usize>) -> bool {
        out.clear();
        self.stack.clear();
        self.search(adj, k, 0, candidates, out)
    }

    fn search(
        &mut self,
        adj: &[u64],
        k: usize,
        size: usize,
        mut candidates: u64,
        out: &mut Vec<usize>,
    ) -> bool {
        if size >= k {
            out.clear();
            out.extend_from_slice(&self.stack);
            return true;
        }

        let remaining = candidates.count_ones() as usize;
        if size + remaining < k {
            return false;
        }

        let mut ranked = Vec::with_capacity(remaining);
        color_rank(adj, candidates, &mut ranked);

        for &(v, color) in ranked.iter().rev() {
            if size + usize::from(color) < k {
                return false;
            }

            self.stack.push(v);
            if self.search(adj, k, size + 1, candidates & adj[v], out) {
                return true;
            }
            self.stack.pop();
            candidates &= !bit(v);
        }
        false
    }
}

/// Greedy coloring of `candidates` into `ranked` as `(vertex, color)` pairs.
///
/// Colors are non-decreasing along `ranked`, and the color of an entry bounds the clique size
/// among it and the entries before it.
fn color_rank(adj: &[u64], mut candidates: u64, ranked: &mut Vec<(usize, u8)>) {
    ranked.clear();
    let mut color: u8 = 0;
    while candidates != 0 {
        color += 1;
        let mut class = candidates;
        while class != 0 {
            let v = class.trailing_zeros() as usize;
            ranked.push((v, color));
            candidates &= !bit(v);
            class &= !(bit(v) | adj[v]);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
