//! Validity checks for clique minor embeddings against a hardware graph.

use crate::Chain;
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

// ============================================================================
// Public API
// ============================================================================

/// Reasons an embedding is not a valid clique minor.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EmbeddingError {
    /// A chain has no qubits.
    #[error("chain {0} is empty")]
    EmptyChain(usize),
    /// A chain uses a qubit that is not in the node list.
    #[error("chain {chain} uses qubit {qubit}, which is not in the graph")]
    UnknownQubit {
        /// Offending chain.
        chain: usize,
        /// Offending qubit.
        qubit: usize,
    },
    /// Two chains (or one chain twice) use the same qubit.
    #[error("qubit {qubit} is used by chains {first} and {second}")]
    Overlap {
        /// Shared qubit.
        qubit: usize,
        /// First chain using it.
        first: usize,
        /// Second chain using it.
        second: usize,
    },
    /// A chain does not induce a connected subgraph.
    #[error("chain {0} is not connected")]
    Disconnected(usize),
    /// Two chains share no coupler.
    #[error("chains {0} and {1} share no coupler")]
    NotCoupled(usize, usize),
    /// Fewer chains than requested.
    #[error("embedding has {got} chains, expected at least {expected}")]
    TooFewChains {
        /// Requested clique size.
        expected: usize,
        /// Chains present.
        got: usize,
    },
}

/// Checks that `emb` is a clique minor of the graph `(nodes, edges)`:
/// chains are non-empty, use only graph qubits, are pairwise disjoint, each induce a
/// connected subgraph, and every pair of chains is joined by at least one edge.
///
/// # Errors
/// Returns the first violation found.
pub fn verify_embedding(
    nodes: &[usize],
    edges: &[(usize, usize)],
    emb: &[Chain],
) -> Result<(), EmbeddingError> {
    let node_set: HashSet<usize> = nodes.iter().copied().collect();

    let mut owner: HashMap<usize, usize> = HashMap::new();
    for (i, chain) in emb.iter().enumerate() {
        if chain.is_empty() {
            return Err(EmbeddingError::EmptyChain(i));
        }
        for &q in chain {
            if !node_set.contains(&q) {
                return Err(EmbeddingError::UnknownQubit { chain: i, qubit: q });
            }
            if let Some(&first) = owner.get(&q) {
                return Err(EmbeddingError::Overlap { qubit: q, first, second: i });
            }
            owner.insert(q, i);
        }
    }

    let mut adj: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut coupled: HashSet<(usize, usize)> = HashSet::new();
    for &(a, b) in edges {
        let (Some(&ca), Some(&cb)) = (owner.get(&a), owner.get(&b)) else {
            continue;
        };
        if ca == cb {
            adj.entry(a).or_default().push(b);
            adj.entry(b).or_default().push(a);
        } else {
            coupled.insert((ca.min(cb), ca.max(cb)));
        }
    }

    for (i, chain) in emb.iter().enumerate() {
        if !is_connected(chain, &adj) {
            return Err(EmbeddingError::Disconnected(i));
        }
    }

    for i in 0..emb.len() {
        for j in (i + 1)..emb.len() {
            if !coupled.contains(&(i, j)) {
                return Err(EmbeddingError::NotCoupled(i, j));
            }
        }
    }

    Ok(())
}

/// Like [`verify_embedding`], additionally requiring at least `size` chains.
///
/// # Errors
/// Returns [`EmbeddingError::TooFewChains`] or the first structural violation.
pub fn verify_clique(
    nodes: &[usize],
    edges: &[(usize, usize)],
    emb: &[Chain],
    size: usize,
) -> Result<(), EmbeddingError> {
    if emb.len() < size {
        return Err(EmbeddingError::TooFewChains { expected: size, got: emb.len() });
    }
    verify_embedding(nodes, edges, emb)
}

/// Length of the longest chain (0 for an empty embedding).
pub fn max_chain_length(emb: &[Chain]) -> usize {
    emb.iter().map(Vec::len).max().unwrap_or(0)
}

// ============================================================================
// Internal
// ============================================================================

/// `adj` only holds intra-chain edges, so a BFS from the first qubit stays inside the chain.
fn is_connected(chain: &[usize], adj: &HashMap<usize, Vec<usize>>) -> bool {
    let mut seen: HashSet<usize> = HashSet::with_capacity(chain.len());
    let mut queue = VecDeque::from([chain[0]]);
    seen.insert(chain[0]);
    while let Some(q) = queue.pop_front() {
        for &n in adj.get(&q).map(Vec::as_slice).unwrap_or_default() {
            if seen.insert(n) {
                queue.push_back(n);
            }
        }
    }
    seen.len() == chain.len()
}

// ============================================================================
// Tests
// ============================================================================
