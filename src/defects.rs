//! Random damage of a lattice graph, for experiments and tests.

use rand::Rng;

/// Removes each node with probability `node_loss` and each surviving edge with probability
/// `edge_loss`. Edges touching a removed node are dropped too.
///
/// Probabilities are clamped to `[0, 1]`; NaN counts as no loss. Input order is preserved.
pub fn damage<R: Rng>(
    rng: &mut R,
    nodes: &[usize],
    edges: &[(usize, usize)],
    node_loss: f64,
    edge_loss: f64,
) -> (Vec<usize>, Vec<(usize, usize)>) {
    let node_loss = probability(node_loss);
    let edge_loss = probability(edge_loss);

    let kept: Vec<usize> = nodes.iter().copied().filter(|_| !rng.random_bool(node_loss)).collect();
    let mut alive = kept.clone();
    alive.sort_unstable();

    let kept_edges = edges
        .iter()
        .copied()
        .filter(|&(a, b)| alive.binary_search(&a).is_ok() && alive.binary_search(&b).is_ok())
        .filter(|_| !rng.random_bool(edge_loss))
        .collect();
    (kept, kept_edges)
}

#[inline]
fn probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}
