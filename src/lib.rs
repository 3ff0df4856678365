//! # Busclique
//!
//! Clique minor-embedding into defective Chimera and Pegasus lattices.
//!
//! Both lattice families are modelled as a grid of *lines*: every qubit lies along a vertical or
//! horizontal line, on one of a few parallel tracks, and is split into segments along the line.
//! A clique embedding is built from *ells*, L-shaped bundles of one vertical and one horizontal
//! run, placed by a dynamic program over nested rectangles.
//!
//! This crate provides:
//! - Topology descriptions with label/coordinate conversion and full-graph generation.
//! - Per-realization connectivity caches that reconcile missing couplers by deleting qubits.
//! - The rectangle dynamic program and the family-specific width/length search.
//! - Exact checks of the resulting embeddings.
//!
//! ## Quick Start
//!
//! ```
//! use busclique::prelude::*;
//!
//! let topology = Topology::chimera(4, 4, 4).unwrap();
//! let (nodes, edges) = topology.graph();
//!
//! let mut emb = Embedding::new();
//! assert!(find_clique(&topology, &nodes, &edges, 12, &mut emb));
//! assert_eq!(emb.len(), 12);
//! verify_clique(&nodes, &edges, &emb, 12).unwrap();
//! ```
//!
//! ## Defective Lattices
//!
//! ```
//! use busclique::prelude::*;
//!
//! let topology = Topology::pegasus(3).unwrap();
//! let (mut nodes, edges) = topology.graph();
//! nodes.retain(|&q| q % 17 != 0);
//!
//! let mut emb = Embedding::new();
//! if find_clique(&topology, &nodes, &edges, 6, &mut emb) {
//!     verify_clique(&nodes, &edges, &emb, 6).unwrap();
//! } else {
//!     assert!(emb.is_empty());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`topology`]: Lattice families, qubit coordinates and coupler classification.
//! - [`cells`]: Presence and link bitsets of one realization.
//! - [`bundles`]: Ells, their scores and chain lengths.
//! - [`clique_cache`]: Rectangle dynamic program for one width.
//! - [`topo_cache`]: Enumeration of alternate realizations.
//! - [`small_cliques`]: Direct constructions for sizes up to 4.
//! - [`find_clique`]: Search orchestration and entry points.
//! - [`validate`]: Embedding checks.
//! - [`defects`]: Random damage for experiments and tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::inline_always)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::missing_panics_doc)]

pub mod bundles;
pub mod cells;
pub mod clique_cache;
pub mod defects;
pub mod find_clique;
pub mod small_cliques;
pub mod topo_cache;
pub mod topology;
pub mod validate;

/// A chain: the qubit labels representing one logical vertex.
pub type Chain = Vec<usize>;

/// An embedding: one chain per logical vertex.
pub type Embedding = Vec<Chain>;

/// Re-export commonly used types for convenience.
pub mod prelude {
    pub use crate::find_clique::{
        find_clique, find_clique_single_realization, find_clique_with_config, CliqueSearchConfig,
    };
    pub use crate::topology::{ChimeraSpec, PegasusSpec, TopoSpec, Topology, TopologyError};
    pub use crate::validate::{max_chain_length, verify_clique, verify_embedding, EmbeddingError};
    pub use crate::{Chain, Embedding};
}
