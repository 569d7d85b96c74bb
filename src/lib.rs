//! Louvain community detection over undirected, optionally weighted graphs.
//!
//! The crate computes a hierarchical, modularity-maximizing partition of the
//! graph vertices: greedy local-moving passes refine a partition one level at
//! a time, the graph is coarsened into a super-vertex graph of communities,
//! and the per-level partitions are finally flattened into a single
//! vertex-to-community mapping over the original vertices.

pub mod community_algo;
pub mod config;
pub mod error;
pub mod logger;
pub mod louvain;
pub mod louvain_graph;
pub mod types;

pub use crate::community_algo::{modularity, one_level, DegreeState, LevelResult};
pub use crate::config::{EmptyGraphPolicy, LouvainConfig, DEFAULT_MIN_MOD_GROWTH};
pub use crate::error::CommunityError;
pub use crate::louvain::{Louvain, LouvainResult};
pub use crate::louvain_graph::LouvainGraph;
pub use crate::types::{CommID, DegreeMode, Partition, VInt, Weight};
