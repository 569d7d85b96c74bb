use thiserror::Error;

use crate::types::VInt;

/// Errors surfaced by the community detection core. Both are detected at
/// the point of use and returned immediately; nothing is retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommunityError {
    /// A query named a vertex that is not part of the graph.
    #[error("vertex {0} is not present in the graph")]
    InvalidGraph(VInt),

    /// The modularity gain denominator is undefined without edges.
    #[error("graph has no edges, modularity gain is undefined")]
    EmptyGraph,
}
