use std::collections::BTreeMap;

/// Vertex identifier, unique inside one level of the hierarchy.
pub type VInt = u32;

/// Community identifier, drawn from the vertex id space of its level.
pub type CommID = VInt;

/// Edge weight.
pub type Weight = f64;

/// A full vertex-to-community assignment for one level.
/// Every vertex of the level appears exactly once; community ids need not
/// be contiguous.
pub type Partition = BTreeMap<VInt, CommID>;

/// Selects how vertex degrees are accounted during a local-moving level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegreeMode {
    /// Every adjacency entry counts 1, whatever its stored weight.
    Unweighted,
    /// Every adjacency entry counts its stored weight.
    Weighted,
}
