use std::collections::BTreeMap;

use itertools::Itertools;

use crate::louvain_graph::LouvainGraph;
use crate::types::{CommID, DegreeMode, Partition, Weight};

/// Per-community degree accumulators for one local-moving level.
///
/// `community_degrees` sums the (weighted) degrees of every member vertex;
/// `community_in_degrees` accumulates the degree contributed by edges whose
/// both endpoints sit in the community, counted from the to-community side
/// of each move. Both tables are maintained incrementally while vertices
/// move and are authoritative as-is; they are never reconciled against a
/// fresh recount.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DegreeState {
    pub community_degrees: BTreeMap<CommID, Weight>,
    pub community_in_degrees: BTreeMap<CommID, Weight>,
}

impl DegreeState {
    fn seed(&mut self, com: CommID, degree: Weight) {
        self.community_degrees.insert(com, degree);
        self.community_in_degrees.insert(com, 0.0);
    }

    /// Apply the table deltas of moving a vertex between two communities.
    fn apply_move(
        &mut self,
        from: CommID,
        to: CommID,
        node_degree: Weight,
        aff_from: Weight,
        aff_to: Weight,
    ) {
        *self.community_degrees.get_mut(&from).unwrap() -= node_degree - aff_from;
        *self.community_degrees.get_mut(&to).unwrap() += node_degree - aff_to;
        *self.community_in_degrees.get_mut(&from).unwrap() -= aff_from;
        *self.community_in_degrees.get_mut(&to).unwrap() += aff_to;
    }
}

/// Outcome of one local-moving level.
#[derive(Debug, Clone)]
pub struct LevelResult {
    pub partition: Partition,
    pub degrees: DegreeState,
    /// True iff at least one vertex changed community during the level.
    pub improved: bool,
}

/// The affiliation table of one vertex: for every neighboring community,
/// the (weighted) degree the vertex shares with it, built in a single
/// adjacency traversal.
fn node_affiliation(
    graph: &LouvainGraph,
    communities: &[CommID],
    idx: usize,
    mode: DegreeMode,
) -> BTreeMap<CommID, Weight> {
    let mut degree_in_coms = BTreeMap::new();
    for (n_idx, weight) in graph.adj_of(idx) {
        let shared = match mode {
            DegreeMode::Unweighted => 1.0,
            DegreeMode::Weighted => *weight,
        };
        *degree_in_coms.entry(communities[*n_idx]).or_insert(0.0) += shared;
    }
    degree_in_coms
}

/// Compute one level of communities: greedy single-vertex moves, swept over
/// all vertices until a full pass makes no move.
///
/// `count_edges` is the edge count of this level's graph, the `m` of the
/// gain formula. The sweep has a strict sequential dependency: every move
/// updates `DegreeState`, which the next vertex's candidate evaluation in
/// the same pass reads.
pub fn one_level(graph: &LouvainGraph, count_edges: f64, mode: DegreeMode) -> LevelResult {
    let v_count = graph.v_size() as usize;

    // Dense per-vertex state, indexed by arena position. Every vertex
    // starts as its own singleton community.
    let mut communities: Vec<CommID> = Vec::with_capacity(v_count);
    let mut degrees: Vec<Weight> = Vec::with_capacity(v_count);
    let mut state = DegreeState::default();
    for idx in 0..v_count {
        let node = graph.node_at(idx);
        let degree = graph.degree_at(idx, mode);
        communities.push(node);
        degrees.push(degree);
        state.seed(node, degree);
    }

    let mut improvement = false;
    let mut modified = true;
    while modified {
        modified = false;
        for idx in 0..v_count {
            let node_degree = degrees[idx];
            let node_community = communities[idx];
            let node_com_tot_degree = state.community_degrees[&node_community];

            let degree_in_coms = node_affiliation(graph, &communities, idx, mode);
            let node_in_node_com_degree = degree_in_coms
                .get(&node_community)
                .copied()
                .unwrap_or(0.0);

            let mut best_mod = 0.0;
            let mut best_com = node_community;
            // Candidates are scanned in adjacency order and a move needs a
            // strictly positive gain, so the first community reaching the
            // maximum wins a tie.
            for (n_idx, _) in graph.adj_of(idx) {
                let neighbor_community = communities[*n_idx];
                if neighbor_community == node_community {
                    continue;
                }
                let neighbor_com_tot_degree = state.community_degrees[&neighbor_community];
                let node_in_neighbor_com_degree = degree_in_coms[&neighbor_community];

                let delta_modularity = (1.0 / count_edges)
                    * (node_in_neighbor_com_degree - node_in_node_com_degree)
                    - (node_degree / (2.0 * count_edges * count_edges))
                        * (node_degree + neighbor_com_tot_degree - node_com_tot_degree);

                if delta_modularity > best_mod {
                    best_mod = delta_modularity;
                    best_com = neighbor_community;
                }
            }

            if best_com != node_community {
                let node_in_best_com_degree = degree_in_coms[&best_com];
                state.apply_move(
                    node_community,
                    best_com,
                    node_degree,
                    node_in_node_com_degree,
                    node_in_best_com_degree,
                );
                communities[idx] = best_com;
                modified = true;
                improvement = true;
            }
        }
    }

    let partition: Partition = (0..v_count)
        .map(|idx| (graph.node_at(idx), communities[idx]))
        .collect();
    LevelResult {
        partition,
        degrees: state,
        improved: improvement,
    }
}

/// Compute the modularity of a partition from its degree accumulators.
///
/// Every distinct community contributes `(tot - in) / m - degree_sum^2 / m^2`
/// with `m = degree_sum / 2`. The second term charges the squared global
/// degree sum to every community identically, not the Newman-Girvan
/// per-community normalization; this scoring is a compatibility contract
/// and must not be swapped out.
pub fn modularity(partition: &Partition, degrees: &DegreeState, degree_sum: f64) -> f64 {
    let m = degree_sum / 2.0;
    let norm = 1.0 / (m * m);
    let mut res = 0.0;
    for com in partition.values().unique() {
        let tot = degrees.community_degrees.get(com).copied().unwrap_or(0.0);
        let inner = degrees
            .community_in_degrees
            .get(com)
            .copied()
            .unwrap_or(0.0);
        res += (tot - inner) / m - degree_sum * degree_sum * norm;
    }
    res
}
