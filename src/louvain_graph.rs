use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};

use anyhow::{Context, Result};

use crate::config::READ_BUFFER_SIZE;
use crate::error::CommunityError;
use crate::types::{CommID, DegreeMode, Partition, VInt, Weight};

/// Undirected weighted graph backing one level of the Louvain hierarchy.
///
/// Vertices live in a dense arena (`nodes`), external vertex ids are mapped
/// to arena positions through `index`, and the adjacency stores
/// (arena-position, weight) pairs. A fresh graph is rebuilt for every
/// coarsened level, so community ids reused as vertex ids stay
/// bounds-checked through the arena.
#[derive(Debug, Default, Clone)]
pub struct LouvainGraph {
    nodes: Vec<VInt>,                // Arena: dense index to external id.
    index: BTreeMap<VInt, usize>,    // External id to arena position.
    adj: Vec<Vec<(usize, Weight)>>,  // Adjacency, one list per arena slot.
    e_size: u32,
    weight_sum: Weight,
}

impl LouvainGraph {
    pub fn new() -> LouvainGraph {
        Default::default()
    }

    /// Register a vertex and return its arena position. Idempotent.
    pub fn insert_vertex(&mut self, v: VInt) -> usize {
        if let Some(idx) = self.index.get(&v) {
            return *idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(v);
        self.index.insert(v, idx);
        self.adj.push(Vec::new());
        idx
    }

    /// Insert an undirected edge. A self loop is stored once in the
    /// adjacency but counts twice toward its vertex degree.
    pub fn insert_edge(&mut self, u: VInt, v: VInt, weight: Weight) {
        let u_idx = self.insert_vertex(u);
        let v_idx = self.insert_vertex(v);
        self.adj[u_idx].push((v_idx, weight));
        if u_idx != v_idx {
            self.adj[v_idx].push((u_idx, weight));
        }
        self.e_size += 1;
        self.weight_sum += weight;
    }

    pub fn from_edge_list(edges: &[(VInt, VInt)]) -> LouvainGraph {
        let mut graph = LouvainGraph::new();
        for (u, v) in edges {
            graph.insert_edge(*u, *v, 1.0);
        }
        graph
    }

    pub fn from_weighted_edge_list(edges: &[(VInt, VInt, Weight)]) -> LouvainGraph {
        let mut graph = LouvainGraph::new();
        for (u, v, weight) in edges {
            graph.insert_edge(*u, *v, *weight);
        }
        graph
    }

    /// Load a graph from a .graph file: a header line, then `v <id>` and
    /// `e <src> <dst> [weight]` lines.
    pub fn from_graph_file(file_path: &str) -> Result<LouvainGraph> {
        let graph_file = File::open(file_path)
            .with_context(|| format!("open graph file {}", file_path))?;
        let graph_reader = BufReader::with_capacity(READ_BUFFER_SIZE, graph_file);
        let mut graph = LouvainGraph::new();
        let mut line_count = 0u32;
        for line in graph_reader.lines() {
            let line = line?;
            line_count += 1;
            if line_count == 1 {
                // The first line, just skip it.
                continue;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            if tokens[0] == "v" && tokens.len() >= 2 {
                // Process Vertices.
                let parsed_vid = tokens[1].parse().context("file format error")?;
                graph.insert_vertex(parsed_vid);
            }
            if tokens[0] == "e" && tokens.len() >= 3 {
                // Process Edges.
                let parsed_src_vid = tokens[1].parse().context("file format error")?;
                let parsed_dst_vid = tokens[2].parse().context("file format error")?;
                let weight = if tokens.len() > 3 {
                    tokens[3].parse().context("file format error")?
                } else {
                    1.0
                };
                graph.insert_edge(parsed_src_vid, parsed_dst_vid, weight);
            }
        }
        Ok(graph)
    }

    pub fn v_size(&self) -> u32 {
        self.nodes.len() as u32
    }

    pub fn edge_count(&self) -> u32 {
        self.e_size
    }

    /// Sum of all edge weights, each undirected edge counted once.
    pub fn weight_sum(&self) -> Weight {
        self.weight_sum
    }

    /// Vertices in arena order, which is insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = VInt> + '_ {
        self.nodes.iter().copied()
    }

    pub(crate) fn idx_of(&self, v: VInt) -> Result<usize, CommunityError> {
        self.index
            .get(&v)
            .copied()
            .ok_or(CommunityError::InvalidGraph(v))
    }

    pub(crate) fn node_at(&self, idx: usize) -> VInt {
        self.nodes[idx]
    }

    pub(crate) fn adj_of(&self, idx: usize) -> &[(usize, Weight)] {
        &self.adj[idx]
    }

    pub fn neighbors(&self, v: VInt) -> Result<Vec<(VInt, Weight)>, CommunityError> {
        let idx = self.idx_of(v)?;
        Ok(self.adj[idx]
            .iter()
            .map(|(n_idx, weight)| (self.nodes[*n_idx], *weight))
            .collect())
    }

    pub fn degree(&self, v: VInt, mode: DegreeMode) -> Result<Weight, CommunityError> {
        Ok(self.degree_at(self.idx_of(v)?, mode))
    }

    pub(crate) fn degree_at(&self, idx: usize, mode: DegreeMode) -> Weight {
        let mut degree = 0.0;
        for (n_idx, weight) in &self.adj[idx] {
            let contribution = match mode {
                DegreeMode::Unweighted => 1.0,
                DegreeMode::Weighted => *weight,
            };
            degree += contribution;
            if *n_idx == idx {
                // Standard undirected accounting: a self loop adds twice.
                degree += contribution;
            }
        }
        degree
    }

    /// Enumerate every undirected edge exactly once, self loops included.
    pub fn edges(&self) -> Vec<(VInt, VInt, Weight)> {
        let mut edge_list = Vec::with_capacity(self.e_size as usize);
        for u_idx in 0..self.adj.len() {
            for (v_idx, weight) in &self.adj[u_idx] {
                if *v_idx >= u_idx {
                    edge_list.push((self.nodes[u_idx], self.nodes[*v_idx], *weight));
                }
            }
        }
        edge_list
    }

    /// Build the super-vertex graph of an unweighted level: every crossing
    /// edge contributes 1 to its community pair. Fails with `InvalidGraph`
    /// when the partition misses one of this graph's vertices.
    pub fn aggregate(&self, partition: &Partition) -> Result<LouvainGraph, CommunityError> {
        self.aggregate_inner(partition, DegreeMode::Unweighted)
    }

    /// Build the super-vertex graph of a weighted level: every crossing
    /// edge carries its stored weight over. Fails with `InvalidGraph`
    /// when the partition misses one of this graph's vertices.
    pub fn aggregate_weighted(
        &self,
        partition: &Partition,
    ) -> Result<LouvainGraph, CommunityError> {
        self.aggregate_inner(partition, DegreeMode::Weighted)
    }

    fn aggregate_inner(
        &self,
        partition: &Partition,
        mode: DegreeMode,
    ) -> Result<LouvainGraph, CommunityError> {
        let mut super_graph = LouvainGraph::new();
        // Every community becomes a super vertex, isolated ones included.
        // The partition must cover every vertex of this graph.
        for node in self.nodes() {
            let com = partition
                .get(&node)
                .copied()
                .ok_or(CommunityError::InvalidGraph(node))?;
            super_graph.insert_vertex(com);
        }
        let mut crossing = BTreeMap::<(CommID, CommID), Weight>::new();
        for (u, v, weight) in self.edges() {
            // Endpoints were validated above.
            let com_u = *partition.get(&u).unwrap();
            let com_v = *partition.get(&v).unwrap();
            if com_u == com_v {
                // Intra-community edges are dropped, not folded into
                // self loops on the super graph.
                continue;
            }
            let key = if com_u <= com_v {
                (com_u, com_v)
            } else {
                (com_v, com_u)
            };
            let carried = match mode {
                DegreeMode::Unweighted => 1.0,
                DegreeMode::Weighted => weight,
            };
            *crossing.entry(key).or_insert(0.0) += carried;
        }
        for ((com_u, com_v), weight) in crossing {
            super_graph.insert_edge(com_u, com_v, weight);
        }
        Ok(super_graph)
    }
}
