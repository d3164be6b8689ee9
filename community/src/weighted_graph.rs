use crate::clustering::Partition;
use crate::network::Network;
use crate::{CommunityError, Result};
use fxhash::FxHashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Requirements on a node identifier: hashable, comparable and printable.
pub trait NodeId: Clone + Eq + Hash + Debug {}

impl<T: Clone + Eq + Hash + Debug> NodeId for T {}

/// Weighted graph over caller-chosen node identifiers.
///
/// Nodes are stored in insertion order and mapped to dense indices. Edges
/// without an explicit weight get weight 1. Adding an edge twice sums the
/// weights.
#[derive(Clone, Debug)]
pub struct WeightedGraph<N> {
    nodes: Vec<N>,
    index: FxHashMap<N, usize>,
    network: Network,
}

impl<N: NodeId> WeightedGraph<N> {
    /// Create an empty undirected graph.
    pub fn new_undirected() -> Self {
        Self::new(false)
    }

    /// Create an empty directed graph.
    pub fn new_directed() -> Self {
        Self::new(true)
    }

    fn new(directed: bool) -> Self {
        WeightedGraph {
            nodes: Vec::new(),
            index: FxHashMap::default(),
            network: Network::new(directed),
        }
    }

    /// Build an unweighted graph from an edge list. Endpoints are added as nodes
    /// in order of first appearance.
    pub fn from_edges(directed: bool, edges: impl IntoIterator<Item = (N, N)>) -> Self {
        let mut g = Self::new(directed);
        for (u, v) in edges {
            let a = g.add_node(u);
            let b = g.add_node(v);
            g.network.add_edge(a, b, 1.0);
        }
        g
    }

    /// Build a graph from a weighted edge list.
    pub fn from_weighted_edges(
        directed: bool,
        edges: impl IntoIterator<Item = (N, N, f64)>,
    ) -> Result<Self> {
        let mut g = Self::new(directed);
        for (u, v, w) in edges {
            g.add_edge(u, v, Some(w))?;
        }
        Ok(g)
    }

    /// Add `node` if it is not present, returning its dense index.
    pub fn add_node(&mut self, node: N) -> usize {
        if let Some(&i) = self.index.get(&node) {
            return i;
        }
        let i = self.network.add_node();
        self.index.insert(node.clone(), i);
        self.nodes.push(node);
        i
    }

    /// Add an edge between `u` and `v`, adding either endpoint if needed.
    /// `None` means weight 1. Weights must be finite.
    pub fn add_edge(&mut self, u: N, v: N, weight: Option<f64>) -> Result<()> {
        let weight = weight.unwrap_or(1.0);
        if !weight.is_finite() {
            return Err(CommunityError::config(format!(
                "edge {:?} -> {:?} has non-finite weight {}",
                u, v, weight
            )));
        }
        let a = self.add_node(u);
        let b = self.add_node(v);
        self.network.add_edge(a, b, weight);
        Ok(())
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct edges.
    pub fn edge_count(&self) -> usize {
        self.network.edge_count()
    }

    /// Total edge weight. Self-loops count once.
    pub fn size(&self) -> f64 {
        self.network.get_total_edge_weight()
    }

    /// True if edges are directed.
    pub fn is_directed(&self) -> bool {
        self.network.is_directed()
    }

    /// Node identifiers in insertion order.
    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    /// Identifier of the node with dense index `i`.
    pub fn node(&self, i: usize) -> &N {
        &self.nodes[i]
    }

    /// Dense index of `node`, if present.
    pub fn index_of(&self, node: &N) -> Option<usize> {
        self.index.get(node).copied()
    }

    /// Weight of the edge between `u` and `v`, if both exist and are connected.
    pub fn edge_weight(&self, u: &N, v: &N) -> Option<f64> {
        let a = self.index_of(u)?;
        let b = self.index_of(v)?;
        self.network.edge_weight(a, b)
    }

    /// Weighted degree of `node`.
    pub fn degree(&self, node: &N) -> Option<f64> {
        self.index_of(node).map(|i| self.network.degree(i))
    }

    /// Weighted in-degree of `node`.
    pub fn in_degree(&self, node: &N) -> Option<f64> {
        self.index_of(node).map(|i| self.network.in_degree(i))
    }

    /// Weighted out-degree of `node`.
    pub fn out_degree(&self, node: &N) -> Option<f64> {
        self.index_of(node).map(|i| self.network.out_degree(i))
    }

    /// The index-addressed network backing this graph.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Translate index cells into a partition of node identifiers.
    pub(crate) fn partition_from_cells(&self, cells: &[Vec<usize>]) -> Partition<N> {
        Partition::new(
            cells
                .iter()
                .map(|cell| cell.iter().map(|&i| self.nodes[i].clone()).collect())
                .collect(),
        )
    }
}

impl<N: NodeId> Default for WeightedGraph<N> {
    fn default() -> Self {
        Self::new_undirected()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nodes_keep_insertion_order() {
        let g = WeightedGraph::from_edges(false, [("b", "a"), ("a", "c"), ("b", "a")]);
        assert_eq!(g.nodes(), &["b", "a", "c"]);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.edge_weight(&"a", &"b"), Some(2.0));
        assert_eq!(g.size(), 3.0);
        assert_eq!(g.degree(&"a"), Some(3.0));
    }

    #[test]
    fn rejects_non_finite_weights() {
        let mut g = WeightedGraph::new_undirected();
        assert!(g.add_edge(0, 1, Some(f64::NAN)).is_err());
        assert!(g.add_edge(0, 1, Some(f64::INFINITY)).is_err());
        assert_eq!(g.node_count(), 0);
        assert!(g.add_edge(0, 1, None).is_ok());
        assert_eq!(g.edge_weight(&0, &1), Some(1.0));
    }

    #[test]
    fn directed_degrees_by_id() -> Result<()> {
        let g = WeightedGraph::from_weighted_edges(true, [(1u32, 2, 0.5), (3, 2, 2.0)])?;
        assert!(g.is_directed());
        assert_eq!(g.in_degree(&2), Some(2.5));
        assert_eq!(g.out_degree(&2), Some(0.0));
        assert_eq!(g.edge_weight(&2, &1), None);
        assert_eq!(g.degree(&7), None);
        Ok(())
    }
}
