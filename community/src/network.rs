use crate::clustering::check_cover;
use crate::graph::{AdjGraph, DiEdge, EdgeReferences};
use crate::{CommunityError, Result};
use fxhash::FxHashMap;
use rayon::prelude::{IndexedParallelIterator, ParallelIterator};
use rayon::slice::ParallelSlice;

/// Per-node list of `(neighbor, weight)` pairs in adjacency insertion order.
pub type NeighborWeights = Vec<Vec<(usize, f64)>>;

/// Relative tolerance allowed when checking that coarsening preserves total edge weight.
const WEIGHT_CONSERVATION_TOLERANCE: f64 = 1e-9;

/// Index-addressed weighted graph. Nodes are `0..nodes()`.
///
/// Coarse graphs built by Louvain carry a `members` list per node naming the
/// original node indices that the coarse node stands for. An empty list means
/// the node stands only for itself.
#[derive(Clone, Debug, Default)]
pub struct Network {
    pub(crate) graph: AdjGraph,
    members: Vec<Vec<usize>>,
}

/// Iterator over pairs of (adjacent node id, edge_weight) for all neighbors of a chosen node.
pub struct NeighborAndWeightIter<'a> {
    edge_iter: std::slice::Iter<'a, DiEdge>,
}

impl Iterator for NeighborAndWeightIter<'_> {
    type Item = (usize, f64);

    fn next(&mut self) -> Option<Self::Item> {
        self.edge_iter.next().map(|e| (e.target(), e.weight()))
    }
}

impl Network {
    /// Create a new empty network.
    pub fn new(directed: bool) -> Network {
        Network {
            graph: AdjGraph::new(directed),
            members: Vec::new(),
        }
    }

    fn with_capacity(directed: bool, nodes: usize) -> Network {
        Network {
            graph: AdjGraph::with_capacity(directed, nodes),
            members: Vec::with_capacity(nodes),
        }
    }

    /// True if edges are directed.
    pub fn is_directed(&self) -> bool {
        self.graph.is_directed()
    }

    /// Number of nodes in the graph
    pub fn nodes(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of distinct edges. Parallel edges count once.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Add a node and return its index.
    pub fn add_node(&mut self) -> usize {
        self.members.push(Vec::new());
        self.graph.add_node()
    }

    fn add_node_with_members(&mut self, members: Vec<usize>) -> usize {
        self.members.push(members);
        self.graph.add_node()
    }

    /// Add `weight` to the edge between `source` and `target`, creating it if needed.
    pub fn add_edge(&mut self, source: usize, target: usize, weight: f64) {
        self.graph.add_edge(source, target, weight);
    }

    /// Weight of the edge between `source` and `target`, if it exists.
    pub fn edge_weight(&self, source: usize, target: usize) -> Option<f64> {
        self.graph.edge_weight(source, target)
    }

    /// Original node indices represented by `node`. Empty for nodes of a non-coarsened graph.
    pub fn members(&self, node: usize) -> &[usize] {
        &self.members[node]
    }

    /// Original node indices represented by `node`, falling back to the node itself.
    pub fn original_nodes(&self, node: usize) -> Vec<usize> {
        match self.members[node].as_slice() {
            [] => vec![node],
            members => members.to_vec(),
        }
    }

    /// Iterator over pairs of (adjacent node id, edge_weight) for all neighbors of `node`.
    /// For directed graphs only the outgoing arcs are visited.
    pub fn neighbors(&self, node: usize) -> NeighborAndWeightIter<'_> {
        NeighborAndWeightIter {
            edge_iter: self.graph.edges(node).iter(),
        }
    }

    /// Iterate over every edge once.
    pub fn edge_references(&self) -> EdgeReferences<'_> {
        self.graph.edge_references()
    }

    /// Get the total edge weight of the graph (its size). Self-loops count once.
    pub fn get_total_edge_weight(&self) -> f64 {
        self.edge_references().fold(0.0, |acc, edge| acc + edge.weight())
    }

    /// Get the total edge weight of the graph, summed in parallel over chunks of nodes.
    pub fn get_total_edge_weight_par(&self) -> f64 {
        let directed = self.is_directed();
        let mut partial_sums = vec![];

        // Sum over chunks, then sum the chunks serially so the result is deterministic.
        // Undirected edges appear in both endpoint lists, so count self-loops twice
        // and halve at the end.
        self.graph
            .adjacency()
            .par_chunks(256)
            .enumerate()
            .map(|(chunk, node_chunk)| {
                node_chunk
                    .iter()
                    .enumerate()
                    .map(|(offset, edges)| {
                        let node = chunk * 256 + offset;
                        edges.iter().fold(0.0, |acc, e| {
                            if !directed && e.target() == node {
                                acc + 2.0 * e.weight()
                            } else {
                                acc + e.weight()
                            }
                        })
                    })
                    .sum::<f64>()
            })
            .collect_into_vec(&mut partial_sums);

        let total = partial_sums.iter().sum::<f64>();
        if directed {
            total
        } else {
            total / 2.0
        }
    }

    /// Weighted degree of `node`. Undirected self-loops count twice, directed graphs
    /// report in-degree plus out-degree.
    pub fn degree(&self, node: usize) -> f64 {
        if self.is_directed() {
            return self.in_degree(node) + self.out_degree(node);
        }
        // The self-loop is added a second time after the plain sum.
        let (sum, self_loop) = self
            .graph
            .edges(node)
            .iter()
            .fold((0.0, 0.0), |(sum, self_loop), e| {
                let self_loop = if e.target() == node { e.weight() } else { self_loop };
                (sum + e.weight(), self_loop)
            });
        sum + self_loop
    }

    /// Weighted out-degree of `node`. Equals `degree` for undirected graphs.
    pub fn out_degree(&self, node: usize) -> f64 {
        if !self.is_directed() {
            return self.degree(node);
        }
        self.graph.edges(node).iter().map(|e| e.weight()).sum()
    }

    /// Weighted in-degree of `node`. Equals `degree` for undirected graphs.
    pub fn in_degree(&self, node: usize) -> f64 {
        if !self.is_directed() {
            return self.degree(node);
        }
        self.graph.in_edges(node).iter().map(|e| e.weight()).sum()
    }

    /// Collect the neighbor weights of every node, excluding self-loops.
    ///
    /// Undirected graphs report the plain edge weight. Directed graphs merge both
    /// directions per neighbor: an outgoing arc contributes `weight * out_scale`
    /// and an incoming arc `weight * in_scale`. Neighbors keep first-appearance
    /// order, outgoing arcs first.
    pub fn neighbor_weights(&self, in_scale: f64, out_scale: f64) -> NeighborWeights {
        self.collect_neighbor_weights(in_scale, out_scale, false)
    }

    /// Neighbor weights as seen by label propagation. Same as
    /// `neighbor_weights`, except that a directed self-loop is kept. It is met
    /// once as an outgoing and once as an incoming arc, so it adds
    /// `weight * (in_scale + out_scale)` to the node's own entry.
    pub fn label_weights(&self, in_scale: f64, out_scale: f64) -> NeighborWeights {
        self.collect_neighbor_weights(in_scale, out_scale, true)
    }

    fn collect_neighbor_weights(
        &self,
        in_scale: f64,
        out_scale: f64,
        directed_self_loops: bool,
    ) -> NeighborWeights {
        let mut positions: FxHashMap<usize, usize> = FxHashMap::default();

        (0..self.nodes())
            .map(|node| -> Vec<(usize, f64)> {
                if !self.is_directed() {
                    return self
                        .neighbors(node)
                        .filter(|&(target, _)| target != node)
                        .collect();
                }

                positions.clear();
                let mut weights: Vec<(usize, f64)> = Vec::new();
                let outgoing = self.graph.edges(node).iter().map(|e| (e, out_scale));
                let incoming = self.graph.in_edges(node).iter().map(|e| (e, in_scale));
                for (e, scale) in outgoing.chain(incoming) {
                    if e.target() == node && !directed_self_loops {
                        continue;
                    }
                    let pos = *positions.entry(e.target()).or_insert_with(|| {
                        weights.push((e.target(), 0.0));
                        weights.len() - 1
                    });
                    weights[pos].1 += e.weight() * scale;
                }
                weights
            })
            .collect()
    }

    /// Copy of the network rebuilt by adding its edges in `edge_references`
    /// order, so each adjacency list follows the order edges are first reported.
    /// Members are kept. Unless `weighted` is set every edge gets weight 1.
    pub fn normalized(&self, weighted: bool) -> Network {
        let mut n = Network::with_capacity(self.is_directed(), self.nodes());
        for members in &self.members {
            n.add_node_with_members(members.clone());
        }
        for e in self.edge_references() {
            let weight = if weighted { e.weight() } else { 1.0 };
            n.add_edge(e.source(), e.target(), weight);
        }
        n
    }

    /// Creates a reduced (or aggregate) network based on a partition of the nodes.
    ///
    /// Cell `i` of `partition` becomes node `i` of the new network, and its
    /// members are the union of the members of the cell's nodes. The weight of an
    /// edge between two new nodes equals the sum of the weights of the edges
    /// between the two corresponding cells. Edges inside a cell accumulate into a
    /// self-loop. The total edge weight is preserved.
    pub fn build_coarse_graph(&self, partition: &[Vec<usize>]) -> Result<Network> {
        check_cover(partition, self.nodes())?;

        let mut coarse = Network::with_capacity(self.is_directed(), partition.len());
        let mut cell_of = vec![0; self.nodes()];

        for (cell, nodes) in partition.iter().enumerate() {
            let mut members = Vec::with_capacity(nodes.len());
            for &node in nodes {
                cell_of[node] = cell;
                members.extend(self.original_nodes(node));
            }
            members.sort_unstable();
            let ni = coarse.add_node_with_members(members);
            debug_assert_eq!(ni, cell);
        }

        for e in self.edge_references() {
            coarse.add_edge(cell_of[e.source()], cell_of[e.target()], e.weight());
        }

        let before = self.get_total_edge_weight_par();
        let after = coarse.get_total_edge_weight_par();
        if (before - after).abs() > WEIGHT_CONSERVATION_TOLERANCE * before.abs().max(1.0) {
            return Err(CommunityError::invariant(format!(
                "coarse graph weight {after} differs from input weight {before}"
            )));
        }

        Ok(coarse)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn two_triangles() -> Network {
        let mut n = Network::new(false);
        for _ in 0..6 {
            n.add_node();
        }
        for (a, b) in [(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5), (2, 3)] {
            n.add_edge(a, b, 1.0);
        }
        n
    }

    #[test]
    fn degrees_count_self_loops_twice() {
        let mut n = Network::new(false);
        n.add_node();
        n.add_node();
        n.add_edge(0, 0, 1.5);
        n.add_edge(0, 1, 1.0);

        assert_eq!(n.degree(0), 4.0);
        assert_eq!(n.degree(1), 1.0);
        assert_eq!(n.get_total_edge_weight(), 2.5);
        assert_eq!(n.get_total_edge_weight_par(), 2.5);
    }

    #[test]
    fn directed_degrees() {
        let mut n = Network::new(true);
        for _ in 0..3 {
            n.add_node();
        }
        n.add_edge(0, 1, 2.0);
        n.add_edge(2, 1, 1.0);
        n.add_edge(1, 1, 0.5);

        assert_eq!(n.out_degree(0), 2.0);
        assert_eq!(n.in_degree(1), 3.5);
        assert_eq!(n.out_degree(1), 0.5);
        assert_eq!(n.degree(1), 4.0);
        assert_eq!(n.get_total_edge_weight(), 3.5);
        assert_eq!(n.get_total_edge_weight_par(), 3.5);
    }

    #[test]
    fn neighbor_weights_merge_directions() {
        let mut n = Network::new(true);
        for _ in 0..3 {
            n.add_node();
        }
        n.add_edge(0, 1, 2.0);
        n.add_edge(1, 0, 1.0);
        n.add_edge(2, 0, 4.0);
        n.add_edge(0, 0, 7.0);

        let w = n.neighbor_weights(0.5, 3.0);
        // out-arc 0->1 scaled by 3, in-arcs 1->0 and 2->0 scaled by 0.5, self-loop dropped
        assert_eq!(w[0], vec![(1, 6.5), (2, 2.0)]);
        assert_eq!(w[2], vec![(0, 12.0)]);

        // label propagation keeps the self-loop in both directions
        let w = n.label_weights(0.5, 3.0);
        assert_eq!(w[0], vec![(1, 6.5), (0, 24.5), (2, 2.0)]);
        assert_eq!(w[1], vec![(0, 4.0)]);
    }

    #[test]
    fn undirected_label_weights_skip_self_loops() {
        let mut n = Network::new(false);
        n.add_node();
        n.add_node();
        n.add_edge(0, 0, 3.0);
        n.add_edge(0, 1, 1.0);
        assert_eq!(n.label_weights(1.0, 1.0)[0], vec![(1, 1.0)]);
    }

    #[test]
    fn normalized_copy() {
        let mut n = Network::new(false);
        for _ in 0..3 {
            n.add_node();
        }
        n.add_edge(2, 1, 4.0);
        n.add_edge(0, 2, 0.5);
        n.add_edge(1, 1, 2.0);
        n.add_edge(0, 1, 1.5);

        // node 1 first met its neighbor 2, but edges are reported from node 0 first
        assert_eq!(n.neighbor_weights(1.0, 1.0)[1], vec![(2, 4.0), (0, 1.5)]);
        let canonical = n.normalized(true);
        assert_eq!(canonical.neighbor_weights(1.0, 1.0)[1], vec![(0, 1.5), (2, 4.0)]);
        assert_eq!(canonical.degree(1), n.degree(1));
        assert_eq!(canonical.get_total_edge_weight(), 8.0);

        let unit = n.normalized(false);
        assert_eq!(unit.edge_count(), 4);
        assert_eq!(unit.degree(1), 4.0);
        assert_eq!(unit.edge_weight(2, 1), Some(1.0));
        assert_eq!(unit.get_total_edge_weight(), 4.0);
    }

    #[test]
    fn coarse_graph_preserves_weight() -> Result<()> {
        let n = two_triangles();
        let coarse = n.build_coarse_graph(&[vec![0, 1, 2], vec![3, 4, 5]])?;

        assert_eq!(coarse.nodes(), 2);
        assert_eq!(coarse.edge_weight(0, 0), Some(3.0));
        assert_eq!(coarse.edge_weight(1, 1), Some(3.0));
        assert_eq!(coarse.edge_weight(0, 1), Some(1.0));
        assert_eq!(coarse.members(1), &[3, 4, 5]);
        assert_eq!(coarse.get_total_edge_weight(), n.get_total_edge_weight());

        // members compose across levels
        let top = coarse.build_coarse_graph(&[vec![0, 1]])?;
        assert_eq!(top.original_nodes(0), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(top.edge_weight(0, 0), Some(7.0));
        Ok(())
    }

    #[test]
    fn coarse_graph_rejects_bad_partition() {
        let n = two_triangles();
        let missing = n.build_coarse_graph(&[vec![0, 1, 2], vec![3, 4]]);
        assert!(matches!(missing, Err(CommunityError::InvariantViolation(_))));

        let doubled = n.build_coarse_graph(&[vec![0, 1, 2, 3], vec![3, 4, 5]]);
        assert!(matches!(doubled, Err(CommunityError::InvariantViolation(_))));
    }
}
