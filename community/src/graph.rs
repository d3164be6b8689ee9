use fxhash::FxHashMap;
use std::slice::Iter;

/// Weighted arc as stored in a node's adjacency list.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DiEdge {
    pub(crate) target: usize,
    pub(crate) weight: f64,
}

impl DiEdge {
    /// Node at the far end of the arc.
    pub fn target(&self) -> usize {
        self.target
    }

    /// Weight of the arc.
    pub fn weight(&self) -> f64 {
        self.weight
    }
}

/// A single edge, reported once by `EdgeReferences`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Edge {
    source: usize,
    target: usize,
    weight: f64,
}

impl Edge {
    /// Source node. For undirected graphs this is the endpoint with the smaller index.
    pub fn source(&self) -> usize {
        self.source
    }

    /// Target node.
    pub fn target(&self) -> usize {
        self.target
    }

    /// Edge weight.
    pub fn weight(&self) -> f64 {
        self.weight
    }
}

/// Iterates every edge exactly once. Undirected edges are reported from their
/// lower-indexed endpoint, self-loops once.
pub struct EdgeReferences<'a> {
    edges: &'a [Vec<DiEdge>],
    directed: bool,
    source: usize,
    iter: Option<Iter<'a, DiEdge>>,
}

impl Iterator for EdgeReferences<'_> {
    type Item = Edge;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(iter) = self.iter.as_mut() {
                for e in iter.by_ref() {
                    if self.directed || e.target >= self.source {
                        return Some(Edge {
                            source: self.source,
                            target: e.target,
                            weight: e.weight,
                        });
                    }
                }
                self.source += 1;
            }

            let edges = self.edges.get(self.source)?;
            self.iter = Some(edges.iter());
        }
    }
}

/// Adjacency-list storage addressed by dense node indices.
///
/// Undirected edges live in the out-lists of both endpoints (self-loops once).
/// Directed edges live in the source's out-list and the target's in-list.
/// Adding an edge that already exists sums the weights, so parallel edges
/// collapse into one weighted edge.
#[derive(Clone, Debug, Default)]
pub(crate) struct AdjGraph {
    directed: bool,
    out_edges: Vec<Vec<DiEdge>>,
    in_edges: Vec<Vec<DiEdge>>,
    slots: FxHashMap<(usize, usize), (usize, usize)>,
    total_edges: usize,
}

impl AdjGraph {
    pub fn new(directed: bool) -> Self {
        AdjGraph {
            directed,
            ..AdjGraph::default()
        }
    }

    pub fn with_capacity(directed: bool, nodes: usize) -> Self {
        AdjGraph {
            directed,
            out_edges: Vec::with_capacity(nodes),
            in_edges: Vec::with_capacity(if directed { nodes } else { 0 }),
            ..AdjGraph::default()
        }
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn add_node(&mut self) -> usize {
        let index = self.out_edges.len();
        self.out_edges.push(vec![]);
        if self.directed {
            self.in_edges.push(vec![]);
        }
        index
    }

    fn key(&self, source: usize, target: usize) -> (usize, usize) {
        if self.directed || source <= target {
            (source, target)
        } else {
            (target, source)
        }
    }

    pub fn add_edge(&mut self, source: usize, target: usize, weight: f64) {
        let (a, b) = self.key(source, target);

        if let Some(&(fwd, back)) = self.slots.get(&(a, b)) {
            self.out_edges[a][fwd].weight += weight;
            if self.directed {
                self.in_edges[b][back].weight += weight;
            } else if a != b {
                self.out_edges[b][back].weight += weight;
            }
            return;
        }

        let fwd = self.out_edges[a].len();
        self.out_edges[a].push(DiEdge { target: b, weight });

        let back = if self.directed {
            self.in_edges[b].push(DiEdge { target: a, weight });
            self.in_edges[b].len() - 1
        } else if a != b {
            self.out_edges[b].push(DiEdge { target: a, weight });
            self.out_edges[b].len() - 1
        } else {
            fwd
        };

        self.slots.insert((a, b), (fwd, back));
        self.total_edges += 1;
    }

    pub fn edge_weight(&self, source: usize, target: usize) -> Option<f64> {
        let (a, b) = self.key(source, target);
        self.slots.get(&(a, b)).map(|&(fwd, _)| self.out_edges[a][fwd].weight)
    }

    pub fn node_count(&self) -> usize {
        self.out_edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.total_edges
    }

    /// Outgoing arcs of `source`, or all incident arcs when undirected.
    pub fn edges(&self, source: usize) -> &[DiEdge] {
        &self.out_edges[source]
    }

    /// Incoming arcs of `target`, or all incident arcs when undirected.
    pub fn in_edges(&self, target: usize) -> &[DiEdge] {
        if self.directed {
            &self.in_edges[target]
        } else {
            &self.out_edges[target]
        }
    }

    pub fn adjacency(&self) -> &[Vec<DiEdge>] {
        &self.out_edges
    }

    pub fn edge_references(&self) -> EdgeReferences<'_> {
        EdgeReferences {
            edges: &self.out_edges,
            directed: self.directed,
            source: 0,
            iter: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parallel_edges_are_summed() {
        let mut g = AdjGraph::new(false);
        for _ in 0..3 {
            g.add_node();
        }
        g.add_edge(0, 1, 1.0);
        g.add_edge(1, 0, 2.5);
        g.add_edge(2, 2, 1.0);
        g.add_edge(2, 2, 1.0);

        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.edge_weight(0, 1), Some(3.5));
        assert_eq!(g.edge_weight(1, 0), Some(3.5));
        assert_eq!(g.edge_weight(2, 2), Some(2.0));
        assert_eq!(g.edges(2).len(), 1);
        assert_eq!(g.edge_weight(0, 2), None);
    }

    #[test]
    fn edge_references_report_each_edge_once() {
        let mut g = AdjGraph::new(false);
        for _ in 0..4 {
            g.add_node();
        }
        g.add_edge(3, 0, 1.0);
        g.add_edge(0, 1, 1.0);
        g.add_edge(1, 1, 1.0);
        g.add_edge(2, 1, 1.0);

        let mut edges: Vec<_> = g.edge_references().map(|e| (e.source(), e.target())).collect();
        edges.sort_unstable();
        assert_eq!(edges, vec![(0, 1), (0, 3), (1, 1), (1, 2)]);
    }

    #[test]
    fn directed_arcs_keep_orientation() {
        let mut g = AdjGraph::new(true);
        for _ in 0..2 {
            g.add_node();
        }
        g.add_edge(0, 1, 2.0);
        g.add_edge(1, 0, 3.0);
        g.add_edge(0, 1, 1.0);

        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.edge_weight(0, 1), Some(3.0));
        assert_eq!(g.edge_weight(1, 0), Some(3.0));
        assert_eq!(g.in_edges(1)[0].weight(), 3.0);
        assert_eq!(g.edge_references().count(), 2);
    }
}
