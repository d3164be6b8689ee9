use crate::budget::BudgetClock;
use crate::clustering::Partition;
use crate::coloring::Coloring;
use crate::config::{LpaConfig, UpdateStrategy};
use crate::network::NeighborWeights;
use crate::rng::{below, draw_order};
use crate::weighted_graph::{NodeId, WeightedGraph};
use crate::{CommunityError, Mt19937, Network, Result};
use fxhash::FxHashMap;
use log::{debug, info, warn};
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;

/// Neighbor weights used by label propagation.
///
/// On directed graphs an incoming arc of weight `w` contributes `w * alpha` and
/// an outgoing arc `w * beta`, summed per neighbor. A directed self-loop makes
/// the node its own neighbor. Undirected self-loops are skipped.
pub fn neighbor_weights(network: &Network, alpha: f64, beta: f64) -> NeighborWeights {
    network.label_weights(alpha, beta)
}

/// Tied best labels around `node` in the order they first appear among its
/// neighbors.
fn tied_labels(node: usize, labels: &[usize], neighbors: &NeighborWeights) -> Vec<usize> {
    let adjacency = &neighbors[node];
    if adjacency.is_empty() {
        return vec![labels[node]];
    }

    let mut position: FxHashMap<usize, usize> = FxHashMap::default();
    let mut totals: Vec<(usize, f64)> = Vec::new();
    for &(target, weight) in adjacency {
        let label = labels[target];
        let pos = *position.entry(label).or_insert_with(|| {
            totals.push((label, 0.0));
            totals.len() - 1
        });
        totals[pos].1 += weight;
    }

    let max_weight = totals.iter().map(|&(_, w)| w).fold(f64::NEG_INFINITY, f64::max);
    totals
        .into_iter()
        .filter(|&(_, w)| w == max_weight)
        .map(|(label, _)| label)
        .collect()
}

/// Labels carrying the largest total neighbor weight around `node`, in
/// ascending order. A node without neighbors keeps its own label.
pub fn most_frequent_labels(node: usize, labels: &[usize], neighbors: &NeighborWeights) -> Vec<usize> {
    let mut best = tied_labels(node, labels, neighbors);
    best.sort_unstable();
    best
}

/// True if every node holds one of its most frequent labels.
pub fn labeling_complete(labels: &[usize], neighbors: &NeighborWeights) -> bool {
    (0..labels.len()).all(|node| {
        neighbors[node].is_empty() || most_frequent_labels(node, labels, neighbors).contains(&labels[node])
    })
}

/// Prec-Max rule: a unique best label is adopted, among tied labels the
/// current one is kept if present, otherwise the largest is taken.
/// Returns the new label if it differs from the current one.
pub fn prec_max(node: usize, labels: &[usize], neighbors: &NeighborWeights) -> Option<usize> {
    let best = most_frequent_labels(node, labels, neighbors);
    let current = labels[node];
    let next = match best.as_slice() {
        [only] => *only,
        [.., largest] if !best.contains(&current) => *largest,
        _ => current,
    };
    (next != current).then_some(next)
}

/// Asynchronous label propagation.
///
/// Labels start as node indices. Each pass visits the nodes in index order,
/// and a node whose label is not among its most frequent labels takes one of
/// them uniformly at random. The tied labels are enumerated in [`draw_order`]
/// before the draw. Stops after a pass with no change.
pub fn async_update(
    neighbors: &NeighborWeights,
    rng: &mut impl RngCore,
    clock: &mut BudgetClock,
) -> Result<Vec<usize>> {
    let mut labels: Vec<usize> = (0..neighbors.len()).collect();

    loop {
        let pass = clock.check_pass()?;

        let mut changes = 0;
        for node in 0..labels.len() {
            let best = tied_labels(node, &labels, neighbors);
            if !best.contains(&labels[node]) {
                let order = draw_order(&best);
                labels[node] = order[below(rng, order.len())];
                changes += 1;
            }
        }

        debug!("async label propagation pass {}: {} labels changed", pass, changes);
        if changes == 0 {
            return Ok(labels);
        }
    }
}

/// Semi-synchronous label propagation.
///
/// Labels start as node indices. Each round walks the color classes in
/// ascending order. The nodes of a class are not adjacent, so they are
/// evaluated in parallel against the labels as they stood when the class
/// began, then updated together by the Prec-Max rule. Rounds repeat until the
/// labeling is complete.
pub fn semi_sync_update(
    neighbors: &NeighborWeights,
    coloring: &Coloring,
    clock: &mut BudgetClock,
) -> Result<Vec<usize>> {
    let mut labels: Vec<usize> = (0..neighbors.len()).collect();

    while !labeling_complete(&labels, neighbors) {
        let round = clock.check_pass()?;
        let mut changes = 0;

        for class in coloring.classes() {
            let updates: Vec<(usize, usize)> = class
                .par_iter()
                .filter_map(|&node| prec_max(node, &labels, neighbors).map(|label| (node, label)))
                .collect();

            changes += updates.len();
            for (node, label) in updates {
                labels[node] = label;
            }
        }

        debug!("semi-synchronous round {}: {} labels changed", round, changes);
    }

    Ok(labels)
}

/// Label propagation runner.
#[derive(Debug, Clone, Default)]
pub struct LabelPropagation {
    config: LpaConfig,
}

impl LabelPropagation {
    /// Validate `config` and build a runner.
    pub fn new(config: &LpaConfig) -> Result<LabelPropagation> {
        config.validate()?;
        Ok(LabelPropagation {
            config: config.clone(),
        })
    }

    /// The configuration of this runner.
    pub fn config(&self) -> &LpaConfig {
        &self.config
    }

    /// Propagate labels over `graph` until no node wants to change.
    ///
    /// The graph is rebuilt in edge order first, with unit weights unless
    /// `weighted` is set.
    pub fn run<N: NodeId>(&self, graph: &WeightedGraph<N>) -> Result<Labels<N>> {
        if graph.node_count() == 0 {
            return Err(CommunityError::EmptyGraph);
        }

        let network = graph.network().normalized(self.config.weighted);
        let neighbors = neighbor_weights(&network, self.config.alpha, self.config.beta);
        let mut clock = self.config.budget.start();

        info!(
            "{} label propagation on {} nodes, {} edges",
            self.config.strategy,
            graph.node_count(),
            graph.edge_count()
        );

        let labels = match self.config.strategy {
            UpdateStrategy::Async => {
                let mut rng = Mt19937::seed_from_u64(self.config.seed);
                async_update(&neighbors, &mut rng, &mut clock)?
            }
            UpdateStrategy::SemiSync => {
                if graph.is_directed() {
                    warn!("semi-synchronous label propagation is only guaranteed to converge on symmetric weights");
                }
                let coloring = Coloring::greedy(&neighbors);
                debug!("coloring uses {} colors", coloring.num_colors());
                semi_sync_update(&neighbors, &coloring, &mut clock)?
            }
        };

        let result = Labels::new(graph.nodes().to_vec(), labels);
        info!(
            "label propagation found {} communities in {} passes",
            result.num_communities(),
            clock.passes()
        );
        Ok(result)
    }
}

/// Final label of every node. Labels are node indices of the input graph and
/// are not compacted.
#[derive(Debug, Clone)]
pub struct Labels<N> {
    nodes: Vec<N>,
    labels: Vec<usize>,
    index: FxHashMap<N, usize>,
}

impl<N: NodeId> Labels<N> {
    fn new(nodes: Vec<N>, labels: Vec<usize>) -> Self {
        let index = nodes.iter().cloned().enumerate().map(|(i, n)| (n, i)).collect();
        Labels { nodes, labels, index }
    }

    /// Label of `node`, if it was part of the graph.
    pub fn get(&self, node: &N) -> Option<usize> {
        self.index.get(node).map(|&i| self.labels[i])
    }

    /// Labels indexed by node insertion order.
    pub fn as_slice(&self) -> &[usize] {
        &self.labels
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    /// Number of distinct labels.
    pub fn num_communities(&self) -> usize {
        let mut distinct = self.labels.clone();
        distinct.sort_unstable();
        distinct.dedup();
        distinct.len()
    }

    /// Node indices grouped by label, in the order each label is first seen.
    pub(crate) fn cells(&self) -> Vec<Vec<usize>> {
        let mut position: FxHashMap<usize, usize> = FxHashMap::default();
        let mut cells: Vec<Vec<usize>> = Vec::new();
        for (i, &label) in self.labels.iter().enumerate() {
            let pos = *position.entry(label).or_insert_with(|| {
                cells.push(Vec::new());
                cells.len() - 1
            });
            cells[pos].push(i);
        }
        cells
    }

    /// Group nodes by label. Communities appear in the order their label is
    /// first seen in node order.
    pub fn partition(&self) -> Partition<N> {
        let communities = self
            .cells()
            .into_iter()
            .map(|cell| cell.into_iter().map(|i| self.nodes[i].clone()).collect())
            .collect();
        Partition::new(communities)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::budget::Budget;

    fn weights(edges: &[(usize, usize, f64)], nodes: usize) -> NeighborWeights {
        let mut n = Network::new(false);
        for _ in 0..nodes {
            n.add_node();
        }
        for &(a, b, w) in edges {
            n.add_edge(a, b, w);
        }
        n.neighbor_weights(1.0, 1.0)
    }

    #[test]
    fn most_frequent_is_sorted_and_exact() {
        let w = weights(&[(0, 1, 1.0), (0, 2, 2.0), (0, 3, 1.0), (0, 4, 1.0)], 5);

        // label 5 collects 3.0, label 7 collects 2.0
        let labels = vec![0, 7, 5, 7, 5];
        assert_eq!(most_frequent_labels(0, &labels, &w), vec![5]);

        let labels = vec![0, 9, 5, 3, 3];
        assert_eq!(most_frequent_labels(0, &labels, &w), vec![3, 5]);

        let isolated = weights(&[], 2);
        assert_eq!(most_frequent_labels(1, &[4, 8], &isolated), vec![8]);
    }

    #[test]
    fn prec_max_rule() {
        let w = weights(&[(0, 1, 1.0), (0, 2, 1.0)], 3);

        // tie without the current label: take the largest
        assert_eq!(prec_max(0, &[0, 4, 6], &w), Some(6));
        // tie including the current label: stay
        assert_eq!(prec_max(0, &[4, 4, 6], &w), None);
        // unique winner
        assert_eq!(prec_max(0, &[0, 6, 6], &w), Some(6));
    }

    #[test]
    fn semi_sync_two_triangles() -> Result<()> {
        let edges: Vec<_> = [(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5), (2, 3)]
            .iter()
            .map(|&(a, b)| (a, b, 1.0))
            .collect();
        let w = weights(&edges, 6);
        let coloring = Coloring::greedy(&w);
        let mut clock = Budget::unlimited().start();

        let labels = semi_sync_update(&w, &coloring, &mut clock)?;
        assert_eq!(labels, vec![3, 3, 3, 5, 5, 5]);
        assert!(labeling_complete(&labels, &w));
        Ok(())
    }

    #[test]
    fn async_reaches_fixed_point() -> Result<()> {
        let mut edges = vec![];
        for a in 0..4 {
            for b in (a + 1)..4 {
                edges.push((a, b, 1.0));
                edges.push((a + 4, b + 4, 1.0));
            }
        }
        let w = weights(&edges, 8);

        for seed in 0..10 {
            let mut rng = Mt19937::seed_from_u64(seed);
            let mut clock = Budget::unlimited().start();
            let labels = async_update(&w, &mut rng, &mut clock)?;

            assert!(labeling_complete(&labels, &w));
            assert!(labels[..4].iter().all(|&l| l == labels[0]));
            assert!(labels[4..].iter().all(|&l| l == labels[4]));
            assert_ne!(labels[0], labels[4]);
        }
        Ok(())
    }

    #[test]
    fn ties_keep_first_appearance() {
        let w = weights(&[(0, 1, 1.0), (0, 2, 1.0), (0, 3, 1.0), (0, 4, 0.5)], 5);
        let labels = vec![0, 40, 7, 33, 2];

        assert_eq!(tied_labels(0, &labels, &w), vec![40, 7, 33]);
        assert_eq!(most_frequent_labels(0, &labels, &w), vec![7, 33, 40]);
    }

    #[test]
    fn directed_self_loop_holds_label() -> Result<()> {
        let g = WeightedGraph::from_weighted_edges(true, [(0, 0, 5.0), (0, 1, 1.0), (0, 2, 1.0)])?;
        for strategy in [UpdateStrategy::SemiSync, UpdateStrategy::Async] {
            let config = LpaConfig {
                strategy,
                ..Default::default()
            };
            let labels = LabelPropagation::new(&config)?.run(&g)?;
            assert_eq!(labels.as_slice(), &[0, 0, 0]);
        }
        Ok(())
    }

    #[test]
    fn unit_weights_change_async_ties() -> Result<()> {
        let g = WeightedGraph::from_weighted_edges(false, [(0, 1, 1.0), (0, 2, 1.0), (0, 3, 3.0)])?;

        let weighted = LabelPropagation::new(&LpaConfig::default())?.run(&g)?;
        assert_eq!(weighted.as_slice(), &[3, 3, 3, 3]);

        let config = LpaConfig {
            weighted: false,
            ..Default::default()
        };
        let unit = LabelPropagation::new(&config)?.run(&g)?;
        assert_eq!(unit.as_slice(), &[1, 1, 1, 1]);
        Ok(())
    }

    #[test]
    fn partition_in_first_seen_order() {
        let labels = Labels::new(vec!["a", "b", "c", "d"], vec![3, 1, 3, 1]);
        assert_eq!(labels.num_communities(), 2);
        assert_eq!(labels.get(&"c"), Some(3));
        assert_eq!(labels.partition().communities(), &[vec!["a", "c"], vec!["b", "d"]]);
    }
}
