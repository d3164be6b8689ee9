use crate::budget::BudgetClock;
use crate::clustering::check_cover;
use crate::rng::shuffle;
use crate::{Clustering, Network, Result, ZeroVec};
use log::debug;
use rand::RngCore;

/// Outcome of one level of local moving.
#[derive(Debug, Clone)]
pub struct Refinement {
    /// Communities over the original (finest) node indices.
    pub partition: Vec<Vec<usize>>,
    /// Communities over the node indices of the refined network.
    pub inner_partition: Vec<Vec<usize>>,
    /// Dense clustering of the refined network, cluster `i` being `inner_partition[i]`.
    pub clustering: Clustering,
    /// True if any node changed community.
    pub improved: bool,
}

/// Reusable scratch space for the Louvain local-moving phase.
#[derive(Default)]
pub(crate) struct LocalMoving {
    resolution: f64,
    labels: Vec<usize>,
    stot: Vec<f64>,
    stot_in: Vec<f64>,
    stot_out: Vec<f64>,
    degrees: Vec<f64>,
    in_degrees: Vec<f64>,
    out_degrees: Vec<f64>,
    node_order: Vec<usize>,
    edge_weight_per_cluster: Vec<f64>,
    visited: Vec<bool>,
    neighboring_clusters: Vec<usize>,
}

impl LocalMoving {
    pub fn new(resolution: f64) -> Self {
        LocalMoving {
            resolution,
            ..LocalMoving::default()
        }
    }

    /// Move single nodes between communities until a full pass over the nodes
    /// moves nothing. Every node starts alone and the visiting order is
    /// shuffled once per call.
    ///
    /// `total_weight` is the size of the finest graph, which coarsening preserves.
    pub fn iterate(
        &mut self,
        n: &Network,
        total_weight: f64,
        rng: &mut impl RngCore,
        clock: &mut BudgetClock,
    ) -> Result<Refinement> {
        let nodes = n.nodes();
        let directed = n.is_directed();
        let m = total_weight;

        self.labels.clear();
        self.labels.extend(0..nodes);

        if m == 0.0 {
            return self.finish(n, false);
        }

        self.degrees.zero_len(nodes);
        self.in_degrees.zero_len(nodes);
        self.out_degrees.zero_len(nodes);
        for i in 0..nodes {
            self.degrees[i] = n.degree(i);
            self.in_degrees[i] = n.in_degree(i);
            self.out_degrees[i] = n.out_degree(i);
        }
        self.stot.clear();
        self.stot.extend_from_slice(&self.degrees);
        self.stot_in.clear();
        self.stot_in.extend_from_slice(&self.in_degrees);
        self.stot_out.clear();
        self.stot_out.extend_from_slice(&self.out_degrees);

        self.edge_weight_per_cluster.zero_len(nodes);
        self.visited.zero_len(nodes);
        self.node_order.clear();
        self.node_order.extend(0..nodes);
        shuffle(rng, &mut self.node_order);

        let neighbors = n.neighbor_weights(1.0, 1.0);
        let mut improved = false;

        loop {
            let pass = clock.check_pass()?;
            let mut moves = 0;

            for idx in 0..nodes {
                let j = self.node_order[idx];
                let current = self.labels[j];

                // Accumulate the weight towards each neighboring community in
                // first-appearance order.
                self.neighboring_clusters.clear();
                for &(target, weight) in &neighbors[j] {
                    let c = self.labels[target];
                    if !self.visited[c] {
                        self.visited[c] = true;
                        self.neighboring_clusters.push(c);
                    }
                    self.edge_weight_per_cluster[c] += weight;
                }
                // A node with no neighbor in its own community weighs staying last.
                if !self.visited[current] {
                    self.visited[current] = true;
                    self.neighboring_clusters.push(current);
                }

                // Remove the node from its community.
                let own_weight = self.edge_weight_per_cluster[current];
                let remove_cost = if directed {
                    self.stot_in[current] -= self.in_degrees[j];
                    self.stot_out[current] -= self.out_degrees[j];
                    -own_weight / m
                        + self.resolution
                            * (self.out_degrees[j] * self.stot_in[current]
                                + self.in_degrees[j] * self.stot_out[current])
                            / (m * m)
                } else {
                    self.stot[current] -= self.degrees[j];
                    -own_weight / m
                        + self.resolution * (self.stot[current] * self.degrees[j]) / (2.0 * m * m)
                };

                // Staying put is worth 0, the first strictly better community wins.
                let mut best_gain = 0.0;
                let mut best_cluster = current;
                for &c in &self.neighboring_clusters {
                    let weight = self.edge_weight_per_cluster[c];
                    let gain = if directed {
                        remove_cost + weight / m
                            - self.resolution
                                * (self.out_degrees[j] * self.stot_in[c]
                                    + self.in_degrees[j] * self.stot_out[c])
                                / (m * m)
                    } else {
                        remove_cost + weight / m
                            - self.resolution * (self.stot[c] * self.degrees[j]) / (2.0 * m * m)
                    };
                    if gain > best_gain {
                        best_gain = gain;
                        best_cluster = c;
                    }
                    self.edge_weight_per_cluster[c] = 0.0;
                    self.visited[c] = false;
                }

                if directed {
                    self.stot_in[best_cluster] += self.in_degrees[j];
                    self.stot_out[best_cluster] += self.out_degrees[j];
                } else {
                    self.stot[best_cluster] += self.degrees[j];
                }

                if best_cluster != current {
                    self.labels[j] = best_cluster;
                    improved = true;
                    moves += 1;
                }
            }

            debug!("local moving pass {}: {} of {} nodes moved", pass, moves, nodes);

            if moves == 0 {
                break;
            }
        }

        self.finish(n, improved)
    }

    fn finish(&self, n: &Network, improved: bool) -> Result<Refinement> {
        // Community order follows the seed node of each community.
        let clustering = Clustering::new_from_labels(&self.labels);
        let inner_partition = clustering.nodes_per_cluster();
        check_cover(&inner_partition, n.nodes())?;

        let partition = inner_partition
            .iter()
            .map(|cell| {
                let mut members: Vec<usize> = cell.iter().flat_map(|&i| n.original_nodes(i)).collect();
                members.sort_unstable();
                members
            })
            .collect();

        Ok(Refinement {
            partition,
            inner_partition,
            clustering,
            improved,
        })
    }
}

/// Run one level of Louvain local moving on `network`.
///
/// Every node starts in its own community. Nodes are visited in one shuffled
/// order, the same for every pass, and moved to the neighboring community with the largest strictly
/// positive modularity gain, until a pass moves nothing. `total_weight` is the
/// size `m` of the finest graph.
pub fn refine_level(
    network: &Network,
    total_weight: f64,
    resolution: f64,
    rng: &mut impl RngCore,
    clock: &mut BudgetClock,
) -> Result<Refinement> {
    LocalMoving::new(resolution).iterate(network, total_weight, rng, clock)
}
