use crate::weighted_graph::NodeId;
use crate::{CommunityError, Result};
use fxhash::FxHashMap;

/// Assignment of every node index to an integer cluster label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clustering {
    labels: Vec<usize>,
    num_clusters: usize,
}

impl Clustering {
    /// Initialize a fresh clustering with each node in it's own cluster
    pub fn init_different_clusters(num_nodes: usize) -> Self {
        Clustering {
            labels: (0..num_nodes).collect(),
            num_clusters: num_nodes,
        }
    }

    /// Initialize the clustering with a known set of labels. Unused labels are removed.
    pub fn new_from_labels(input_labels: &[usize]) -> Self {
        let max_cluster = input_labels.iter().copied().max();

        let mut r = Clustering {
            labels: input_labels.to_vec(),
            num_clusters: max_cluster.map_or(0, |m| m + 1),
        };

        r.remove_empty_clusters();
        r
    }

    /// List the nodes of each cluster in ascending node order.
    pub fn nodes_per_cluster(&self) -> Vec<Vec<usize>> {
        let mut cluster_lists = vec![Vec::new(); self.num_clusters()];

        for (node, label) in self.labels.iter().enumerate() {
            cluster_lists[*label].push(node)
        }

        cluster_lists
    }

    /// Get the label of node `i`
    pub fn get(&self, node: usize) -> usize {
        self.labels[node]
    }

    /// Size of the label range. Equals the number of non-empty clusters after
    /// `remove_empty_clusters`.
    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    /// Relabel clusters to `0..k`, dropping unused labels and keeping the
    /// relative order of the labels that remain.
    pub fn remove_empty_clusters(&mut self) {
        let mut counts = vec![0; self.num_clusters()];

        for &l in self.labels.iter() {
            counts[l] += 1;
        }

        let mut new_labels = Vec::with_capacity(self.num_clusters());

        let mut new_label = 0;
        for cluster_count in counts {
            if cluster_count == 0 {
                new_labels.push(usize::MAX);
            } else {
                new_labels.push(new_label);
                new_label += 1;
            }
        }

        for label in self.labels.iter_mut() {
            *label = new_labels[*label];
        }

        self.num_clusters = new_label;
    }
}

/// Check that `cells` is a partition of `0..num_nodes`: no empty cell, and every
/// node in exactly one cell.
pub fn check_cover(cells: &[Vec<usize>], num_nodes: usize) -> Result<()> {
    let mut seen = vec![false; num_nodes];
    let mut covered = 0;

    for (i, cell) in cells.iter().enumerate() {
        if cell.is_empty() {
            return Err(CommunityError::invariant(format!("community {i} is empty")));
        }
        for &node in cell {
            match seen.get_mut(node) {
                None => {
                    return Err(CommunityError::invariant(format!(
                        "community {i} holds node {node} outside a graph of {num_nodes} nodes"
                    )))
                }
                Some(true) => {
                    return Err(CommunityError::invariant(format!(
                        "node {node} appears in more than one community"
                    )))
                }
                Some(flag) => *flag = true,
            }
            covered += 1;
        }
    }

    if covered != num_nodes {
        return Err(CommunityError::invariant(format!(
            "partition covers {covered} of {num_nodes} nodes"
        )));
    }
    Ok(())
}

/// Ordered sequence of disjoint, non-empty communities over the nodes of a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition<N> {
    communities: Vec<Vec<N>>,
}

impl<N: NodeId> Partition<N> {
    /// Wrap a list of communities.
    pub fn new(communities: Vec<Vec<N>>) -> Self {
        Partition { communities }
    }

    /// The communities, in order.
    pub fn communities(&self) -> &[Vec<N>] {
        &self.communities
    }

    /// Number of communities.
    pub fn len(&self) -> usize {
        self.communities.len()
    }

    /// True if there are no communities.
    pub fn is_empty(&self) -> bool {
        self.communities.is_empty()
    }

    /// Iterate over the communities.
    pub fn iter(&self) -> std::slice::Iter<'_, Vec<N>> {
        self.communities.iter()
    }

    /// Map each node to the position of its community.
    pub fn node_to_community(&self) -> FxHashMap<N, usize> {
        let mut map = FxHashMap::default();
        for (com, nodes) in self.communities.iter().enumerate() {
            for node in nodes {
                map.insert(node.clone(), com);
            }
        }
        map
    }

    /// Unwrap into the list of communities.
    pub fn into_inner(self) -> Vec<Vec<N>> {
        self.communities
    }
}
