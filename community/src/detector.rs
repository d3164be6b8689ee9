use crate::clustering::Partition;
use crate::config::{LouvainConfig, LpaConfig};
use crate::label_propagation::LabelPropagation;
use crate::louvain::Louvain;
use crate::weighted_graph::{NodeId, WeightedGraph};
use crate::{CommunityError, Network, Result};
use fxhash::FxHashMap;

/// Result of fitting a detector to a graph.
#[derive(Debug, Clone)]
pub struct Fitted<N> {
    partition: Partition<N>,
    node_to_community: FxHashMap<N, usize>,
    num_communities: usize,
}

impl<N: NodeId> Fitted<N> {
    fn new(partition: Partition<N>, node_to_community: FxHashMap<N, usize>) -> Self {
        let num_communities = partition.len();
        Fitted {
            partition,
            node_to_community,
            num_communities,
        }
    }

    /// Final partition over the graph's nodes.
    pub fn partition(&self) -> &Partition<N> {
        &self.partition
    }

    /// Community id of every node.
    pub fn node_to_community(&self) -> &FxHashMap<N, usize> {
        &self.node_to_community
    }

    /// Number of communities found.
    pub fn num_communities(&self) -> usize {
        self.num_communities
    }

    /// Community id of `node`.
    pub fn community_of(&self, node: &N) -> Result<usize> {
        self.node_to_community
            .get(node)
            .copied()
            .ok_or_else(|| CommunityError::UnknownNode(format!("{:?}", node)))
    }
}

/// A community detection algorithm that is fitted to a graph and then queried.
pub trait Detector<N: NodeId> {
    /// Detect communities in `graph`, replacing any earlier fit. A failed fit
    /// leaves the detector unfitted.
    fn fit(&mut self, graph: &WeightedGraph<N>) -> Result<&Fitted<N>>;

    /// The last successful fit, if any.
    fn fitted(&self) -> Option<&Fitted<N>>;

    /// Community id of each of `nodes`, in order.
    fn decision_function(&self, nodes: &[N]) -> Result<Vec<usize>> {
        let fitted = self.fitted().ok_or(CommunityError::NotFitted)?;
        nodes.iter().map(|node| fitted.community_of(node)).collect()
    }
}

/// Louvain detector. Community ids are the node indices of the coarsest graph.
#[derive(Debug, Clone)]
pub struct LouvainDetector<N> {
    louvain: Louvain,
    fitted: Option<Fitted<N>>,
    levels: Vec<Partition<N>>,
    community_graph: Option<Network>,
}

impl<N: NodeId> LouvainDetector<N> {
    /// Build a detector, rejecting an invalid `config`.
    pub fn new(config: &LouvainConfig) -> Result<Self> {
        Ok(LouvainDetector {
            louvain: Louvain::new(config)?,
            fitted: None,
            levels: Vec::new(),
            community_graph: None,
        })
    }

    /// Partition of every level of the last fit, finest first.
    pub fn levels(&self) -> &[Partition<N>] {
        &self.levels
    }

    /// Coarsest graph of the last fit. Node `i` is community `i`.
    pub fn community_graph(&self) -> Option<&Network> {
        self.community_graph.as_ref()
    }
}

impl<N: NodeId> Default for LouvainDetector<N> {
    fn default() -> Self {
        LouvainDetector {
            louvain: Louvain::default(),
            fitted: None,
            levels: Vec::new(),
            community_graph: None,
        }
    }
}

impl<N: NodeId> Detector<N> for LouvainDetector<N> {
    fn fit(&mut self, graph: &WeightedGraph<N>) -> Result<&Fitted<N>> {
        self.fitted = None;
        self.levels.clear();
        self.community_graph = None;

        let mut last = None;
        let mut levels = Vec::new();
        for level in self.louvain.levels(graph)? {
            let level = level?;
            levels.push(level.partition.clone());
            last = Some(level);
        }
        let last = last.ok_or_else(|| CommunityError::invariant("louvain produced no level"))?;

        let node_to_community = last.partition.node_to_community();
        self.levels = levels;
        self.community_graph = Some(last.graph);
        Ok(&*self.fitted.insert(Fitted::new(last.partition, node_to_community)))
    }

    fn fitted(&self) -> Option<&Fitted<N>> {
        self.fitted.as_ref()
    }
}

/// Label propagation detector. Community ids are the raw final labels, which
/// are node indices and not compacted.
#[derive(Debug, Clone)]
pub struct LpaDetector<N> {
    lpa: LabelPropagation,
    fitted: Option<Fitted<N>>,
    community_graph: Option<Network>,
}

impl<N: NodeId> LpaDetector<N> {
    /// Build a detector, rejecting an invalid `config`.
    pub fn new(config: &LpaConfig) -> Result<Self> {
        Ok(LpaDetector {
            lpa: LabelPropagation::new(config)?,
            fitted: None,
            community_graph: None,
        })
    }

    /// Graph of the communities of the last fit. Node `i` is the `i`-th
    /// community of the fitted partition.
    pub fn community_graph(&self) -> Option<&Network> {
        self.community_graph.as_ref()
    }
}

impl<N: NodeId> Default for LpaDetector<N> {
    fn default() -> Self {
        LpaDetector {
            lpa: LabelPropagation::default(),
            fitted: None,
            community_graph: None,
        }
    }
}

impl<N: NodeId> Detector<N> for LpaDetector<N> {
    fn fit(&mut self, graph: &WeightedGraph<N>) -> Result<&Fitted<N>> {
        self.fitted = None;
        self.community_graph = None;

        let labels = self.lpa.run(graph)?;
        let community_graph = graph
            .network()
            .normalized(self.lpa.config().weighted)
            .build_coarse_graph(&labels.cells())?;
        self.community_graph = Some(community_graph);

        let node_to_community = labels
            .nodes()
            .iter()
            .cloned()
            .zip(labels.as_slice().iter().copied())
            .collect();

        Ok(&*self.fitted.insert(Fitted::new(labels.partition(), node_to_community)))
    }

    fn fitted(&self) -> Option<&Fitted<N>> {
        self.fitted.as_ref()
    }
}
