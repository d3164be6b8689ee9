use crate::budget::BudgetClock;
use crate::clustering::{check_cover, Partition};
use crate::config::LouvainConfig;
use crate::local_moving::{LocalMoving, Refinement};
use crate::objective::modularity;
use crate::weighted_graph::{NodeId, WeightedGraph};
use crate::{Clustering, CommunityError, Mt19937, Network, Result};
use log::{debug, info};
use rand::SeedableRng;

pub use crate::config::{DEFAULT_RESOLUTION, DEFAULT_THRESHOLD};

/// Perform the Louvain clustering algorithm
#[derive(Debug, Clone, Default)]
pub struct Louvain {
    config: LouvainConfig,
}

/// One level of the Louvain dendrogram.
#[derive(Debug, Clone)]
pub struct Level<N> {
    /// Coarse graph of this level. Node `i` stands for `inner_partition[i]`.
    pub graph: Network,
    /// Communities over the node indices of the graph that was refined.
    pub inner_partition: Vec<Vec<usize>>,
    /// Communities over the original nodes, in coarse node order.
    pub partition: Partition<N>,
    /// Modularity of `partition` on the original graph.
    pub modularity: f64,
}

impl Louvain {
    /// Validate `config` and build a runner.
    pub fn new(config: &LouvainConfig) -> Result<Louvain> {
        config.validate()?;
        Ok(Louvain {
            config: config.clone(),
        })
    }

    /// The configuration of this runner.
    pub fn config(&self) -> &LouvainConfig {
        &self.config
    }

    /// Lazily compute the levels of the dendrogram, finest first. Each call
    /// starts from a fresh PRNG seeded from the configuration.
    ///
    /// The first level refines a copy of the graph rebuilt in edge order, with
    /// unit weights unless `weighted` is set.
    pub fn levels<'a, N: NodeId>(&self, graph: &'a WeightedGraph<N>) -> Result<Levels<'a, N>> {
        if graph.node_count() == 0 {
            return Err(CommunityError::EmptyGraph);
        }

        info!(
            "louvain on {} nodes, {} edges, resolution {}",
            graph.node_count(),
            graph.edge_count(),
            self.config.resolution
        );

        let base = graph.network().normalized(self.config.weighted);

        Ok(Levels {
            source: graph,
            total_weight: base.get_total_edge_weight(),
            base,
            current: None,
            resolution: self.config.resolution,
            threshold: self.config.threshold,
            rng: Mt19937::seed_from_u64(self.config.seed),
            local_moving: LocalMoving::new(self.config.resolution),
            clock: self.config.budget.start(),
            modularity: 0.0,
            state: State::Start,
        })
    }

    /// Run to completion and return the coarsest level.
    pub fn run<N: NodeId>(&self, graph: &WeightedGraph<N>) -> Result<Level<N>> {
        let mut last = None;
        for level in self.levels(graph)? {
            last = Some(level?);
        }
        last.ok_or_else(|| CommunityError::invariant("louvain produced no level"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Refine,
    Done,
}

/// Iterator over the levels of a Louvain run. Yields nothing after an error.
pub struct Levels<'a, N> {
    source: &'a WeightedGraph<N>,
    base: Network,
    current: Option<Network>,
    total_weight: f64,
    resolution: f64,
    threshold: f64,
    rng: Mt19937,
    local_moving: LocalMoving,
    clock: BudgetClock,
    modularity: f64,
    state: State,
}

impl<N: NodeId> Levels<'_, N> {
    fn step(&mut self) -> Result<Option<Level<N>>> {
        let network = self.current.as_ref().unwrap_or(&self.base);

        let refinement = match self.state {
            State::Done => return Ok(None),
            State::Start if self.total_weight == 0.0 => {
                // Nothing can move. The only level is the singleton partition.
                self.state = State::Done;
                let singletons = Clustering::init_different_clusters(network.nodes());
                let inner_partition = singletons.nodes_per_cluster();
                return self
                    .emit(network, inner_partition.clone(), inner_partition, singletons)
                    .map(|(level, _)| Some(level));
            }
            State::Start => {
                let singletons = Clustering::init_different_clusters(network.nodes());
                self.modularity = modularity(self.resolution, network, &singletons);
                debug!("singleton modularity {:.6}", self.modularity);
                self.state = State::Refine;
                // The first level is always reported.
                self.local_moving
                    .iterate(network, self.total_weight, &mut self.rng, &mut self.clock)?
            }
            State::Refine => {
                self.clock.reset_passes();
                let r = self
                    .local_moving
                    .iterate(network, self.total_weight, &mut self.rng, &mut self.clock)?;
                if !r.improved {
                    self.state = State::Done;
                    return Ok(None);
                }
                r
            }
        };

        let Refinement {
            partition,
            inner_partition,
            clustering,
            ..
        } = refinement;

        let (level, coarse) = self.emit(network, partition, inner_partition, clustering)?;

        if level.modularity - self.modularity <= self.threshold {
            self.state = State::Done;
        }
        self.modularity = level.modularity;
        self.current = Some(coarse);

        Ok(Some(level))
    }

    fn emit(
        &self,
        network: &Network,
        partition: Vec<Vec<usize>>,
        inner_partition: Vec<Vec<usize>>,
        clustering: Clustering,
    ) -> Result<(Level<N>, Network)> {
        check_cover(&partition, self.source.node_count())?;

        let q = if self.total_weight == 0.0 {
            0.0
        } else {
            modularity(self.resolution, network, &clustering)
        };
        let coarse = network.build_coarse_graph(&inner_partition)?;

        info!(
            "louvain level: {} nodes -> {} communities, modularity {:.6}",
            network.nodes(),
            coarse.nodes(),
            q
        );

        let level = Level {
            graph: coarse.clone(),
            inner_partition,
            partition: self.source.partition_from_cells(&partition),
            modularity: q,
        };
        Ok((level, coarse))
    }
}

impl<N: NodeId> Iterator for Levels<'_, N> {
    type Item = Result<Level<N>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(Some(level)) => Some(Ok(level)),
            Ok(None) => {
                self.state = State::Done;
                None
            }
            Err(e) => {
                self.state = State::Done;
                Some(Err(e))
            }
        }
    }
}
