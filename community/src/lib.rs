//! Community detection by Louvain modularity optimization and label propagation
#![deny(missing_docs)]
#![deny(warnings)]

/// Iteration and time limits for a run
pub mod budget;

/// Data structures for storing a clustering or partition of nodes
pub mod clustering;

/// Graph coloring for semi-synchronous label propagation
pub mod coloring;

/// Run parameters and their defaults
pub mod config;

/// Fit / query facade over the community detection algorithms
pub mod detector;

/// Error type shared by the crate
pub mod error;

/// Label propagation algorithm, asynchronous and semi-synchronous
pub mod label_propagation;

/// Louvain local moving phase
pub mod local_moving;

/// Louvain clustering algorithm
pub mod louvain;

/// Data structure for storing a weighted graph (aka network) by node index
pub mod network;

/// Seeded random stream and the draws built on it
pub mod rng;

/// Clustering objective functions
pub mod objective;

/// Weighted graph over arbitrary node identifiers
pub mod weighted_graph;

mod graph;


pub use budget::Budget;
pub use clustering::{Clustering, Partition};
pub use config::{LouvainConfig, LpaConfig, UpdateStrategy};
pub use detector::{Detector, Fitted, LouvainDetector, LpaDetector};
pub use error::{CommunityError, Result};
pub use label_propagation::{LabelPropagation, Labels};
pub use louvain::{Level, Levels, Louvain};
pub use network::Network;
pub use rng::Mt19937;
pub use weighted_graph::{NodeId, WeightedGraph};

trait ZeroVec {
    fn zero(&mut self);
    fn zero_len(&mut self, len: usize);
}

impl<T: Default> ZeroVec for Vec<T> {
    fn zero(&mut self) {
        for i in self.iter_mut() {
            *i = T::default();
        }
    }

    fn zero_len(&mut self, len: usize) {
        self.zero();
        self.resize_with(len, T::default)
    }
}
