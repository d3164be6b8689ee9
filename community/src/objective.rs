use crate::{Clustering, Network};
use rayon::prelude::*;

/// Newman modularity of a clustering, with resolution parameter `resolution`.
///
/// Undirected: `sum_c [L_c / m - resolution * (deg_c / 2m)^2]`.
/// Directed: `sum_c [L_c / m - resolution * out_c * in_c / m^2]`.
/// `L_c` is the weight of edges with both ends in `c` (self-loops once) and `m`
/// the total edge weight. A graph without edge weight has modularity 0.
pub fn modularity(resolution: f64, graph: &Network, clustering: &Clustering) -> f64 {
    let mut internal = 0.0f64;
    let mut total_edge_weight = 0.0f64;

    for e in graph.edge_references() {
        if clustering.get(e.source()) == clustering.get(e.target()) {
            internal += e.weight();
        }
        total_edge_weight += e.weight();
    }

    finish(resolution, graph, clustering, internal, total_edge_weight)
}

/// Modularity of a clustering, computed using parallelization.
pub fn par_modularity(resolution: f64, graph: &Network, clustering: &Clustering) -> f64 {
    let directed = graph.is_directed();

    // Create a number of chunks that is large relative to typical thread-counts
    // to let rayon balance the uneven chunk loads.
    let chunk_size = std::cmp::max(1, graph.nodes() / 64);
    let chunks = (0..graph.nodes())
        .collect::<Vec<usize>>()
        .par_chunks(chunk_size)
        .map(|nodes| {
            let mut internal = 0f64;
            let mut total_edge_weight = 0f64;

            for &i in nodes {
                let c_i = clustering.get(i);
                for (j, edge_weight) in graph.neighbors(i) {
                    // Undirected edges are stored at both ends, count them from the larger index.
                    if directed || j <= i {
                        total_edge_weight += edge_weight;
                        if c_i == clustering.get(j) {
                            internal += edge_weight;
                        }
                    }
                }
            }
            (internal, total_edge_weight)
        })
        .collect::<Vec<(f64, f64)>>();

    // Reduce serially to ensure deterministic order of adds
    let (internal, total_edge_weight) = chunks
        .into_iter()
        .fold((0f64, 0f64), |a, b| (a.0 + b.0, a.1 + b.1));

    finish(resolution, graph, clustering, internal, total_edge_weight)
}

fn finish(
    resolution: f64,
    graph: &Network,
    clustering: &Clustering,
    internal: f64,
    total_edge_weight: f64,
) -> f64 {
    if total_edge_weight == 0.0 {
        return 0.0;
    }

    let m = total_edge_weight;
    let mut quality = internal / m;

    if graph.is_directed() {
        let mut out_weights = vec![0.0; clustering.num_clusters()];
        let mut in_weights = vec![0.0; clustering.num_clusters()];
        for i in 0..graph.nodes() {
            out_weights[clustering.get(i)] += graph.out_degree(i);
            in_weights[clustering.get(i)] += graph.in_degree(i);
        }
        for (out_w, in_w) in out_weights.iter().zip(&in_weights) {
            quality -= resolution * out_w * in_w / (m * m);
        }
    } else {
        let mut cluster_weights = vec![0.0; clustering.num_clusters()];
        for i in 0..graph.nodes() {
            cluster_weights[clustering.get(i)] += graph.degree(i);
        }
        for cluster_weight in cluster_weights {
            quality -= resolution * cluster_weight * cluster_weight / (4.0 * m * m);
        }
    }

    quality
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Result;

    fn network(directed: bool, nodes: usize, edges: &[(usize, usize)]) -> Network {
        let mut n = Network::new(directed);
        for _ in 0..nodes {
            n.add_node();
        }
        for &(a, b) in edges {
            n.add_edge(a, b, 1.0);
        }
        n
    }

    const TRIANGLES: [(usize, usize); 7] = [(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5), (2, 3)];

    #[test]
    fn two_triangles() -> Result<()> {
        let n = network(false, 6, &TRIANGLES);
        let c = Clustering::new_from_labels(&[0, 0, 0, 1, 1, 1]);

        assert!((modularity(1.0, &n, &c) - 5.0 / 14.0).abs() < 1e-12);

        let all = Clustering::new_from_labels(&[0; 6]);
        assert!(modularity(1.0, &n, &all).abs() < 1e-12);
        assert!((modularity(0.0, &n, &all) - 1.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn directed_cycles() -> Result<()> {
        let edges = [(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (2, 3)];
        let n = network(true, 6, &edges);
        let c = Clustering::new_from_labels(&[0, 0, 0, 1, 1, 1]);

        assert!((modularity(1.0, &n, &c) - 18.0 / 49.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn self_loops_count_once() -> Result<()> {
        let mut n = network(false, 2, &[(0, 1)]);
        n.add_edge(0, 0, 1.0);
        let c = Clustering::init_different_clusters(2);

        // m = 2, L_0 = 1, deg = [3, 1]
        let expected = 0.5 - (9.0 + 1.0) / 16.0;
        assert!((modularity(1.0, &n, &c) - expected).abs() < 1e-12);
        assert!((par_modularity(1.0, &n, &c) - expected).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn edgeless_is_zero() {
        let n = network(false, 3, &[]);
        let c = Clustering::init_different_clusters(3);
        assert_eq!(modularity(1.0, &n, &c), 0.0);
        assert_eq!(par_modularity(1.0, &n, &c), 0.0);
    }

    #[test]
    fn parallel_matches_serial() {
        // ring of 200 nodes with chords, clustered into blocks of 10
        let mut edges = vec![];
        for i in 0..200 {
            edges.push((i, (i + 1) % 200));
            edges.push((i, (i * 7 + 3) % 200));
        }
        for directed in [false, true] {
            let n = network(directed, 200, &edges);
            let labels: Vec<usize> = (0..200).map(|i| i / 10).collect();
            let c = Clustering::new_from_labels(&labels);

            let serial = modularity(1.0, &n, &c);
            let parallel = par_modularity(1.0, &n, &c);
            assert!((serial - parallel).abs() < 1e-12);
        }
    }
}
