//! Greedy graph coloring used to schedule semi-synchronous label updates.

use crate::network::NeighborWeights;

/// Proper vertex coloring: adjacent nodes never share a color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coloring {
    colors: Vec<usize>,
    classes: Vec<Vec<usize>>,
}

impl Coloring {
    /// Greedy largest-first coloring of a symmetric adjacency.
    ///
    /// Nodes are visited by decreasing neighbor count, ties in index order, and
    /// each takes the smallest color none of its neighbors has. Each color
    /// class lists its nodes in visiting order.
    pub fn greedy(neighbors: &NeighborWeights) -> Coloring {
        let n = neighbors.len();

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&i| std::cmp::Reverse(neighbors[i].len()));

        let mut colors = vec![usize::MAX; n];
        // stamp[c] == node means color c is taken by a neighbor of node
        let mut stamp: Vec<usize> = Vec::new();
        let mut classes: Vec<Vec<usize>> = Vec::new();

        for &node in &order {
            for &(target, _) in &neighbors[node] {
                let c = colors[target];
                if c != usize::MAX {
                    stamp[c] = node;
                }
            }

            let color = (0..stamp.len()).find(|&c| stamp[c] != node).unwrap_or(stamp.len());
            if color == stamp.len() {
                stamp.push(usize::MAX);
                classes.push(Vec::new());
            }

            colors[node] = color;
            classes[color].push(node);
        }

        Coloring { colors, classes }
    }

    /// Color of `node`.
    pub fn color(&self, node: usize) -> usize {
        self.colors[node]
    }

    /// Nodes of each color, in ascending color order.
    pub fn classes(&self) -> &[Vec<usize>] {
        &self.classes
    }

    /// Number of colors used.
    pub fn num_colors(&self) -> usize {
        self.classes.len()
    }

    /// True if no two neighbors share a color.
    pub fn is_proper(&self, neighbors: &NeighborWeights) -> bool {
        neighbors.iter().enumerate().all(|(node, adj)| {
            adj.iter()
                .all(|&(target, _)| target == node || self.colors[target] != self.colors[node])
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Network;
    use insta::assert_snapshot;

    fn network(nodes: usize, edges: &[(usize, usize)]) -> Network {
        let mut n = Network::new(false);
        for _ in 0..nodes {
            n.add_node();
        }
        for &(a, b) in edges {
            n.add_edge(a, b, 1.0);
        }
        n
    }

    #[test]
    fn two_triangles() {
        let n = network(6, &[(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5), (2, 3)]);
        let w = n.neighbor_weights(1.0, 1.0);
        let c = Coloring::greedy(&w);

        assert!(c.is_proper(&w));
        assert_eq!(c.num_colors(), 3);
        assert_snapshot!(format!("{:?}", c.classes()), @"[[2, 4], [3, 0], [1, 5]]");
    }

    #[test]
    fn triangle_needs_three_colors() {
        let n = network(3, &[(0, 1), (1, 2), (2, 0)]);
        let w = n.neighbor_weights(1.0, 1.0);
        let c = Coloring::greedy(&w);
        assert_eq!(c.num_colors(), 3);
        assert!(c.is_proper(&w));
    }

    #[test]
    fn isolated_nodes_share_color_zero() {
        let n = network(3, &[]);
        let c = Coloring::greedy(&n.neighbor_weights(1.0, 1.0));
        assert_eq!(c.classes(), &[vec![0, 1, 2]]);
        assert_eq!(c.color(2), 0);
    }
}
