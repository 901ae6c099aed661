use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::BTreeMap;

/// A vertex of a graph layer.
///
/// `size` is 1 for graphs read from disk. For collapsed graphs it counts the
/// original vertices merged into this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub id: String,
    pub size: usize,
}

impl Site {
    pub fn new(id: impl Into<String>) -> Self {
        Site {
            id: id.into(),
            size: 1,
        }
    }
}

/// Weighted undirected graph with the per-vertex caches partitions need.
///
/// Self-loops and parallel edges are allowed. Every edge counts once towards
/// `total_weight`; a self-loop counts twice towards its vertex's strength.
#[derive(Debug, Clone)]
pub struct Graph {
    inner: UnGraph<Site, f64>,
    neighbours: Vec<Vec<(usize, f64)>>,
    self_weight: Vec<f64>,
    strength: Vec<f64>,
    total_weight: f64,
    total_size: usize,
}

impl Graph {
    pub fn new(inner: UnGraph<Site, f64>) -> Self {
        let n = inner.node_count();
        let mut self_weight = vec![0.0; n];
        let mut strength = vec![0.0; n];
        let mut merged: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n];
        let mut total_weight = 0.0;

        for edge in inner.edge_references() {
            let (u, v, w) = (edge.source().index(), edge.target().index(), *edge.weight());
            total_weight += w;
            strength[u] += w;
            strength[v] += w;
            if u == v {
                self_weight[u] += w;
            } else {
                *merged[u].entry(v).or_insert(0.0) += w;
                *merged[v].entry(u).or_insert(0.0) += w;
            }
        }

        let total_size = inner.node_weights().map(|site| site.size).sum();
        let neighbours = merged
            .into_iter()
            .map(|adj| adj.into_iter().collect())
            .collect();

        Graph {
            inner,
            neighbours,
            self_weight,
            strength,
            total_weight,
            total_size,
        }
    }

    /// Builds a graph with unit-size vertices from identifiers and an edge list.
    pub fn from_edges(ids: Vec<String>, edges: &[(usize, usize, f64)]) -> Self {
        let mut inner = UnGraph::with_capacity(ids.len(), edges.len());
        for id in ids {
            inner.add_node(Site::new(id));
        }
        for &(u, v, w) in edges {
            inner.add_edge(NodeIndex::new(u), NodeIndex::new(v), w);
        }
        Graph::new(inner)
    }

    pub fn vertex_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn id(&self, v: usize) -> &str {
        &self.inner[NodeIndex::new(v)].id
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.inner.node_weights().map(|site| site.id.as_str())
    }

    pub fn size(&self, v: usize) -> usize {
        self.inner[NodeIndex::new(v)].size
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    pub fn strength(&self, v: usize) -> f64 {
        self.strength[v]
    }

    pub fn self_weight(&self, v: usize) -> f64 {
        self.self_weight[v]
    }

    /// Distinct neighbours of `v` with the summed weight of the edges to each.
    /// Self-loops are not included.
    pub fn neighbours(&self, v: usize) -> &[(usize, f64)] {
        &self.neighbours[v]
    }

    /// `(source, target, weight)` for every edge, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.inner
            .edge_references()
            .map(|e| (e.source().index(), e.target().index(), *e.weight()))
    }

    pub fn petgraph(&self) -> &UnGraph<Site, f64> {
        &self.inner
    }

    /// Total weight over the number of possible vertex pairs.
    pub fn density(&self) -> f64 {
        let pairs = possible_pairs(self.total_size as f64);
        if pairs > 0.0 {
            self.total_weight / pairs
        } else {
            0.0
        }
    }

    /// The layer of negative edges with their weights made positive.
    ///
    /// Every vertex is kept in place so group indices stay aligned with the
    /// layer this one was extracted from.
    pub fn negative_layer(&self) -> Graph {
        let inner = self.inner.filter_map(
            |_, site| Some(site.clone()),
            |_, &w| if w < 0.0 { Some(-w) } else { None },
        );
        Graph::new(inner)
    }

    /// The same sites and edges with every weight set to 1, so that weights
    /// count edges.
    pub fn unweighted(&self) -> Graph {
        Graph::new(self.inner.map(|_, site| site.clone(), |_, _| 1.0))
    }

    /// Merges every community into a single vertex.
    ///
    /// `membership` must use the contiguous labels `0..n_communities`. Edges
    /// inside a community become a self-loop on its vertex, so total weight
    /// and every partition quality are preserved.
    pub fn collapse(&self, membership: &[usize], n_communities: usize) -> Graph {
        let mut sizes = vec![0usize; n_communities];
        for (v, &c) in membership.iter().enumerate() {
            sizes[c] += self.size(v);
        }

        let mut weights: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for (u, v, w) in self.edges() {
            let (cu, cv) = (membership[u], membership[v]);
            let key = if cu <= cv { (cu, cv) } else { (cv, cu) };
            *weights.entry(key).or_insert(0.0) += w;
        }

        let mut inner = UnGraph::with_capacity(n_communities, weights.len());
        for (c, size) in sizes.into_iter().enumerate() {
            inner.add_node(Site {
                id: c.to_string(),
                size,
            });
        }
        for ((cu, cv), w) in weights {
            inner.add_edge(NodeIndex::new(cu), NodeIndex::new(cv), w);
        }
        Graph::new(inner)
    }
}

/// Number of unordered vertex pairs among `n` vertices.
pub fn possible_pairs(n: f64) -> f64 {
    n * (n - 1.0) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("s{i}")).collect()
    }

    #[test]
    fn test_strength_counts_self_loop_twice() {
        let graph = Graph::from_edges(ids(2), &[(0, 1, 2.0), (0, 0, 1.5)]);
        assert_eq!(graph.total_weight(), 3.5);
        assert_eq!(graph.strength(0), 5.0);
        assert_eq!(graph.strength(1), 2.0);
        assert_eq!(graph.self_weight(0), 1.5);
        assert_eq!(graph.neighbours(0), &[(1, 2.0)]);
    }

    #[test]
    fn test_parallel_edges_are_merged_in_neighbours() {
        let graph = Graph::from_edges(ids(2), &[(0, 1, 1.0), (1, 0, 2.0)]);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.neighbours(1), &[(0, 3.0)]);
    }

    #[test]
    fn test_negative_layer_keeps_vertices_and_flips_sign() {
        let graph = Graph::from_edges(
            ids(4),
            &[(0, 1, 1.0), (1, 2, -2.0), (2, 3, 0.5), (0, 3, -0.25)],
        );
        let neg = graph.negative_layer();

        assert_eq!(neg.vertex_count(), 4);
        assert_eq!(neg.ids().collect::<Vec<_>>(), vec!["s0", "s1", "s2", "s3"]);
        let edges: Vec<_> = neg.edges().collect();
        assert_eq!(edges, vec![(1, 2, 2.0), (0, 3, 0.25)]);
        assert_eq!(neg.total_weight(), 2.25);
    }

    #[test]
    fn test_negative_layer_of_positive_graph_is_empty() {
        let graph = Graph::from_edges(ids(3), &[(0, 1, 1.0), (1, 2, 1.0)]);
        let neg = graph.negative_layer();
        assert_eq!(neg.vertex_count(), 3);
        assert_eq!(neg.edge_count(), 0);
    }

    #[test]
    fn test_unweighted_counts_edges() {
        let graph = Graph::from_edges(ids(3), &[(0, 1, 2.5), (1, 2, -4.0), (1, 1, 3.0)]);
        let counted = graph.unweighted();
        assert_eq!(counted.ids().collect::<Vec<_>>(), vec!["s0", "s1", "s2"]);
        assert_eq!(counted.edges().collect::<Vec<_>>(), vec![(0, 1, 1.0), (1, 2, 1.0), (1, 1, 1.0)]);
        assert_eq!(counted.total_weight(), 3.0);
    }

    #[test]
    fn test_collapse_preserves_weight_and_size() {
        let graph = Graph::from_edges(
            ids(4),
            &[(0, 1, 1.0), (1, 2, 2.0), (2, 3, 3.0), (3, 3, 0.5)],
        );
        let collapsed = graph.collapse(&[0, 0, 1, 1], 2);

        assert_eq!(collapsed.vertex_count(), 2);
        assert_eq!(collapsed.total_weight(), graph.total_weight());
        assert_eq!(collapsed.total_size(), 4);
        assert_eq!(collapsed.size(0), 2);
        assert_eq!(collapsed.self_weight(0), 1.0);
        assert_eq!(collapsed.self_weight(1), 3.5);
        assert_eq!(collapsed.neighbours(0), &[(1, 2.0)]);
    }

    #[test]
    fn test_density() {
        let graph = Graph::from_edges(ids(4), &[(0, 1, 1.0), (2, 3, 1.0), (1, 2, 1.0)]);
        assert!((graph.density() - 0.5).abs() < 1e-12);
        assert_eq!(Graph::from_edges(ids(1), &[]).density(), 0.0);
    }
}
