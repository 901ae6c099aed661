use crate::error::{Error, Result};
use crate::graph::{Graph, possible_pairs};
use crate::quality::{QualityFunction, kl, kll};
use rayon::prelude::*;

/// A partition of one graph layer into communities, with the aggregates the
/// quality functions read kept up to date on every move.
///
/// Community labels live in `0..vertex_count`, so there is always room to
/// move a vertex into an empty community.
#[derive(Debug, Clone)]
pub struct VertexPartition<'g> {
    graph: &'g Graph,
    quality: QualityFunction,
    membership: Vec<usize>,
    comm_size: Vec<usize>,
    comm_internal: Vec<f64>,
    comm_strength: Vec<f64>,
    comm_vertices: Vec<usize>,
    total_internal: f64,
    total_possible: f64,
}

impl<'g> VertexPartition<'g> {
    /// Every vertex in its own community.
    pub fn singletons(graph: &'g Graph, quality: QualityFunction) -> Self {
        let membership = (0..graph.vertex_count()).collect();
        Self::build(graph, quality, membership)
    }

    pub fn with_membership(
        graph: &'g Graph,
        quality: QualityFunction,
        membership: Vec<usize>,
    ) -> Result<Self> {
        let n = graph.vertex_count();
        if membership.len() != n {
            return Err(Error::InvalidParameter {
                name: "membership",
                message: format!("has {} entries for {} vertices", membership.len(), n),
            });
        }
        if let Some(&c) = membership.iter().find(|&&c| c >= n) {
            return Err(Error::InvalidParameter {
                name: "membership",
                message: format!("community {c} is out of range for {n} vertices"),
            });
        }
        Ok(Self::build(graph, quality, membership))
    }

    /// `membership` must hold one label below `vertex_count` per vertex.
    pub(crate) fn build(graph: &'g Graph, quality: QualityFunction, membership: Vec<usize>) -> Self {
        let n = graph.vertex_count();
        let mut partition = VertexPartition {
            graph,
            quality,
            membership,
            comm_size: vec![0; n],
            comm_internal: vec![0.0; n],
            comm_strength: vec![0.0; n],
            comm_vertices: vec![0; n],
            total_internal: 0.0,
            total_possible: 0.0,
        };
        partition.recompute();
        partition
    }

    fn recompute(&mut self) {
        let graph = self.graph;
        self.comm_size.iter_mut().for_each(|s| *s = 0);
        self.comm_vertices.iter_mut().for_each(|s| *s = 0);
        self.comm_internal.iter_mut().for_each(|w| *w = 0.0);
        self.comm_strength.iter_mut().for_each(|w| *w = 0.0);

        for (v, &c) in self.membership.iter().enumerate() {
            self.comm_size[c] += graph.size(v);
            self.comm_vertices[c] += 1;
            self.comm_strength[c] += graph.strength(v);
        }
        for (u, v, w) in graph.edges() {
            let c = self.membership[u];
            if c == self.membership[v] {
                self.comm_internal[c] += w;
            }
        }
        self.total_internal = self.comm_internal.iter().sum();
        self.total_possible = self
            .comm_size
            .iter()
            .map(|&s| possible_pairs(s as f64))
            .sum();
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    pub fn quality_function(&self) -> QualityFunction {
        self.quality
    }

    pub fn membership(&self) -> &[usize] {
        &self.membership
    }

    /// Number of non-empty communities.
    pub fn community_count(&self) -> usize {
        self.comm_vertices.iter().filter(|&&n| n > 0).count()
    }

    /// Number of label slots, non-empty or not.
    pub fn capacity(&self) -> usize {
        self.membership.len()
    }

    pub fn is_empty_community(&self, c: usize) -> bool {
        self.comm_vertices[c] == 0
    }

    /// Number of vertices currently labelled `c`.
    pub fn community_vertices(&self, c: usize) -> usize {
        self.comm_vertices[c]
    }

    pub fn community_size(&self, c: usize) -> usize {
        self.comm_size[c]
    }

    pub fn community_internal_weight(&self, c: usize) -> f64 {
        self.comm_internal[c]
    }

    /// Summed weight of the edges between `v` and the members of `c`,
    /// excluding self-loops on `v`.
    pub fn weight_to_comm(&self, v: usize, c: usize) -> f64 {
        self.graph
            .neighbours(v)
            .iter()
            .filter(|(u, _)| self.membership[*u] == c)
            .map(|(_, w)| w)
            .sum()
    }

    pub fn quality(&self) -> f64 {
        let m = self.graph.total_weight();
        match self.quality {
            QualityFunction::Modularity => {
                if m == 0.0 {
                    return 0.0;
                }
                (0..self.capacity())
                    .into_par_iter()
                    .filter(|&c| self.comm_vertices[c] > 0)
                    .map(|c| {
                        let k = self.comm_strength[c];
                        self.comm_internal[c] / m - k * k / (4.0 * m * m)
                    })
                    .sum()
            }
            QualityFunction::Surprise => surprise(
                m,
                possible_pairs(self.graph.total_size() as f64),
                self.total_internal,
                self.total_possible,
            ),
            QualityFunction::Significance => {
                let p = self.graph.density();
                (0..self.capacity())
                    .into_par_iter()
                    .filter(|&c| self.comm_vertices[c] > 0)
                    .map(|c| significance_term(self.comm_size[c], self.comm_internal[c], p))
                    .sum()
            }
        }
    }

    /// Change in [`quality`](Self::quality) if `v` moved to `new_comm`.
    pub fn diff_move(&self, v: usize, new_comm: usize) -> f64 {
        let old_comm = self.membership[v];
        self.diff_move_with(
            v,
            new_comm,
            self.weight_to_comm(v, old_comm),
            self.weight_to_comm(v, new_comm),
        )
    }

    /// [`diff_move`](Self::diff_move) with the weights from `v` to its
    /// current community and to `new_comm` already known.
    pub(crate) fn diff_move_with(&self, v: usize, new_comm: usize, w_old: f64, w_new: f64) -> f64 {
        let old_comm = self.membership[v];
        if new_comm == old_comm {
            return 0.0;
        }
        let graph = self.graph;
        let m = graph.total_weight();
        let self_w = graph.self_weight(v);
        let size = graph.size(v);

        match self.quality {
            QualityFunction::Modularity => {
                if m == 0.0 {
                    return 0.0;
                }
                let k = graph.strength(v);
                let k_old = self.comm_strength[old_comm];
                let k_new = self.comm_strength[new_comm];
                (w_new - w_old) / m - k * (k_new - k_old + k) / (2.0 * m * m)
            }
            QualityFunction::Surprise => {
                let n2 = possible_pairs(graph.total_size() as f64);
                let internal = self.total_internal + w_new - w_old;
                let possible = self.total_possible
                    + self.pairs_change(old_comm, size, false)
                    + self.pairs_change(new_comm, size, true);
                surprise(m, n2, internal, possible)
                    - surprise(m, n2, self.total_internal, self.total_possible)
            }
            QualityFunction::Significance => {
                let p = graph.density();
                let (n_old, n_new) = (self.comm_size[old_comm], self.comm_size[new_comm]);
                let (i_old, i_new) = (self.comm_internal[old_comm], self.comm_internal[new_comm]);
                significance_term(n_old - size, i_old - w_old - self_w, p)
                    + significance_term(n_new + size, i_new + w_new + self_w, p)
                    - significance_term(n_old, i_old, p)
                    - significance_term(n_new, i_new, p)
            }
        }
    }

    fn pairs_change(&self, c: usize, size: usize, adding: bool) -> f64 {
        let before = self.comm_size[c];
        let after = if adding { before + size } else { before - size };
        possible_pairs(after as f64) - possible_pairs(before as f64)
    }

    pub fn move_node(&mut self, v: usize, new_comm: usize) {
        let old_comm = self.membership[v];
        let w_old = self.weight_to_comm(v, old_comm);
        let w_new = self.weight_to_comm(v, new_comm);
        self.move_node_with(v, new_comm, w_old, w_new);
    }

    pub(crate) fn move_node_with(&mut self, v: usize, new_comm: usize, w_old: f64, w_new: f64) {
        let old_comm = self.membership[v];
        if new_comm == old_comm {
            return;
        }
        let graph = self.graph;
        let size = graph.size(v);
        let self_w = graph.self_weight(v);
        let k = graph.strength(v);

        self.total_possible +=
            self.pairs_change(old_comm, size, false) + self.pairs_change(new_comm, size, true);
        self.total_internal += w_new - w_old;

        self.comm_size[old_comm] -= size;
        self.comm_vertices[old_comm] -= 1;
        self.comm_strength[old_comm] -= k;
        self.comm_internal[old_comm] -= w_old + self_w;

        self.comm_size[new_comm] += size;
        self.comm_vertices[new_comm] += 1;
        self.comm_strength[new_comm] += k;
        self.comm_internal[new_comm] += w_new + self_w;

        self.membership[v] = new_comm;
    }

    /// Labels ordered by decreasing community size. Ties keep the lower
    /// original label first. Empty communities receive labels after all
    /// non-empty ones.
    pub fn renumbering(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.capacity()).collect();
        order.sort_by_key(|&c| {
            (
                self.comm_vertices[c] == 0,
                std::cmp::Reverse(self.comm_size[c]),
            )
        });
        let mut mapping = vec![0; self.capacity()];
        for (label, c) in order.into_iter().enumerate() {
            mapping[c] = label;
        }
        mapping
    }

    /// Replaces every label `c` with `mapping[c]`.
    pub fn relabel(&mut self, mapping: &[usize]) {
        for c in self.membership.iter_mut() {
            *c = mapping[*c];
        }
        self.recompute();
    }

    pub fn renumber_communities(&mut self) {
        let mapping = self.renumbering();
        self.relabel(&mapping);
    }

    /// Sets each vertex to the community its collapsed vertex was given.
    ///
    /// The current labels must be the collapsed vertex indices, which holds
    /// right after the graph was collapsed by this partition.
    pub fn from_coarse_partition(&mut self, coarse: &[usize]) {
        for c in self.membership.iter_mut() {
            *c = coarse[*c];
        }
        self.recompute();
    }
}

fn surprise(m: f64, n2: f64, internal: f64, possible: f64) -> f64 {
    if m <= 0.0 || n2 <= 0.0 {
        return 0.0;
    }
    m * kll(internal / m, possible / n2)
}

fn significance_term(size: usize, internal: f64, p: f64) -> f64 {
    let pairs = possible_pairs(size as f64);
    if pairs <= 0.0 {
        return 0.0;
    }
    pairs * kl(internal / pairs, p)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two triangles joined by the edge 2-3.
    fn two_triangles() -> Graph {
        let ids = (0..6).map(|i| i.to_string()).collect();
        Graph::from_edges(
            ids,
            &[
                (0, 1, 1.0),
                (1, 2, 1.0),
                (0, 2, 1.0),
                (3, 4, 1.0),
                (4, 5, 1.0),
                (3, 5, 1.0),
                (2, 3, 1.0),
            ],
        )
    }

    #[test]
    fn test_modularity_of_two_triangles() {
        let graph = two_triangles();
        let partition =
            VertexPartition::with_membership(&graph, QualityFunction::Modularity, vec![0, 0, 0, 1, 1, 1])
                .unwrap();
        // m = 7, w_c = 3, K_c = 7 for both halves.
        let expected = 2.0 * (3.0 / 7.0 - 49.0 / 196.0);
        assert!((partition.quality() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_surprise_of_two_triangles() {
        let graph = two_triangles();
        let partition =
            VertexPartition::with_membership(&graph, QualityFunction::Surprise, vec![0, 0, 0, 1, 1, 1])
                .unwrap();
        // m = 7, q = 6/7 of the weight inside, s = 6 of 15 pairs inside.
        let (q, s) = (6.0f64 / 7.0, 6.0f64 / 15.0);
        let expected = 7.0 * (q * (q / s).ln() + (1.0 - q) * ((1.0 - q) / (1.0 - s)).ln());
        assert!((partition.quality() - expected).abs() < 1e-12);
        assert!((partition.quality() - 3.1377557869920576).abs() < 1e-12);
    }

    #[test]
    fn test_significance_of_two_triangles() {
        let graph = two_triangles();
        let partition = VertexPartition::with_membership(
            &graph,
            QualityFunction::Significance,
            vec![0, 0, 0, 1, 1, 1],
        )
        .unwrap();
        // Both triangles are complete (p_c = 1) against density p = 7/15.
        let expected = 6.0 * (15.0f64 / 7.0).ln();
        assert!((partition.quality() - expected).abs() < 1e-12);
        assert!((partition.quality() - 4.5728403122813805).abs() < 1e-12);
    }

    #[test]
    fn test_singleton_modularity_is_negative() {
        let graph = two_triangles();
        let partition = VertexPartition::singletons(&graph, QualityFunction::Modularity);
        assert!(partition.quality() < 0.0);
        assert_eq!(partition.community_count(), 6);
    }

    #[test]
    fn test_diff_move_matches_quality_difference() {
        let graph = two_triangles();
        for quality in [
            QualityFunction::Modularity,
            QualityFunction::Surprise,
            QualityFunction::Significance,
        ] {
            let mut partition =
                VertexPartition::with_membership(&graph, quality, vec![0, 0, 1, 1, 3, 3]).unwrap();
            for (v, target) in [(2, 0), (3, 3), (5, 4), (0, 1)] {
                let before = partition.quality();
                let predicted = partition.diff_move(v, target);
                partition.move_node(v, target);
                let after = partition.quality();
                assert!(
                    (after - before - predicted).abs() < 1e-9,
                    "{quality}: moving {v} to {target} predicted {predicted}, got {}",
                    after - before
                );
            }
        }
    }

    #[test]
    fn test_move_node_keeps_aggregates_consistent() {
        let graph = two_triangles();
        let mut moved = VertexPartition::singletons(&graph, QualityFunction::Surprise);
        for (v, c) in [(1, 0), (2, 0), (4, 3), (5, 3)] {
            moved.move_node(v, c);
        }
        let rebuilt = VertexPartition::with_membership(
            &graph,
            QualityFunction::Surprise,
            moved.membership().to_vec(),
        )
        .unwrap();
        assert_eq!(moved.community_count(), 2);
        assert!((moved.quality() - rebuilt.quality()).abs() < 1e-12);
        assert_eq!(moved.community_internal_weight(0), 3.0);
    }

    #[test]
    fn test_renumber_orders_by_decreasing_size() {
        let graph = two_triangles();
        let mut partition = VertexPartition::with_membership(
            &graph,
            QualityFunction::Modularity,
            vec![5, 2, 2, 2, 4, 4],
        )
        .unwrap();
        partition.renumber_communities();
        assert_eq!(partition.membership(), &[2, 0, 0, 0, 1, 1]);
    }

    #[test]
    fn test_collapsed_partition_keeps_quality() {
        let graph = two_triangles();
        for quality in [
            QualityFunction::Modularity,
            QualityFunction::Surprise,
            QualityFunction::Significance,
        ] {
            let membership = vec![0, 0, 1, 1, 2, 2];
            let fine = VertexPartition::with_membership(&graph, quality, membership.clone()).unwrap();
            let collapsed = graph.collapse(&membership, 3);
            let coarse = VertexPartition::singletons(&collapsed, quality);
            assert!((fine.quality() - coarse.quality()).abs() < 1e-9, "{quality}");
        }
    }

    #[test]
    fn test_with_membership_rejects_bad_input() {
        let graph = two_triangles();
        assert!(VertexPartition::with_membership(&graph, QualityFunction::Modularity, vec![0; 3]).is_err());
        assert!(
            VertexPartition::with_membership(&graph, QualityFunction::Modularity, vec![0, 0, 0, 0, 0, 6])
                .is_err()
        );
    }

    #[test]
    fn test_empty_graph_qualities_are_zero() {
        let graph = Graph::from_edges(vec!["a".into(), "b".into()], &[]);
        for quality in [QualityFunction::Modularity, QualityFunction::Surprise] {
            let partition = VertexPartition::singletons(&graph, quality);
            assert_eq!(partition.quality(), 0.0);
            assert_eq!(partition.diff_move(0, 1), 0.0);
        }
    }
}
