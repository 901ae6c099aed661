use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::optimiser::Optimiser;
use crate::partition::VertexPartition;
use crate::quality::QualityFunction;
use crate::report::{self, Row};

/// Weights of the positive and negative layers in a signed partition.
pub const LAYER_WEIGHTS: [f64; 2] = [1.0, -1.0];

/// A partition of a positive layer, optionally paired with a negative layer
/// over the same sites that pushes apart the vertices it connects.
#[derive(Debug, Clone)]
pub struct SignedPartition<'g> {
    layers: Vec<VertexPartition<'g>>,
}

impl<'g> SignedPartition<'g> {
    pub fn new(positive: &'g Graph, negative: Option<&'g Graph>, quality: QualityFunction) -> Result<Self> {
        let mut layers = vec![VertexPartition::singletons(positive, quality)];
        if let Some(negative) = negative {
            if negative.vertex_count() != positive.vertex_count() {
                return Err(Error::LayerMismatch {
                    layer: 1,
                    expected: positive.vertex_count(),
                    found: negative.vertex_count(),
                });
            }
            layers.push(VertexPartition::singletons(negative, quality));
        }
        Ok(Self { layers })
    }

    pub fn has_negative_layer(&self) -> bool {
        self.layers.len() > 1
    }

    /// One optimisation pass, continuing from the current membership.
    pub fn optimise(&mut self, optimiser: &mut Optimiser) -> Result<f64> {
        if self.has_negative_layer() {
            optimiser.optimise_partition_multiplex(&mut self.layers, &LAYER_WEIGHTS)
        } else {
            optimiser.optimise_partition(&mut self.layers[0])
        }
    }

    /// Positive-layer quality minus negative-layer quality.
    pub fn quality(&self) -> f64 {
        self.layers
            .iter()
            .zip(LAYER_WEIGHTS)
            .map(|(layer, weight)| weight * layer.quality())
            .sum()
    }

    /// Significance of the positive layer's membership.
    ///
    /// Significance is defined on edge counts, so edge weights are ignored.
    pub fn significance(&self) -> f64 {
        let positive = &self.layers[0];
        let counted = positive.graph().unweighted();
        VertexPartition::build(
            &counted,
            QualityFunction::Significance,
            positive.membership().to_vec(),
        )
        .quality()
    }

    pub fn membership(&self) -> &[usize] {
        self.layers[0].membership()
    }

    pub fn rows(&self) -> Vec<Row> {
        report::rows(self.layers[0].graph(), self.membership())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_square() -> Graph {
        // 0-1 and 2-3 attract, 1-2 repels, 0-3 attracts weakly.
        let ids = ["a", "b", "c", "d"].into_iter().map(String::from).collect();
        Graph::from_edges(ids, &[(0, 1, 2.0), (2, 3, 2.0), (1, 2, -3.0), (0, 3, 0.5)])
    }

    #[test]
    fn test_quality_subtracts_negative_layer() {
        let graph = signed_square();
        let positive = Graph::from_edges(
            graph.ids().map(String::from).collect(),
            &graph.edges().filter(|e| e.2 > 0.0).collect::<Vec<_>>(),
        );
        let negative = graph.negative_layer();
        let partition = SignedPartition::new(&positive, Some(&negative), QualityFunction::Modularity).unwrap();

        let pos = VertexPartition::singletons(&positive, QualityFunction::Modularity).quality();
        let neg = VertexPartition::singletons(&negative, QualityFunction::Modularity).quality();
        assert!(partition.has_negative_layer());
        assert!((partition.quality() - (pos - neg)).abs() < 1e-12);
    }

    #[test]
    fn test_optimise_without_negative_layer() {
        let graph = signed_square();
        let positive = Graph::from_edges(
            graph.ids().map(String::from).collect(),
            &graph.edges().filter(|e| e.2 > 0.0).collect::<Vec<_>>(),
        );
        let mut partition = SignedPartition::new(&positive, None, QualityFunction::Modularity).unwrap();
        let before = partition.quality();
        partition.optimise(&mut Optimiser::new(Some(1))).unwrap();
        assert!(!partition.has_negative_layer());
        assert!(partition.quality() > before);
        assert_eq!(partition.rows().len(), 4);
        assert!(partition.rows().iter().all(|r| r.group >= 1));
    }

    #[test]
    fn test_negative_layer_keeps_repelled_sites_apart() {
        let graph = signed_square();
        let positive = Graph::from_edges(
            graph.ids().map(String::from).collect(),
            &graph.edges().filter(|e| e.2 > 0.0).collect::<Vec<_>>(),
        );
        let negative = graph.negative_layer();
        let mut partition = SignedPartition::new(&positive, Some(&negative), QualityFunction::Modularity).unwrap();
        let mut optimiser = Optimiser::new(Some(5));
        partition.optimise(&mut optimiser).unwrap();
        partition.optimise(&mut optimiser).unwrap();
        let membership = partition.membership();
        assert_ne!(membership[1], membership[2]);
    }

    #[test]
    fn test_mismatched_negative_layer_is_rejected() {
        let positive = Graph::from_edges(vec!["a".into(), "b".into()], &[(0, 1, 1.0)]);
        let negative = Graph::from_edges(vec!["a".into()], &[]);
        assert!(SignedPartition::new(&positive, Some(&negative), QualityFunction::Surprise).is_err());
    }

    #[test]
    fn test_significance_ignores_edge_weights() {
        let ids: Vec<String> = (0..6).map(|i| i.to_string()).collect();
        let triangles = |w: f64| {
            Graph::from_edges(
                ids.clone(),
                &[
                    (0, 1, w),
                    (1, 2, w),
                    (0, 2, w),
                    (3, 4, w),
                    (4, 5, w),
                    (3, 5, w),
                    (2, 3, 1.0),
                ],
            )
        };
        let expected = 6.0 * (15.0f64 / 7.0).ln();
        for w in [1.0, 3.0] {
            let graph = triangles(w);
            let mut partition = SignedPartition::new(&graph, None, QualityFunction::Modularity).unwrap();
            partition.optimise(&mut Optimiser::new(Some(2))).unwrap();
            let m = partition.membership();
            assert!(m[0] == m[1] && m[1] == m[2], "weight {w}: {m:?}");
            assert!(m[3] == m[4] && m[4] == m[5], "weight {w}: {m:?}");
            assert_ne!(m[0], m[3]);
            assert!((partition.significance() - expected).abs() < 1e-12, "weight {w}");
        }
    }

    #[test]
    fn test_significance_of_singletons_is_zero() {
        let positive = Graph::from_edges(vec!["a".into(), "b".into()], &[(0, 1, 1.0)]);
        let partition = SignedPartition::new(&positive, None, QualityFunction::Modularity).unwrap();
        assert_eq!(partition.significance(), 0.0);
    }
}
