//! Multilevel Louvain optimisation of single and multiplex partitions.
//!
//! 1. **Local moving**: visit vertices in random order and move each to the
//!    candidate community with the largest positive improvement, until a full
//!    sweep moves nothing.
//! 2. **Aggregation**: collapse every layer by the resulting communities and
//!    start again from singletons on the collapsed graphs.
//! 3. Stop once collapsing no longer reduces the number of vertices.
//!
//! A multiplex partition is a set of layers over the same vertices that share
//! one membership. The improvement of a move is the sum of each layer's
//! improvement scaled by its layer weight.

use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::partition::VertexPartition;
use crate::quality::QualityFunction;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Which communities are tried when a vertex is moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ConsiderComms {
    /// Every non-empty community and one empty one.
    #[default]
    All,
    /// Communities of the vertex's neighbours in any layer.
    AllNeigh,
    /// The community of one uniformly chosen vertex.
    Rand,
    /// The community of one randomly chosen neighbour.
    RandNeigh,
}

#[derive(Debug, Clone)]
pub struct Optimiser {
    consider_comms: ConsiderComms,
    /// Moves must improve quality by more than this to be taken.
    min_improvement: f64,
    rng: StdRng,
}

impl Optimiser {
    /// Optimiser seeded from `seed`, or from system entropy when `None`.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            consider_comms: ConsiderComms::default(),
            min_improvement: 1e-10,
            rng,
        }
    }

    pub fn with_consider_comms(mut self, consider_comms: ConsiderComms) -> Self {
        self.consider_comms = consider_comms;
        self
    }

    pub fn with_min_improvement(mut self, min_improvement: f64) -> Self {
        self.min_improvement = min_improvement;
        self
    }

    pub fn consider_comms(&self) -> ConsiderComms {
        self.consider_comms
    }

    /// Optimises `partition` starting from its current membership.
    ///
    /// Returns the total improvement in quality.
    pub fn optimise_partition(&mut self, partition: &mut VertexPartition<'_>) -> Result<f64> {
        self.optimise_partition_multiplex(std::slice::from_mut(partition), &[1.0])
    }

    /// Optimises the layers jointly, keeping their memberships identical.
    ///
    /// The starting membership is taken from the first layer. Returns the
    /// total improvement of `Σ layer_weight · quality`.
    pub fn optimise_partition_multiplex(
        &mut self,
        partitions: &mut [VertexPartition<'_>],
        layer_weights: &[f64],
    ) -> Result<f64> {
        if partitions.len() != layer_weights.len() {
            return Err(Error::InvalidParameter {
                name: "layer_weights",
                message: format!(
                    "{} weights given for {} layers",
                    layer_weights.len(),
                    partitions.len()
                ),
            });
        }
        let Some(first) = partitions.first() else {
            return Ok(0.0);
        };
        let n = first.graph().vertex_count();
        for (layer, partition) in partitions.iter().enumerate() {
            let found = partition.graph().vertex_count();
            if found != n {
                return Err(Error::LayerMismatch {
                    layer,
                    expected: n,
                    found,
                });
            }
        }
        if partitions
            .iter()
            .any(|p| p.membership() != partitions[0].membership())
        {
            let membership = partitions[0].membership().to_vec();
            for partition in partitions.iter_mut().skip(1) {
                *partition = VertexPartition::with_membership(
                    partition.graph(),
                    partition.quality_function(),
                    membership.clone(),
                )?;
            }
        }

        let mut total = self.move_nodes(partitions, layer_weights);
        renumber(partitions);
        debug!(level = 0, vertices = n, improvement = total, "local moving finished");

        let mut vertices = n;
        let mut graphs = collapse(partitions.iter());
        let mut level = 1;
        while graphs[0].vertex_count() < vertices {
            vertices = graphs[0].vertex_count();
            let qualities = partitions.iter().map(|p| p.quality_function());
            let mut coarse: Vec<VertexPartition<'_>> = graphs
                .iter()
                .zip(qualities)
                .map(|(graph, quality)| VertexPartition::singletons(graph, quality))
                .collect();

            let improvement = self.move_nodes(&mut coarse, layer_weights);
            total += improvement;
            renumber(&mut coarse);
            debug!(level, vertices, improvement, "local moving finished");

            for partition in partitions.iter_mut() {
                partition.from_coarse_partition(coarse[0].membership());
            }
            let next = collapse(coarse.iter());
            drop(coarse);
            graphs = next;
            level += 1;
        }

        renumber(partitions);
        Ok(total)
    }

    /// Local moving phase. Returns the summed improvement of all moves.
    fn move_nodes(&mut self, partitions: &mut [VertexPartition<'_>], layer_weights: &[f64]) -> f64 {
        let n = partitions[0].capacity();
        let mut order: Vec<usize> = (0..n).collect();
        let mut scratch: Vec<CommWeights> = partitions.iter().map(|_| CommWeights::new(n)).collect();
        let mut seen = vec![false; n];
        let mut candidates: Vec<usize> = Vec::new();
        let mut total = 0.0;
        let mut sweeps = 0;

        loop {
            order.shuffle(&mut self.rng);
            let mut moves = 0;

            for &v in &order {
                let current = partitions[0].membership()[v];
                for (weights, partition) in scratch.iter_mut().zip(partitions.iter()) {
                    weights.collect(partition, v);
                }

                candidates.clear();
                self.candidates(&partitions[0], v, &scratch, &mut seen, &mut candidates);

                let mut best = current;
                let mut best_gain = self.min_improvement;
                for &c in &candidates {
                    if c == current {
                        continue;
                    }
                    let gain: f64 = partitions
                        .iter()
                        .zip(&scratch)
                        .zip(layer_weights)
                        .map(|((p, weights), &lw)| {
                            lw * p.diff_move_with(v, c, weights.get(current), weights.get(c))
                        })
                        .sum();
                    if gain > best_gain {
                        best_gain = gain;
                        best = c;
                    }
                }

                if best != current {
                    for (partition, weights) in partitions.iter_mut().zip(&scratch) {
                        partition.move_node_with(v, best, weights.get(current), weights.get(best));
                    }
                    total += best_gain;
                    moves += 1;
                }
                scratch.iter_mut().for_each(CommWeights::clear);
            }

            sweeps += 1;
            if moves == 0 {
                break;
            }
        }
        debug!(sweeps, vertices = n, "vertex moves converged");
        total
    }

    fn candidates(
        &mut self,
        partition: &VertexPartition<'_>,
        v: usize,
        scratch: &[CommWeights],
        seen: &mut [bool],
        out: &mut Vec<usize>,
    ) {
        let n = partition.capacity();
        match self.consider_comms {
            ConsiderComms::All => {
                let alone = partition.community_vertices(partition.membership()[v]) == 1;
                let mut empty_offered = false;
                for c in 0..n {
                    if !partition.is_empty_community(c) {
                        out.push(c);
                    } else if !alone && !empty_offered {
                        out.push(c);
                        empty_offered = true;
                    }
                }
            }
            ConsiderComms::AllNeigh => {
                for weights in scratch {
                    for &c in &weights.touched {
                        if !seen[c] {
                            seen[c] = true;
                            out.push(c);
                        }
                    }
                }
                for &c in out.iter() {
                    seen[c] = false;
                }
            }
            ConsiderComms::Rand => {
                let u = self.rng.gen_range(0..n);
                out.push(partition.membership()[u]);
            }
            ConsiderComms::RandNeigh => {
                let degree: usize = scratch.iter().map(|w| w.neighbours.len()).sum();
                if degree > 0 {
                    let mut pick = self.rng.gen_range(0..degree);
                    for weights in scratch {
                        if pick < weights.neighbours.len() {
                            out.push(partition.membership()[weights.neighbours[pick]]);
                            break;
                        }
                        pick -= weights.neighbours.len();
                    }
                }
            }
        }
    }
}

/// Partitions `graph` with `quality` from singletons in a single optimiser run.
pub fn find_partition<'g>(
    graph: &'g Graph,
    quality: QualityFunction,
    seed: Option<u64>,
) -> Result<VertexPartition<'g>> {
    let mut partition = VertexPartition::singletons(graph, quality);
    Optimiser::new(seed).optimise_partition(&mut partition)?;
    Ok(partition)
}

/// Renumbers every layer with the labels of the first.
fn renumber(partitions: &mut [VertexPartition<'_>]) {
    let mapping = partitions[0].renumbering();
    for partition in partitions.iter_mut() {
        partition.relabel(&mapping);
    }
}

fn collapse<'a, 'g: 'a>(partitions: impl Iterator<Item = &'a VertexPartition<'g>>) -> Vec<Graph> {
    partitions
        .map(|p| p.graph().collapse(p.membership(), p.community_count()))
        .collect()
}

/// Weights from one vertex to each neighbouring community in one layer.
#[derive(Debug)]
struct CommWeights {
    weights: Vec<f64>,
    seen: Vec<bool>,
    touched: Vec<usize>,
    neighbours: Vec<usize>,
}

impl CommWeights {
    fn new(n: usize) -> Self {
        Self {
            weights: vec![0.0; n],
            seen: vec![false; n],
            touched: Vec::new(),
            neighbours: Vec::new(),
        }
    }

    fn collect(&mut self, partition: &VertexPartition<'_>, v: usize) {
        let membership = partition.membership();
        for &(u, w) in partition.graph().neighbours(v) {
            let c = membership[u];
            if !self.seen[c] {
                self.seen[c] = true;
                self.touched.push(c);
            }
            self.weights[c] += w;
            self.neighbours.push(u);
        }
    }

    fn get(&self, c: usize) -> f64 {
        self.weights[c]
    }

    fn clear(&mut self) {
        for &c in &self.touched {
            self.weights[c] = 0.0;
            self.seen[c] = false;
        }
        self.touched.clear();
        self.neighbours.clear();
    }
}
