use crate::error::{Error, Result};
use crate::graph::Graph;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// G(n, p) random graph with unit edge weights and vertex ids `"0".."n-1"`.
///
/// Rows are drawn in parallel, each from its own generator derived from
/// `seed`, so the result depends only on `seed` and not on thread count.
pub fn erdos_renyi(n: usize, p: f64, seed: u64) -> Result<Graph> {
    if !(0.0..=1.0).contains(&p) {
        return Err(Error::InvalidParameter {
            name: "p",
            message: format!("edge probability {p} is outside [0, 1]"),
        });
    }

    let edges: Vec<(usize, usize, f64)> = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| {
            let mut rng = StdRng::seed_from_u64(seed ^ (i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
            ((i + 1)..n).filter_map(move |j| rng.gen_bool(p).then_some((i, j, 1.0)))
        })
        .collect();

    let ids = (0..n).map(|i| i.to_string()).collect();
    Ok(Graph::from_edges(ids, &edges))
}
