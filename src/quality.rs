//! Partition quality functions.
//!
//! All three functions are evaluated from per-community aggregates only
//! (internal weight, total strength and size), so they are unchanged when a
//! graph is collapsed by its own partition.
//!
//! ```text
//! modularity    Q = Σ_c [ w_c/m − K_c²/(4m²) ]
//! surprise      S = m · KLL( Σ w_c / m , Σ pairs(n_c) / pairs(n) )
//! significance  Σ_c pairs(n_c) · KL( w_c / pairs(n_c) , m / pairs(n) )
//! ```

use std::fmt;

/// The functional a partition optimises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum QualityFunction {
    Modularity,
    Surprise,
    /// Reported for every partition, not offered as an optimisation target.
    #[value(skip)]
    Significance,
}

impl QualityFunction {
    pub fn name(self) -> &'static str {
        match self {
            QualityFunction::Modularity => "modularity",
            QualityFunction::Surprise => "surprise",
            QualityFunction::Significance => "significance",
        }
    }
}

impl fmt::Display for QualityFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Binary Kullback-Leibler divergence of `q` from `p`.
///
/// Terms whose logarithm is undefined are dropped.
pub fn kl(q: f64, p: f64) -> f64 {
    let mut kl = 0.0;
    if q > 0.0 && p > 0.0 {
        kl += q * (q / p).ln();
    }
    if q < 1.0 && p < 1.0 {
        kl += (1.0 - q) * ((1.0 - q) / (1.0 - p)).ln();
    }
    kl
}

/// Signed variant of [`kl`]: negative when `q < p`.
pub fn kll(q: f64, p: f64) -> f64 {
    let kl = kl(q, p);
    if q < p { -kl } else { kl }
}
