//! Louvain community detection on signed graphs read from GraphML.
//!
//! A graph is split into a positive layer and an optional negative layer over
//! the same sites. The layers are optimised jointly with weights `+1` and `-1`
//! under modularity or surprise, and every result is also scored by
//! significance.

pub mod cli;
pub mod driver;
pub mod error;
pub mod generate;
pub mod graph;
pub mod graphml;
pub mod optimiser;
pub mod partition;
pub mod quality;
pub mod report;

pub use driver::SignedPartition;
pub use error::{Error, Result};
pub use graph::{Graph, Site};
pub use optimiser::{ConsiderComms, Optimiser, find_partition};
pub use partition::VertexPartition;
pub use quality::QualityFunction;
