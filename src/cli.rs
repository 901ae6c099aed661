use crate::optimiser::ConsiderComms;
use crate::quality::QualityFunction;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::path::{Path, PathBuf};

pub const MISSING_POSITIVE_LAYER: &str = "Graph layer with positive weights on branches is required!";

/// Finds communities in a signed graph given as positive and negative GraphML layers.
#[derive(Parser, Debug)]
#[command(name = "find-partition", version, about)]
pub struct Cli {
    /// Negative graph layer in GraphML format
    #[arg(short = 'n', long = "neg", value_name = "GRAPHML")]
    pub neg: Option<PathBuf>,

    /// Positive graph layer in GraphML format
    #[arg(short = 'p', long = "pos", value_name = "GRAPHML")]
    pub pos: Option<PathBuf>,

    /// Optimised functional
    #[arg(short = 'f', long = "funct", value_enum, default_value_t = QualityFunction::Modularity)]
    pub funct: QualityFunction,

    /// Number of extra optimisation passes after the first
    #[arg(short = 'r', long = "repeats", value_name = "N", default_value_t = 0)]
    pub repeats: usize,

    /// Communities tried for each vertex move
    #[arg(long, value_enum, default_value_t = ConsiderComms::All)]
    pub consider_comms: ConsiderComms,

    /// Seed for the vertex visiting order
    #[arg(long)]
    pub seed: Option<u64>,

    /// Also write the site/group table as CSV
    #[arg(short = 'o', long, value_name = "CSV")]
    pub output: Option<PathBuf>,

    /// Write the positive layer as Graphviz DOT coloured by group
    #[arg(long, value_name = "DOT")]
    pub dot: Option<PathBuf>,

    /// Set the logging level (diagnostics go to stderr)
    #[arg(long, default_value = "warn")]
    pub log_level: tracing::Level,
}

impl Cli {
    /// The positive layer path, or the usage error for its absence.
    pub fn positive_layer(&self) -> Result<&Path, clap::Error> {
        self.pos
            .as_deref()
            .ok_or_else(|| Cli::command().error(ErrorKind::MissingRequiredArgument, MISSING_POSITIVE_LAYER))
    }
}
