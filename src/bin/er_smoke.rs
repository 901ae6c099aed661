use clap::Parser;
use louvain_partition::{QualityFunction, find_partition, generate};
use rand::Rng;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

/// Partitions an Erdős–Rényi random graph by modularity.
#[derive(Parser, Debug)]
#[command(name = "er-smoke", about)]
struct Args {
    /// Number of vertices
    #[arg(short = 'n', long, default_value_t = 100)]
    vertices: usize,

    /// Edge probability
    #[arg(short = 'p', long, default_value_t = 5.0 / 100.0)]
    probability: f64,

    /// Seed for graph generation and optimisation
    #[arg(long)]
    seed: Option<u64>,

    /// Set the logging level
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let seed = args.seed.unwrap_or_else(|| rand::thread_rng().gen_range(0..u64::MAX));
    info!(seed, "generating graph");

    // 1. Generate data
    let graph = generate::erdos_renyi(args.vertices, args.probability, seed)?;

    // 2. Find communities
    let partition = find_partition(&graph, QualityFunction::Modularity, Some(seed))?;

    // 3. Print community info
    println!(
        "Detected {} communities on {} vertices and {} edges",
        partition.community_count(),
        graph.vertex_count(),
        graph.edge_count()
    );
    println!("Modularity: {}", partition.quality());
    for c in 0..partition.community_count() {
        println!("Community {} ({} members)", c + 1, partition.community_vertices(c));
    }

    Ok(())
}
