use anyhow::Context;
use clap::Parser;
use louvain_partition::cli::Cli;
use louvain_partition::{Optimiser, SignedPartition, graphml, report};
use tracing::debug;
use tracing_subscriber::FmtSubscriber;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let pos_path = cli.positive_layer().unwrap_or_else(|e| e.exit());

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    println!("Optimizing functional=  {}", cli.funct);

    // 1. Load the layers
    let positive = graphml::read_graphml(pos_path)
        .with_context(|| format!("loading positive layer '{}'", pos_path.display()))?;
    let negative = match &cli.neg {
        Some(path) => {
            let graph = graphml::read_graphml(path)
                .with_context(|| format!("loading negative layer '{}'", path.display()))?;
            Some(graph.negative_layer())
        }
        None => None,
    };

    // 2. First optimisation pass
    let mut optimiser = Optimiser::new(cli.seed).with_consider_comms(cli.consider_comms);
    let mut partition = SignedPartition::new(&positive, negative.as_ref(), cli.funct)?;
    if partition.has_negative_layer() {
        println!("Graph with negative layer:");
    } else {
        println!("Graph without negative layer:");
    }
    partition.optimise(&mut optimiser)?;
    println!(
        "Q_0= {:?} Significance_0= {:?}",
        partition.quality(),
        partition.significance()
    );

    // 3. Refinement passes
    for pass in 1..=cli.repeats {
        let improvement = partition.optimise(&mut optimiser)?;
        debug!(pass, improvement, "repeat finished");
    }
    println!(
        "Q= {:?} Significance= {:?}",
        partition.quality(),
        partition.significance()
    );

    // 4. Report
    let rows = partition.rows();
    print!("{}", report::format_table(&rows));
    if let Some(path) = &cli.output {
        report::write_csv(path, &rows).with_context(|| format!("writing '{}'", path.display()))?;
    }
    if let Some(path) = &cli.dot {
        report::save_dot(&positive, partition.membership(), path)
            .with_context(|| format!("writing '{}'", path.display()))?;
    }

    Ok(())
}
