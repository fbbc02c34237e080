//! smallworld CLI: ingest a people dataset and measure path lengths
//!
//! Talks to a running graph store through `RemoteGateway`, or to an in-process
//! store with `--embedded`.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use smallworld::algo::{all_pairs, sample_pairs, AggregateStats, PairStatus, PathFinder, PathOutcome};
use smallworld::{
    load_entities, load_identifiers, load_relationships, AuditLog, BatchSummary, BulkWriter,
    Config, PathReport,
};
use smallworld_sdk::{EmbeddedGateway, GraphGateway, RemoteGateway};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(name = "smallworld", version, about = "Graph ingestion and six-degrees path statistics")]
struct Cli {
    /// YAML config file
    #[arg(long, global = true, env = "SMALLWORLD_CONFIG")]
    config: Option<PathBuf>,

    /// Graph store HTTP URL
    #[arg(long, global = true, env = "SMALLWORLD_URI")]
    uri: Option<String>,

    /// Database name
    #[arg(long, global = true)]
    database: Option<String>,

    #[arg(long, global = true, env = "SMALLWORLD_USER")]
    user: Option<String>,

    #[arg(long, global = true, env = "SMALLWORLD_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Use an in-process store instead of a remote one
    #[arg(long, global = true)]
    embedded: bool,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Load entities and relationships into the store
    Ingest {
        /// Attribute directory (one file per entity)
        #[arg(long)]
        attributes: Option<PathBuf>,

        /// Link file (tab-separated pairs)
        #[arg(long)]
        links: Option<PathBuf>,

        /// Concurrent write transactions
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Shortest path between two entities
    Path {
        source: String,
        target: String,
    },
    /// Average path length over entity pairs, with the six-degrees verdict
    Analyze {
        #[arg(long)]
        attributes: Option<PathBuf>,

        /// Measure this many random pairs instead of all of them
        #[arg(long)]
        sample: Option<usize>,

        /// Seed for --sample
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Ingest the dataset first (useful with --embedded)
        #[arg(long)]
        ingest: bool,

        #[arg(long)]
        links: Option<PathBuf>,
    },
    /// Check that the store is reachable
    Ping,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(uri) = &cli.uri {
        config.store.uri = uri.clone();
    }
    if let Some(database) = &cli.database {
        config.store.database = database.clone();
    }
    if let Some(user) = &cli.user {
        config.store.user = user.clone();
    }
    if let Some(password) = &cli.password {
        config.store.password = password.clone();
    }

    match &cli.command {
        Commands::Ingest { attributes, links, concurrency } => {
            if let Some(dir) = attributes {
                config.data.attributes_dir = dir.clone();
            }
            if let Some(file) = links {
                config.data.links_file = file.clone();
            }
            if let Some(n) = concurrency {
                config.ingest.concurrency = *n;
            }
        }
        Commands::Analyze { attributes, links, .. } => {
            if let Some(dir) = attributes {
                config.data.attributes_dir = dir.clone();
            }
            if let Some(file) = links {
                config.data.links_file = file.clone();
            }
        }
        Commands::Path { .. } | Commands::Ping => {}
    }

    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;

    let gateway: Arc<dyn GraphGateway> = if cli.embedded {
        Arc::new(EmbeddedGateway::new())
    } else {
        Arc::new(RemoteGateway::new(config.store.remote_config())?)
    };
    if let Err(e) = gateway.verify_connectivity().await {
        if e.is_transport() {
            bail!("cannot reach graph store at {}: {}", config.store.uri, e);
        }
        bail!("graph store at {} failed the connectivity check: {}", config.store.uri, e);
    }

    match cli.command {
        Commands::Ingest { .. } => run_ingest(gateway, &config, &cli.format).await,
        Commands::Path { ref source, ref target } => {
            run_path(gateway, &config, source, target, &cli.format).await
        }
        Commands::Analyze { sample, seed, ingest, .. } => {
            if ingest {
                run_ingest(gateway.clone(), &config, &cli.format).await?;
            }
            run_analyze(gateway, &config, sample, seed, &cli.format).await
        }
        Commands::Ping => {
            println!("PONG");
            Ok(())
        }
    }
}

async fn run_ingest(gateway: Arc<dyn GraphGateway>, config: &Config, format: &OutputFormat) -> Result<()> {
    let entities = load_entities(&config.data.attributes_dir)?;
    let links = load_relationships(&config.data.links_file)?;

    let writer = BulkWriter::open(
        gateway,
        config.writer_config(),
        &config.ingest.entity_log,
        &config.ingest.link_log,
    )?;
    let nodes = writer.write_batch(&config.ingest.label, entities).await;
    let edges = writer.write_links(links).await;

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({ "entities": nodes, "links": edges });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["batch", "attempted", "succeeded", "unchanged", "failed", "elapsed"]);
            table.add_row(summary_row("entities", &nodes));
            table.add_row(summary_row("links", &edges));
            println!("{}", table);

            for failure in nodes.failed.iter().chain(&edges.failed).take(20) {
                println!("failed {}: {}", failure.key, failure.message);
            }
            println!(
                "Audit logs: {}, {}",
                config.ingest.entity_log.display(),
                config.ingest.link_log.display()
            );
        }
    }
    Ok(())
}

fn summary_row(name: &str, summary: &BatchSummary) -> Vec<String> {
    vec![
        name.to_string(),
        summary.attempted.to_string(),
        summary.succeeded.to_string(),
        summary.unchanged.to_string(),
        summary.failed_count().to_string(),
        format!("{:.2?}", summary.elapsed),
    ]
}

async fn run_path(
    gateway: Arc<dyn GraphGateway>,
    config: &Config,
    source: &str,
    target: &str,
    format: &OutputFormat,
) -> Result<()> {
    let finder = PathFinder::new(gateway, config.path_config());
    let outcome = finder
        .shortest_path(source, target)
        .await
        .with_context(|| format!("distance from {} to {} unknown", source, target))?;
    let cap = finder.depth_cap();

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "source": source,
                "target": target,
                "outcome": outcome,
                "hops": outcome.hops(cap),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Table => match outcome {
            PathOutcome::Found(hops) => println!("{} --> {} {}", source, target, hops),
            PathOutcome::BoundExceeded => {
                println!("{} --> {} no path within {} hops", source, target, cap)
            }
        },
    }
    Ok(())
}

async fn run_analyze(
    gateway: Arc<dyn GraphGateway>,
    config: &Config,
    sample: Option<usize>,
    seed: u64,
    format: &OutputFormat,
) -> Result<()> {
    let ids = load_identifiers(&config.data.attributes_dir)?;
    let pairs = match sample {
        Some(n) => sample_pairs(&ids, n, seed),
        None => all_pairs(&ids),
    };

    let audit = Arc::new(AuditLog::open(&config.ingest.entity_log, "PERSON_LOG")?);
    let finder = PathFinder::new(gateway, config.path_config()).with_audit(audit);
    let stats = AggregateStats::new(&finder, config.stats_config())
        .collect(&pairs)
        .await;
    let report = PathReport::from_statistics(&stats, config.paths.threshold);

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({ "report": report, "pairs": stats.pairs });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["source", "target", "hops"]);
            for pair in &stats.pairs {
                let hops = match &pair.status {
                    PairStatus::Measured { hops } => hops.to_string(),
                    PairStatus::Capped { reached: true } => format!("{} (cap)", stats.depth_cap),
                    PairStatus::Capped { reached: false } => format!("> {}", stats.depth_cap),
                    PairStatus::Failed { error } => format!("error: {}", error),
                    PairStatus::Skipped => "skipped".to_string(),
                };
                table.add_row(vec![pair.source.clone(), pair.target.clone(), hops]);
            }
            println!("{}", table);

            if !report.distribution.is_empty() {
                let mut dist = Table::new();
                dist.set_header(vec!["hops", "pairs"]);
                for (hops, count) in &report.distribution {
                    dist.add_row(vec![hops.to_string(), count.to_string()]);
                }
                println!("{}", dist);
            }
            if !report.excluded_sources.is_empty() {
                println!("Excluded sources: {}", report.excluded_sources.join(", "));
            }
            println!("{}", report);
            println!("{} adjacency queries issued", finder.queries_issued());
        }
    }
    Ok(())
}
