use anyhow::{Context, Result};
use butterfly_ch::{
    validate_hierarchy, ContractionConfig, DirectedGraph, EdgeListFile, Hierarchy, HierarchyBuilder,
    HierarchyFile, WitnessGraphFile,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "butterfly-ch")]
#[command(about = "Contraction Hierarchy preprocessing for weighted road graphs", long_about = None)]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Tuning flags, applied on top of `--config`
#[derive(Args)]
struct TuningArgs {
    /// JSON config file (missing fields keep their defaults)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Max hops of a witness search
    #[arg(long)]
    hop_limit: Option<u32>,
    /// Max settled vertices per witness search direction
    #[arg(long)]
    max_settles: Option<usize>,
    /// Witness slack
    #[arg(long)]
    epsilon: Option<f64>,
    /// Skip the two-hop witness precompute
    #[arg(long)]
    no_neighbour_witnesses: bool,
    /// Worker threads (0 = all cores)
    #[arg(long)]
    threads: Option<usize>,
}

impl TuningArgs {
    fn load(&self) -> Result<ContractionConfig> {
        let mut config = match &self.config {
            Some(path) => ContractionConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ContractionConfig::default(),
        };
        if let Some(hops) = self.hop_limit {
            config.hop_limit = hops;
        }
        if let Some(settles) = self.max_settles {
            config.max_settles = settles;
        }
        if let Some(epsilon) = self.epsilon {
            config.epsilon = epsilon;
        }
        if self.no_neighbour_witnesses {
            config.neighbour_witnesses = false;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Contract a weighted graph and write the hierarchy
    Contract {
        /// Input edge list (JSON)
        input: PathBuf,
        /// Output hierarchy (JSON)
        output: PathBuf,
        #[command(flatten)]
        tuning: TuningArgs,
        /// Also write the two-hop witness graph
        #[arg(long)]
        witness_graph: Option<PathBuf>,
    },
    /// Contract in memory and compare random queries against Dijkstra
    Validate {
        /// Input edge list (JSON)
        input: PathBuf,
        #[command(flatten)]
        tuning: TuningArgs,
        /// Number of random queries
        #[arg(long, default_value = "1000")]
        queries: usize,
        /// Seed for query selection
        #[arg(long, default_value = "42")]
        seed: u64,
    },
    /// Print statistics of a contracted graph
    Inspect {
        /// Hierarchy file (JSON)
        input: PathBuf,
    },
}

fn init_logging(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr);
    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))
}

fn load_graph(path: &Path) -> Result<DirectedGraph<f32>> {
    let list = EdgeListFile::read(path).with_context(|| format!("reading {}", path.display()))?;
    let graph = list.to_graph()?;
    tracing::info!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "loaded {}",
        path.display()
    );
    Ok(graph)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format)?;

    match cli.command {
        Commands::Contract {
            input,
            output,
            tuning,
            witness_graph,
        } => {
            let config = tuning.load()?;
            let mut graph = load_graph(&input)?;

            let start = Instant::now();
            let (stats, witnesses) = HierarchyBuilder::new(&mut graph, config)?.run_with_witnesses()?;

            let hierarchy = Hierarchy::from_graph(&graph)?;
            HierarchyFile::write(&output, &hierarchy)
                .with_context(|| format!("writing {}", output.display()))?;
            if let Some(path) = witness_graph {
                WitnessGraphFile::write(&path, &witnesses.records())
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("Witness graph: {} pairs -> {}", witnesses.len(), path.display());
            }

            println!("Contracted {} vertices in {:.2?}", stats.n_contracted, start.elapsed());
            println!("  original edges: {}", stats.n_original_edges);
            println!("  shortcuts:      {}", stats.n_shortcuts);
            println!("  total edges:    {}", stats.n_edges);
            println!(
                "  witness searches: {} ({} hit a bound)",
                stats.n_witness_searches, stats.n_exhausted_searches
            );
            println!("  lazy requeues:  {}", stats.n_lazy_requeues);
            println!("Output: {}", output.display());
        }
        Commands::Validate {
            input,
            tuning,
            queries,
            seed,
        } => {
            let config = tuning.load()?;
            let epsilon = config.epsilon;
            let original = load_graph(&input)?;
            let mut contracted = original.clone();
            let stats = HierarchyBuilder::new(&mut contracted, config)?.run()?;
            println!("Contracted: {} shortcuts", stats.n_shortcuts);

            let result = validate_hierarchy(&original, &contracted, queries, seed, epsilon);
            println!();
            println!("Results:");
            println!("  Total tests: {}", result.n_tests);
            println!("  Correct: {}", result.correct);
            println!("  Incorrect: {}", result.incorrect);
            println!("  Both unreachable: {}", result.unreachable_both);
            for e in &result.errors {
                println!(
                    "    {} -> {}: dijkstra={:?} ch={:?}",
                    e.source, e.target, e.dijkstra_dist, e.ch_dist
                );
            }
            if !result.is_ok() {
                anyhow::bail!("{} of {} queries disagree", result.incorrect, result.n_tests);
            }
        }
        Commands::Inspect { input } => {
            let hierarchy = HierarchyFile::read(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let graph: DirectedGraph<f32> = hierarchy.to_graph()?;

            let contracted = (0..graph.vertex_count()).filter(|&v| graph.is_contracted(v)).count();
            let max_level = (0..graph.vertex_count()).filter_map(|v| graph.level(v)).max();
            let max_degree = (0..graph.vertex_count()).map(|v| graph.degree(v)).max().unwrap_or(0);
            let one_way = hierarchy.edges.iter().filter(|e| e.dir != butterfly_ch::dir::DirName::Both).count();

            println!("Hierarchy: {}", input.display());
            println!("  vertices:   {}", graph.vertex_count());
            println!("  contracted: {}", contracted);
            println!("  max level:  {:?}", max_level);
            println!("  edges:      {}", graph.edge_count());
            println!("  shortcuts:  {}", graph.shortcut_count());
            println!("  one-way:    {}", one_way);
            println!("  max degree: {}", max_degree);
        }
    }

    Ok(())
}
