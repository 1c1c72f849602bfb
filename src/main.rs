//! CLI for building, evaluating and serving an LSH retrieval index

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mips_lsh::dataset::{embeddings, synthetic};
use mips_lsh::evaluation::sweep;
use mips_lsh::server::{self, AppState};
use mips_lsh::{
    Comparison, Corpus, Dataset, Evaluator, FlatIndex, MipsIndex, RetrievalConfig,
    RetrievalMetrics, SyntheticConfig,
};

#[derive(Parser)]
#[command(name = "mips-lsh")]
#[command(about = "Approximate top-K recommendation with LSH", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where item and user vectors come from.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// JSON embedding file. Synthetic data is generated when unset.
    #[arg(long)]
    embeddings: Option<PathBuf>,

    /// Synthetic users
    #[arg(long, default_value_t = 200)]
    users: usize,

    /// Synthetic items
    #[arg(long, default_value_t = 2000)]
    items: usize,

    /// Synthetic embedding dimension
    #[arg(long, default_value_t = 32)]
    dim: usize,

    /// Held-out relevant items per synthetic user
    #[arg(long, default_value_t = 10)]
    relevant: usize,

    /// Observation noise of the synthetic embeddings
    #[arg(long, default_value_t = 0.1)]
    noise: f32,

    /// Seed for synthetic data
    #[arg(long, default_value_t = 42)]
    data_seed: u64,
}

impl DataArgs {
    fn load(&self) -> Result<Dataset> {
        match &self.embeddings {
            Some(path) => embeddings::load(path)
                .with_context(|| format!("failed to load embeddings from {}", path.display())),
            None => Ok(synthetic::generate(&SyntheticConfig {
                num_users: self.users,
                num_items: self.items,
                dimension: self.dim,
                relevant_per_user: self.relevant,
                noise: self.noise,
                seed: self.data_seed,
            })?),
        }
    }
}

/// Settings shared by every command that builds an index.
#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// JSON retrieval config; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Result list length (K)
    #[arg(long)]
    top_k: Option<usize>,

    /// Seed for hash function sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Hash raw item vectors instead of Xbox-augmented ones
    #[arg(long)]
    no_xbox: bool,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<RetrievalConfig> {
        let mut config = match &self.config {
            Some(path) => RetrievalConfig::from_json_file(path)
                .with_context(|| format!("failed to read config {}", path.display()))?,
            None => RetrievalConfig::default(),
        };
        if let Some(top_k) = self.top_k {
            config.top_k = top_k;
        }
        if self.seed.is_some() {
            config.lsh.seed = self.seed;
        }
        if self.no_xbox {
            config.use_xbox_transform = false;
        }
        Ok(config)
    }
}

/// Index shape for commands that build a single index.
#[derive(Args, Debug, Clone)]
struct IndexArgs {
    /// Hash functions per table (k)
    #[arg(long)]
    bits: Option<usize>,

    /// Number of tables (L)
    #[arg(long)]
    tables: Option<usize>,

    #[command(flatten)]
    config: ConfigArgs,
}

impl IndexArgs {
    fn resolve(&self) -> Result<RetrievalConfig> {
        let mut config = self.config.resolve()?;
        if let Some(bits) = self.bits {
            config.lsh.num_bits = bits;
        }
        if let Some(tables) = self.tables {
            config.lsh.num_tables = tables;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compare LSH retrieval against exact linear search
    Evaluate {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        index: IndexArgs,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Evaluate every (bits, tables) combination
    Sweep {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        config: ConfigArgs,
        /// Values of k to try, comma-separated
        #[arg(long, value_delimiter = ',', default_values_t = [4, 8, 12, 16])]
        bits: Vec<usize>,
        /// Values of L to try, comma-separated
        #[arg(long, value_delimiter = ',', default_values_t = [1, 5, 10, 20])]
        tables: Vec<usize>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Retrieve the top items for one user
    Query {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        index: IndexArgs,
        /// Id of a known user
        #[arg(long, conflicts_with = "vector")]
        user: Option<u64>,
        /// Query vector as comma-separated values (e.g., "1.0,2.0,3.0")
        #[arg(long)]
        vector: Option<String>,
    },
    /// Write a synthetic dataset as a JSON embedding file
    Generate {
        #[command(flatten)]
        data: DataArgs,
        /// Output path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Start the HTTP API server
    Serve {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        index: IndexArgs,
        /// Address to bind to
        #[arg(long, default_value = "0.0.0.0:3000")]
        addr: String,
    },
}

fn print_metrics(label: &str, metrics: &RetrievalMetrics) {
    println!(
        "{:<10} precision@{} {:.4}  recall@{} {:.4}  touched {:.4}",
        label, metrics.k, metrics.precision, metrics.k, metrics.recall, metrics.touched_fraction
    );
}

fn print_ratio(label: &str, ratio: Option<f64>) {
    match ratio {
        Some(ratio) => println!("{:<10} {:.4}", label, ratio),
        None => println!("{:<10} n/a (baseline is 0)", label),
    }
}

fn print_comparison(comparison: &Comparison) {
    print_metrics("lsh", &comparison.lsh);
    print_metrics("linear", &comparison.baseline);
    print_ratio("rel. prec", comparison.relative_precision);
    print_ratio("rel. rec", comparison.relative_recall);
    println!(
        "{} queries evaluated, {} skipped (no held-out items)",
        comparison.lsh.evaluated_queries, comparison.lsh.skipped_queries
    );
}

fn evaluate(data: &DataArgs, index: &IndexArgs, json: bool) -> Result<()> {
    let config = index.resolve()?;
    let dataset = data.load()?;
    let items = Arc::new(dataset.items);

    let lsh = MipsIndex::build(Arc::clone(&items), &config)?;
    let baseline = FlatIndex::inner_product(items);
    let evaluator = Evaluator::new(&dataset.users, &dataset.ground_truth, config.top_k)?;
    let comparison = evaluator.compare(&lsh, &baseline)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
    } else {
        println!(
            "k={} L={} seed={} xbox={}",
            config.lsh.num_bits,
            config.lsh.num_tables,
            lsh.config().lsh.seed.unwrap_or_default(),
            config.use_xbox_transform
        );
        print_comparison(&comparison);
    }
    Ok(())
}

fn run_sweep(
    data: &DataArgs,
    config: &ConfigArgs,
    bits: &[usize],
    tables: &[usize],
    json: bool,
) -> Result<()> {
    let base = config.resolve()?;
    let dataset = data.load()?;
    let items = Arc::new(dataset.items);
    let evaluator = Evaluator::new(&dataset.users, &dataset.ground_truth, base.top_k)?;

    let grid: Vec<(usize, usize)> = bits
        .iter()
        .flat_map(|&k| tables.iter().map(move |&l| (k, l)))
        .collect();
    let points = sweep(&items, &evaluator, &grid, &base)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }

    println!(
        "{:>4} {:>4} {:>10} {:>10} {:>10} {:>10}",
        "k", "L", "precision", "recall", "touched", "rel.rec"
    );
    for point in &points {
        let lsh = &point.comparison.lsh;
        println!(
            "{:>4} {:>4} {:>10.4} {:>10.4} {:>10.4} {:>10}",
            point.num_bits,
            point.num_tables,
            lsh.precision,
            lsh.recall,
            lsh.touched_fraction,
            point
                .comparison
                .relative_recall
                .map_or_else(|| "n/a".to_string(), |r| format!("{:.4}", r))
        );
    }
    if let Some(point) = points.first() {
        print_metrics("linear", &point.comparison.baseline);
    }
    Ok(())
}

fn query(
    data: &DataArgs,
    index: &IndexArgs,
    user: Option<u64>,
    vector: Option<&str>,
) -> Result<()> {
    let config = index.resolve()?;
    let dataset = data.load()?;

    let query = match (user, vector) {
        (Some(user), None) => match dataset.users.get(user) {
            Some(vector) => vector.clone(),
            None => bail!("unknown user {}", user),
        },
        (None, Some(text)) => embeddings::parse_vector(text)?,
        _ => bail!("pass exactly one of --user or --vector"),
    };

    let index = MipsIndex::build(Arc::new(dataset.items), &config)?;
    let result = index.query_default(&query)?;

    if result.is_empty() {
        println!("No candidates found (no table bucket matched the query)");
    } else {
        println!("Top {} results:", result.len());
        for (i, item) in result.items.iter().enumerate() {
            println!("{}. item {} (score: {:.4})", i + 1, item.id, item.score);
        }
    }
    println!(
        "Touched {} of {} items ({:.2}%)",
        result.touched,
        result.corpus_len,
        result.touched_fraction() * 100.0
    );
    Ok(())
}

fn generate(data: &DataArgs, output: &Path) -> Result<()> {
    if data.embeddings.is_some() {
        bail!("generate writes synthetic data; drop --embeddings");
    }
    let dataset = data.load()?;
    embeddings::save(&dataset, output)?;
    println!(
        "Wrote {} items and {} users to {}",
        dataset.items.len(),
        dataset.users.len(),
        output.display()
    );
    Ok(())
}

async fn serve(data: &DataArgs, index: &IndexArgs, addr: &str) -> Result<()> {
    let config = index.resolve()?;
    let dataset = data.load()?;
    let users: Option<Arc<Corpus>> =
        (!dataset.users.is_empty()).then(|| Arc::new(dataset.users));

    let index = MipsIndex::build(Arc::new(dataset.items), &config)?;
    info!(seed = ?index.config().lsh.seed, "index ready");
    server::start(addr, AppState::new(Arc::new(index), users)).await
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate { data, index, json } => evaluate(&data, &index, json),
        Commands::Sweep {
            data,
            config,
            bits,
            tables,
            json,
        } => run_sweep(&data, &config, &bits, &tables, json),
        Commands::Query {
            data,
            index,
            user,
            vector,
        } => query(&data, &index, user, vector.as_deref()),
        Commands::Generate { data, output } => generate(&data, &output),
        Commands::Serve { data, index, addr } => serve(&data, &index, &addr).await,
    }
}
