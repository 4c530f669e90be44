#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use sextant::attribute::Attribute;
use sextant::beam::{BeamSearch, SearchResult};
use sextant::config::{DEFAULT_POSITIVE_LABEL, SearchConfig};
use sextant::heuristic::{Heuristic, QualityHeuristic};
use sextant::load::load_dataset;
use sextant::progress::{SearchProgressObserver, SearchStage};
use sextant::report::{DEFAULT_DECIMALS, render_banner, render_levels, write_tsv};

#[derive(Clone, Copy, ValueEnum)]
pub enum HeuristicCli {
    Wracc,
    Sensitivity,
    Specificity,
    ChiSquared,
}

impl From<HeuristicCli> for Heuristic {
    fn from(value: HeuristicCli) -> Self {
        match value {
            HeuristicCli::Wracc => Heuristic::Wracc,
            HeuristicCli::Sensitivity => Heuristic::Sensitivity,
            HeuristicCli::Specificity => Heuristic::Specificity,
            HeuristicCli::ChiSquared => Heuristic::ChiSquared,
        }
    }
}

#[derive(Args)]
pub struct SearchArgs {
    /// Path to the dataset (.arff, .arff.gz, .csv or .tsv)
    pub dataset: PathBuf,

    /// Name of the target column (defaults to the last column)
    #[arg(long)]
    pub target: Option<String>,

    /// Beam width: groups kept per level
    #[arg(long, value_name = "W")]
    pub width: Option<usize>,

    /// Number of conjunction levels
    #[arg(long, value_name = "D")]
    pub depth: Option<usize>,

    /// Quality heuristic; repeat to run several. Without it every built-in
    /// heuristic runs, unless a config file names one
    #[arg(long = "heuristic", value_enum)]
    pub heuristics: Vec<HeuristicCli>,

    /// Treat groups over the same attributes and comparators as duplicates
    /// even when their values differ
    #[arg(long)]
    pub ignore_values: bool,

    /// Attribute to leave out of the search; may be repeated
    #[arg(long, value_name = "NAME")]
    pub blacklist: Vec<String>,

    /// Target value counted as the positive class
    #[arg(long)]
    pub positive_label: Option<String>,

    /// Size of a dedicated worker pool
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Evaluate attributes on the calling thread only
    #[arg(long)]
    pub sequential: bool,

    /// Disable the per-level confusion cache
    #[arg(long)]
    pub no_cache: bool,

    /// Search config (.toml); flags given here override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also write every reported subgroup to this TSV file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Decimals printed for scores
    #[arg(long, default_value_t = DEFAULT_DECIMALS)]
    pub decimals: usize,
}

#[derive(Args)]
pub struct DescribeArgs {
    /// Path to the dataset (.arff, .arff.gz, .csv or .tsv)
    pub dataset: PathBuf,

    /// Name of the target column (defaults to the last column)
    #[arg(long)]
    pub target: Option<String>,

    /// Target value counted as the positive class
    #[arg(long, default_value = DEFAULT_POSITIVE_LABEL)]
    pub positive_label: String,
}

#[derive(Parser)]
#[command(
    name = "sextant",
    about = "Beam-search subgroup discovery over labelled tabular data",
    long_about = "Searches for conjunctions of attribute tests whose target distribution \
                 deviates from the whole dataset, ranked by a quality heuristic."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run a beam search and print the best subgroups per level")]
    Search(SearchArgs),
    #[command(about = "Summarise a dataset's attributes and class balance")]
    Describe(DescribeArgs),
    #[command(about = "Display version and build information")]
    Version,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Some(Commands::Search(args)) => run_search(args),
        Some(Commands::Describe(args)) => run_describe(args),
        Some(Commands::Version) => {
            print_version_info();
            Ok(())
        }
        None => Cli::command()
            .print_help()
            .map(|()| println!())
            .map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Config file values first, then command-line overrides.
fn resolve_config(args: &SearchArgs) -> Result<SearchConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => SearchConfig::load(path)?,
        None => SearchConfig::default(),
    };
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(depth) = args.depth {
        config.depth = depth;
    }
    if args.ignore_values {
        config.compare_values = false;
    }
    config.blacklist.extend(args.blacklist.iter().cloned());
    if let Some(label) = &args.positive_label {
        config.positive_label = label.clone();
    }
    if args.threads.is_some() {
        config.threads = args.threads;
    }
    if args.sequential {
        config.parallel = false;
    }
    if args.no_cache {
        config.memoize = false;
    }
    config.validate()?;
    Ok(config)
}

fn run_search(args: SearchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(&args)?;
    let heuristics: Vec<Heuristic> = if !args.heuristics.is_empty() {
        args.heuristics.iter().map(|&h| h.into()).collect()
    } else if args.config.is_some() {
        vec![config.heuristic]
    } else {
        Heuristic::ALL.to_vec()
    };

    let dataset = load_dataset(&args.dataset, args.target.as_deref())?;
    let (positives, negatives) = dataset.class_balance(&config.positive_label)?;
    println!(
        "Loaded '{}': {} instances ({positives} positive, {negatives} negative), target '{}'.",
        dataset.relation(),
        dataset.instances().len(),
        dataset.target_attribute().name
    );

    let mut results: Vec<SearchResult> = Vec::with_capacity(heuristics.len());
    for heuristic in heuristics {
        println!();
        print!("{}", render_banner(heuristic.name(), heuristic.formula()));

        let bar = Arc::new(LevelProgress::new(config.depth));
        let search = BeamSearch::new(&dataset, SearchConfig { heuristic, ..config.clone() })
            .with_progress(bar.clone());
        let outcome = search.run();
        bar.finish();
        let result = outcome?;

        print!("{}", render_levels(&result, args.decimals));
        results.push(result);
    }

    if let Some(path) = &args.output {
        write_tsv(&results, path)?;
        println!("\nWrote {} subgroups to {}.", count_subgroups(&results), path.display());
    }
    Ok(())
}

fn count_subgroups(results: &[SearchResult]) -> usize {
    results
        .iter()
        .flat_map(|r| r.levels.iter())
        .map(Vec::len)
        .sum()
}

fn run_describe(args: DescribeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let dataset = load_dataset(&args.dataset, args.target.as_deref())?;
    let (positives, negatives) = dataset.class_balance(&args.positive_label)?;

    println!("Relation:  {}", dataset.relation());
    println!("Instances: {}", dataset.instances().len());
    println!(
        "Target:    {} ({positives} positive, {negatives} other for label '{}')",
        dataset.target_attribute().name,
        args.positive_label
    );
    println!();
    println!("{:>4}  {:<28} {:<8} {:>8}", "id", "name", "kind", "distinct");

    let mut attributes: Vec<&Attribute> = dataset.attributes().iter().collect();
    attributes.sort_by(|a, b| natord::compare(&a.name, &b.name));
    for attribute in attributes {
        let distinct = dataset.distinct_values(attribute)?.len();
        let marker = if attribute.id == dataset.target() { " (target)" } else { "" };
        println!(
            "{:>4}  {:<28} {:<8} {:>8}{marker}",
            attribute.id,
            attribute.name,
            attribute.kind.describe(),
            distinct
        );
    }
    Ok(())
}

/// One progress bar per search; its length is reset to the attribute count
/// at the start of every level.
struct LevelProgress {
    bar: ProgressBar,
    depth: usize,
}

impl LevelProgress {
    fn new(depth: usize) -> Self {
        let draw_target = if std::io::stderr().is_terminal() {
            ProgressDrawTarget::stderr_with_hz(20)
        } else {
            ProgressDrawTarget::hidden()
        };
        let bar = ProgressBar::with_draw_target(Some(0), draw_target);
        let style = ProgressStyle::with_template(
            "> [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} attributes {msg}",
        )
        .map(|style| style.progress_chars("█▉▊▋▌▍▎▏  "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self { bar, depth }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl SearchProgressObserver for LevelProgress {
    fn on_level_start(&self, level: usize, attributes: usize) {
        self.bar.set_length(attributes as u64);
        self.bar.set_position(0);
        self.bar.set_message(format!("(level {}/{})", level + 1, self.depth));
    }

    fn on_stage(&self, level: usize, stage: SearchStage) {
        if stage == SearchStage::Merge {
            self.bar
                .set_message(format!("(level {}/{}, {stage})", level + 1, self.depth));
        }
    }

    fn on_attribute_done(&self, level: usize, attribute: usize) {
        let _ = (level, attribute);
        self.bar.inc(1);
    }
}

/// Formats an age in seconds like "2.4 hours ago".
fn format_duration_ago(seconds: u64) -> String {
    const UNITS: [(&str, u64); 6] = [
        ("years", 365 * 86_400),
        ("months", 30 * 86_400),
        ("weeks", 7 * 86_400),
        ("days", 86_400),
        ("hours", 3_600),
        ("minutes", 60),
    ];
    for (name, size) in UNITS {
        if seconds >= size {
            return format!("{:.1} {name} ago", seconds as f64 / size as f64);
        }
    }
    format!("{seconds} seconds ago")
}

fn print_version_info() {
    println!("sextant {}", env!("CARGO_PKG_VERSION"));
    match option_env!("SEXTANT_RELEASE_TAG") {
        Some(tag) => println!("Release: {tag}"),
        None => println!("Release: development build"),
    }

    let built: u64 = option_env!("SEXTANT_BUILD_TIMESTAMP")
        .and_then(|t| t.parse().ok())
        .unwrap_or(0);
    if built > 0 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        if now > built {
            println!("Built: {}", format_duration_ago(now - built));
        } else {
            println!("Built: just now");
        }
    }
}
