//! survey-synth CLI - Synthetic survey response generation.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use survey_synth::models::EXAMPLE_CONFIG;
use survey_synth::{Config, FrequencySummary, GenerationPipeline, PickPolicy, preview};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_CONFIG: &str = "config.toml";

#[derive(Parser)]
#[command(name = "survey-synth")]
#[command(version)]
#[command(about = "Synthetic survey response generation from weighted distributions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic response dataset
    Generate {
        /// Number of respondents (overrides generation.count)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Random seed (overrides generation.seed)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output file, .csv or .jsonl (overrides output.path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Picks per multi-choice question (overrides generation.pick_policy)
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,
    },

    /// Validate configuration file
    Validate,

    /// Show example configuration
    Example,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Uniform in [1, max_picks]
    Uniform,
    /// Always max_picks
    Fixed,
}

impl From<PolicyArg> for PickPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Uniform => PickPolicy::Uniform,
            PolicyArg::Fixed => PickPolicy::Fixed,
        }
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")
}

/// Load the config file; without one at the default path, use the built-in survey.
fn load_config(path: &Path) -> Result<Config> {
    if path == Path::new(DEFAULT_CONFIG) && !path.exists() {
        warn!("No {DEFAULT_CONFIG} found, using the built-in example survey");
        return Config::example().context("Built-in example configuration is invalid");
    }
    Config::from_file(path).with_context(|| format!("Failed to load config from {path:?}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Example => {
            println!("{EXAMPLE_CONFIG}");
        }

        Commands::Validate => {
            let config = load_config(&cli.config)?;
            config.validate().context("Invalid generation settings")?;
            let survey = config.survey().context("Invalid survey definition")?;

            info!("Configuration is valid");
            info!(
                "  Records: {} ({} workers, chunks of {})",
                config.generation.count, config.generation.workers, config.generation.chunk_size
            );
            info!("  Questions: {}", survey.len());
            for question in survey.questions() {
                info!(
                    "    {}: {} options, {} rules{}",
                    question.id(),
                    question.choices().len(),
                    question.rules().len(),
                    if question.mode().is_multi() { ", multi" } else { "" }
                );
            }
            let order: Vec<&str> = survey.draw_order().map(|q| q.id()).collect();
            info!("  Draw order: {}", order.join(" → "));
        }

        Commands::Generate {
            count,
            seed,
            output,
            policy,
        } => {
            let mut config = load_config(&cli.config)?;

            // Command line overrides
            if let Some(count) = count {
                config.generation.count = count;
            }
            if seed.is_some() {
                config.generation.seed = seed;
            }
            if let Some(policy) = policy {
                config.generation.pick_policy = policy.into();
            }
            if let Some(output) = output {
                config.output.path = output;
            }

            let output = config.output.clone();
            let pipeline = GenerationPipeline::new(config)?;
            let (dataset, stats) = pipeline.run(&output.path).await?;

            println!("\n=== Generation Complete ===");
            println!("Requested:   {}", stats.requested);
            println!("Generated:   {}", stats.generated);
            println!("Skipped:     {}", stats.skipped);
            println!("Seed:        {}", stats.seed);
            println!("Throughput:  {:.0}/s", stats.throughput_per_sec);
            println!("Runtime:     {:.3}s", stats.runtime_secs);
            println!("Output:      {:?}", output.path);

            if output.preview_rows > 0 && !dataset.is_empty() {
                println!("\n=== Preview ===");
                println!(
                    "{}",
                    preview(&dataset, pipeline.survey(), output.preview_rows, &output.multi_separator)
                );
            }

            if output.summary {
                let summary = FrequencySummary::from_dataset(&dataset, pipeline.survey());
                println!("\n=== Frequencies ===");
                print!("{summary}");
                println!(
                    "\nMax deviation (unconditioned single-choice): {:.2}pp",
                    summary.max_deviation(pipeline.survey()) * 100.0
                );
            }
        }
    }

    Ok(())
}
