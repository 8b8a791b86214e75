//! sentinel-sim - scenario generator and offline decision runner
//!
//! Usage:
//!   sentinel-sim list
//!   sentinel-sim generate --scenario high --rows 200 --format csv --output high.csv
//!   sentinel-sim analyze --input high.csv --mission "Keep payouts flowing" --pretty

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sentinel_core::{DecisionOrchestrator, PipelineConfig};
use sentinel_sim::{DEFAULT_ROWS, DEFAULT_SEED, OutputFormat, format, scenarios};

#[derive(Parser)]
#[command(name = "sentinel-sim")]
#[command(about = "Synthetic telemetry scenarios for the SentinelAI decision pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available scenarios
    List,

    /// Generate a synthetic telemetry table
    Generate {
        /// Scenario name (normal, medium, high)
        #[arg(short, long, default_value = "normal")]
        scenario: String,

        /// Number of rows
        #[arg(short, long, default_value_t = DEFAULT_ROWS)]
        rows: usize,

        /// RNG seed
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,

        /// Output file; stdout when absent
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the decision pipeline on a CSV or JSON table file
    Analyze {
        /// Table file
        #[arg(short, long)]
        input: PathBuf,

        /// Mission statement
        #[arg(short, long)]
        mission: Option<String>,

        /// Pipeline config JSON
        #[arg(long, env = "SENTINEL_CONFIG")]
        config: Option<PathBuf>,

        /// Pretty-print the decision
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => run_list(),
        Commands::Generate {
            scenario,
            rows,
            seed,
            format,
            output,
        } => run_generate(&scenario, rows, seed, format, output),
        Commands::Analyze {
            input,
            mission,
            config,
            pretty,
        } => run_analyze(input, mission, config, pretty),
    }
}

fn run_list() -> anyhow::Result<()> {
    println!("Available scenarios:");
    for (name, description) in scenarios::list_scenarios() {
        println!("  {:8} - {}", name, description);
    }
    println!("\nUsage: sentinel-sim generate --scenario <SCENARIO> [--rows N] [--seed S]");
    Ok(())
}

fn run_generate(
    scenario: &str,
    rows: usize,
    seed: u64,
    output_format: OutputFormat,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let table = scenarios::generate(scenario, rows, seed)?;
    let rendered = format::render(&table, output_format)?;

    match output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(scenario, rows, seed, path = %path.display(), "Scenario written.");
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn run_analyze(
    input: PathBuf,
    mission: Option<String>,
    config: Option<PathBuf>,
    pretty: bool,
) -> anyhow::Result<()> {
    let config = match config {
        Some(path) => PipelineConfig::from_json_file(&path)
            .with_context(|| format!("loading pipeline config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let table = format::load_table(&input)?;
    info!(
        input = %input.display(),
        rows = table.row_count(),
        columns = table.column_count(),
        "Table loaded."
    );

    let decision = DecisionOrchestrator::new(config).decide(&table, mission.as_deref());
    let json = if pretty {
        serde_json::to_string_pretty(&decision)?
    } else {
        serde_json::to_string(&decision)?
    };
    println!("{}", json);
    Ok(())
}
