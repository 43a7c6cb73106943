//! @ai:module:intent CLI for the cross-compiler benchmark harness
//! @ai:module:layer presentation

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use compiler_bench::{
    config::{FilterConfig, HarnessConfig},
    invoker::ProcessInvoker,
    ranking::TestRanking,
    toolchain::{ToolchainInfo, ToolchainRegistry},
    BenchmarkResults, Harness, PairOutcome, ProgramCorpus, ReportGenerator,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "compiler-bench")]
#[command(about = "Benchmark build times of equivalent programs across compiler toolchains")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run benchmarks
    Run {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Filter by toolchain ids (comma-separated)
        #[arg(long)]
        toolchains: Option<String>,

        /// Filter by test ids (comma-separated)
        #[arg(long)]
        tests: Option<String>,

        /// Trials per (toolchain, test) pair
        #[arg(short, long)]
        iterations: Option<u32>,

        /// Maximum pairs measured at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Output directory for results
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Discover toolchains and show their versions
    Toolchains {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List corpus test cases
    List {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = "bench.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("compiler_bench=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            toolchains,
            tests,
            iterations,
            concurrency,
            output,
        } => {
            run_benchmarks(RunArgs {
                config,
                toolchains,
                tests,
                iterations,
                concurrency,
                output,
            })
            .await
        }
        Commands::Toolchains { config } => show_toolchains(config).await,
        Commands::List { config } => list_tests(config),
        Commands::Init { output } => init_config(output),
    }
}

struct RunArgs {
    config: Option<PathBuf>,
    toolchains: Option<String>,
    tests: Option<String>,
    iterations: Option<u32>,
    concurrency: Option<usize>,
    output: Option<PathBuf>,
}

/// @ai:intent Run the benchmark suite and write results
/// @ai:effects io, fs:write
async fn run_benchmarks(args: RunArgs) -> Result<()> {
    let mut config = load_or_default_config(args.config)?;

    if let Some(iterations) = args.iterations {
        config.run.iterations = iterations;
    }
    if let Some(concurrency) = args.concurrency {
        config.run.concurrency = concurrency;
    }
    apply_filter(&mut config.run.filter, args.toolchains, args.tests);

    let invoker = build_invoker(&config);
    let results_dir = args.output.unwrap_or_else(|| config.paths.results_dir.clone());

    let harness = Harness::new(config, invoker)
        .await
        .context("Failed to set up benchmark suite")?;

    if !harness.toolchains().iter().any(|t| t.available) {
        tracing::error!("No toolchains available. Nothing to benchmark.");
        return Ok(());
    }

    let results = harness.run().await?;

    let timestamp = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S");
    let output_dir = results_dir.join(timestamp.to_string());
    let json_path = ReportGenerator::new().generate_all(&results, &output_dir)?;

    print_summary(&results);
    println!("Results written to {}", json_path.display());

    Ok(())
}

/// @ai:intent Probe every configured toolchain and print what was found
/// @ai:effects io
async fn show_toolchains(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_or_default_config(config_path)?;
    let registry = ToolchainRegistry::from_config(&config)?;
    let infos = registry
        .discover(&build_invoker(&config), config.run.probe_timeout())
        .await;

    let ordered: Vec<&ToolchainInfo> = registry
        .ids()
        .iter()
        .filter_map(|id| infos.get(id))
        .collect();

    println!("{:<10} {:<10} {:<10} {}", "ID", "Name", "Status", "Version");
    println!("{}", "-".repeat(60));

    for info in ordered {
        let status = if info.available { "ok" } else { "missing" };
        println!("{:<10} {:<10} {:<10} {}", info.id, info.name, status, info.version);
    }

    Ok(())
}

/// @ai:intent Print the corpus and which toolchains each test covers
/// @ai:effects fs:read
fn list_tests(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_or_default_config(config_path)?;
    let corpus = ProgramCorpus::load(config.paths.corpus_dir.as_deref())?;

    println!("Test cases ({}):", corpus.len());
    println!();
    println!("{:<20} {}", "ID", "Toolchains");
    println!("{}", "-".repeat(50));

    for test in corpus.tests() {
        let toolchains: Vec<&str> = test.toolchains().collect();
        println!("{:<20} {}", test.identifier, toolchains.join(", "));
    }

    Ok(())
}

/// @ai:intent Write a default configuration file
/// @ai:effects fs:write
fn init_config(output: PathBuf) -> Result<()> {
    let config = HarnessConfig::default();
    config.save(&output)?;
    println!("Configuration saved to {}", output.display());
    Ok(())
}

/// @ai:intent Load configuration or use defaults
/// @ai:effects fs:read
fn load_or_default_config(path: Option<PathBuf>) -> Result<HarnessConfig> {
    match path {
        Some(p) => HarnessConfig::load(&p).with_context(|| format!("Failed to load {}", p.display())),
        None => {
            let default_path = PathBuf::from("bench.toml");

            if default_path.exists() {
                HarnessConfig::load(&default_path)
            } else {
                Ok(HarnessConfig::default())
            }
        }
    }
}

/// @ai:intent Real process invoker honoring the configured scratch directory
/// @ai:effects pure
fn build_invoker(config: &HarnessConfig) -> ProcessInvoker {
    match &config.paths.scratch_dir {
        Some(dir) => ProcessInvoker::with_scratch_root(dir.clone()),
        None => ProcessInvoker::new(),
    }
}

/// @ai:intent Override config filters with CLI arguments
/// @ai:effects pure
fn apply_filter(filter: &mut FilterConfig, toolchains: Option<String>, tests: Option<String>) {
    let split = |s: String| {
        s.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
    };

    if let Some(toolchains) = toolchains {
        filter.toolchains = Some(split(toolchains));
    }
    if let Some(tests) = tests {
        filter.tests = Some(split(tests));
    }
}

/// @ai:intent Print ranking tables for every test
/// @ai:effects io
fn print_summary(results: &BenchmarkResults) {
    println!();
    println!("Compiler Benchmark Results ({} iterations)", results.iterations);
    println!("=========================================");

    for ranking in &results.rankings {
        print_ranking(ranking);
    }

    println!();
}

fn print_ranking(ranking: &TestRanking) {
    println!();
    println!("{}", ranking.test_identifier);
    println!(
        "{:<4} {:<10} {:>12} {:>12} {:>10}",
        "#", "Toolchain", "Median", "Std dev", "Relative"
    );
    println!("{}", "-".repeat(52));

    for entry in &ranking.entries {
        let position = entry
            .position
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());

        match entry.representative_duration {
            Some(median) => println!(
                "{:<4} {:<10} {:>12} {:>12} {:>10}",
                position,
                entry.toolchain,
                format_ms(median),
                format_ms(entry.dispersion),
                entry
                    .relative_to_fastest
                    .map(|r| format!("{r:.2}x"))
                    .unwrap_or_else(|| "-".to_string())
            ),
            None => {
                let label = match entry.outcome {
                    PairOutcome::Unavailable => "unavailable",
                    _ => "failed",
                };
                println!("{:<4} {:<10} {:>12}", position, entry.toolchain, label);
            }
        }
    }
}

fn format_ms(duration: Duration) -> String {
    format!("{:.2} ms", duration.as_secs_f64() * 1000.0)
}
