//! `csv-assets` CLI entry-point.
//!
//! Available sub-commands:
//! - `validate`    — translate asset specs and print the node graph.
//! - `materialize` — run the umbrella job in-process.
//! - `generate`    — write a random CSV fixture.

mod fixtures;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::{rngs::StdRng, SeedableRng};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use engine::translate::DEFAULT_JOB_NAME;
use engine::{AssetSpec, ExecutorConfig, JobExecutor, NodeStatus, Repository};

#[derive(Debug, Parser)]
#[command(
    name = "csv-assets",
    about = "Register CSV files as assets and load them into a database",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Where asset specs come from.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct SpecSource {
    /// YAML list of asset specs.
    #[arg(long, env = "CSV_ASSETS_CONFIG")]
    config: Option<PathBuf>,
    /// Treat every `*.csv` file in this directory as an asset.
    #[arg(long)]
    csv_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct RepositoryArgs {
    #[command(flatten)]
    source: SpecSource,
    /// Store URL applied to every asset found with `--csv-dir`.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
    #[arg(long, default_value = DEFAULT_JOB_NAME)]
    job_name: String,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Translate specs, validate the graph and print it.
    Validate {
        #[command(flatten)]
        repo: RepositoryArgs,
    },
    /// Materialize every asset.
    Materialize {
        #[command(flatten)]
        repo: RepositoryArgs,
        /// Retries for transient store failures.
        #[arg(long, default_value_t = ExecutorConfig::default().max_retries)]
        max_retries: u32,
        /// Print the run report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Write a CSV file of random person records.
    Generate {
        path: PathBuf,
        #[arg(long, default_value_t = 100)]
        rows: usize,
        /// Seed for reproducible output.
        #[arg(long)]
        seed: Option<u64>,
    },
}

impl RepositoryArgs {
    fn load_specs(&self) -> Result<Vec<AssetSpec>> {
        match (&self.source.config, &self.source.csv_dir) {
            (Some(path), _) => {
                if self.database_url.is_some() {
                    warn!("--database-url is ignored with --config; set database_url per asset");
                }
                engine::load_specs(path)
                    .with_context(|| format!("loading asset specs from {}", path.display()))
            }
            (None, Some(dir)) => engine::specs_from_directory(dir, self.database_url.as_deref())
                .with_context(|| format!("scanning {} for CSV files", dir.display())),
            (None, None) => anyhow::bail!("either --config or --csv-dir is required"),
        }
    }

    fn build(&self) -> Result<Repository> {
        let specs = self.load_specs()?;
        engine::build_repository(&specs, &self.job_name).context("registering asset graph")
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Validate { repo } => {
            let repository = repo.build()?;
            println!(
                "Job '{}' is valid. {} node(s) in execution order:",
                repository.job().name,
                repository.nodes().len()
            );
            for name in repository.execution_order() {
                let Some(node) = repository.node(name) else {
                    continue;
                };
                let upstreams: Vec<&str> = node.upstreams.iter().map(String::as_str).collect();
                if upstreams.is_empty() {
                    println!("  {name} ({})", node.kind);
                } else {
                    println!("  {name} ({}) <- {}", node.kind, upstreams.join(", "));
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Materialize {
            repo,
            max_retries,
            json,
        } => {
            let repository = repo.build()?;
            let executor = JobExecutor::new(ExecutorConfig {
                max_retries,
                ..ExecutorConfig::default()
            });

            let report = executor.run(&repository).await;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("serialising run report")?
                );
            } else {
                for run in &report.nodes {
                    match &run.status {
                        NodeStatus::Succeeded => println!("ok      {}", run.name),
                        NodeStatus::Failed { error } => println!("FAILED  {}: {error}", run.name),
                        NodeStatus::Skipped { upstream } => {
                            println!("skipped {} (upstream '{upstream}' did not succeed)", run.name)
                        }
                    }
                }
            }

            Ok(if report.succeeded() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Command::Generate { path, rows, seed } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let records = fixtures::generate_rows(&mut rng, rows);
            fixtures::write_csv(&path, &records)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Data has been saved to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}
