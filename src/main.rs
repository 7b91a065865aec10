//! # arith-fixture
//!
//! Command-line entry point. Runs the scenario against a stack kept under a state
//! directory, or drives many stacks at once as a load test.
//!
//! ```text
//! arith-fixture up --stack dev -c x=3 -c z=7
//! arith-fixture up --stack dev --config-file dev.yaml
//! arith-fixture refresh --stack dev
//! arith-fixture destroy --stack dev
//! arith-fixture load-test --stacks 20 --min 1 --max 5
//! ```

use arith_fixture::config::StackConfig;
use arith_fixture::error::FixtureError;
use arith_fixture::loadtest::{self, LoadTestOptions};
use arith_fixture::ops::OperatorProviders;
use arith_fixture::scenario::{self, ScenarioParams};
use clap::{Parser, Subcommand};
use resource_framework::tracing::setup_tracing;
use resource_framework::{Stack, UpdateSummary};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Instrument};

#[derive(Debug, Parser)]
#[command(name = "arith-fixture", version, about = "Arithmetic resource fixture")]
struct Cli {
    /// Directory holding one checkpoint file per stack
    #[arg(long, env = "ARITH_FIXTURE_STATE_DIR", default_value = ".fixture-state")]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the scenario and reconcile the stack
    Up {
        #[arg(long, short)]
        stack: String,

        /// YAML file with a `config:` mapping
        #[arg(long)]
        config_file: Option<PathBuf>,

        /// Config override, `key=value`; may be repeated
        #[arg(long = "config", short = 'c', value_name = "KEY=VALUE")]
        overrides: Vec<String>,
    },
    /// Re-read every resource in the stack
    Refresh {
        #[arg(long, short)]
        stack: String,
    },
    /// Delete every resource in the stack
    Destroy {
        #[arg(long, short)]
        stack: String,
    },
    /// Update or destroy many random stacks concurrently
    LoadTest {
        #[arg(long, default_value_t = loadtest::DEFAULT_STACKS)]
        stacks: usize,

        #[arg(long, default_value_t = loadtest::DEFAULT_MIN)]
        min: u32,

        #[arg(long, default_value_t = loadtest::DEFAULT_MAX)]
        max: u32,

        /// Destroy the stacks instead of updating them
        #[arg(long)]
        destroy: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), FixtureError> {
    setup_tracing();

    let cli = Cli::parse();
    let providers = Arc::new(OperatorProviders::new());

    match cli.command {
        Command::Up {
            stack,
            config_file,
            overrides,
        } => {
            let mut config = match &config_file {
                Some(path) => StackConfig::load(path)?,
                None => StackConfig::new(),
            };
            for assignment in &overrides {
                config.apply_override(assignment)?;
            }
            let params = ScenarioParams::from_config(&config)?;
            info!(?params, "Scenario parameters");

            let span = tracing::info_span!("up", stack = %stack);
            async {
                let mut target = Stack::open(&stack, &cli.state_dir, providers.registry())?;
                let result = target
                    .up(|client| scenario::program(client, providers.clone(), params))
                    .await?;
                info!(declared = result.output.declared.len(), "Program finished");
                finish(&stack, result.summary)
            }
            .instrument(span)
            .await
        }
        Command::Refresh { stack } => {
            let mut target = Stack::open(&stack, &cli.state_dir, providers.registry())?;
            let summary = target.refresh().await?;
            finish(&stack, summary)
        }
        Command::Destroy { stack } => {
            let mut target = Stack::open(&stack, &cli.state_dir, providers.registry())?;
            let summary = target.destroy().await?;
            finish(&stack, summary)
        }
        Command::LoadTest {
            stacks,
            min,
            max,
            destroy,
        } => {
            let options = LoadTestOptions {
                stacks,
                state_dir: cli.state_dir,
                min,
                max,
                destroy,
            };
            let report = loadtest::run(&options, providers).await;
            if report.failed > 0 {
                return Err(FixtureError::LoadTestFailed {
                    failed: report.failed,
                    total: stacks,
                });
            }
            Ok(())
        }
    }
}

fn finish(stack: &str, summary: UpdateSummary) -> Result<(), FixtureError> {
    for failure in &summary.failures {
        tracing::error!(urn = %failure.urn, error = %failure.error, "Step failed");
    }
    if !summary.succeeded() {
        return Err(FixtureError::UpdateFailed {
            stack: stack.to_string(),
            summary: summary.to_string(),
        });
    }
    info!(stack, %summary, "Update complete");
    Ok(())
}
