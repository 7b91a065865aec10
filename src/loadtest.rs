//! # Load Test
//!
//! Drives many stacks at once. Every stack gets fresh random `x`, `y` and `z` counts,
//! is refreshed, and is then either updated with the scenario or destroyed. A failing
//! stack is logged and counted; it never stops the others.

use crate::config::StackConfig;
use crate::error::FixtureError;
use crate::ops::OperatorProviders;
use crate::scenario::{self, ScenarioParams};
use rand::Rng;
use resource_framework::{Stack, UpdateSummary};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

pub const DEFAULT_STACKS: usize = 100;
pub const DEFAULT_MIN: u32 = 10;
pub const DEFAULT_MAX: u32 = 100;

#[derive(Debug, Clone)]
pub struct LoadTestOptions {
    pub stacks: usize,
    pub state_dir: PathBuf,
    /// Inclusive bounds for the random counts.
    pub min: u32,
    pub max: u32,
    pub destroy: bool,
}

impl LoadTestOptions {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            stacks: DEFAULT_STACKS,
            state_dir: state_dir.into(),
            min: DEFAULT_MIN,
            max: DEFAULT_MAX,
            destroy: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadTestReport {
    pub succeeded: usize,
    pub failed: usize,
}

pub fn stack_name(index: usize) -> String {
    format!("lt-{index}")
}

/// `x`, `y` and `z` drawn uniformly from `[min, max]`.
pub fn random_config(rng: &mut impl Rng, min: u32, max: u32) -> StackConfig {
    let (low, high) = (min.min(max), min.max(max));
    let mut config = StackConfig::new();
    for key in ["x", "y", "z"] {
        config.set(key, rng.gen_range(low..=high).to_string());
    }
    config
}

pub async fn run(options: &LoadTestOptions, providers: Arc<OperatorProviders>) -> LoadTestReport {
    let jobs: Vec<(String, StackConfig)> = {
        let mut rng = rand::thread_rng();
        (0..options.stacks)
            .map(|i| (stack_name(i), random_config(&mut rng, options.min, options.max)))
            .collect()
    };
    info!(stacks = jobs.len(), destroy = options.destroy, "Starting load test");

    let mut handles = Vec::with_capacity(jobs.len());
    for (name, config) in jobs {
        let state_dir = options.state_dir.clone();
        let providers = providers.clone();
        let destroy = options.destroy;
        let span = tracing::info_span!("stack", stack = %name);
        handles.push(tokio::spawn(
            async move {
                let result = run_stack(&name, &state_dir, providers, &config, destroy).await;
                (name, result)
            }
            .instrument(span),
        ));
    }

    let mut report = LoadTestReport::default();
    for handle in handles {
        match handle.await {
            Ok((name, Ok(summary))) => {
                info!(stack = %name, %summary, "Stack succeeded");
                report.succeeded += 1;
            }
            Ok((name, Err(e))) => {
                error!(stack = %name, error = %e, "Stack failed");
                report.failed += 1;
            }
            Err(e) => {
                error!(error = %e, "Stack task aborted");
                report.failed += 1;
            }
        }
    }

    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        "LOAD TEST COMPLETE"
    );
    report
}

async fn run_stack(
    name: &str,
    state_dir: &Path,
    providers: Arc<OperatorProviders>,
    config: &StackConfig,
    destroy: bool,
) -> Result<UpdateSummary, FixtureError> {
    let mut stack = Stack::open(name, state_dir, providers.registry())?;

    let refreshed = stack.refresh().await?;
    if !refreshed.succeeded() {
        warn!(summary = %refreshed, "Refresh reported failures");
    } else {
        info!(summary = %refreshed, "Refresh succeeded");
    }

    let summary = if destroy {
        stack.destroy().await?
    } else {
        let params = ScenarioParams::from_config(config)?;
        stack
            .up(|client| scenario::program(client, providers, params))
            .await?
            .summary
    };

    if !summary.succeeded() {
        return Err(FixtureError::UpdateFailed {
            stack: name.to_string(),
            summary: summary.to_string(),
        });
    }
    Ok(summary)
}
