use crate::config::ConfigError;
use crate::topology::TopologyError;
use resource_framework::FrameworkError;
use thiserror::Error;

/// Errors raised while driving the fixture.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error(transparent)]
    Framework(#[from] FrameworkError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("Update of stack {stack} failed: {summary}")]
    UpdateFailed { stack: String, summary: String },

    #[error("Load test failed for {failed} of {total} stacks")]
    LoadTestFailed { failed: usize, total: usize },
}
