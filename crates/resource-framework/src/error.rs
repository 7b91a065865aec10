//! # Framework Errors
//!
//! This module defines the error types shared by providers, the engine and stacks.
//! Keeping them in one place gives every layer the same vocabulary for reporting a
//! failed step.

use crate::provider::CheckFailure;
use crate::urn::Urn;

/// Errors raised by a [`ResourceProvider`](crate::ResourceProvider) implementation.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ProviderError {
    #[error("Provider operation failed: {0}")]
    Failed(String),
    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),
}

fn join_failures(failures: &[CheckFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur within the host engine itself.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("Engine closed")]
    EngineClosed,
    #[error("Engine dropped the resolution channel")]
    EngineDropped,
    #[error("Duplicate resource: {0}")]
    DuplicateResource(Urn),
    #[error("Check failed for {urn}: {}", join_failures(.failures))]
    CheckFailed {
        urn: Urn,
        failures: Vec<CheckFailure>,
    },
    #[error("Dependency {dependency} of {urn} failed")]
    DependencyFailed { urn: Urn, dependency: Urn },
    #[error("Provider error for {urn}: {source}")]
    Provider {
        urn: Urn,
        #[source]
        source: ProviderError,
    },
    #[error("No provider registered for type {0}")]
    ProviderNotFound(String),
    #[error("Output {field} of {urn} could not be resolved: {reason}")]
    Unresolved {
        urn: Urn,
        field: String,
        reason: String,
    },
    #[error("State file error: {0}")]
    State(#[from] std::io::Error),
    #[error("State encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("Program failed: {0}")]
    Program(Box<dyn std::error::Error + Send + Sync>),
}
