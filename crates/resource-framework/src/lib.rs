//! # Resource Framework
//!
//! This crate provides the host side of a declarative resource model: a provider contract
//! for resource kinds, and a small in-process engine that realizes programs against it.
//!
//! ## Architecture Overview
//!
//! The framework separates concerns into three layers:
//!
//! 1. **Provider Layer** ([`ResourceProvider`]) - what a resource kind does on check, diff,
//!    create, read, update and delete
//! 2. **Engine Layer** ([`Engine`], [`Stack`]) - dependency ordering, change detection and
//!    the persisted [`Checkpoint`]
//! 3. **Program Layer** ([`EngineClient`], [`Output`], [`Input`]) - how programs declare
//!    resources and wire outputs into inputs
//!
//! ## Declaring Resources
//!
//! Registration returns immediately. Outputs are handles that resolve once the engine has
//! run the provider, and passing one as another resource's input creates a dependency edge:
//!
//! ```rust
//! use resource_framework::{
//!     number, CreateResult, Input, PropertyMap, ProviderError, ProviderRegistry,
//!     ResourceProvider, Stack, UpdateResult,
//! };
//! use async_trait::async_trait;
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! struct Double;
//!
//! #[async_trait]
//! impl ResourceProvider for Double {
//!     async fn create(&self, inputs: &PropertyMap) -> Result<CreateResult, ProviderError> {
//!         let mut outs = PropertyMap::new();
//!         outs.insert("value".into(), (number(inputs, "x") * 2.0).into());
//!         Ok(CreateResult { id: "0".into(), outs })
//!     }
//!
//!     async fn update(&self, _id: &str, _olds: &PropertyMap, news: &PropertyMap) -> Result<UpdateResult, ProviderError> {
//!         Ok(UpdateResult { outs: self.create(news).await?.outs })
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let provider: Arc<dyn ResourceProvider> = Arc::new(Double);
//!     let mut registry = ProviderRegistry::new();
//!     registry.register("demo:Double", provider.clone());
//!     let mut stack = Stack::new("dev", registry);
//!
//!     let result = stack
//!         .up(|client| async move {
//!             let mut inputs = BTreeMap::new();
//!             inputs.insert("x".to_string(), Input::from(2.0));
//!             let first = client.register_resource("demo:Double", "first", provider.clone(), inputs)?;
//!
//!             let mut inputs = BTreeMap::new();
//!             inputs.insert("x".to_string(), Input::from(first.output("value")));
//!             let second = client.register_resource("demo:Double", "second", provider, inputs)?;
//!
//!             second.output("value").number().await
//!         })
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(result.output, 8.0);
//!     assert_eq!(stack.checkpoint().len(), 2);
//! }
//! ```
//!
//! ## Concurrency Model
//!
//! - The engine's receive loop runs in its own Tokio task and owns all update state
//! - Every resource is realized in its own step task; dependents wait on their inputs
//! - Programs never block on registration, only when they choose to await an output
//!
//! ## Testing
//!
//! The [`mock`] module provides a scripted [`MockEngine`](mock::MockEngine) and channel
//! helpers for testing programs without running providers.

pub mod client;
pub mod engine;
pub mod error;
pub mod message;
pub mod mock;
pub mod output;
pub mod property;
pub mod provider;
pub mod stack;
pub mod state;
pub mod tracing;
pub mod urn;

// Re-export core types for convenience
pub use client::{EngineClient, RegisteredResource};
pub use engine::{Engine, UpdateOutcome};
pub use error::{FrameworkError, ProviderError};
pub use message::{EngineRequest, ResourceRegistration};
pub use output::{Input, Output, Resolution};
pub use property::{number, PropertyMap, PropertyValue, ResourceReference};
pub use provider::{
    CheckFailure, CheckResult, CreateResult, DiffResult, ReadResult, ResourceProvider,
    ProviderRegistry, UpdateResult,
};
pub use stack::{Stack, UpResult};
pub use state::{Checkpoint, OpKind, ResourceState, StepFailure, UpdateSummary};
pub use urn::Urn;
