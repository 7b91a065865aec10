//! # Arithmetic Resource Fixture
//!
//! > **A deterministic workload for exercising a resource engine.**
//!
//! This crate declares small graphs of arithmetic resources (`Add`, `Sub`, `Mul`,
//! `Div`) whose outputs feed each other's inputs. Because every provider is a pure
//! function, a run is fully predictable: the engine's create, update, delete and
//! validation paths can be checked against values computed up front.
//!
//! ## 🚀 Core Components
//!
//! - **[ops]**: The resource kinds, their providers ([`OperatorProvider`](ops::OperatorProvider),
//!   [`DivProvider`](ops::DivProvider)) and the [`ResourceReferenceComponent`](ops::ResourceReferenceComponent).
//! - **[topology]**: Pure builders describing the four resource graphs, with an evaluator
//!   that predicts every output.
//! - **[scenario]**: The driver that turns configuration into declared resources.
//! - **[config]**: Stack configuration from YAML and `key=value` overrides.
//! - **[loadtest]**: Many random stacks updated or destroyed concurrently.
//!
//! The engine itself lives in the `resource-framework` crate.
//!
//! ## 📚 Quick Start
//!
//! ```rust,no_run
//! use arith_fixture::ops::OperatorProviders;
//! use arith_fixture::scenario::{self, ScenarioParams};
//! use resource_framework::Stack;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let providers = Arc::new(OperatorProviders::new());
//!     let mut stack = Stack::new("dev", providers.registry());
//!     let params = ScenarioParams { x: Some(3.0), z: Some(7.0), ..Default::default() };
//!
//!     let result = stack
//!         .up(|client| scenario::program(client, providers.clone(), params))
//!         .await
//!         .unwrap();
//!     assert_eq!(result.output.z_squared, Some(49.0));
//!     println!("{}", result.summary);
//! }
//! ```
//!
//! ## 🧪 Testing
//!
//! Drivers can be tested without running providers through
//! [`resource_framework::mock::MockEngine`]; see `tests/scenario_test.rs` for full runs.

pub mod config;
pub mod error;
pub mod loadtest;
pub mod ops;
pub mod scenario;
pub mod topology;
