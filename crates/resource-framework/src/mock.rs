//! # Mock Engine & Testing Guide
//!
//! The `MockEngine` type accepts registrations through a real [`EngineClient`] but never
//! calls a provider. You decide what each resource resolves to, which makes it possible
//! to test a program's wiring (names, inputs, dependency edges, ordering) without running
//! any resource lifecycle.
//!
//! ## When to use Mocks vs the Real Engine
//!
//! | Feature | MockEngine | Engine |
//! |---------|------------|--------|
//! | **Provider calls** | None | check/diff/create/update/delete |
//! | **Outputs** | Scripted per resource | Computed by providers |
//! | **State** | Registrations only | Checkpoint and reconciliation |
//! | **Use Case** | Testing program wiring | Testing providers or full runs |
//! | **Error Injection** | Easy (`return_failure`) | Requires a failing provider |
//!
//! ## Pattern 0: Channel-Level Assertions
//!
//! ```rust
//! use resource_framework::mock::{create_mock_client, expect_register};
//! use resource_framework::{Input, PropertyMap, Resolution};
//! # use resource_framework::{CreateResult, ProviderError, ResourceProvider, UpdateResult};
//! # use async_trait::async_trait;
//! # use std::collections::BTreeMap;
//! # use std::sync::Arc;
//! # struct Noop;
//! # #[async_trait]
//! # impl ResourceProvider for Noop {
//! #     async fn create(&self, _: &PropertyMap) -> Result<CreateResult, ProviderError> {
//! #         Ok(CreateResult { id: "0".into(), outs: PropertyMap::new() })
//! #     }
//! #     async fn update(&self, _: &str, _: &PropertyMap, _: &PropertyMap) -> Result<UpdateResult, ProviderError> {
//! #         Ok(UpdateResult { outs: PropertyMap::new() })
//! #     }
//! # }
//!
//! #[tokio::main]
//! async fn main() {
//!     let (client, mut receiver) = create_mock_client("test");
//!
//!     let mut inputs = BTreeMap::new();
//!     inputs.insert("left".to_string(), Input::from(1.0));
//!     let resource = client
//!         .register_resource("test:Noop", "a", Arc::new(Noop), inputs)
//!         .unwrap();
//!
//!     let (registration, resolve_to) = expect_register(&mut receiver).await.unwrap();
//!     assert_eq!(registration.urn.name(), "a");
//!
//!     let mut outs = PropertyMap::new();
//!     outs.insert("sum".into(), 3.0.into());
//!     resolve_to.send_replace(Resolution::Resolved(outs));
//!     assert_eq!(resource.output("sum").number().await.unwrap(), 3.0);
//! }
//! ```
//!
//! ## Pattern 1: Scripted Engine
//!
//! ```rust,ignore
//! let mut mock = MockEngine::new("test");
//! mock.expect_register("z^2").return_number("product", 49.0);
//!
//! run_program(mock.client()).await?;
//!
//! mock.verify();
//! assert_eq!(mock.registered_names(), vec!["z^2"]);
//! ```
//!
//! ## Pattern 2: Full Engine
//!
//! Use [`Stack`](crate::Stack) with real providers; see `tests/engine_test.rs`.

use crate::client::EngineClient;
use crate::message::{EngineRequest, ResourceRegistration};
use crate::output::Resolution;
use crate::property::PropertyMap;
use crate::urn::Urn;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// An expected registration and how it resolves.
struct Expectation {
    name: String,
    resolution: Resolution,
}

#[derive(Default)]
struct Recorded {
    registrations: Vec<ResourceRegistration>,
    registered_at: Vec<Instant>,
    components: Vec<(Urn, PropertyMap)>,
}

/// A scripted engine with expectation tracking.
///
/// Registrations must arrive in the order they were expected. A registration that does
/// not match the next expectation makes the background task panic, which surfaces as
/// unresolved outputs in the program under test.
pub struct MockEngine {
    client: Option<EngineClient>,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    recorded: Arc<Mutex<Recorded>>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockEngine {
    pub fn new(stack: &str) -> Self {
        let (client, mut receiver) = create_mock_client(stack);
        let expectations: Arc<Mutex<VecDeque<Expectation>>> = Arc::default();
        let recorded: Arc<Mutex<Recorded>> = Arc::default();
        let expectations_clone = expectations.clone();
        let recorded_clone = recorded.clone();

        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                match request {
                    EngineRequest::RegisterResource {
                        registration,
                        resolve_to,
                    } => {
                        let expectation = expectations_clone.lock().unwrap().pop_front();
                        match expectation {
                            Some(expectation) if expectation.name == registration.urn.name() => {
                                resolve_to.send_replace(expectation.resolution);
                            }
                            other => panic!(
                                "Unexpected registration {} (expected {:?})",
                                registration.urn,
                                other.map(|e| e.name)
                            ),
                        }
                        let mut recorded = recorded_clone.lock().unwrap();
                        recorded.registrations.push(registration);
                        recorded.registered_at.push(Instant::now());
                    }
                    EngineRequest::RegisterComponent { urn, outputs } => {
                        recorded_clone
                            .lock()
                            .unwrap()
                            .components
                            .push((urn, outputs));
                    }
                    EngineRequest::ProgramFailed { .. } => {}
                }
            }
        });

        Self {
            client: Some(client),
            expectations,
            recorded,
            handle,
        }
    }

    /// Returns a client for the program under test.
    pub fn client(&self) -> EngineClient {
        self.client
            .clone()
            .expect("client() called after finish()")
    }

    /// Expects a resource named `name` to be registered next.
    pub fn expect_register(&mut self, name: &str) -> RegisterExpectationBuilder {
        RegisterExpectationBuilder {
            name: name.to_string(),
            expectations: self.expectations.clone(),
        }
    }

    /// Names of all registered resources, in arrival order.
    pub fn registered_names(&self) -> Vec<String> {
        self.recorded
            .lock()
            .unwrap()
            .registrations
            .iter()
            .map(|r| r.urn.name().to_string())
            .collect()
    }

    /// Names with the time each registration arrived, on the tokio clock so paused-time
    /// tests see the virtual instants.
    pub fn registration_times(&self) -> Vec<(String, Instant)> {
        let recorded = self.recorded.lock().unwrap();
        recorded
            .registrations
            .iter()
            .zip(&recorded.registered_at)
            .map(|(r, at)| (r.urn.name().to_string(), *at))
            .collect()
    }

    pub fn registrations(&self) -> Vec<ResourceRegistration> {
        self.recorded.lock().unwrap().registrations.clone()
    }

    pub fn components(&self) -> Vec<(Urn, PropertyMap)> {
        self.recorded.lock().unwrap().components.clone()
    }

    /// Drops the mock's own client and waits until every request has been handled.
    ///
    /// Clients handed to the program must be dropped first.
    pub async fn finish(&mut self) {
        self.client.take();
        (&mut self.handle)
            .await
            .expect("mock engine task panicked");
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }
}

/// Builder for registration expectations.
pub struct RegisterExpectationBuilder {
    name: String,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
}

impl RegisterExpectationBuilder {
    /// Resolves the resource with `outputs`.
    pub fn return_outputs(self, outputs: PropertyMap) {
        self.push(Resolution::Resolved(outputs));
    }

    /// Resolves the resource with a single numeric output.
    pub fn return_number(self, field: &str, value: f64) {
        let mut outputs = PropertyMap::new();
        outputs.insert(field.to_string(), value.into());
        self.return_outputs(outputs);
    }

    /// Leaves the resource pending forever.
    pub fn return_pending(self) {
        self.push(Resolution::Pending);
    }

    /// Fails the resource.
    pub fn return_failure(self, reason: &str) {
        self.push(Resolution::Failed(reason.to_string()));
    }

    fn push(self, resolution: Resolution) {
        let mut exps = self.expectations.lock().unwrap();
        exps.push_back(Expectation {
            name: self.name,
            resolution,
        });
    }
}

// =============================================================================
// CHANNEL HELPERS
// =============================================================================

/// Creates a client and the receiving end of its channel.
///
/// Nothing answers the requests; the test reads them with [`expect_register`] or
/// [`expect_component`] and resolves outputs by hand.
pub fn create_mock_client(stack: &str) -> (EngineClient, mpsc::UnboundedReceiver<EngineRequest>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (EngineClient::new(stack, sender), receiver)
}

/// Helper to verify that the next message is a resource registration.
pub async fn expect_register(
    receiver: &mut mpsc::UnboundedReceiver<EngineRequest>,
) -> Option<(ResourceRegistration, watch::Sender<Resolution>)> {
    match receiver.recv().await {
        Some(EngineRequest::RegisterResource {
            registration,
            resolve_to,
        }) => Some((registration, resolve_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a component registration.
pub async fn expect_component(
    receiver: &mut mpsc::UnboundedReceiver<EngineRequest>,
) -> Option<(Urn, PropertyMap)> {
    match receiver.recv().await {
        Some(EngineRequest::RegisterComponent { urn, outputs }) => Some((urn, outputs)),
        _ => None,
    }
}
