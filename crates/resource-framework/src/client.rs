//! # Engine Client
//!
//! This module defines the handle programs use to register resources with an engine.

use crate::error::FrameworkError;
use crate::message::{EngineRequest, ResourceRegistration};
use crate::output::{Input, Output, Resolution};
use crate::property::PropertyMap;
use crate::provider::ResourceProvider;
use crate::urn::Urn;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::debug;

/// ## EngineClient
///
/// The `EngineClient` is the program side of an update. Registration never waits: it
/// queues a message for the engine and hands back a [`RegisteredResource`] whose outputs
/// resolve later. The engine finishes the update once every clone has been dropped.
///
/// * **Cloneable** – holds only a sender and the stack name.
/// * **Synchronous registration** – the channel is unbounded, so declaring a resource
///   never suspends the program.
#[derive(Clone, Debug)]
pub struct EngineClient {
    stack: Arc<str>,
    sender: mpsc::UnboundedSender<EngineRequest>,
}

impl EngineClient {
    pub fn new(stack: impl Into<Arc<str>>, sender: mpsc::UnboundedSender<EngineRequest>) -> Self {
        Self {
            stack: stack.into(),
            sender,
        }
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }

    pub fn urn(&self, type_token: &str, name: &str) -> Urn {
        Urn::new(self.stack.as_ref(), type_token, name)
    }

    /// Declares a custom resource managed by `provider`.
    pub fn register_resource(
        &self,
        type_token: &str,
        name: &str,
        provider: Arc<dyn ResourceProvider>,
        inputs: BTreeMap<String, Input>,
    ) -> Result<RegisteredResource, FrameworkError> {
        let urn = self.urn(type_token, name);
        let (resolve_to, state) = watch::channel(Resolution::Pending);
        let registration = ResourceRegistration {
            urn: urn.clone(),
            provider,
            inputs,
        };
        debug!(%urn, "Register resource");
        self.sender
            .send(EngineRequest::RegisterResource {
                registration,
                resolve_to,
            })
            .map_err(|_| FrameworkError::EngineClosed)?;
        Ok(RegisteredResource { urn, state })
    }

    /// Declares a component resource and records `outputs` as its state.
    pub fn register_component(
        &self,
        type_token: &str,
        name: &str,
        outputs: PropertyMap,
    ) -> Result<Urn, FrameworkError> {
        let urn = self.urn(type_token, name);
        debug!(%urn, "Register component");
        self.sender
            .send(EngineRequest::RegisterComponent {
                urn: urn.clone(),
                outputs,
            })
            .map_err(|_| FrameworkError::EngineClosed)?;
        Ok(urn)
    }

    /// Tells the engine the program will not finish normally.
    pub fn program_failed(&self, reason: impl Into<String>) -> Result<(), FrameworkError> {
        self.sender
            .send(EngineRequest::ProgramFailed {
                reason: reason.into(),
            })
            .map_err(|_| FrameworkError::EngineClosed)
    }
}

/// A resource the engine has accepted but may not have realized yet.
#[derive(Debug, Clone)]
pub struct RegisteredResource {
    urn: Urn,
    state: watch::Receiver<Resolution>,
}

impl RegisteredResource {
    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    /// Handle on the named output slot.
    pub fn output(&self, field: &str) -> Output {
        Output::new(self.urn.clone(), field, self.state.clone())
    }
}
