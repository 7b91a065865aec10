//! # Engine Messages
//!
//! This module defines the message types sent from an [`EngineClient`](crate::EngineClient)
//! to the [`Engine`](crate::Engine).
//!
//! Programs talk to the engine only through these messages. Registration is
//! fire-and-forget: the program keeps going, and the resolution channel carried in
//! the message is how the engine eventually reports the resource's outputs.

use crate::output::{Input, Resolution};
use crate::property::PropertyMap;
use crate::provider::ResourceProvider;
use crate::urn::Urn;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Everything the engine needs to manage one custom resource.
#[derive(Clone)]
pub struct ResourceRegistration {
    pub urn: Urn,
    pub provider: Arc<dyn ResourceProvider>,
    pub inputs: BTreeMap<String, Input>,
}

impl ResourceRegistration {
    /// The resources this registration depends on, one entry per input edge.
    pub fn dependencies(&self) -> Vec<Urn> {
        let mut deps: Vec<Urn> = self
            .inputs
            .values()
            .filter_map(|input| input.as_output().map(|output| output.urn().clone()))
            .collect();
        deps.sort();
        deps.dedup();
        deps
    }
}

impl fmt::Debug for ResourceRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRegistration")
            .field("urn", &self.urn)
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum EngineRequest {
    RegisterResource {
        registration: ResourceRegistration,
        resolve_to: watch::Sender<Resolution>,
    },
    /// A component has no provider; its outputs are recorded as given.
    RegisterComponent { urn: Urn, outputs: PropertyMap },
    /// The program failed after registering some resources.
    ProgramFailed { reason: String },
}
