//! # Checkpoints and Summaries
//!
//! A [`Checkpoint`] is the persisted picture of a stack: every resource the last
//! operation left behind, in registration order. Dependencies always precede their
//! dependents, which is what makes reverse-order deletion safe.

use crate::error::FrameworkError;
use crate::property::{PropertyMap, PropertyValue};
use crate::urn::Urn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Recorded state of one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub urn: Urn,
    /// `false` for components, which have no provider and no physical id.
    pub custom: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub inputs: PropertyMap,
    #[serde(default)]
    pub outputs: PropertyMap,
    #[serde(default)]
    pub dependencies: Vec<Urn>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub stack: String,
    #[serde(default)]
    pub resources: Vec<ResourceState>,
}

impl Checkpoint {
    pub fn new(stack: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
            resources: Vec::new(),
        }
    }

    pub fn find(&self, urn: &Urn) -> Option<&ResourceState> {
        self.resources.iter().find(|r| &r.urn == urn)
    }

    /// Looks a resource up by its logical name alone.
    pub fn find_by_name(&self, name: &str) -> Option<&ResourceState> {
        self.resources.iter().find(|r| r.urn.name() == name)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.resources.iter().map(|r| r.urn.name()).collect()
    }

    /// Every `(holder, referenced)` pair recorded in resource outputs.
    pub fn resource_references(&self) -> Vec<(Urn, Urn)> {
        let mut links = Vec::new();
        for resource in &self.resources {
            for value in resource.outputs.values() {
                value.visit(&mut |v: &PropertyValue| {
                    if let Some(reference) = v.as_resource() {
                        links.push((resource.urn.clone(), reference.urn.clone()));
                    }
                });
            }
        }
        links
    }

    pub fn to_json(&self) -> Result<String, FrameworkError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, FrameworkError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a checkpoint, or returns an empty one when the file does not exist yet.
    pub fn load(path: &Path, stack: &str) -> Result<Self, FrameworkError> {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new(stack)),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), FrameworkError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// What the engine did to one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpKind {
    Create,
    Update,
    Same,
    Replace,
    Delete,
    Read,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpKind::Create => "create",
            OpKind::Update => "update",
            OpKind::Same => "same",
            OpKind::Replace => "replace",
            OpKind::Delete => "delete",
            OpKind::Read => "read",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub urn: Urn,
    pub error: String,
}

/// Result of an `up`, `refresh` or `destroy`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub ops: BTreeMap<OpKind, usize>,
    pub failures: Vec<StepFailure>,
}

impl UpdateSummary {
    pub fn record(&mut self, op: OpKind) {
        *self.ops.entry(op).or_default() += 1;
    }

    pub fn fail(&mut self, urn: Urn, error: impl ToString) {
        self.failures.push(StepFailure {
            urn,
            error: error.to_string(),
        });
    }

    pub fn count(&self, op: OpKind) -> usize {
        self.ops.get(&op).copied().unwrap_or(0)
    }

    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for UpdateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (op, count) in &self.ops {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{count} {op}")?;
            first = false;
        }
        if first {
            write!(f, "no changes")?;
        }
        if !self.failures.is_empty() {
            write!(f, "; {} failed", self.failures.len())?;
        }
        Ok(())
    }
}
