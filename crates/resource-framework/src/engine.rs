//! # Reference Host Engine
//!
//! This module defines the `Engine`, the component that turns resource registrations into
//! provider calls. It implements the "Server" side of an update: programs send
//! [`EngineRequest`]s through an [`EngineClient`], and the engine owns all state for the
//! duration of the update.

use crate::client::EngineClient;
use crate::error::{FrameworkError, ProviderError};
use crate::message::{EngineRequest, ResourceRegistration};
use crate::output::{Input, Resolution};
use crate::property::{PropertyMap, PropertyValue};
use crate::provider::ProviderRegistry;
use crate::state::{Checkpoint, OpKind, ResourceState, UpdateSummary};
use crate::urn::Urn;
use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, warn, Instrument};

/// The engine that realizes one update of a stack.
///
/// ## Concurrency Model
/// The receive loop runs in a single task and is the only owner of the prior
/// checkpoint and the bookkeeping for the update. Each registered resource gets its own
/// *step* task, so independent resources are realized in parallel while a dependent
/// step simply waits on its inputs' [`Output`](crate::Output)s.
///
/// ## Operations
///
/// * **Step** (per registered resource):
///     1. Awaits every input that is an output of another resource.
///     2. Calls `check`; any failure blocks this resource only.
///     3. No prior state: calls `create`.
///     4. Prior state: calls `diff`. Replacements create the new resource and delete the
///        old one. Otherwise `changes`, or an input comparison when the provider has no
///        opinion, selects `update` or `same`.
///     5. Resolves the resource's outputs, or marks them failed.
///
/// * **Finish** (after every client is dropped):
///     1. Waits for all steps.
///     2. Deletes prior resources that were not registered, newest first. If the
///        program or any step failed, deletion is skipped and the stale state is kept.
///     3. Produces the new checkpoint in registration order.
pub struct Engine {
    receiver: mpsc::UnboundedReceiver<EngineRequest>,
    prior: Checkpoint,
    providers: ProviderRegistry,
}

/// Everything an update produced.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub checkpoint: Checkpoint,
    pub summary: UpdateSummary,
    pub program_failed: bool,
}

type StepResult = Result<(OpKind, ResourceState), FrameworkError>;

impl Engine {
    /// Creates an engine for the stack named in `prior`, and the client programs use to
    /// talk to it.
    pub fn new(prior: Checkpoint, providers: ProviderRegistry) -> (Self, EngineClient) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let client = EngineClient::new(prior.stack.as_str(), sender);
        let engine = Self {
            receiver,
            prior,
            providers,
        };
        (engine, client)
    }

    /// Runs the update until the program side closes, then reconciles.
    pub async fn run(mut self) -> UpdateOutcome {
        let stack = self.prior.stack.clone();
        info!(stack = %stack, prior = self.prior.len(), "Update started");

        let mut steps: JoinSet<(usize, StepResult)> = JoinSet::new();
        let mut registered: HashMap<usize, Urn> = HashMap::new();
        let mut seen: HashSet<Urn> = HashSet::new();
        let mut entries: Vec<(usize, ResourceState)> = Vec::new();
        let mut summary = UpdateSummary::default();
        let mut program_failed = false;
        let mut next_index = 0usize;

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                EngineRequest::RegisterResource {
                    registration,
                    resolve_to,
                } => {
                    let urn = registration.urn.clone();
                    if !seen.insert(urn.clone()) {
                        let err = FrameworkError::DuplicateResource(urn.clone());
                        warn!(%urn, "Duplicate resource");
                        resolve_to.send_replace(Resolution::Failed(err.to_string()));
                        summary.fail(urn, err);
                        continue;
                    }
                    let index = next_index;
                    next_index += 1;
                    registered.insert(index, urn.clone());

                    let prior = self.prior.find(&urn).cloned();
                    let span = info_span!("step", urn = %urn);
                    steps.spawn(
                        async move { (index, execute_step(registration, prior, resolve_to).await) }
                            .instrument(span),
                    );
                }
                EngineRequest::RegisterComponent { urn, outputs } => {
                    if !seen.insert(urn.clone()) {
                        warn!(%urn, "Duplicate component");
                        summary.fail(urn.clone(), FrameworkError::DuplicateResource(urn));
                        continue;
                    }
                    let op = match self.prior.find(&urn) {
                        None => OpKind::Create,
                        Some(prior) if prior.outputs == outputs => OpKind::Same,
                        Some(_) => OpKind::Update,
                    };
                    let state = ResourceState {
                        dependencies: referenced_urns(&outputs),
                        urn,
                        custom: false,
                        id: None,
                        inputs: PropertyMap::new(),
                        outputs,
                    };
                    info!(urn = %state.urn, %op, "Component recorded");
                    summary.record(op);
                    entries.push((next_index, state));
                    next_index += 1;
                }
                EngineRequest::ProgramFailed { reason } => {
                    warn!(stack = %stack, reason = %reason, "Program failed");
                    program_failed = true;
                }
            }
        }

        let mut finished: HashSet<usize> = HashSet::new();
        while let Some(joined) = steps.join_next().await {
            let Ok((index, result)) = joined else {
                continue;
            };
            finished.insert(index);
            let Some(urn) = registered.get(&index) else {
                continue;
            };
            match result {
                Ok((op, state)) => {
                    summary.record(op);
                    entries.push((index, state));
                }
                Err(e) => {
                    // A failed step leaves whatever was there before untouched.
                    if let Some(prior) = self.prior.find(urn) {
                        entries.push((index, prior.clone()));
                    }
                    summary.fail(urn.clone(), e);
                }
            }
        }
        for (index, urn) in &registered {
            if !finished.contains(index) {
                summary.fail(urn.clone(), "step aborted");
            }
        }

        let stale: Vec<ResourceState> = self
            .prior
            .resources
            .iter()
            .filter(|r| !seen.contains(&r.urn))
            .cloned()
            .collect();
        let mut kept = Vec::new();
        if program_failed || !summary.succeeded() {
            if !stale.is_empty() {
                warn!(stack = %stack, stale = stale.len(), "Update failed, skipping deletes");
            }
            kept = stale;
        } else {
            let mut undeleted: HashSet<Urn> = HashSet::new();
            for resource in stale.iter().rev() {
                match delete_resource(&self.providers, resource).await {
                    Ok(()) => summary.record(OpKind::Delete),
                    Err(e) => {
                        warn!(urn = %resource.urn, error = %e, "Delete failed");
                        undeleted.insert(resource.urn.clone());
                        summary.fail(resource.urn.clone(), e);
                    }
                }
            }
            kept.extend(stale.into_iter().filter(|r| undeleted.contains(&r.urn)));
        }

        entries.sort_by_key(|(index, _)| *index);
        let mut checkpoint = Checkpoint::new(stack.clone());
        checkpoint.resources = entries.into_iter().map(|(_, state)| state).collect();
        checkpoint.resources.extend(kept);

        info!(stack = %stack, size = checkpoint.len(), %summary, "Update finished");
        UpdateOutcome {
            checkpoint,
            summary,
            program_failed,
        }
    }
}

async fn execute_step(
    registration: ResourceRegistration,
    prior: Option<ResourceState>,
    resolve_to: watch::Sender<Resolution>,
) -> StepResult {
    let result = realize(&registration, prior.as_ref()).await;
    match &result {
        Ok((op, state)) => {
            info!(%op, "Step ok");
            resolve_to.send_replace(Resolution::Resolved(state.outputs.clone()));
        }
        Err(e) => {
            warn!(error = %e, "Step failed");
            resolve_to.send_replace(Resolution::Failed(e.to_string()));
        }
    }
    result
}

async fn realize(registration: &ResourceRegistration, prior: Option<&ResourceState>) -> StepResult {
    let urn = &registration.urn;
    let provider = &registration.provider;
    let provider_err = |source: ProviderError| FrameworkError::Provider {
        urn: urn.clone(),
        source,
    };

    let mut news = PropertyMap::new();
    for (key, input) in &registration.inputs {
        let value = match input {
            Input::Value(value) => value.clone(),
            Input::Output(output) => {
                output
                    .value()
                    .await
                    .map_err(|_| FrameworkError::DependencyFailed {
                        urn: urn.clone(),
                        dependency: output.urn().clone(),
                    })?
            }
        };
        news.insert(key.clone(), value);
    }
    debug!(inputs = ?news, "Inputs resolved");

    let olds = prior.map(|p| p.inputs.clone()).unwrap_or_default();
    let checked = provider.check(&olds, news).await.map_err(provider_err)?;
    if !checked.is_valid() {
        return Err(FrameworkError::CheckFailed {
            urn: urn.clone(),
            failures: checked.failures,
        });
    }
    let news = checked.inputs;

    let (op, id, outputs) = match prior {
        None => {
            let created = provider.create(&news).await.map_err(provider_err)?;
            (OpKind::Create, created.id, created.outs)
        }
        Some(prior) => {
            let id = prior.id.clone().unwrap_or_default();
            let diff = provider
                .diff(&id, &prior.inputs, &news)
                .await
                .map_err(provider_err)?;
            if !diff.replaces.is_empty() {
                debug!(replaces = ?diff.replaces, "Replacing");
                let created = provider.create(&news).await.map_err(provider_err)?;
                provider
                    .delete(&id, &prior.outputs)
                    .await
                    .map_err(provider_err)?;
                (OpKind::Replace, created.id, created.outs)
            } else if diff.changes.unwrap_or_else(|| prior.inputs != news) {
                let updated = provider
                    .update(&id, &prior.inputs, &news)
                    .await
                    .map_err(provider_err)?;
                (OpKind::Update, id, updated.outs)
            } else {
                (OpKind::Same, id, prior.outputs.clone())
            }
        }
    };

    Ok((
        op,
        ResourceState {
            urn: urn.clone(),
            custom: true,
            id: Some(id),
            inputs: news,
            outputs,
            dependencies: registration.dependencies(),
        },
    ))
}

async fn delete_resource(
    providers: &ProviderRegistry,
    resource: &ResourceState,
) -> Result<(), FrameworkError> {
    if resource.custom {
        let type_token = resource.urn.type_token();
        let provider = providers
            .get(type_token)
            .ok_or_else(|| FrameworkError::ProviderNotFound(type_token.to_string()))?;
        let id = resource.id.as_deref().unwrap_or_default();
        provider
            .delete(id, &resource.outputs)
            .await
            .map_err(|source| FrameworkError::Provider {
                urn: resource.urn.clone(),
                source,
            })?;
    }
    info!(urn = %resource.urn, "Deleted");
    Ok(())
}

fn referenced_urns(outputs: &PropertyMap) -> Vec<Urn> {
    let mut urns = Vec::new();
    for value in outputs.values() {
        value.visit(&mut |v: &PropertyValue| {
            if let Some(reference) = v.as_resource() {
                urns.push(reference.urn.clone());
            }
        });
    }
    urns.sort();
    urns.dedup();
    urns
}

/// Re-reads every resource through its provider and records what comes back.
pub async fn refresh(
    checkpoint: &Checkpoint,
    providers: &ProviderRegistry,
) -> (Checkpoint, UpdateSummary) {
    let mut summary = UpdateSummary::default();
    let mut refreshed = Checkpoint::new(checkpoint.stack.clone());
    for resource in &checkpoint.resources {
        let mut state = resource.clone();
        if resource.custom {
            match read_resource(providers, resource).await {
                Ok((id, props)) => {
                    state.id = Some(id);
                    state.outputs = props;
                    summary.record(OpKind::Read);
                }
                Err(e) => {
                    warn!(urn = %resource.urn, error = %e, "Read failed");
                    summary.fail(resource.urn.clone(), e);
                }
            }
        }
        refreshed.resources.push(state);
    }
    info!(stack = %refreshed.stack, %summary, "Refresh finished");
    (refreshed, summary)
}

async fn read_resource(
    providers: &ProviderRegistry,
    resource: &ResourceState,
) -> Result<(String, PropertyMap), FrameworkError> {
    let type_token = resource.urn.type_token();
    let provider = providers
        .get(type_token)
        .ok_or_else(|| FrameworkError::ProviderNotFound(type_token.to_string()))?;
    let id = resource.id.as_deref().unwrap_or_default();
    let read = provider
        .read(id, resource.outputs.clone())
        .await
        .map_err(|source| FrameworkError::Provider {
            urn: resource.urn.clone(),
            source,
        })?;
    Ok((read.id, read.props))
}

/// Deletes every resource, newest first. Resources whose delete fails stay recorded.
pub async fn destroy(
    checkpoint: &Checkpoint,
    providers: &ProviderRegistry,
) -> (Checkpoint, UpdateSummary) {
    let mut summary = UpdateSummary::default();
    let mut failed: HashSet<Urn> = HashSet::new();
    for resource in checkpoint.resources.iter().rev() {
        match delete_resource(providers, resource).await {
            Ok(()) => summary.record(OpKind::Delete),
            Err(e) => {
                warn!(urn = %resource.urn, error = %e, "Delete failed");
                failed.insert(resource.urn.clone());
                summary.fail(resource.urn.clone(), e);
            }
        }
    }
    let mut remaining = Checkpoint::new(checkpoint.stack.clone());
    remaining.resources = checkpoint
        .resources
        .iter()
        .filter(|r| failed.contains(&r.urn))
        .cloned()
        .collect();
    info!(stack = %remaining.stack, %summary, "Destroy finished");
    (remaining, summary)
}
