//! # ResourceProvider Trait
//!
//! The `ResourceProvider` trait is the contract every resource kind must implement to be
//! managed by the [`Engine`](crate::Engine). It covers the full lifecycle the host drives:
//! `check`, `diff`, `create`, `read`, `update` and `delete`.
//!
//! # Provided Methods (Hooks)
//! Only [`ResourceProvider::create`] and [`ResourceProvider::update`] are required. The
//! rest have default implementations:
//! - [`ResourceProvider::check`] accepts the proposed inputs unchanged.
//! - [`ResourceProvider::diff`] reports nothing, leaving the decision to the host.
//! - [`ResourceProvider::read`] returns the recorded properties as they are.
//! - [`ResourceProvider::delete`] does nothing.

use crate::error::ProviderError;
use crate::property::PropertyMap;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A single input validation failure reported by [`ResourceProvider::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFailure {
    pub property: String,
    pub reason: String,
}

impl CheckFailure {
    pub fn new(property: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.property, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub inputs: PropertyMap,
    pub failures: Vec<CheckFailure>,
}

impl CheckResult {
    pub fn valid(inputs: PropertyMap) -> Self {
        Self {
            inputs,
            failures: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of [`ResourceProvider::diff`].
///
/// `changes: None` means the provider has no opinion; the host then compares
/// the old and new inputs itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    pub changes: Option<bool>,
    pub replaces: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateResult {
    pub id: String,
    pub outs: PropertyMap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadResult {
    pub id: String,
    pub props: PropertyMap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateResult {
    pub outs: PropertyMap,
}

/// Lifecycle contract between a resource kind and the host engine.
///
/// # Async
/// Every method is async so that providers backed by real infrastructure can await
/// remote calls. The host may invoke them concurrently for different resources, in
/// any order consistent with the dependency graph.
///
/// # Errors
/// Validation problems belong in [`CheckResult::failures`]; they block one resource
/// without failing the whole update. A returned `ProviderError` is treated as a
/// failure of the step that called it.
#[async_trait]
pub trait ResourceProvider: Send + Sync + 'static {
    /// Validates proposed inputs before anything else happens to a resource.
    async fn check(
        &self,
        _olds: &PropertyMap,
        news: PropertyMap,
    ) -> Result<CheckResult, ProviderError> {
        Ok(CheckResult::valid(news))
    }

    /// Decides whether an existing resource needs an update or a replacement.
    async fn diff(
        &self,
        _id: &str,
        _olds: &PropertyMap,
        _news: &PropertyMap,
    ) -> Result<DiffResult, ProviderError> {
        Ok(DiffResult::default())
    }

    async fn create(&self, inputs: &PropertyMap) -> Result<CreateResult, ProviderError>;

    /// Reads live state. The default trusts whatever the host recorded.
    async fn read(&self, id: &str, props: PropertyMap) -> Result<ReadResult, ProviderError> {
        Ok(ReadResult {
            id: id.to_string(),
            props,
        })
    }

    async fn update(
        &self,
        id: &str,
        olds: &PropertyMap,
        news: &PropertyMap,
    ) -> Result<UpdateResult, ProviderError>;

    async fn delete(&self, _id: &str, _props: &PropertyMap) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Providers by resource type token.
///
/// The engine needs this for resources that exist in the checkpoint but were not
/// registered by the current program, since those must still be read or deleted.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ResourceProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        type_token: impl Into<String>,
        provider: Arc<dyn ResourceProvider>,
    ) -> &mut Self {
        self.providers.insert(type_token.into(), provider);
        self
    }

    pub fn get(&self, type_token: &str) -> Option<Arc<dyn ResourceProvider>> {
        self.providers.get(type_token).cloned()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens: Vec<_> = self.providers.keys().collect();
        tokens.sort();
        f.debug_struct("ProviderRegistry")
            .field("types", &tokens)
            .finish()
    }
}
