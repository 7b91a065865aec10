//! # Arithmetic Operator Resources
//!
//! The resource kinds the fixture declares, the providers behind them, and the
//! [`ResourceReferenceComponent`] used to record resource-to-resource links.
//!
//! Providers are built once per process in [`OperatorProviders`] and shared by every
//! resource of the same kind through a [`Scope`].

pub mod component;
pub mod kind;
pub mod provider;
pub mod resources;

pub use component::ResourceReferenceComponent;
pub use kind::OperatorKind;
pub use provider::{BinaryOp, DivProvider, OperatorProvider};
pub use resources::{Add, Div, Mul, OperatorResource, Sub};

use provider::{add, mul, sub};
use resource_framework::{
    EngineClient, FrameworkError, Input, ProviderRegistry, RegisteredResource, ResourceProvider,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One shared provider instance per operator kind.
#[derive(Debug, Clone)]
pub struct OperatorProviders {
    add: Arc<OperatorProvider>,
    sub: Arc<OperatorProvider>,
    mul: Arc<OperatorProvider>,
    div: Arc<DivProvider>,
}

impl OperatorProviders {
    pub fn new() -> Self {
        Self {
            add: Arc::new(OperatorProvider::new(add)),
            sub: Arc::new(OperatorProvider::new(sub)),
            mul: Arc::new(OperatorProvider::new(mul)),
            div: Arc::new(DivProvider::new()),
        }
    }

    pub fn get(&self, kind: OperatorKind) -> Arc<dyn ResourceProvider> {
        match kind {
            OperatorKind::Add => self.add.clone(),
            OperatorKind::Sub => self.sub.clone(),
            OperatorKind::Mul => self.mul.clone(),
            OperatorKind::Div => self.div.clone(),
        }
    }

    /// Registry the engine uses for resources left over from earlier runs.
    pub fn registry(&self) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        for kind in OperatorKind::ALL {
            registry.register(kind.type_token(), self.get(kind));
        }
        registry
    }
}

impl Default for OperatorProviders {
    fn default() -> Self {
        Self::new()
    }
}

/// What a program needs to declare operator resources: the engine client and the
/// shared providers.
#[derive(Debug, Clone)]
pub struct Scope {
    client: EngineClient,
    providers: Arc<OperatorProviders>,
}

impl Scope {
    pub fn new(client: EngineClient, providers: Arc<OperatorProviders>) -> Self {
        Self { client, providers }
    }

    pub fn client(&self) -> &EngineClient {
        &self.client
    }

    pub(crate) fn register(
        &self,
        kind: OperatorKind,
        name: &str,
        left: Input,
        right: Input,
    ) -> Result<RegisteredResource, FrameworkError> {
        let mut inputs = BTreeMap::new();
        inputs.insert("left".to_string(), left);
        inputs.insert("right".to_string(), right);
        self.client
            .register_resource(kind.type_token(), name, self.providers.get(kind), inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_every_kind() {
        let providers = OperatorProviders::new();
        let registry = providers.registry();
        assert_eq!(registry.len(), OperatorKind::ALL.len());
        for kind in OperatorKind::ALL {
            assert!(registry.get(kind.type_token()).is_some());
        }
    }

    #[test]
    fn test_same_kind_shares_a_provider() {
        let providers = OperatorProviders::new();
        assert!(Arc::ptr_eq(
            &providers.get(OperatorKind::Div),
            &providers.get(OperatorKind::Div)
        ));
    }
}
