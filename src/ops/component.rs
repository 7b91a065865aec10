use crate::error::FixtureError;
use resource_framework::{PropertyMap, PropertyValue, ResourceReference, Urn};

use super::Scope;

/// A component whose only purpose is to hold references to other resources, so that
/// the engine records those links in the checkpoint.
///
/// The references are stored under `inputArgs.resourcesToReference`.
#[derive(Debug, Clone)]
pub struct ResourceReferenceComponent {
    urn: Urn,
    references: Vec<Urn>,
}

impl ResourceReferenceComponent {
    pub const TYPE: &'static str = "fixture:testing:CreateResRefComponent";

    pub fn new(
        scope: &Scope,
        name: &str,
        resources_to_reference: impl IntoIterator<Item = Urn>,
    ) -> Result<Self, FixtureError> {
        let references: Vec<Urn> = resources_to_reference.into_iter().collect();

        let refs: Vec<PropertyValue> = references
            .iter()
            .map(|urn| ResourceReference { urn: urn.clone() }.into())
            .collect();
        let mut input_args = PropertyMap::new();
        input_args.insert("resourcesToReference".into(), PropertyValue::Array(refs));
        let mut outputs = PropertyMap::new();
        outputs.insert("inputArgs".into(), input_args.into());

        let urn = scope
            .client()
            .register_component(Self::TYPE, name, outputs)?;
        Ok(Self { urn, references })
    }

    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    pub fn references(&self) -> &[Urn] {
        &self.references
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{Add, OperatorProviders};
    use resource_framework::mock::{create_mock_client, expect_component, expect_register};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_component_outputs_hold_references() {
        let (client, mut receiver) = create_mock_client("test");
        let scope = Scope::new(client, Arc::new(OperatorProviders::new()));

        let add = Add::new(&scope, "a", 1.0, 2.0).unwrap();
        let component =
            ResourceReferenceComponent::new(&scope, "refs", [add.urn().clone()]).unwrap();
        assert_eq!(component.references(), &[add.urn().clone()]);

        expect_register(&mut receiver).await.unwrap();
        let (urn, outputs) = expect_component(&mut receiver).await.unwrap();
        assert_eq!(urn.type_token(), ResourceReferenceComponent::TYPE);

        let PropertyValue::Object(args) = &outputs["inputArgs"] else {
            panic!("inputArgs is not an object");
        };
        let PropertyValue::Array(refs) = &args["resourcesToReference"] else {
            panic!("resourcesToReference is not an array");
        };
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].as_resource().unwrap().urn, *add.urn());
    }
}
