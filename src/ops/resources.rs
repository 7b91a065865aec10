//! # Operator Resources
//!
//! `Add`, `Sub`, `Mul` and `Div` bind a resource kind to its shared provider and output
//! fields. Construction only queues a registration; every output field is an
//! [`Output`] that resolves once the engine has created or updated the resource, and can
//! be passed straight into another resource's inputs.

use super::kind::OperatorKind;
use super::Scope;
use crate::error::FixtureError;
use resource_framework::{Input, Output, RegisteredResource, Urn};

macro_rules! operator_resource {
    ($(#[$meta:meta])* $kind:ident { $($field:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $kind {
            resource: RegisteredResource,
            $(pub $field: Output,)+
        }

        impl $kind {
            pub const KIND: OperatorKind = OperatorKind::$kind;

            /// Declares the resource. Fails only if the engine has already shut down.
            pub fn new(
                scope: &Scope,
                name: &str,
                left: impl Into<Input>,
                right: impl Into<Input>,
            ) -> Result<Self, FixtureError> {
                let resource = scope.register(Self::KIND, name, left.into(), right.into())?;
                Ok(Self {
                    $($field: resource.output(stringify!($field)),)+
                    resource,
                })
            }

            pub fn urn(&self) -> &Urn {
                self.resource.urn()
            }

            /// Looks an output up by field name.
            pub fn output(&self, field: &str) -> Option<&Output> {
                match field {
                    $(stringify!($field) => Some(&self.$field),)+
                    _ => None,
                }
            }
        }

        impl From<$kind> for OperatorResource {
            fn from(resource: $kind) -> Self {
                OperatorResource::$kind(resource)
            }
        }
    };
}

operator_resource!(
    /// `left + right` as `sum`.
    Add { sum }
);
operator_resource!(
    /// `left - right` as `difference`.
    Sub { difference }
);
operator_resource!(
    /// `left * right` as `product`.
    Mul { product }
);
operator_resource!(
    /// Floor division: `quotient` and `remainder`. A zero divisor fails the resource's
    /// check step.
    Div { quotient, remainder }
);

/// Any declared operator resource.
#[derive(Debug, Clone)]
pub enum OperatorResource {
    Add(Add),
    Sub(Sub),
    Mul(Mul),
    Div(Div),
}

impl OperatorResource {
    /// Declares a resource of `kind`.
    pub fn declare(
        scope: &Scope,
        kind: OperatorKind,
        name: &str,
        left: Input,
        right: Input,
    ) -> Result<Self, FixtureError> {
        Ok(match kind {
            OperatorKind::Add => Add::new(scope, name, left, right)?.into(),
            OperatorKind::Sub => Sub::new(scope, name, left, right)?.into(),
            OperatorKind::Mul => Mul::new(scope, name, left, right)?.into(),
            OperatorKind::Div => Div::new(scope, name, left, right)?.into(),
        })
    }

    pub fn kind(&self) -> OperatorKind {
        match self {
            OperatorResource::Add(_) => Add::KIND,
            OperatorResource::Sub(_) => Sub::KIND,
            OperatorResource::Mul(_) => Mul::KIND,
            OperatorResource::Div(_) => Div::KIND,
        }
    }

    pub fn urn(&self) -> &Urn {
        match self {
            OperatorResource::Add(r) => r.urn(),
            OperatorResource::Sub(r) => r.urn(),
            OperatorResource::Mul(r) => r.urn(),
            OperatorResource::Div(r) => r.urn(),
        }
    }

    pub fn output(&self, field: &str) -> Option<&Output> {
        match self {
            OperatorResource::Add(r) => r.output(field),
            OperatorResource::Sub(r) => r.output(field),
            OperatorResource::Mul(r) => r.output(field),
            OperatorResource::Div(r) => r.output(field),
        }
    }
}
