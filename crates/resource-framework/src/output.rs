//! # Outputs and Inputs
//!
//! Registering a resource returns immediately; its outputs are filled in later, once the
//! engine has run the provider. An [`Output`] is a handle on one named output slot of a
//! registered resource. Passing it as an [`Input`] to another resource creates a
//! dependency edge: the engine will not run the dependent step until the slot resolves.
//!
//! ```rust,ignore
//! let sum = add.sum.clone();                  // handle, nothing resolved yet
//! let div = Div::new(&scope, "d", sum, 3.0)?; // edge: d waits for the Add step
//! let q = div.quotient.number().await?;       // explicit synchronization point
//! ```

use crate::error::FrameworkError;
use crate::property::{PropertyMap, PropertyValue};
use crate::urn::Urn;
use tokio::sync::watch;

/// What a resource's outputs currently look like.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Pending,
    Resolved(PropertyMap),
    Failed(String),
}

/// Handle on a named output slot of a registered resource.
#[derive(Debug, Clone)]
pub struct Output {
    urn: Urn,
    field: String,
    state: watch::Receiver<Resolution>,
}

impl Output {
    pub fn new(urn: Urn, field: impl Into<String>, state: watch::Receiver<Resolution>) -> Self {
        Self {
            urn,
            field: field.into(),
            state,
        }
    }

    /// The resource this output belongs to.
    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn is_resolved(&self) -> bool {
        matches!(*self.state.borrow(), Resolution::Resolved(_))
    }

    /// Waits for the owning resource to settle and returns this slot's value.
    ///
    /// A slot the provider did not populate resolves to a NaN number, so reading it as a
    /// number propagates NaN rather than zero.
    pub async fn value(&self) -> Result<PropertyValue, FrameworkError> {
        let mut state = self.state.clone();
        let settled = state
            .wait_for(|resolution| !matches!(resolution, Resolution::Pending))
            .await
            .map_err(|_| FrameworkError::EngineDropped)?
            .clone();
        match settled {
            Resolution::Resolved(outs) => {
                Ok(outs
                .get(&self.field)
                .cloned()
                .unwrap_or(PropertyValue::Number(f64::NAN)))
            }
            Resolution::Failed(reason) => Err(FrameworkError::Unresolved {
                urn: self.urn.clone(),
                field: self.field.clone(),
                reason,
            }),
            Resolution::Pending => Err(FrameworkError::EngineDropped),
        }
    }

    /// Like [`Output::value`], coerced with [`PropertyValue::to_number`].
    pub async fn number(&self) -> Result<f64, FrameworkError> {
        Ok(self.value().await?.to_number())
    }
}

/// A resource input: either a known value or another resource's output.
#[derive(Debug, Clone)]
pub enum Input {
    Value(PropertyValue),
    Output(Output),
}

impl Input {
    pub fn as_output(&self) -> Option<&Output> {
        match self {
            Input::Output(output) => Some(output),
            Input::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&PropertyValue> {
        match self {
            Input::Value(value) => Some(value),
            Input::Output(_) => None,
        }
    }
}

impl From<PropertyValue> for Input {
    fn from(value: PropertyValue) -> Self {
        Input::Value(value)
    }
}

impl From<f64> for Input {
    fn from(n: f64) -> Self {
        Input::Value(PropertyValue::Number(n))
    }
}

impl From<Output> for Input {
    fn from(output: Output) -> Self {
        Input::Output(output)
    }
}

impl From<&Output> for Input {
    fn from(output: &Output) -> Self {
        Input::Output(output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urn() -> Urn {
        Urn::new("test", "fixture:ops:Add", "a")
    }

    #[tokio::test]
    async fn test_value_waits_for_resolution() {
        let (tx, rx) = watch::channel(Resolution::Pending);
        let output = Output::new(urn(), "sum", rx);
        assert!(!output.is_resolved());

        let waiter = tokio::spawn({
            let output = output.clone();
            async move { output.number().await }
        });

        let mut outs = PropertyMap::new();
        outs.insert("sum".into(), 5.0.into());
        tx.send_replace(Resolution::Resolved(outs));

        assert_eq!(waiter.await.unwrap().unwrap(), 5.0);
        assert!(output.is_resolved());
    }

    #[tokio::test]
    async fn test_missing_slot_is_nan() {
        let (_tx, rx) = watch::channel(Resolution::Resolved(PropertyMap::new()));
        let output = Output::new(urn(), "sum", rx);
        assert!(matches!(output.value().await.unwrap(), PropertyValue::Number(n) if n.is_nan()));
        assert!(output.number().await.unwrap().is_nan());
    }

    #[tokio::test]
    async fn test_failed_resource_fails_output() {
        let (tx, rx) = watch::channel(Resolution::Pending);
        let output = Output::new(urn(), "sum", rx);
        tx.send_replace(Resolution::Failed("boom".into()));
        drop(tx);

        let err = output.value().await.unwrap_err();
        assert!(matches!(err, FrameworkError::Unresolved { ref reason, .. } if reason == "boom"));
    }

    #[tokio::test]
    async fn test_dropped_sender_while_pending() {
        let (tx, rx) = watch::channel(Resolution::Pending);
        let output = Output::new(urn(), "sum", rx);
        drop(tx);
        assert!(matches!(
            output.value().await,
            Err(FrameworkError::EngineDropped)
        ));
    }
}
