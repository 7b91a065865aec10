//! # Operator Providers
//!
//! Providers for the arithmetic resources. Each one wraps a pure binary function and
//! recomputes its outputs on every create or update, so identical inputs always give
//! identical outputs.

use async_trait::async_trait;
use resource_framework::{
    number, CheckFailure, CheckResult, CreateResult, PropertyMap, PropertyValue,
    ProviderError, ResourceProvider, UpdateResult,
};
use tracing::debug;

/// A pure operator from `(left, right)` to an output record.
pub type BinaryOp = fn(f64, f64) -> PropertyMap;

pub fn add(left: f64, right: f64) -> PropertyMap {
    record([("sum", left + right)])
}

pub fn sub(left: f64, right: f64) -> PropertyMap {
    record([("difference", left - right)])
}

pub fn mul(left: f64, right: f64) -> PropertyMap {
    record([("product", left * right)])
}

/// Floor division. The remainder keeps the sign of `left`.
pub fn div(left: f64, right: f64) -> PropertyMap {
    record([("quotient", (left / right).floor()), ("remainder", left % right)])
}

fn record<const N: usize>(fields: [(&str, f64); N]) -> PropertyMap {
    fields
        .into_iter()
        .map(|(field, value)| (field.to_string(), value.into()))
        .collect()
}

/// Physical id shared by every operator resource. Identity lives in the URN.
const OPERATOR_ID: &str = "0";

/// ## OperatorProvider
///
/// Applies its operator to the numeric `left` and `right` inputs. Relies on the default
/// `check` (accept as-is) and `diff` (no opinion), so a changed input is always an
/// in-place update and never a replacement.
#[derive(Debug, Clone, Copy)]
pub struct OperatorProvider {
    op: BinaryOp,
}

impl OperatorProvider {
    pub fn new(op: BinaryOp) -> Self {
        Self { op }
    }

    pub fn apply(&self, inputs: &PropertyMap) -> PropertyMap {
        (self.op)(number(inputs, "left"), number(inputs, "right"))
    }
}

#[async_trait]
impl ResourceProvider for OperatorProvider {
    async fn create(&self, inputs: &PropertyMap) -> Result<CreateResult, ProviderError> {
        let outs = self.apply(inputs);
        debug!(?outs, "Operator created");
        Ok(CreateResult {
            id: OPERATOR_ID.to_string(),
            outs,
        })
    }

    async fn update(
        &self,
        _id: &str,
        _olds: &PropertyMap,
        news: &PropertyMap,
    ) -> Result<UpdateResult, ProviderError> {
        let outs = self.apply(news);
        debug!(?outs, "Operator updated");
        Ok(UpdateResult { outs })
    }
}

/// ## DivProvider
///
/// [`OperatorProvider`] for division, plus a `check` that rejects a zero divisor. The
/// rejection is a validation failure on `right`, not a provider error.
#[derive(Debug, Clone, Copy)]
pub struct DivProvider {
    inner: OperatorProvider,
}

impl DivProvider {
    pub fn new() -> Self {
        Self {
            inner: OperatorProvider::new(div),
        }
    }
}

impl Default for DivProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Loose comparison of `right` with zero: an absent or null divisor is not zero, while
/// anything that coerces to 0 (`false`, `""`, `"0"`) is.
fn is_zero_divisor(news: &PropertyMap) -> bool {
    match news.get("right") {
        None | Some(PropertyValue::Null) => false,
        Some(value) => value.to_number() == 0.0,
    }
}

#[async_trait]
impl ResourceProvider for DivProvider {
    async fn check(
        &self,
        _olds: &PropertyMap,
        news: PropertyMap,
    ) -> Result<CheckResult, ProviderError> {
        let mut failures = Vec::new();
        if is_zero_divisor(&news) {
            failures.push(CheckFailure::new("right", "divisor must be non-zero"));
        }
        Ok(CheckResult {
            inputs: news,
            failures,
        })
    }

    async fn create(&self, inputs: &PropertyMap) -> Result<CreateResult, ProviderError> {
        self.inner.create(inputs).await
    }

    async fn update(
        &self,
        id: &str,
        olds: &PropertyMap,
        news: &PropertyMap,
    ) -> Result<UpdateResult, ProviderError> {
        self.inner.update(id, olds, news).await
    }
}
