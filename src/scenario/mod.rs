//! # Scenario Driver
//!
//! Declares the resources for every enabled branch:
//!
//! 1. **x** - fan-out groups of `Add -> Div -> Mul`.
//! 2. **y** - one sequential chain of `Add`s.
//! 3. **z** - a single square, whose product is awaited and logged.
//! 4. **exact** - a fixed number of independent `Add`s, paced by `delayMs`.
//!
//! Branches are independent and may all run in one update. Declaration never waits
//! for the engine; the only suspension points are the `z` product and the pacing timer.
//! Running again with a smaller (or skipped) branch shrinks the declared set, and the
//! engine deletes whatever is no longer declared.

mod params;

pub use params::{ExactParams, ScenarioParams, DEFAULT_DELAY_MS};

use crate::error::FixtureError;
use crate::ops::{OperatorProviders, OperatorResource, Scope};
use crate::topology::{
    exact_set, fan_out_groups, sequential_chain, square, Operand, ResourceDescriptor,
    TopologyError, SQUARE_NAME,
};
use resource_framework::{EngineClient, Input, Output};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// What the driver declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioReport {
    /// Resource names in declaration order.
    pub declared: Vec<String>,
    /// The resolved `z^2` product, when the `z` branch ran.
    pub z_squared: Option<f64>,
}

/// Runs the scenario as an update program.
///
/// The scope, and with it the engine client, is dropped before this returns.
pub async fn program(
    client: EngineClient,
    providers: Arc<OperatorProviders>,
    params: ScenarioParams,
) -> Result<ScenarioReport, FixtureError> {
    let scope = Scope::new(client, providers);
    run(&scope, &params).await
}

pub async fn run(scope: &Scope, params: &ScenarioParams) -> Result<ScenarioReport, FixtureError> {
    let mut declared = Declared::default();
    let mut report = ScenarioReport::default();

    if let Some(x) = params.x {
        for group in fan_out_groups(x).resources.chunks(3) {
            for resource in group {
                declared.declare(scope, resource)?;
            }
            info!(x, "log message");
        }
    }

    if let Some(y) = params.y {
        for resource in &sequential_chain(y).resources {
            declared.declare(scope, resource)?;
            info!(y, "log message");
        }
    }

    if let Some(z) = params.z {
        for resource in &square(z).resources {
            declared.declare(scope, resource)?;
        }
        let product = declared.output(SQUARE_NAME, "product")?.number().await?;
        info!("z^2 = {product}");
        report.z_squared = Some(product);
    }

    if let Some(exact) = &params.exact {
        info!("Creating {} resources", exact.count);
        for resource in &exact_set(exact.count).resources {
            declared.declare(scope, resource)?;
            tokio::time::sleep(exact.delay).await;
        }
    }

    info!(resources = declared.order.len(), "Done!");
    report.declared = declared.order;
    Ok(report)
}

/// Resources declared so far, by name.
#[derive(Debug, Default)]
struct Declared {
    order: Vec<String>,
    resources: HashMap<String, OperatorResource>,
}

impl Declared {
    fn declare(
        &mut self,
        scope: &Scope,
        descriptor: &ResourceDescriptor,
    ) -> Result<(), FixtureError> {
        let left = self.input(&descriptor.name, &descriptor.left)?;
        let right = self.input(&descriptor.name, &descriptor.right)?;
        let resource =
            OperatorResource::declare(scope, descriptor.kind, &descriptor.name, left, right)?;
        debug!(urn = %resource.urn(), kind = %descriptor.kind, "Declared");

        self.order.push(descriptor.name.clone());
        self.resources.insert(descriptor.name.clone(), resource);
        Ok(())
    }

    fn input(&self, name: &str, operand: &Operand) -> Result<Input, TopologyError> {
        match operand {
            Operand::Literal(value) => Ok(Input::from(*value)),
            Operand::Output { resource, field } => self
                .resources
                .get(resource)
                .and_then(|r| r.output(field))
                .map(Input::from)
                .ok_or_else(|| TopologyError::UnknownDependency {
                    resource: name.to_string(),
                    dependency: format!("{resource}.{field}"),
                }),
        }
    }

    fn output(&self, name: &str, field: &str) -> Result<&Output, TopologyError> {
        self.resources
            .get(name)
            .and_then(|r| r.output(field))
            .ok_or_else(|| TopologyError::UnknownDependency {
                resource: name.to_string(),
                dependency: format!("{name}.{field}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resource_framework::mock::MockEngine;
    use std::time::Duration;

    fn providers() -> Arc<OperatorProviders> {
        Arc::new(OperatorProviders::new())
    }

    #[tokio::test]
    async fn test_z_branch_logs_resolved_product() {
        let mut mock = MockEngine::new("test");
        mock.expect_register("z^2").return_number("product", 49.0);

        let params = ScenarioParams {
            z: Some(7.0),
            ..Default::default()
        };
        let report = program(mock.client(), providers(), params).await.unwrap();

        mock.finish().await;
        mock.verify();
        assert_eq!(report.z_squared, Some(49.0));
        assert_eq!(report.declared, vec!["z^2"]);
    }

    #[tokio::test]
    async fn test_z_branch_fails_when_product_fails() {
        let mut mock = MockEngine::new("test");
        mock.expect_register("z^2").return_failure("boom");

        let params = ScenarioParams {
            z: Some(7.0),
            ..Default::default()
        };
        let result = program(mock.client(), providers(), params).await;
        assert!(matches!(result, Err(FixtureError::Framework(_))));
        mock.finish().await;
    }

    #[tokio::test]
    async fn test_x_and_y_wire_outputs_in_order() {
        let mut mock = MockEngine::new("test");
        for name in ["0 + 2", "(0 + 2) / 3", "0-result", "y-step-0", "y-step-1"] {
            mock.expect_register(name).return_pending();
        }

        let params = ScenarioParams {
            x: Some(1.0),
            y: Some(2.0),
            ..Default::default()
        };
        program(mock.client(), providers(), params).await.unwrap();
        mock.finish().await;
        mock.verify();

        let registrations = mock.registrations();
        let by_name = |name: &str| {
            registrations
                .iter()
                .find(|r| r.urn.name() == name)
                .unwrap()
                .clone()
        };

        let result = by_name("0-result");
        let div = by_name("(0 + 2) / 3");
        assert_eq!(result.dependencies(), vec![div.urn.clone()]);
        assert_eq!(result.inputs["left"].as_output().unwrap().field(), "quotient");

        let step = by_name("y-step-1");
        assert_eq!(step.dependencies(), vec![by_name("y-step-0").urn]);
        assert_eq!(
            step.inputs["right"].as_value().unwrap().to_number(),
            2.0
        );
    }

    #[tokio::test]
    async fn test_nothing_enabled_declares_nothing() {
        let mut mock = MockEngine::new("test");
        let report = program(mock.client(), providers(), ScenarioParams::default())
            .await
            .unwrap();
        mock.finish().await;
        assert!(report.declared.is_empty());
        assert!(mock.registered_names().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exact_branch_waits_between_each_resource() {
        let mut mock = MockEngine::new("test");
        for name in [
            "exact-resource-0000",
            "exact-resource-0001",
            "exact-resource-0002",
            "exact-resource-0003",
        ] {
            mock.expect_register(name).return_pending();
        }

        let params = ScenarioParams {
            exact: Some(ExactParams::new(4.0, 20.0)),
            ..Default::default()
        };
        program(mock.client(), providers(), params).await.unwrap();
        mock.finish().await;
        mock.verify();

        let times = mock.registration_times();
        let names: Vec<&str> = times.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "exact-resource-0000",
                "exact-resource-0001",
                "exact-resource-0002",
                "exact-resource-0003",
            ]
        );
        for pair in times.windows(2) {
            let gap = pair[1].1 - pair[0].1;
            assert!(gap >= Duration::from_millis(20), "{} after {gap:?}", pair[1].0);
        }
    }
}
