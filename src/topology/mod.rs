//! # Topologies
//!
//! Pure builders for the resource graphs each scenario branch declares. A [`Topology`]
//! is a list of [`ResourceDescriptor`]s in declaration order; edges are explicit in the
//! operands, so the shape can be inspected and evaluated without an engine.
//!
//! | Builder | Shape |
//! |---------|-------|
//! | [`fan_out_groups`] | `x` independent `Add -> Div -> Mul` chains |
//! | [`sequential_chain`] | one linear chain of `y` `Add`s |
//! | [`square`] | a single `Mul(z, z)` |
//! | [`exact_set`] | `n` independent `Add(i, 0)`s with zero-padded names |

use crate::ops::OperatorKind;
use resource_framework::{number, PropertyMap};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("Resource {resource} refers to {dependency}, which is not declared before it")]
    UnknownDependency { resource: String, dependency: String },

    #[error("Resource {resource} reads {field} from {dependency}, which has no such output")]
    UnknownOutput {
        resource: String,
        dependency: String,
        field: String,
    },
}

/// One side of a binary operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(f64),
    /// A named output of an earlier resource in the same topology.
    Output {
        resource: String,
        field: &'static str,
    },
}

impl Operand {
    pub fn output(resource: impl Into<String>, field: &'static str) -> Self {
        Operand::Output {
            resource: resource.into(),
            field,
        }
    }

    pub fn dependency(&self) -> Option<&str> {
        match self {
            Operand::Literal(_) => None,
            Operand::Output { resource, .. } => Some(resource),
        }
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Literal(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    pub kind: OperatorKind,
    pub name: String,
    pub left: Operand,
    pub right: Operand,
}

impl ResourceDescriptor {
    pub fn new(
        kind: OperatorKind,
        name: impl Into<String>,
        left: impl Into<Operand>,
        right: impl Into<Operand>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            left: left.into(),
            right: right.into(),
        }
    }

    /// Names of the resources this one consumes, deduplicated.
    pub fn dependencies(&self) -> Vec<&str> {
        let mut deps: Vec<&str> = [&self.left, &self.right]
            .into_iter()
            .filter_map(Operand::dependency)
            .collect();
        deps.dedup();
        deps
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Topology {
    pub resources: Vec<ResourceDescriptor>,
}

impl Topology {
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.resources.iter().map(|r| r.name.as_str()).collect()
    }

    /// Every `(dependency, dependent)` edge.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.resources
            .iter()
            .flat_map(|r| {
                r.dependencies()
                    .into_iter()
                    .map(move |dep| (dep, r.name.as_str()))
            })
            .collect()
    }

    /// Computes every resource's outputs the way the providers would.
    ///
    /// Operands may only read fields their dependency's kind produces.
    pub fn evaluate(&self) -> Result<BTreeMap<String, PropertyMap>, TopologyError> {
        let mut outputs: BTreeMap<String, (OperatorKind, PropertyMap)> = BTreeMap::new();
        for resource in &self.resources {
            let resolve = |operand: &Operand| -> Result<f64, TopologyError> {
                match operand {
                    Operand::Literal(value) => Ok(*value),
                    Operand::Output {
                        resource: dependency,
                        field,
                    } => {
                        let (kind, outs) = outputs.get(dependency).ok_or_else(|| {
                            TopologyError::UnknownDependency {
                                resource: resource.name.clone(),
                                dependency: dependency.clone(),
                            }
                        })?;
                        if !kind.output_fields().contains(field) {
                            return Err(TopologyError::UnknownOutput {
                                resource: resource.name.clone(),
                                dependency: dependency.clone(),
                                field: field.to_string(),
                            });
                        }
                        Ok(number(outs, field))
                    }
                }
            };
            let left = resolve(&resource.left)?;
            let right = resolve(&resource.right)?;
            let outs = resource.kind.op()(left, right);
            outputs.insert(resource.name.clone(), (resource.kind, outs));
        }
        Ok(outputs
            .into_iter()
            .map(|(name, (_, outs))| (name, outs))
            .collect())
    }
}

/// Largest loop count a branch accepts.
pub const MAX_COUNT: usize = 1_000_000;

/// How many times a loop bounded by `count` runs. Fractions round up; anything that is
/// not positive (NaN included) runs zero times. Capped at [`MAX_COUNT`].
pub fn iterations(count: f64) -> usize {
    if count > 0.0 {
        (count.ceil() as usize).min(MAX_COUNT)
    } else {
        0
    }
}

/// `x` independent chains `Add(i, 2) -> Div(sum, 3) -> Mul(quotient, quotient)`.
pub fn fan_out_groups(x: f64) -> Topology {
    let mut resources = Vec::new();
    for i in 0..iterations(x) {
        let add = format!("{i} + 2");
        let div = format!("({i} + 2) / 3");
        resources.push(ResourceDescriptor::new(OperatorKind::Add, &add, i as f64, 2.0));
        resources.push(ResourceDescriptor::new(
            OperatorKind::Div,
            &div,
            Operand::output(&add, "sum"),
            3.0,
        ));
        resources.push(ResourceDescriptor::new(
            OperatorKind::Mul,
            format!("{i}-result"),
            Operand::output(&div, "quotient"),
            Operand::output(&div, "quotient"),
        ));
    }
    Topology { resources }
}

/// A chain of `y` `Add`s, each adding `y` to the previous sum, starting from 0.
pub fn sequential_chain(y: f64) -> Topology {
    let mut resources: Vec<ResourceDescriptor> = Vec::new();
    for i in 0..iterations(y) {
        let left = match resources.last() {
            Some(prev) => Operand::output(&prev.name, "sum"),
            None => Operand::Literal(0.0),
        };
        resources.push(ResourceDescriptor::new(
            OperatorKind::Add,
            format!("y-step-{i}"),
            left,
            y,
        ));
    }
    Topology { resources }
}

pub const SQUARE_NAME: &str = "z^2";

pub fn square(z: f64) -> Topology {
    Topology {
        resources: vec![ResourceDescriptor::new(OperatorKind::Mul, SQUARE_NAME, z, z)],
    }
}

pub fn exact_resource_name(index: usize) -> String {
    format!("exact-resource-{index:04}")
}

/// `count` independent `Add(i, 0)`s.
pub fn exact_set(count: f64) -> Topology {
    let resources = (0..iterations(count))
        .map(|i| {
            ResourceDescriptor::new(OperatorKind::Add, exact_resource_name(i), i as f64, 0.0)
        })
        .collect();
    Topology { resources }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_out_groups_shape() {
        let topology = fan_out_groups(2.0);
        assert_eq!(
            topology.names(),
            vec!["0 + 2", "(0 + 2) / 3", "0-result", "1 + 2", "(1 + 2) / 3", "1-result"]
        );
        assert_eq!(
            topology.edges(),
            vec![
                ("0 + 2", "(0 + 2) / 3"),
                ("(0 + 2) / 3", "0-result"),
                ("1 + 2", "(1 + 2) / 3"),
                ("(1 + 2) / 3", "1-result"),
            ]
        );
    }

    #[test]
    fn test_fan_out_products() {
        let x = 12;
        let outputs = fan_out_groups(x as f64).evaluate().unwrap();
        for i in 0..x {
            let expected = ((i + 2) / 3) as f64;
            let product = number(&outputs[&format!("{i}-result")], "product");
            assert_eq!(product, expected * expected, "chain {i}");
        }
    }

    #[test]
    fn test_sequential_chain_accumulates() {
        let topology = sequential_chain(4.0);
        assert_eq!(topology.resources[0].left, Operand::Literal(0.0));
        assert_eq!(topology.edges().len(), 3);

        let outputs = topology.evaluate().unwrap();
        let sums: Vec<f64> = topology
            .names()
            .iter()
            .map(|name| number(&outputs[*name], "sum"))
            .collect();
        assert_eq!(sums, vec![4.0, 8.0, 12.0, 16.0]);
    }

    #[test]
    fn test_square() {
        let outputs = square(7.0).evaluate().unwrap();
        assert_eq!(number(&outputs[SQUARE_NAME], "product"), 49.0);
    }

    #[test]
    fn test_exact_set_names_are_padded_and_independent() {
        let topology = exact_set(3.0);
        assert_eq!(
            topology.names(),
            vec!["exact-resource-0000", "exact-resource-0001", "exact-resource-0002"]
        );
        assert!(topology.edges().is_empty());
        assert_eq!(exact_resource_name(12345), "exact-resource-12345");
    }

    #[test]
    fn test_iterations() {
        assert_eq!(iterations(0.0), 0);
        assert_eq!(iterations(-3.0), 0);
        assert_eq!(iterations(f64::NAN), 0);
        assert_eq!(iterations(2.5), 3);
        assert_eq!(iterations(3.0), 3);
        assert!(fan_out_groups(0.0).is_empty());
        assert_eq!(iterations(1e19), MAX_COUNT);
    }

    #[test]
    fn test_evaluate_rejects_field_the_kind_does_not_produce() {
        let topology = Topology {
            resources: vec![
                ResourceDescriptor::new(OperatorKind::Add, "a", 1.0, 2.0),
                ResourceDescriptor::new(OperatorKind::Mul, "b", Operand::output("a", "product"), 2.0),
            ],
        };
        assert_eq!(
            topology.evaluate(),
            Err(TopologyError::UnknownOutput {
                resource: "b".into(),
                dependency: "a".into(),
                field: "product".into(),
            })
        );
    }

    #[test]
    fn test_evaluate_rejects_forward_reference() {
        let topology = Topology {
            resources: vec![ResourceDescriptor::new(
                OperatorKind::Add,
                "a",
                Operand::output("b", "sum"),
                1.0,
            )],
        };
        assert_eq!(
            topology.evaluate(),
            Err(TopologyError::UnknownDependency {
                resource: "a".into(),
                dependency: "b".into(),
            })
        );
    }
}
