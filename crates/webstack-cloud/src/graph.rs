//! Resource dependency graph
//!
//! Nodes are resource logical IDs. An edge `a -> b` means `a` depends on `b`
//! and must be created after it (and destroyed before it). Edges come from
//! explicit `DependsOn` declarations and from `Ref` / `Fn::GetAtt` inside
//! resource properties.

use crate::error::{CloudError, Result};
use crate::logical_id::LogicalId;
use crate::stack::Stack;
use std::collections::{BTreeMap, BTreeSet};

/// Explicit dependency graph of a stack's resources
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// node -> nodes it depends on
    dependencies: BTreeMap<LogicalId, BTreeSet<LogicalId>>,
    /// node -> nodes that depend on it
    dependents: BTreeMap<LogicalId, BTreeSet<LogicalId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph of `stack`, checking that every reference resolves.
    ///
    /// References to template parameters are valid but do not create edges.
    /// Output values are checked the same way; outputs are not graph nodes.
    pub fn from_stack(stack: &Stack) -> Result<Self> {
        let mut graph = Self::new();

        for id in stack.resources().keys() {
            graph.add_node(id.clone());
        }

        for (id, resource) in stack.resources() {
            for target in &resource.depends_on {
                if !stack.resources().contains_key(target) {
                    return Err(CloudError::UnknownReference {
                        from: id.to_string(),
                        to: target.to_string(),
                    });
                }
                graph.add_edge(id.clone(), target.clone());
            }

            for target in resource.references() {
                let target = Self::resolve(stack, id, &target)?;
                if let Some(target) = target {
                    graph.add_edge(id.clone(), target);
                }
            }
        }

        for (id, output) in stack.outputs() {
            for target in crate::intrinsic::references(&output.value) {
                Self::resolve(stack, id, &target)?;
            }
        }

        tracing::debug!(
            "Built dependency graph: {} resources, {} edges",
            graph.len(),
            graph.edge_count()
        );
        Ok(graph)
    }

    /// Map a referenced name to a resource node, `None` for parameters
    fn resolve(stack: &Stack, from: &LogicalId, target: &str) -> Result<Option<LogicalId>> {
        let unknown = || CloudError::UnknownReference {
            from: from.to_string(),
            to: target.to_string(),
        };
        let target = LogicalId::new(target).map_err(|_| unknown())?;

        if stack.resources().contains_key(&target) {
            Ok(Some(target))
        } else if stack.parameters().contains_key(&target) {
            Ok(None)
        } else {
            Err(unknown())
        }
    }

    pub fn add_node(&mut self, id: LogicalId) {
        self.dependencies.entry(id.clone()).or_default();
        self.dependents.entry(id).or_default();
    }

    /// Record that `from` depends on `to`
    pub fn add_edge(&mut self, from: LogicalId, to: LogicalId) {
        self.add_node(from.clone());
        self.add_node(to.clone());
        self.dependencies.entry(from.clone()).or_default().insert(to.clone());
        self.dependents.entry(to).or_default().insert(from);
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.dependencies.values().map(BTreeSet::len).sum()
    }

    /// Direct dependencies of `id`
    pub fn dependencies_of(&self, id: &LogicalId) -> impl Iterator<Item = &LogicalId> {
        self.dependencies.get(id).into_iter().flatten()
    }

    /// Resources that directly depend on `id`
    pub fn dependents_of(&self, id: &LogicalId) -> impl Iterator<Item = &LogicalId> {
        self.dependents.get(id).into_iter().flatten()
    }

    /// Whether `from` depends on `to`, directly or transitively
    pub fn depends_on(&self, from: &LogicalId, to: &LogicalId) -> bool {
        let mut stack: Vec<&LogicalId> = self.dependencies_of(from).collect();
        let mut seen = BTreeSet::new();
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if seen.insert(id) {
                stack.extend(self.dependencies_of(id));
            }
        }
        false
    }

    /// Resources in creation order (dependencies first).
    ///
    /// Kahn's algorithm; among resources that are ready at the same time the
    /// lexically smallest ID goes first, so the order is deterministic.
    pub fn creation_order(&self) -> Result<Vec<LogicalId>> {
        let mut remaining: BTreeMap<&LogicalId, usize> = self
            .dependencies
            .iter()
            .map(|(id, deps)| (id, deps.len()))
            .collect();

        let mut ready: BTreeSet<&LogicalId> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut order = Vec::with_capacity(self.len());
        while let Some(id) = ready.pop_first() {
            remaining.remove(id);
            order.push(id.clone());

            for dependent in self.dependents_of(id) {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if !remaining.is_empty() {
            let cycle: Vec<String> = remaining.keys().map(|id| id.to_string()).collect();
            return Err(CloudError::CircularDependency(cycle));
        }

        Ok(order)
    }

    /// Resources in teardown order (dependents first)
    pub fn teardown_order(&self) -> Result<Vec<LogicalId>> {
        let mut order = self.creation_order()?;
        order.reverse();
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intrinsic;
    use crate::resource::{Output, Parameter, Resource};

    fn id(s: &str) -> LogicalId {
        LogicalId::new(s).unwrap()
    }

    fn sample_stack() -> Stack {
        let mut stack = Stack::new("TestStack");
        stack
            .add_resource(Resource::new(id("Vpc"), "AWS::EC2::VPC"))
            .unwrap();
        stack
            .add_resource(
                Resource::new(id("Sg"), "AWS::EC2::SecurityGroup")
                    .with_property("VpcId", intrinsic::reference(&id("Vpc"))),
            )
            .unwrap();
        stack
            .add_resource(Resource::new(id("Role"), "AWS::IAM::Role"))
            .unwrap();
        stack
            .add_resource(
                Resource::new(id("Instance"), "AWS::EC2::Instance")
                    .with_property(
                        "SecurityGroupIds",
                        serde_json::json!([intrinsic::get_att(&id("Sg"), "GroupId")]),
                    )
                    .depends_on(&id("Role")),
            )
            .unwrap();
        stack
    }

    #[test]
    fn test_creation_order_respects_edges() {
        let graph = DependencyGraph::from_stack(&sample_stack()).unwrap();
        let order = graph.creation_order().unwrap();
        let pos = |s: &str| order.iter().position(|x| x.as_str() == s).unwrap();

        assert_eq!(order.len(), 4);
        assert!(pos("Vpc") < pos("Sg"));
        assert!(pos("Sg") < pos("Instance"));
        assert!(pos("Role") < pos("Instance"));
    }

    #[test]
    fn test_creation_order_is_deterministic() {
        let graph = DependencyGraph::from_stack(&sample_stack()).unwrap();
        let order: Vec<String> = graph
            .creation_order()
            .unwrap()
            .iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(order, vec!["Role", "Vpc", "Sg", "Instance"]);
    }

    #[test]
    fn test_teardown_is_reverse_of_creation() {
        let graph = DependencyGraph::from_stack(&sample_stack()).unwrap();
        let mut creation = graph.creation_order().unwrap();
        creation.reverse();
        assert_eq!(graph.teardown_order().unwrap(), creation);
    }

    #[test]
    fn test_transitive_dependency() {
        let graph = DependencyGraph::from_stack(&sample_stack()).unwrap();
        assert!(graph.depends_on(&id("Instance"), &id("Vpc")));
        assert!(!graph.depends_on(&id("Vpc"), &id("Instance")));
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(id("A"), id("B"));
        graph.add_edge(id("B"), id("C"));
        graph.add_edge(id("C"), id("A"));
        graph.add_node(id("Free"));

        match graph.creation_order() {
            Err(CloudError::CircularDependency(nodes)) => {
                assert_eq!(nodes, vec!["A", "B", "C"]);
            }
            other => panic!("expected CircularDependency, got {:?}", other),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let mut stack = Stack::new("TestStack");
        stack
            .add_resource(Resource::new(id("Loop"), "AWS::EC2::VPC").depends_on(&id("Loop")))
            .unwrap();
        let graph = DependencyGraph::from_stack(&stack).unwrap();
        assert!(graph.creation_order().is_err());
    }

    #[test]
    fn test_unknown_reference_is_rejected() {
        let mut stack = Stack::new("TestStack");
        stack
            .add_resource(
                Resource::new(id("Sg"), "AWS::EC2::SecurityGroup")
                    .with_property("VpcId", intrinsic::reference(&id("Missing"))),
            )
            .unwrap();

        let err = DependencyGraph::from_stack(&stack).unwrap_err();
        assert!(matches!(
            err,
            CloudError::UnknownReference { ref from, ref to } if from == "Sg" && to == "Missing"
        ));
    }

    #[test]
    fn test_parameter_reference_is_not_an_edge() {
        let mut stack = Stack::new("TestStack");
        stack
            .add_parameter(Parameter::new(id("ImageId"), "String"))
            .unwrap();
        stack
            .add_resource(
                Resource::new(id("Instance"), "AWS::EC2::Instance")
                    .with_property("ImageId", intrinsic::reference(&id("ImageId"))),
            )
            .unwrap();

        let graph = DependencyGraph::from_stack(&stack).unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_output_reference_is_checked() {
        let mut stack = Stack::new("TestStack");
        stack
            .add_output(Output::new(
                id("PublicIp"),
                intrinsic::get_att(&id("Instance"), "PublicIp"),
            ))
            .unwrap();
        assert!(DependencyGraph::from_stack(&stack).is_err());
    }
}
