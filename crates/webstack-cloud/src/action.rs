//! Provisioning plans
//!
//! A plan is the ordered list of actions the provisioning engine will perform
//! for a stack. It is computed here only to display and test the ordering; the
//! engine computes and executes its own.

use crate::error::Result;
use crate::logical_id::LogicalId;
use crate::stack::Stack;
use serde::{Deserialize, Serialize};

/// Represents a planned action for a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Position in the plan, starting at 1
    pub step: usize,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Resource type (e.g., "AWS::EC2::VPC")
    pub resource_type: String,

    /// Logical ID of the resource
    pub resource_id: LogicalId,

    /// Resources this action waits for (creation) or that must be gone first (teardown)
    pub waits_for: Vec<LogicalId>,
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Delete a resource
    Delete,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Delete => write!(f, "delete"),
        }
    }
}

/// Plan containing all actions in execution order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Stack the plan belongs to
    pub stack: String,

    /// List of actions to perform
    pub actions: Vec<Action>,
}

impl Plan {
    /// Create every resource, dependencies first
    pub fn creation(stack: &Stack) -> Result<Self> {
        let graph = stack.dependency_graph()?;
        let order = graph.creation_order()?;
        Ok(Self::build(stack, order, ActionType::Create, |id| {
            graph.dependencies_of(id).cloned().collect()
        }))
    }

    /// Delete every resource, dependents first
    pub fn teardown(stack: &Stack) -> Result<Self> {
        let graph = stack.dependency_graph()?;
        let order = graph.teardown_order()?;
        Ok(Self::build(stack, order, ActionType::Delete, |id| {
            graph.dependents_of(id).cloned().collect()
        }))
    }

    fn build(
        stack: &Stack,
        order: Vec<LogicalId>,
        action_type: ActionType,
        waits_for: impl Fn(&LogicalId) -> Vec<LogicalId>,
    ) -> Self {
        let actions = order
            .into_iter()
            .enumerate()
            .map(|(i, id)| Action {
                step: i + 1,
                action_type,
                resource_type: stack
                    .resource(&id)
                    .map(|r| r.resource_type.clone())
                    .unwrap_or_default(),
                waits_for: waits_for(&id),
                resource_id: id,
            })
            .collect();

        Self {
            stack: stack.name().to_string(),
            actions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Step number of the action on `id`
    pub fn position(&self, id: &LogicalId) -> Option<usize> {
        self.actions
            .iter()
            .find(|a| &a.resource_id == id)
            .map(|a| a.step)
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub delete: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to create, {} to delete", self.create, self.delete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intrinsic;
    use crate::resource::Resource;

    fn id(s: &str) -> LogicalId {
        LogicalId::new(s).unwrap()
    }

    fn stack() -> Stack {
        let mut stack = Stack::new("TestStack");
        stack
            .add_resource(Resource::new(id("Vpc"), "AWS::EC2::VPC"))
            .unwrap();
        stack
            .add_resource(
                Resource::new(id("Subnet"), "AWS::EC2::Subnet")
                    .with_property("VpcId", intrinsic::reference(&id("Vpc"))),
            )
            .unwrap();
        stack
    }

    #[test]
    fn test_creation_plan() {
        let plan = Plan::creation(&stack()).unwrap();
        assert_eq!(plan.stack, "TestStack");
        assert_eq!(plan.summary(), PlanSummary { create: 2, delete: 0 });
        assert_eq!(plan.position(&id("Vpc")), Some(1));
        assert_eq!(plan.position(&id("Subnet")), Some(2));
        assert_eq!(plan.actions[1].resource_type, "AWS::EC2::Subnet");
        assert_eq!(plan.actions[1].waits_for, vec![id("Vpc")]);
    }

    #[test]
    fn test_teardown_plan() {
        let plan = Plan::teardown(&stack()).unwrap();
        assert_eq!(plan.summary().to_string(), "0 to create, 2 to delete");
        assert_eq!(plan.position(&id("Subnet")), Some(1));
        assert_eq!(plan.position(&id("Vpc")), Some(2));
        assert_eq!(plan.actions[1].waits_for, vec![id("Subnet")]);
    }

    #[test]
    fn test_empty_plan() {
        let plan = Plan::creation(&Stack::new("Empty")).unwrap();
        assert!(plan.is_empty());
    }
}
