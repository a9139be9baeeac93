//! Stack: an atomically deployed collection of resource declarations

use crate::app::Environment;
use crate::error::{CloudError, Result};
use crate::graph::DependencyGraph;
use crate::logical_id::LogicalId;
use crate::resource::{Construct, Output, Parameter, Resource, Tag};
use crate::template::Template;
use std::collections::BTreeMap;

/// Longest stack name CloudFormation accepts
pub const MAX_STACK_NAME_LEN: usize = 128;

/// Check a stack name against CloudFormation's naming rule
///
/// The name doubles as the template file name in the cloud assembly, so
/// anything outside `[A-Za-z][A-Za-z0-9-]*` is rejected.
pub fn validate_stack_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
        && name.len() <= MAX_STACK_NAME_LEN;
    if !valid {
        return Err(CloudError::InvalidStackName(name.to_string()));
    }
    Ok(())
}

/// In-memory declaration of one stack
///
/// Resources and parameters share one logical-ID namespace; outputs have their
/// own. Nothing is validated against a provider here, only the structure of the
/// declaration (unique IDs, resolvable references, no cycles).
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    description: Option<String>,
    environment: Environment,
    resources: BTreeMap<LogicalId, Resource>,
    parameters: BTreeMap<LogicalId, Parameter>,
    outputs: BTreeMap<LogicalId, Output>,
    tags: Vec<Tag>,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            environment: Environment::default(),
            resources: BTreeMap::new(),
            parameters: BTreeMap::new(),
            outputs: BTreeMap::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Add a construct and everything it expands into
    pub fn add<C: Construct>(&mut self, construct: &C) -> std::result::Result<(), C::Error> {
        tracing::debug!("Synthesizing construct {} into {}", construct.node_id(), self.name);
        construct.synthesize(self)
    }

    pub fn add_resource(&mut self, resource: Resource) -> Result<()> {
        self.ensure_free(&resource.logical_id)?;
        tracing::trace!(
            "Declared {} ({})",
            resource.logical_id,
            resource.resource_type
        );
        self.resources.insert(resource.logical_id.clone(), resource);
        Ok(())
    }

    pub fn add_parameter(&mut self, parameter: Parameter) -> Result<()> {
        self.ensure_free(&parameter.logical_id)?;
        self.parameters
            .insert(parameter.logical_id.clone(), parameter);
        Ok(())
    }

    pub fn add_output(&mut self, output: Output) -> Result<()> {
        if self.outputs.contains_key(&output.logical_id) {
            return Err(CloudError::DuplicateLogicalId(output.logical_id.to_string()));
        }
        self.outputs.insert(output.logical_id.clone(), output);
        Ok(())
    }

    fn ensure_free(&self, id: &LogicalId) -> Result<()> {
        if self.resources.contains_key(id) || self.parameters.contains_key(id) {
            return Err(CloudError::DuplicateLogicalId(id.to_string()));
        }
        Ok(())
    }

    /// Declare that `from` must be created after `to`
    pub fn add_dependency(&mut self, from: &LogicalId, to: &LogicalId) -> Result<()> {
        if !self.resources.contains_key(to) {
            return Err(CloudError::UnknownReference {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        let resource = self
            .resources
            .get_mut(from)
            .ok_or_else(|| CloudError::UnknownReference {
                from: from.to_string(),
                to: to.to_string(),
            })?;
        resource.depends_on.insert(to.clone());
        Ok(())
    }

    /// Tag every taggable resource in the stack
    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let tag = Tag::new(key, value);
        self.tags.retain(|t| t.key != tag.key);
        self.tags.push(tag);
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn resource(&self, id: &LogicalId) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn resources(&self) -> &BTreeMap<LogicalId, Resource> {
        &self.resources
    }

    pub fn parameters(&self) -> &BTreeMap<LogicalId, Parameter> {
        &self.parameters
    }

    pub fn outputs(&self) -> &BTreeMap<LogicalId, Output> {
        &self.outputs
    }

    /// Get resources by type
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<&Resource> {
        self.resources
            .values()
            .filter(|r| r.resource_type == resource_type)
            .collect()
    }

    pub fn dependency_graph(&self) -> Result<DependencyGraph> {
        DependencyGraph::from_stack(self)
    }

    /// Check the declaration and render it to a template
    pub fn synthesize(&self) -> Result<Template> {
        let graph = self.dependency_graph()?;
        graph.creation_order()?;
        let template = Template::from_stack(self);
        tracing::debug!(
            "Synthesized {}: {} resources, {} parameters, {} outputs",
            self.name,
            self.resources.len(),
            self.parameters.len(),
            self.outputs.len()
        );
        Ok(template)
    }
}
