//! Resource, parameter and output descriptors, and the construct trait

use crate::error::CloudError;
use crate::intrinsic;
use crate::logical_id::LogicalId;
use crate::stack::Stack;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// A reusable piece of a stack that expands into one or more resources
///
/// All resource groups (VPC, security group, instance, ...) implement this
/// trait so a stack definition can add them uniformly.
pub trait Construct {
    /// Error raised by this construct's own validation
    type Error: From<CloudError>;

    /// Construct ID, unique among its siblings in the stack
    fn node_id(&self) -> &str;

    /// Emit the construct's resources, parameters and outputs into `stack`
    fn synthesize(&self, stack: &mut Stack) -> Result<(), Self::Error>;
}

/// Declaration of a single template resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Logical ID within the template
    pub logical_id: LogicalId,

    /// Resource type (e.g., "AWS::EC2::VPC")
    pub resource_type: String,

    /// Resource-specific properties
    pub properties: Map<String, Value>,

    /// Explicit dependencies, on top of the ones implied by references
    pub depends_on: BTreeSet<LogicalId>,

    /// Whether stack-level tags are merged into this resource's `Tags`
    pub taggable: bool,
}

impl Resource {
    pub fn new(logical_id: LogicalId, resource_type: impl Into<String>) -> Self {
        Self {
            logical_id,
            resource_type: resource_type.into(),
            properties: Map::new(),
            depends_on: BTreeSet::new(),
            taggable: false,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn depends_on(mut self, id: &LogicalId) -> Self {
        self.depends_on.insert(id.clone());
        self
    }

    pub fn taggable(mut self) -> Self {
        self.taggable = true;
        self
    }

    /// Get a property value as a specific type
    pub fn get_property<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.properties
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Logical IDs this resource refers to through its properties
    pub fn references(&self) -> BTreeSet<String> {
        self.properties
            .values()
            .flat_map(intrinsic::references)
            .collect()
    }
}

/// Key/value tag as it appears in a `Tags` property
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Template parameter, resolved by the engine at deploy time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub logical_id: LogicalId,

    /// Parameter type (e.g., "String", "AWS::SSM::Parameter::Value<...>")
    pub parameter_type: String,

    pub default: Option<Value>,

    pub description: Option<String>,
}

impl Parameter {
    pub fn new(logical_id: LogicalId, parameter_type: impl Into<String>) -> Self {
        Self {
            logical_id,
            parameter_type: parameter_type.into(),
            default: None,
            description: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Named value surfaced by the engine after deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub logical_id: LogicalId,

    pub value: Value,

    pub description: Option<String>,

    /// Cross-stack export name
    pub export_name: Option<String>,
}

impl Output {
    pub fn new(logical_id: LogicalId, value: Value) -> Self {
        Self {
            logical_id,
            value,
            description: None,
            export_name: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_export_name(mut self, name: impl Into<String>) -> Self {
        self.export_name = Some(name.into());
        self
    }
}
