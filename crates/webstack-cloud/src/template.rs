//! Template rendering
//!
//! The template is the document the provisioning engine consumes. Field names
//! follow the CloudFormation JSON format.

use crate::resource::Tag;
use crate::stack::Stack;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const FORMAT_VERSION: &str = "2010-09-09";

/// Rendered stack template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,

    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(
        rename = "Parameters",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub parameters: BTreeMap<String, ParameterTemplate>,

    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, ResourceTemplate>,

    #[serde(rename = "Outputs", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, OutputTemplate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceTemplate {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(rename = "Properties", default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,

    #[serde(rename = "DependsOn", default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterTemplate {
    #[serde(rename = "Type")]
    pub parameter_type: String,

    #[serde(rename = "Default", skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputTemplate {
    #[serde(rename = "Value")]
    pub value: Value,

    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "Export", skip_serializing_if = "Option::is_none")]
    pub export: Option<OutputExport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputExport {
    #[serde(rename = "Name")]
    pub name: String,
}

impl Template {
    /// Render `stack` as is. Use [`Stack::synthesize`] to validate first.
    pub fn from_stack(stack: &Stack) -> Self {
        let resources = stack
            .resources()
            .iter()
            .map(|(id, resource)| {
                let mut properties = resource.properties.clone();
                if resource.taggable && !stack.tags().is_empty() {
                    merge_tags(&mut properties, stack.tags());
                }
                (
                    id.to_string(),
                    ResourceTemplate {
                        resource_type: resource.resource_type.clone(),
                        properties,
                        depends_on: resource.depends_on.iter().map(|d| d.to_string()).collect(),
                    },
                )
            })
            .collect();

        let parameters = stack
            .parameters()
            .iter()
            .map(|(id, p)| {
                (
                    id.to_string(),
                    ParameterTemplate {
                        parameter_type: p.parameter_type.clone(),
                        default: p.default.clone(),
                        description: p.description.clone(),
                    },
                )
            })
            .collect();

        let outputs = stack
            .outputs()
            .iter()
            .map(|(id, o)| {
                (
                    id.to_string(),
                    OutputTemplate {
                        value: o.value.clone(),
                        description: o.description.clone(),
                        export: o.export_name.clone().map(|name| OutputExport { name }),
                    },
                )
            })
            .collect();

        Self {
            format_version: FORMAT_VERSION.to_string(),
            description: stack.description().map(str::to_string),
            parameters,
            resources,
            outputs,
        }
    }

    /// Resources of the given type, keyed by logical ID
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<(&str, &ResourceTemplate)> {
        self.resources
            .iter()
            .filter(|(_, r)| r.resource_type == resource_type)
            .map(|(id, r)| (id.as_str(), r))
            .collect()
    }

    pub fn resource_count(&self, resource_type: &str) -> usize {
        self.resources_of_type(resource_type).len()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Merge stack tags into a `Tags` list. Tags already on the resource win;
/// the result is sorted by key.
fn merge_tags(properties: &mut Map<String, Value>, stack_tags: &[Tag]) {
    let mut tags: BTreeMap<String, Value> = BTreeMap::new();

    for tag in stack_tags {
        tags.insert(tag.key.clone(), Value::String(tag.value.clone()));
    }

    if let Some(Value::Array(existing)) = properties.get("Tags") {
        for entry in existing {
            if let (Some(Value::String(key)), Some(value)) = (entry.get("Key"), entry.get("Value"))
            {
                tags.insert(key.clone(), value.clone());
            }
        }
    }

    let merged: Vec<Value> = tags
        .into_iter()
        .map(|(key, value)| serde_json::json!({ "Key": key, "Value": value }))
        .collect();
    properties.insert("Tags".to_string(), Value::Array(merged));
}
