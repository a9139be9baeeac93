//! Intrinsic functions
//!
//! Helpers that build CloudFormation intrinsic function values, and the
//! reverse direction: finding which logical IDs a property value refers to.

use crate::logical_id::LogicalId;
use serde_json::{Value, json};
use std::collections::BTreeSet;

/// Pseudo parameters resolved by the provisioning engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pseudo {
    AccountId,
    Partition,
    Region,
    StackId,
    StackName,
    UrlSuffix,
    NoValue,
}

impl Pseudo {
    pub fn name(&self) -> &'static str {
        match self {
            Pseudo::AccountId => "AWS::AccountId",
            Pseudo::Partition => "AWS::Partition",
            Pseudo::Region => "AWS::Region",
            Pseudo::StackId => "AWS::StackId",
            Pseudo::StackName => "AWS::StackName",
            Pseudo::UrlSuffix => "AWS::URLSuffix",
            Pseudo::NoValue => "AWS::NoValue",
        }
    }
}

/// `{"Ref": id}`
pub fn reference(id: &LogicalId) -> Value {
    json!({ "Ref": id.as_str() })
}

/// `{"Ref": "AWS::..."}`
pub fn pseudo(param: Pseudo) -> Value {
    json!({ "Ref": param.name() })
}

/// `{"Fn::GetAtt": [id, attribute]}`
pub fn get_att(id: &LogicalId, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [id.as_str(), attribute] })
}

pub fn base64(value: impl Into<Value>) -> Value {
    json!({ "Fn::Base64": value.into() })
}

pub fn select(index: usize, list: Value) -> Value {
    json!({ "Fn::Select": [index, list] })
}

/// Availability zones of the deployment region (`""` means the stack's own region)
pub fn get_azs() -> Value {
    json!({ "Fn::GetAZs": "" })
}

pub fn join(delimiter: &str, parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": [delimiter, parts] })
}

/// Logical IDs referenced by `value` through `Ref` or `Fn::GetAtt`.
///
/// Pseudo parameters (`AWS::*`) are not included. Parameter references are,
/// callers decide whether a target is a resource.
pub fn references(value: &Value) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    collect_references(value, &mut found);
    found
}

fn collect_references(value: &Value, found: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(target)) = map.get("Ref") {
                    if !target.starts_with("AWS::") {
                        found.insert(target.clone());
                    }
                    return;
                }
                if let Some(att) = map.get("Fn::GetAtt") {
                    match att {
                        Value::Array(parts) => {
                            if let Some(Value::String(target)) = parts.first() {
                                found.insert(target.clone());
                            }
                        }
                        // Short form "Resource.Attribute"
                        Value::String(dotted) => {
                            if let Some((target, _)) = dotted.split_once('.') {
                                found.insert(target.to_string());
                            }
                        }
                        _ => {}
                    }
                    return;
                }
            }
            for v in map.values() {
                collect_references(v, found);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect_references(v, found);
            }
        }
        _ => {}
    }
}
