//! IAM roles and instance profiles

use crate::error::{AwsError, Result};
use serde_json::{Value, json};
use webstack_cloud::intrinsic::{self, Pseudo};
use webstack_cloud::{Construct, LogicalId, Resource, Stack};

/// Service allowed to assume a role, e.g. `ec2.amazonaws.com`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePrincipal(String);

impl ServicePrincipal {
    pub fn new(service: impl Into<String>) -> Self {
        Self(service.into())
    }

    pub fn ec2() -> Self {
        Self::new("ec2.amazonaws.com")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Reference to a managed policy by ARN
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedPolicy {
    arn: Value,
}

impl ManagedPolicy {
    /// AWS-managed policy; the ARN is resolved against the stack's partition
    pub fn from_aws_managed_policy_name(name: &str) -> Self {
        Self {
            arn: intrinsic::join(
                "",
                vec![
                    json!("arn:"),
                    intrinsic::pseudo(Pseudo::Partition),
                    json!(format!(":iam::aws:policy/{}", name)),
                ],
            ),
        }
    }

    pub fn from_arn(arn: impl Into<String>) -> Self {
        Self {
            arn: Value::String(arn.into()),
        }
    }

    pub fn arn(&self) -> &Value {
        &self.arn
    }
}

/// Identity assumed by a service principal
#[derive(Debug, Clone)]
pub struct Role {
    node_path: Vec<String>,
    logical_id: LogicalId,
    assumed_by: ServicePrincipal,
    managed_policies: Vec<ManagedPolicy>,
    tags: Vec<(String, String)>,
}

impl Role {
    /// `path` is the construct path, e.g. `["WebServerInstance", "InstanceRole"]`
    pub fn new<S: AsRef<str>>(path: &[S], assumed_by: ServicePrincipal) -> Self {
        let node_path: Vec<String> = path.iter().map(|p| p.as_ref().to_string()).collect();
        Self {
            logical_id: LogicalId::from_path(&node_path),
            node_path,
            assumed_by,
            managed_policies: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn add_managed_policy(&mut self, policy: ManagedPolicy) {
        if !self.managed_policies.contains(&policy) {
            self.managed_policies.push(policy);
        }
    }

    pub fn managed_policies(&self) -> &[ManagedPolicy] {
        &self.managed_policies
    }

    pub(crate) fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.push((key.into(), value.into()));
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    /// `{"Ref": <role>}`, the role name
    pub fn role_name(&self) -> Value {
        intrinsic::reference(&self.logical_id)
    }

    pub fn arn(&self) -> Value {
        intrinsic::get_att(&self.logical_id, "Arn")
    }

    fn assume_role_policy(&self) -> Value {
        json!({
            "Statement": [{
                "Action": "sts:AssumeRole",
                "Effect": "Allow",
                "Principal": { "Service": self.assumed_by.as_str() }
            }],
            "Version": "2012-10-17"
        })
    }
}

impl Construct for Role {
    type Error = AwsError;

    fn node_id(&self) -> &str {
        self.node_path.last().map(String::as_str).unwrap_or_default()
    }

    fn synthesize(&self, stack: &mut Stack) -> Result<()> {
        let mut resource = Resource::new(self.logical_id.clone(), "AWS::IAM::Role")
            .with_property("AssumeRolePolicyDocument", self.assume_role_policy())
            .taggable();

        if !self.managed_policies.is_empty() {
            resource.set_property(
                "ManagedPolicyArns",
                Value::Array(self.managed_policies.iter().map(|p| p.arn().clone()).collect()),
            );
        }
        if !self.tags.is_empty() {
            resource.set_property(
                "Tags",
                Value::Array(
                    self.tags
                        .iter()
                        .map(|(k, v)| json!({ "Key": k, "Value": v }))
                        .collect(),
                ),
            );
        }

        stack.add_resource(resource)?;
        Ok(())
    }
}

/// Container that passes a role to EC2 instances
#[derive(Debug, Clone)]
pub struct InstanceProfile {
    node_path: Vec<String>,
    logical_id: LogicalId,
    role: LogicalId,
}

impl InstanceProfile {
    pub fn new<S: AsRef<str>>(path: &[S], role: &Role) -> Self {
        let node_path: Vec<String> = path.iter().map(|p| p.as_ref().to_string()).collect();
        Self {
            logical_id: LogicalId::from_path(&node_path),
            node_path,
            role: role.logical_id().clone(),
        }
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    /// `{"Ref": <profile>}`, the profile name
    pub fn profile_name(&self) -> Value {
        intrinsic::reference(&self.logical_id)
    }
}

impl Construct for InstanceProfile {
    type Error = AwsError;

    fn node_id(&self) -> &str {
        self.node_path.last().map(String::as_str).unwrap_or_default()
    }

    fn synthesize(&self, stack: &mut Stack) -> Result<()> {
        stack.add_resource(
            Resource::new(self.logical_id.clone(), "AWS::IAM::InstanceProfile")
                .with_property("Roles", json!([intrinsic::reference(&self.role)])),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aws_managed_policy_arn() {
        let policy = ManagedPolicy::from_aws_managed_policy_name("AmazonSSMManagedInstanceCore");
        assert_eq!(
            policy.arn(),
            &json!({"Fn::Join": ["", [
                "arn:",
                {"Ref": "AWS::Partition"},
                ":iam::aws:policy/AmazonSSMManagedInstanceCore"
            ]]})
        );
    }

    #[test]
    fn test_role_and_profile() {
        let mut role = Role::new(&["Server", "InstanceRole"], ServicePrincipal::ec2());
        role.add_managed_policy(ManagedPolicy::from_arn("arn:aws:iam::aws:policy/ReadOnlyAccess"));
        role.add_managed_policy(ManagedPolicy::from_arn("arn:aws:iam::aws:policy/ReadOnlyAccess"));
        let profile = InstanceProfile::new(&["Server", "InstanceProfile"], &role);

        let mut stack = Stack::new("TestStack");
        stack.add(&role).unwrap();
        stack.add(&profile).unwrap();

        let role_resource = stack.resource(role.logical_id()).unwrap();
        assert_eq!(
            role_resource.properties["AssumeRolePolicyDocument"]["Statement"][0]["Principal"],
            json!({"Service": "ec2.amazonaws.com"})
        );
        assert_eq!(
            role_resource.properties["ManagedPolicyArns"],
            json!(["arn:aws:iam::aws:policy/ReadOnlyAccess"])
        );

        let profile_resource = stack.resource(profile.logical_id()).unwrap();
        assert_eq!(profile_resource.properties["Roles"], json!([role.role_name()]));

        let graph = stack.dependency_graph().unwrap();
        assert!(graph.depends_on(profile.logical_id(), role.logical_id()));
    }

    #[test]
    fn test_role_without_policies_omits_property() {
        let role = Role::new(&["Lonely"], ServicePrincipal::new("lambda.amazonaws.com"));
        let mut stack = Stack::new("TestStack");
        stack.add(&role).unwrap();
        assert_eq!(role.logical_id().as_str(), "Lonely");
        assert!(
            !stack
                .resource(role.logical_id())
                .unwrap()
                .properties
                .contains_key("ManagedPolicyArns")
        );
    }
}
