//! Security group construct
//!
//! Rules are rendered inline on the `AWS::EC2::SecurityGroup` resource.

use crate::ec2::port::{Peer, Port, Protocol};
use crate::ec2::vpc::Vpc;
use crate::error::Result;
use serde_json::{Map, Value, json};
use webstack_cloud::{Construct, LogicalId, Resource, Stack, intrinsic};

/// A single ingress or egress rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub peer: Peer,
    pub port: Port,
    pub description: String,
}

impl Rule {
    fn to_json(&self) -> Value {
        let mut rule = Map::new();
        rule.insert("CidrIp".into(), json!(self.peer.cidr().to_string()));
        rule.insert("Description".into(), json!(self.description));
        if let Some(from) = self.port.from_port() {
            rule.insert("FromPort".into(), json!(from));
        }
        rule.insert("IpProtocol".into(), json!(self.port.protocol.as_str()));
        if let Some(to) = self.port.to_port() {
            rule.insert("ToPort".into(), json!(to));
        }
        Value::Object(rule)
    }
}

/// Firewall attached to instances in a VPC
#[derive(Debug, Clone)]
pub struct SecurityGroup {
    node_id: String,
    logical_id: LogicalId,
    vpc_id: Value,
    description: Option<String>,
    allow_all_outbound: bool,
    ingress: Vec<Rule>,
}

impl SecurityGroup {
    pub fn new(node_id: impl Into<String>, vpc: &Vpc) -> Self {
        let node_id = node_id.into();
        Self {
            logical_id: LogicalId::from_path(&[node_id.as_str(), "Resource"]),
            node_id,
            vpc_id: vpc.vpc_id(),
            description: None,
            allow_all_outbound: true,
            ingress: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn allow_all_outbound(mut self, allow: bool) -> Self {
        self.allow_all_outbound = allow;
        self
    }

    /// Allow inbound traffic; the description defaults to `from <peer>:<port>`
    pub fn add_ingress_rule(&mut self, peer: Peer, port: Port, description: Option<&str>) {
        let description = description
            .map(str::to_string)
            .unwrap_or_else(|| format!("from {}:{}", peer, port));
        tracing::debug!("Ingress rule on {}: {}", self.node_id, description);
        self.ingress.push(Rule {
            peer,
            port,
            description,
        });
    }

    pub fn ingress_rules(&self) -> &[Rule] {
        &self.ingress
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    /// `{"Fn::GetAtt": [<sg>, "GroupId"]}`
    pub fn group_id(&self) -> Value {
        intrinsic::get_att(&self.logical_id, "GroupId")
    }

    fn egress_rules(&self) -> Vec<Value> {
        let rule = if self.allow_all_outbound {
            Rule {
                peer: Peer::AnyIpv4,
                port: Port::all_traffic(),
                description: "Allow all outbound traffic by default".to_string(),
            }
        } else {
            // Placeholder that matches nothing, replacing the implicit allow-all
            Rule {
                peer: Peer::ipv4_host([255, 255, 255, 255]),
                port: Port {
                    protocol: Protocol::Icmp,
                    range: Some((252, 86)),
                },
                description: "Disallow all traffic".to_string(),
            }
        };
        vec![rule.to_json()]
    }
}

impl Construct for SecurityGroup {
    type Error = crate::error::AwsError;

    fn node_id(&self) -> &str {
        &self.node_id
    }

    fn synthesize(&self, stack: &mut Stack) -> Result<()> {
        let description = self
            .description
            .clone()
            .unwrap_or_else(|| format!("{}/{}", stack.name(), self.node_id));

        let mut resource = Resource::new(self.logical_id.clone(), "AWS::EC2::SecurityGroup")
            .with_property("GroupDescription", description)
            .with_property("SecurityGroupEgress", Value::Array(self.egress_rules()))
            .with_property("VpcId", self.vpc_id.clone())
            .taggable();

        if !self.ingress.is_empty() {
            resource.set_property(
                "SecurityGroupIngress",
                Value::Array(self.ingress.iter().map(Rule::to_json).collect()),
            );
        }

        stack.add_resource(resource)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vpc() -> Vpc {
        Vpc::builder("Net").max_azs(1).build().unwrap()
    }

    #[test]
    fn test_ingress_rule_rendering() {
        let vpc = vpc();
        let mut sg = SecurityGroup::new("Sg", &vpc);
        sg.add_ingress_rule(Peer::any_ipv4(), Port::tcp(80), None);

        let mut stack = Stack::new("TestStack");
        stack.add(&vpc).unwrap();
        stack.add(&sg).unwrap();

        let resource = stack.resource(sg.logical_id()).unwrap();
        assert_eq!(
            resource.properties["SecurityGroupIngress"],
            json!([{
                "CidrIp": "0.0.0.0/0",
                "Description": "from 0.0.0.0/0:80",
                "FromPort": 80,
                "IpProtocol": "tcp",
                "ToPort": 80
            }])
        );
        assert_eq!(resource.properties["VpcId"], vpc.vpc_id());
        assert_eq!(resource.properties["GroupDescription"], json!("TestStack/Sg"));
    }

    #[test]
    fn test_default_egress_allows_all() {
        let sg = SecurityGroup::new("Sg", &vpc());
        assert_eq!(
            sg.egress_rules(),
            vec![json!({
                "CidrIp": "0.0.0.0/0",
                "Description": "Allow all outbound traffic by default",
                "IpProtocol": "-1"
            })]
        );
    }

    #[test]
    fn test_restricted_egress_placeholder() {
        let sg = SecurityGroup::new("Sg", &vpc()).allow_all_outbound(false);
        assert_eq!(
            sg.egress_rules(),
            vec![json!({
                "CidrIp": "255.255.255.255/32",
                "Description": "Disallow all traffic",
                "FromPort": 252,
                "IpProtocol": "icmp",
                "ToPort": 86
            })]
        );
    }

    #[test]
    fn test_no_ingress_property_without_rules() {
        let vpc = vpc();
        let sg = SecurityGroup::new("Sg", &vpc).with_description("web");
        let mut stack = Stack::new("TestStack");
        stack.add(&vpc).unwrap();
        stack.add(&sg).unwrap();

        let resource = stack.resource(sg.logical_id()).unwrap();
        assert!(!resource.properties.contains_key("SecurityGroupIngress"));
        assert_eq!(resource.properties["GroupDescription"], json!("web"));
        assert_eq!(
            sg.group_id(),
            json!({"Fn::GetAtt": [sg.logical_id().as_str(), "GroupId"]})
        );
    }
}
