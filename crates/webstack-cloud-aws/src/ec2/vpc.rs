//! VPC construct
//!
//! A `Vpc` expands into the VPC itself plus, for every availability zone and
//! subnet group, a subnet with its route table. Public subnets route through an
//! internet gateway; private subnets route through a NAT gateway hosted in a
//! public subnet; isolated subnets get no default route.
//!
//! Subnet blocks are allocated group by group, zone by zone, in declaration
//! order. Groups without an explicit mask share the VPC block evenly.

use crate::ec2::network::{CidrAllocator, Ipv4Cidr, even_split_prefix};
use crate::error::{AwsError, Result};
use serde_json::{Value, json};
use webstack_cloud::{Construct, LogicalId, Resource, Stack, intrinsic};

pub const DEFAULT_CIDR: &str = "10.0.0.0/16";
pub const DEFAULT_MAX_AZS: u32 = 3;

/// Role of a subnet group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubnetType {
    /// Default route to the internet gateway; instances get public IPs
    Public,
    /// Outbound-only internet access through a NAT gateway
    PrivateWithEgress,
    /// No route outside the VPC
    PrivateIsolated,
}

impl SubnetType {
    /// Value of the `aws-cdk:subnet-type` tag
    pub fn tag_value(&self) -> &'static str {
        match self {
            SubnetType::Public => "Public",
            SubnetType::PrivateWithEgress => "Private",
            SubnetType::PrivateIsolated => "Isolated",
        }
    }
}

impl std::fmt::Display for SubnetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubnetType::Public => write!(f, "public"),
            SubnetType::PrivateWithEgress => write!(f, "private-with-egress"),
            SubnetType::PrivateIsolated => write!(f, "private-isolated"),
        }
    }
}

/// One subnet group, replicated in every availability zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetConfiguration {
    pub name: String,
    pub subnet_type: SubnetType,
    /// Prefix length; `None` shares the remaining space evenly
    pub cidr_mask: Option<u8>,
}

impl SubnetConfiguration {
    pub fn new(name: impl Into<String>, subnet_type: SubnetType) -> Self {
        Self {
            name: name.into(),
            subnet_type,
            cidr_mask: None,
        }
    }

    pub fn with_cidr_mask(mut self, mask: u8) -> Self {
        self.cidr_mask = Some(mask);
        self
    }

    /// One public and one private-with-egress group
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("Public", SubnetType::Public),
            Self::new("Private", SubnetType::PrivateWithEgress),
        ]
    }
}

/// A subnet allocated in one availability zone
#[derive(Debug, Clone)]
pub struct Subnet {
    /// Construct ID, e.g. `PublicSubnet1`
    pub node_id: String,
    pub group_name: String,
    pub subnet_type: SubnetType,
    /// Index into the region's availability zones
    pub az_index: usize,
    pub cidr: Ipv4Cidr,
    pub subnet_id: LogicalId,
    pub route_table_id: LogicalId,
    pub association_id: LogicalId,
    /// Default route, absent for isolated subnets
    pub default_route_id: Option<LogicalId>,
    /// `(EIP, NAT gateway)` when this subnet hosts a NAT gateway
    pub nat: Option<(LogicalId, LogicalId)>,
}

/// Subnets picked for placing resources
#[derive(Debug, Clone)]
pub struct SelectedSubnets {
    pub subnet_type: SubnetType,
    pub subnet_ids: Vec<LogicalId>,
    pub az_indexes: Vec<usize>,
    /// Resources that must exist before the subnets can reach the internet
    pub internet_connectivity: Vec<LogicalId>,
}

/// Builder for [`Vpc`]
#[derive(Debug, Clone)]
pub struct VpcBuilder {
    node_id: String,
    cidr: String,
    max_azs: u32,
    nat_gateways: Option<u32>,
    subnet_configuration: Vec<SubnetConfiguration>,
}

impl VpcBuilder {
    pub fn cidr(mut self, cidr: impl Into<String>) -> Self {
        self.cidr = cidr.into();
        self
    }

    pub fn max_azs(mut self, max_azs: u32) -> Self {
        self.max_azs = max_azs;
        self
    }

    /// Number of NAT gateways; defaults to one per availability zone
    pub fn nat_gateways(mut self, count: u32) -> Self {
        self.nat_gateways = Some(count);
        self
    }

    pub fn subnet_configuration(mut self, groups: Vec<SubnetConfiguration>) -> Self {
        self.subnet_configuration = groups;
        self
    }

    pub fn build(self) -> Result<Vpc> {
        let cidr: Ipv4Cidr = self.cidr.parse()?;

        if self.max_azs == 0 {
            return Err(AwsError::InvalidSubnetLayout(
                "max_azs must be at least 1".to_string(),
            ));
        }
        if self.subnet_configuration.is_empty() {
            return Err(AwsError::InvalidSubnetLayout(
                "at least one subnet group is required".to_string(),
            ));
        }
        for (i, group) in self.subnet_configuration.iter().enumerate() {
            if self.subnet_configuration[..i]
                .iter()
                .any(|g| g.name == group.name)
            {
                return Err(AwsError::InvalidSubnetLayout(format!(
                    "duplicate subnet group name: {}",
                    group.name
                )));
            }
        }

        let has = |t: SubnetType| self.subnet_configuration.iter().any(|g| g.subnet_type == t);
        let azs = self.max_azs as usize;

        let nat_count = if has(SubnetType::PrivateWithEgress) {
            let requested = self.nat_gateways.unwrap_or(self.max_azs) as usize;
            if requested == 0 {
                return Err(AwsError::InvalidSubnetLayout(
                    "private subnets with egress need at least one NAT gateway".to_string(),
                ));
            }
            if !has(SubnetType::Public) {
                return Err(AwsError::InvalidSubnetLayout(
                    "NAT gateways need a public subnet group".to_string(),
                ));
            }
            requested.min(azs)
        } else {
            0
        };

        let subnets = allocate_subnets(&self.node_id, cidr, azs, &self.subnet_configuration, nat_count)?;

        tracing::debug!(
            "Planned VPC {} ({}): {} subnets across {} AZs, {} NAT gateways",
            self.node_id,
            cidr,
            subnets.len(),
            azs,
            nat_count
        );

        Ok(Vpc {
            vpc_id: LogicalId::from_path(&[self.node_id.as_str(), "Resource"]),
            igw_id: LogicalId::from_path(&[self.node_id.as_str(), "IGW"]),
            attachment_id: LogicalId::from_path(&[self.node_id.as_str(), "VPCGW"]),
            node_id: self.node_id,
            cidr,
            max_azs: self.max_azs,
            subnets,
        })
    }
}

fn allocate_subnets(
    node_id: &str,
    cidr: Ipv4Cidr,
    azs: usize,
    groups: &[SubnetConfiguration],
    nat_count: usize,
) -> Result<Vec<Subnet>> {
    let shared_prefix = if groups.iter().any(|g| g.cidr_mask.is_none()) {
        even_split_prefix(&cidr, groups.len() * azs)?
    } else {
        cidr.prefix()
    };
    let mut allocator = CidrAllocator::new(cidr);
    let mut subnets = Vec::with_capacity(groups.len() * azs);

    for group in groups {
        let prefix = match group.cidr_mask {
            Some(mask) if !(16..=28).contains(&mask) => {
                return Err(AwsError::InvalidSubnetLayout(format!(
                    "subnet mask /{} for {} must be between /16 and /28",
                    mask, group.name
                )));
            }
            Some(mask) => mask,
            None => shared_prefix,
        };

        for az in 0..azs {
            let subnet_node = format!("{}Subnet{}", group.name, az + 1);
            let path = |child: &str| LogicalId::from_path(&[node_id, subnet_node.as_str(), child]);

            let default_route_id = match group.subnet_type {
                SubnetType::PrivateIsolated => None,
                _ => Some(path("DefaultRoute")),
            };
            let nat = if group.subnet_type == SubnetType::Public && az < nat_count {
                Some((path("EIP"), path("NATGateway")))
            } else {
                None
            };

            subnets.push(Subnet {
                group_name: group.name.clone(),
                subnet_type: group.subnet_type,
                az_index: az,
                cidr: allocator.allocate(prefix)?,
                subnet_id: path("Subnet"),
                route_table_id: path("RouteTable"),
                association_id: path("RouteTableAssociation"),
                default_route_id,
                nat,
                node_id: subnet_node,
            });
        }
    }

    Ok(subnets)
}

/// Virtual network partitioned into subnets across availability zones
#[derive(Debug, Clone)]
pub struct Vpc {
    node_id: String,
    cidr: Ipv4Cidr,
    max_azs: u32,
    vpc_id: LogicalId,
    igw_id: LogicalId,
    attachment_id: LogicalId,
    subnets: Vec<Subnet>,
}

impl Vpc {
    pub fn builder(node_id: impl Into<String>) -> VpcBuilder {
        VpcBuilder {
            node_id: node_id.into(),
            cidr: DEFAULT_CIDR.to_string(),
            max_azs: DEFAULT_MAX_AZS,
            nat_gateways: None,
            subnet_configuration: SubnetConfiguration::defaults(),
        }
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.vpc_id
    }

    /// `{"Ref": <vpc>}`
    pub fn vpc_id(&self) -> Value {
        intrinsic::reference(&self.vpc_id)
    }

    pub fn cidr(&self) -> Ipv4Cidr {
        self.cidr
    }

    pub fn max_azs(&self) -> u32 {
        self.max_azs
    }

    pub fn subnets(&self) -> &[Subnet] {
        &self.subnets
    }

    pub fn has_internet_gateway(&self) -> bool {
        self.subnets.iter().any(|s| s.subnet_type == SubnetType::Public)
    }

    fn nat_gateways(&self) -> Vec<(usize, &LogicalId)> {
        self.subnets
            .iter()
            .filter_map(|s| s.nat.as_ref().map(|(_, nat)| (s.az_index, nat)))
            .collect()
    }

    /// Subnets of the given type, in zone order
    pub fn select_subnets(&self, subnet_type: SubnetType) -> Result<SelectedSubnets> {
        let selected: Vec<&Subnet> = self
            .subnets
            .iter()
            .filter(|s| s.subnet_type == subnet_type)
            .collect();

        if selected.is_empty() {
            return Err(AwsError::NoSubnets(subnet_type));
        }

        let internet_connectivity = match subnet_type {
            SubnetType::PrivateIsolated => Vec::new(),
            _ => selected
                .iter()
                .filter_map(|s| s.default_route_id.clone())
                .collect(),
        };

        Ok(SelectedSubnets {
            subnet_type,
            subnet_ids: selected.iter().map(|s| s.subnet_id.clone()).collect(),
            az_indexes: selected.iter().map(|s| s.az_index).collect(),
            internet_connectivity,
        })
    }

    fn name_tag(stack: &Stack, path: &[&str]) -> Value {
        json!([{ "Key": "Name", "Value": format!("{}/{}", stack.name(), path.join("/")) }])
    }

    fn synthesize_subnet(&self, stack: &mut Stack, subnet: &Subnet) -> Result<()> {
        let path = [self.node_id.as_str(), subnet.node_id.as_str()];
        let name = format!("{}/{}", stack.name(), path.join("/"));
        let name_tag = Self::name_tag(stack, &path);

        stack.add_resource(
            Resource::new(subnet.subnet_id.clone(), "AWS::EC2::Subnet")
                .with_property(
                    "AvailabilityZone",
                    intrinsic::select(subnet.az_index, intrinsic::get_azs()),
                )
                .with_property("CidrBlock", subnet.cidr.to_string())
                .with_property(
                    "MapPublicIpOnLaunch",
                    subnet.subnet_type == SubnetType::Public,
                )
                .with_property(
                    "Tags",
                    json!([
                        { "Key": "aws-cdk:subnet-name", "Value": subnet.group_name },
                        { "Key": "aws-cdk:subnet-type", "Value": subnet.subnet_type.tag_value() },
                        { "Key": "Name", "Value": name },
                    ]),
                )
                .with_property("VpcId", self.vpc_id())
                .taggable(),
        )?;

        stack.add_resource(
            Resource::new(subnet.route_table_id.clone(), "AWS::EC2::RouteTable")
                .with_property("Tags", name_tag.clone())
                .with_property("VpcId", self.vpc_id())
                .taggable(),
        )?;

        stack.add_resource(
            Resource::new(
                subnet.association_id.clone(),
                "AWS::EC2::SubnetRouteTableAssociation",
            )
            .with_property("RouteTableId", intrinsic::reference(&subnet.route_table_id))
            .with_property("SubnetId", intrinsic::reference(&subnet.subnet_id)),
        )?;

        let Some(route_id) = &subnet.default_route_id else {
            return Ok(());
        };

        let route = Resource::new(route_id.clone(), "AWS::EC2::Route")
            .with_property("DestinationCidrBlock", Ipv4Cidr::ANY.to_string())
            .with_property("RouteTableId", intrinsic::reference(&subnet.route_table_id));

        let route = match subnet.subnet_type {
            SubnetType::Public => route
                .with_property("GatewayId", intrinsic::reference(&self.igw_id))
                .depends_on(&self.attachment_id),
            _ => {
                let nat = self.nat_for_zone(subnet.az_index).ok_or_else(|| {
                    AwsError::InvalidSubnetLayout(format!(
                        "no NAT gateway available for {}",
                        subnet.node_id
                    ))
                })?;
                route.with_property("NatGatewayId", intrinsic::reference(nat))
            }
        };
        stack.add_resource(route)?;

        if let Some((eip_id, nat_id)) = &subnet.nat {
            stack.add_resource(
                Resource::new(eip_id.clone(), "AWS::EC2::EIP")
                    .with_property("Domain", "vpc")
                    .with_property("Tags", name_tag.clone())
                    .taggable(),
            )?;
            stack.add_resource(
                Resource::new(nat_id.clone(), "AWS::EC2::NatGateway")
                    .with_property("AllocationId", intrinsic::get_att(eip_id, "AllocationId"))
                    .with_property("SubnetId", intrinsic::reference(&subnet.subnet_id))
                    .with_property("Tags", name_tag.clone())
                    .depends_on(route_id)
                    .depends_on(&subnet.association_id)
                    .taggable(),
            )?;
        }

        Ok(())
    }

    /// NAT gateway in the same zone, or round-robin when there are fewer gateways than zones
    fn nat_for_zone(&self, az_index: usize) -> Option<&LogicalId> {
        let nats = self.nat_gateways();
        if nats.is_empty() {
            return None;
        }
        nats.iter()
            .find(|(az, _)| *az == az_index)
            .or_else(|| nats.get(az_index % nats.len()))
            .map(|(_, id)| *id)
    }
}

impl Construct for Vpc {
    type Error = AwsError;

    fn node_id(&self) -> &str {
        &self.node_id
    }

    fn synthesize(&self, stack: &mut Stack) -> Result<()> {
        let name_tag = Self::name_tag(stack, &[self.node_id.as_str()]);

        stack.add_resource(
            Resource::new(self.vpc_id.clone(), "AWS::EC2::VPC")
                .with_property("CidrBlock", self.cidr.to_string())
                .with_property("EnableDnsHostnames", true)
                .with_property("EnableDnsSupport", true)
                .with_property("InstanceTenancy", "default")
                .with_property("Tags", name_tag.clone())
                .taggable(),
        )?;

        for subnet in &self.subnets {
            self.synthesize_subnet(stack, subnet)?;
        }

        if self.has_internet_gateway() {
            stack.add_resource(
                Resource::new(self.igw_id.clone(), "AWS::EC2::InternetGateway")
                    .with_property("Tags", name_tag.clone())
                    .taggable(),
            )?;
            stack.add_resource(
                Resource::new(self.attachment_id.clone(), "AWS::EC2::VPCGatewayAttachment")
                    .with_property("InternetGatewayId", intrinsic::reference(&self.igw_id))
                    .with_property("VpcId", self.vpc_id()),
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_az_vpc() -> Vpc {
        Vpc::builder("TestVpc").max_azs(2).build().unwrap()
    }

    #[test]
    fn test_default_layout_splits_evenly() {
        let vpc = two_az_vpc();
        let cidrs: Vec<(String, String)> = vpc
            .subnets()
            .iter()
            .map(|s| (s.node_id.clone(), s.cidr.to_string()))
            .collect();
        assert_eq!(
            cidrs,
            vec![
                ("PublicSubnet1".to_string(), "10.0.0.0/18".to_string()),
                ("PublicSubnet2".to_string(), "10.0.64.0/18".to_string()),
                ("PrivateSubnet1".to_string(), "10.0.128.0/18".to_string()),
                ("PrivateSubnet2".to_string(), "10.0.192.0/18".to_string()),
            ]
        );
    }

    #[test]
    fn test_one_nat_gateway_per_zone_by_default() {
        let vpc = two_az_vpc();
        let nats: Vec<_> = vpc.subnets().iter().filter(|s| s.nat.is_some()).collect();
        assert_eq!(nats.len(), 2);
        assert!(nats.iter().all(|s| s.subnet_type == SubnetType::Public));
    }

    #[test]
    fn test_synthesized_resource_counts() {
        let mut stack = Stack::new("TestStack");
        stack.add(&two_az_vpc()).unwrap();

        let count = |t: &str| stack.resources_of_type(t).len();
        assert_eq!(count("AWS::EC2::VPC"), 1);
        assert_eq!(count("AWS::EC2::Subnet"), 4);
        assert_eq!(count("AWS::EC2::RouteTable"), 4);
        assert_eq!(count("AWS::EC2::SubnetRouteTableAssociation"), 4);
        assert_eq!(count("AWS::EC2::Route"), 4);
        assert_eq!(count("AWS::EC2::EIP"), 2);
        assert_eq!(count("AWS::EC2::NatGateway"), 2);
        assert_eq!(count("AWS::EC2::InternetGateway"), 1);
        assert_eq!(count("AWS::EC2::VPCGatewayAttachment"), 1);

        stack.synthesize().unwrap();
    }

    #[test]
    fn test_public_subnets_map_public_ips() {
        let mut stack = Stack::new("TestStack");
        let vpc = two_az_vpc();
        stack.add(&vpc).unwrap();

        for subnet in vpc.subnets() {
            let resource = stack.resource(&subnet.subnet_id).unwrap();
            assert_eq!(
                resource.get_property::<bool>("MapPublicIpOnLaunch"),
                Some(subnet.subnet_type == SubnetType::Public)
            );
            assert_eq!(resource.properties["VpcId"], vpc.vpc_id());
        }
    }

    #[test]
    fn test_public_route_waits_for_gateway_attachment() {
        let mut stack = Stack::new("TestStack");
        let vpc = two_az_vpc();
        stack.add(&vpc).unwrap();

        let selected = vpc.select_subnets(SubnetType::Public).unwrap();
        assert_eq!(selected.subnet_ids.len(), 2);
        assert_eq!(selected.az_indexes, vec![0, 1]);

        let graph = stack.dependency_graph().unwrap();
        for route in &selected.internet_connectivity {
            assert!(graph.depends_on(route, &vpc.attachment_id));
        }
    }

    #[test]
    fn test_single_nat_gateway_shared() {
        let vpc = Vpc::builder("TestVpc").max_azs(3).nat_gateways(1).build().unwrap();
        let mut stack = Stack::new("TestStack");
        stack.add(&vpc).unwrap();
        assert_eq!(stack.resources_of_type("AWS::EC2::NatGateway").len(), 1);

        let nat = vpc.subnets()[0].nat.as_ref().unwrap().1.clone();
        for subnet in vpc.subnets().iter().filter(|s| s.subnet_type == SubnetType::PrivateWithEgress) {
            let route = stack.resource(subnet.default_route_id.as_ref().unwrap()).unwrap();
            assert_eq!(route.properties["NatGatewayId"], intrinsic::reference(&nat));
        }
    }

    #[test]
    fn test_isolated_only_vpc_has_no_gateways() {
        let vpc = Vpc::builder("TestVpc")
            .max_azs(2)
            .subnet_configuration(vec![SubnetConfiguration::new(
                "Isolated",
                SubnetType::PrivateIsolated,
            )])
            .build()
            .unwrap();
        let mut stack = Stack::new("TestStack");
        stack.add(&vpc).unwrap();

        assert!(stack.resources_of_type("AWS::EC2::InternetGateway").is_empty());
        assert!(stack.resources_of_type("AWS::EC2::Route").is_empty());
        assert!(matches!(
            vpc.select_subnets(SubnetType::Public),
            Err(AwsError::NoSubnets(SubnetType::Public))
        ));
    }

    #[test]
    fn test_explicit_masks() {
        let vpc = Vpc::builder("TestVpc")
            .max_azs(2)
            .subnet_configuration(vec![
                SubnetConfiguration::new("Public", SubnetType::Public).with_cidr_mask(24),
                SubnetConfiguration::new("Private", SubnetType::PrivateWithEgress).with_cidr_mask(20),
            ])
            .build()
            .unwrap();
        let cidrs: Vec<String> = vpc.subnets().iter().map(|s| s.cidr.to_string()).collect();
        assert_eq!(
            cidrs,
            vec!["10.0.0.0/24", "10.0.1.0/24", "10.0.16.0/20", "10.0.32.0/20"]
        );
    }

    #[test]
    fn test_invalid_layouts() {
        assert!(Vpc::builder("V").max_azs(0).build().is_err());
        assert!(Vpc::builder("V").cidr("10.0.0.0").build().is_err());
        assert!(Vpc::builder("V").subnet_configuration(vec![]).build().is_err());
        assert!(Vpc::builder("V").nat_gateways(0).build().is_err());
        assert!(
            Vpc::builder("V")
                .subnet_configuration(vec![SubnetConfiguration::new(
                    "Private",
                    SubnetType::PrivateWithEgress
                )])
                .build()
                .is_err()
        );
        assert!(
            Vpc::builder("V")
                .subnet_configuration(vec![
                    SubnetConfiguration::new("A", SubnetType::Public),
                    SubnetConfiguration::new("A", SubnetType::PrivateIsolated),
                ])
                .build()
                .is_err()
        );
    }
}
