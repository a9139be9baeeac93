//! EC2 instance construct
//!
//! An instance always carries its own role and instance profile. It is placed
//! in the first subnet of the selected type and waits for that subnet's
//! default route, so it boots with internet connectivity.

use crate::ec2::instance_type::InstanceType;
use crate::ec2::machine_image::MachineImage;
use crate::ec2::security_group::SecurityGroup;
use crate::ec2::user_data::UserData;
use crate::ec2::vpc::{SubnetType, Vpc};
use crate::error::{AwsError, Result};
use crate::iam::{InstanceProfile, Role, ServicePrincipal};
use serde_json::{Value, json};
use webstack_cloud::{Construct, LogicalId, Resource, Stack, intrinsic};

/// Builder for [`Instance`]
#[derive(Debug, Clone)]
pub struct InstanceBuilder {
    node_id: String,
    instance_type: InstanceType,
    machine_image: MachineImage,
    subnet_type: SubnetType,
    security_groups: Vec<Value>,
    user_data: UserData,
}

impl InstanceBuilder {
    pub fn instance_type(mut self, instance_type: InstanceType) -> Self {
        self.instance_type = instance_type;
        self
    }

    pub fn machine_image(mut self, image: MachineImage) -> Self {
        self.machine_image = image;
        self
    }

    /// Subnet type to place the instance in; defaults to private with egress
    pub fn subnet_type(mut self, subnet_type: SubnetType) -> Self {
        self.subnet_type = subnet_type;
        self
    }

    pub fn security_group(mut self, group: &SecurityGroup) -> Self {
        self.security_groups.push(group.group_id());
        self
    }

    pub fn user_data(mut self, user_data: UserData) -> Self {
        self.user_data = user_data;
        self
    }

    pub fn build(self, vpc: &Vpc) -> Result<Instance> {
        let selected = vpc.select_subnets(self.subnet_type)?;
        let subnet_id = selected
            .subnet_ids
            .first()
            .cloned()
            .ok_or(AwsError::NoSubnets(self.subnet_type))?;
        let az_index = selected.az_indexes.first().copied().unwrap_or_default();
        let internet_route = vpc
            .subnets()
            .iter()
            .find(|s| s.subnet_id == subnet_id)
            .and_then(|s| s.default_route_id.clone());

        let role = Role::new(&[self.node_id.as_str(), "InstanceRole"], ServicePrincipal::ec2());
        let profile = InstanceProfile::new(&[self.node_id.as_str(), "InstanceProfile"], &role);

        tracing::debug!(
            "Placing instance {} ({}) in subnet {}",
            self.node_id,
            self.instance_type,
            subnet_id
        );

        Ok(Instance {
            logical_id: LogicalId::from_path(&[self.node_id.as_str(), "Resource"]),
            node_id: self.node_id,
            instance_type: self.instance_type,
            machine_image: self.machine_image,
            subnet_id,
            az_index,
            internet_route,
            security_groups: self.security_groups,
            user_data: self.user_data,
            role,
            profile,
        })
    }
}

/// Virtual server in a VPC subnet
#[derive(Debug, Clone)]
pub struct Instance {
    node_id: String,
    logical_id: LogicalId,
    instance_type: InstanceType,
    machine_image: MachineImage,
    subnet_id: LogicalId,
    az_index: usize,
    internet_route: Option<LogicalId>,
    security_groups: Vec<Value>,
    user_data: UserData,
    role: Role,
    profile: InstanceProfile,
}

impl Instance {
    pub fn builder(node_id: impl Into<String>) -> InstanceBuilder {
        InstanceBuilder {
            node_id: node_id.into(),
            instance_type: InstanceType::default(),
            machine_image: MachineImage::default(),
            subnet_type: SubnetType::PrivateWithEgress,
            security_groups: Vec::new(),
            user_data: UserData::for_linux(),
        }
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    pub fn subnet_id(&self) -> &LogicalId {
        &self.subnet_id
    }

    pub fn instance_type(&self) -> &InstanceType {
        &self.instance_type
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Role for attaching policies before synthesis
    pub fn role_mut(&mut self) -> &mut Role {
        &mut self.role
    }

    pub fn profile(&self) -> &InstanceProfile {
        &self.profile
    }

    pub fn add_user_data<S: AsRef<str>>(&mut self, commands: &[S]) {
        self.user_data.add_commands(commands);
    }

    pub fn user_data(&self) -> &UserData {
        &self.user_data
    }

    /// `{"Fn::GetAtt": [<instance>, "PublicIp"]}`
    pub fn public_ip(&self) -> Value {
        intrinsic::get_att(&self.logical_id, "PublicIp")
    }
}

impl Construct for Instance {
    type Error = AwsError;

    fn node_id(&self) -> &str {
        &self.node_id
    }

    fn synthesize(&self, stack: &mut Stack) -> Result<()> {
        let name = format!("{}/{}", stack.name(), self.node_id);

        let mut role = self.role.clone();
        role.add_tag("Name", name.clone());
        stack.add(&role)?;
        stack.add(&self.profile)?;

        let image_id = self.machine_image.image_id(stack)?;

        let mut resource = Resource::new(self.logical_id.clone(), "AWS::EC2::Instance")
            .with_property(
                "AvailabilityZone",
                intrinsic::select(self.az_index, intrinsic::get_azs()),
            )
            .with_property("IamInstanceProfile", self.profile.profile_name())
            .with_property("ImageId", image_id)
            .with_property("InstanceType", self.instance_type.as_str())
            .with_property("SubnetId", intrinsic::reference(&self.subnet_id))
            .with_property("Tags", json!([{ "Key": "Name", "Value": name }]))
            .with_property("UserData", self.user_data.to_property())
            .depends_on(self.role.logical_id())
            .taggable();

        if !self.security_groups.is_empty() {
            resource.set_property("SecurityGroupIds", Value::Array(self.security_groups.clone()));
        }
        if let Some(route) = &self.internet_route {
            resource = resource.depends_on(route);
        }

        stack.add_resource(resource)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec2::port::{Peer, Port};

    fn setup() -> (Vpc, SecurityGroup) {
        let vpc = Vpc::builder("Net").max_azs(2).build().unwrap();
        let mut sg = SecurityGroup::new("Sg", &vpc);
        sg.add_ingress_rule(Peer::any_ipv4(), Port::tcp(80), None);
        (vpc, sg)
    }

    #[test]
    fn test_public_instance_placement() {
        let (vpc, sg) = setup();
        let instance = Instance::builder("Server")
            .subnet_type(SubnetType::Public)
            .security_group(&sg)
            .build(&vpc)
            .unwrap();

        let public = vpc.select_subnets(SubnetType::Public).unwrap();
        assert_eq!(instance.subnet_id(), &public.subnet_ids[0]);

        let mut stack = Stack::new("TestStack");
        stack.add(&vpc).unwrap();
        stack.add(&sg).unwrap();
        stack.add(&instance).unwrap();

        let resource = stack.resource(instance.logical_id()).unwrap();
        assert_eq!(resource.properties["InstanceType"], json!("t2.micro"));
        assert_eq!(resource.properties["SecurityGroupIds"], json!([sg.group_id()]));
        assert!(resource.depends_on.contains(instance.role().logical_id()));
        assert!(resource.depends_on.contains(&public.internet_connectivity[0]));

        let graph = stack.dependency_graph().unwrap();
        assert!(graph.depends_on(instance.logical_id(), vpc.logical_id()));
        assert!(graph.depends_on(instance.logical_id(), sg.logical_id()));
        assert!(graph.depends_on(instance.logical_id(), instance.profile().logical_id()));
    }

    #[test]
    fn test_role_gets_name_tag() {
        let (vpc, _) = setup();
        let instance = Instance::builder("Server").build(&vpc).unwrap();
        let mut stack = Stack::new("TestStack");
        stack.add(&vpc).unwrap();
        stack.add(&instance).unwrap();

        let role = stack.resource(instance.role().logical_id()).unwrap();
        assert_eq!(
            role.properties["Tags"],
            json!([{"Key": "Name", "Value": "TestStack/Server"}])
        );
    }

    #[test]
    fn test_user_data_rendered() {
        let (vpc, _) = setup();
        let mut instance = Instance::builder("Server").build(&vpc).unwrap();
        instance.add_user_data(&["echo ready"]);

        let mut stack = Stack::new("TestStack");
        stack.add(&vpc).unwrap();
        stack.add(&instance).unwrap();

        let resource = stack.resource(instance.logical_id()).unwrap();
        assert_eq!(
            resource.properties["UserData"],
            json!({"Fn::Base64": "#!/bin/bash\necho ready"})
        );
        assert_eq!(stack.parameters().len(), 1);
    }

    #[test]
    fn test_isolated_placement_fails_without_subnets() {
        let (vpc, _) = setup();
        let err = Instance::builder("Server")
            .subnet_type(SubnetType::PrivateIsolated)
            .build(&vpc)
            .unwrap_err();
        assert!(matches!(err, AwsError::NoSubnets(SubnetType::PrivateIsolated)));
    }
}
