//! Web server stack
//!
//! One VPC, one security group open on TCP 80, and one EC2 instance in a public
//! subnet running Apache httpd. The instance role carries the SSM core policy so
//! the host can be reached without SSH, and the stack outputs its public IP.
//!
//! ```text
//! WebServerVpc ◄── WebServerSecurityGroup ◄── WebServerInstance ──► InstanceRole
//!      ▲                                           │                    ▲
//!      └─────────── public subnet + route ◄────────┘        InstanceProfile
//! ```

use crate::ec2::{
    HTTPD_HELLO_WORLD, Instance, InstanceType, MachineImage, Peer, Port, SecurityGroup,
    SubnetType, UserData, Vpc,
};
use crate::error::Result;
use crate::iam::ManagedPolicy;
use std::collections::BTreeMap;
use webstack_cloud::{App, Environment, LogicalId, Output, Stack, validate_stack_name};

/// Port opened to the internet; not configurable
pub const INGRESS_PORT: u16 = 80;

pub const DEFAULT_STACK_NAME: &str = "WebServerStack";
pub const SSM_CORE_POLICY: &str = "AmazonSSMManagedInstanceCore";

const VPC_ID: &str = "WebServerVpc";
const SECURITY_GROUP_ID: &str = "WebServerSecurityGroup";
const INSTANCE_ID: &str = "WebServerInstance";
const PUBLIC_IP_OUTPUT: &str = "InstancePublicIp";

/// Tunable properties of [`WebServerStack`]
#[derive(Debug, Clone)]
pub struct WebServerProps {
    pub description: Option<String>,
    pub environment: Environment,
    pub instance_type: InstanceType,
    pub machine_image: MachineImage,
    pub max_azs: u32,
    /// NAT gateways for the private subnets; `None` means one per zone
    pub nat_gateways: Option<u32>,
    /// AWS-managed policy names attached to the instance role
    pub managed_policies: Vec<String>,
    pub user_data: Vec<String>,
    pub tags: BTreeMap<String, String>,
}

impl Default for WebServerProps {
    fn default() -> Self {
        Self {
            description: None,
            environment: Environment::default(),
            instance_type: InstanceType::default(),
            machine_image: MachineImage::default(),
            max_azs: 2,
            nat_gateways: None,
            managed_policies: vec![SSM_CORE_POLICY.to_string()],
            user_data: HTTPD_HELLO_WORLD.iter().map(|c| c.to_string()).collect(),
            tags: BTreeMap::new(),
        }
    }
}

/// Declares the web server stack
pub struct WebServerStack;

impl WebServerStack {
    /// Build the stack in isolation
    pub fn build(id: &str, props: &WebServerProps) -> Result<Stack> {
        validate_stack_name(id)?;
        let mut stack = Stack::new(id).with_environment(props.environment.clone());
        if let Some(description) = &props.description {
            stack = stack.with_description(description.clone());
        }
        for (key, value) in &props.tags {
            stack.add_tag(key.clone(), value.clone());
        }

        let mut vpc = Vpc::builder(VPC_ID).max_azs(props.max_azs);
        if let Some(count) = props.nat_gateways {
            vpc = vpc.nat_gateways(count);
        }
        let vpc = vpc.build()?;
        stack.add(&vpc)?;

        let mut security_group = SecurityGroup::new(SECURITY_GROUP_ID, &vpc)
            .with_description("Allow HTTP access to the web server");
        security_group.add_ingress_rule(Peer::any_ipv4(), Port::tcp(INGRESS_PORT), None);
        stack.add(&security_group)?;

        let mut user_data = UserData::for_linux();
        user_data.add_commands(&props.user_data);

        let mut instance = Instance::builder(INSTANCE_ID)
            .instance_type(props.instance_type.clone())
            .machine_image(props.machine_image.clone())
            .subnet_type(SubnetType::Public)
            .security_group(&security_group)
            .user_data(user_data)
            .build(&vpc)?;
        for policy in &props.managed_policies {
            instance
                .role_mut()
                .add_managed_policy(ManagedPolicy::from_aws_managed_policy_name(policy));
        }
        stack.add(&instance)?;

        stack.add_output(
            Output::new(LogicalId::new(PUBLIC_IP_OUTPUT)?, instance.public_ip())
                .with_description("Public IP of the EC2 instance"),
        )?;

        // Catch dangling references and cycles before the stack leaves this crate
        let order = stack.dependency_graph()?.creation_order()?;
        tracing::debug!("Declared stack {} with {} resources", id, order.len());

        Ok(stack)
    }

    /// Build the stack and add it to `app`
    pub fn define<'a>(app: &'a mut App, id: &str, props: &WebServerProps) -> Result<&'a Stack> {
        let stack = Self::build(id, props)?;
        let stack = app.add_stack(stack)?;
        Ok(stack)
    }
}
