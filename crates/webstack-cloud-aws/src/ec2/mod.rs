//! EC2 and VPC constructs

pub mod instance;
pub mod instance_type;
pub mod machine_image;
pub mod network;
pub mod port;
pub mod security_group;
pub mod user_data;
pub mod vpc;

pub use instance::{Instance, InstanceBuilder};
pub use instance_type::InstanceType;
pub use machine_image::{AmazonLinuxGeneration, CpuType, MachineImage};
pub use network::{CidrAllocator, Ipv4Cidr};
pub use port::{Peer, Port, Protocol};
pub use security_group::{Rule, SecurityGroup};
pub use user_data::{HTTPD_HELLO_WORLD, UserData, get_builtin_script};
pub use vpc::{SelectedSubnets, Subnet, SubnetConfiguration, SubnetType, Vpc, VpcBuilder};
