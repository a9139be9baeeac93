//! AWS construct error types

use crate::ec2::SubnetType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("Invalid instance type: {0} (expected <family>.<size>, e.g. t2.micro)")]
    InvalidInstanceType(String),

    #[error("Invalid machine image: {0} (expected al2023, al2023-arm64, al2, al2-arm64 or ami-...)")]
    InvalidMachineImage(String),

    #[error("Invalid CIDR block: {0}")]
    InvalidCidr(String),

    #[error("Invalid port range: {from}-{to}")]
    InvalidPortRange { from: u16, to: u16 },

    #[error("Invalid subnet layout: {0}")]
    InvalidSubnetLayout(String),

    #[error("No {0} subnets in the VPC")]
    NoSubnets(SubnetType),

    #[error(transparent)]
    Cloud(#[from] webstack_cloud::CloudError),
}

pub type Result<T> = std::result::Result<T, AwsError>;
