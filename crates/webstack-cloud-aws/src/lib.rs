//! AWS constructs for WebStack
//!
//! This crate expands high-level constructs (VPC, security group, instance,
//! IAM role) into CloudFormation resources on a `webstack_cloud::Stack`, and
//! defines the web server stack built from them.
//!
//! # Features
//!
//! - VPC with public/private subnets, route tables, internet and NAT gateways
//! - Security groups with inline rules
//! - EC2 instances with their own role and instance profile
//!
//! # Example
//!
//! ```ignore
//! use webstack_cloud::App;
//! use webstack_cloud_aws::{WebServerProps, WebServerStack};
//!
//! let mut app = App::new();
//! WebServerStack::define(&mut app, "WebServerStack", &WebServerProps::default())?;
//!
//! // Write WebServerStack.template.json and manifest.json
//! app.synth("webstack.out")?;
//! ```

pub mod ec2;
pub mod error;
pub mod iam;
pub mod web_server_stack;

pub use error::{AwsError, Result};
pub use web_server_stack::{
    DEFAULT_STACK_NAME, INGRESS_PORT, SSM_CORE_POLICY, WebServerProps, WebServerStack,
};
