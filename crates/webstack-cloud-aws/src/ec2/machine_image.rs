//! Boot images

use crate::error::{AwsError, Result};
use serde_json::Value;
use std::str::FromStr;
use webstack_cloud::{LogicalId, Parameter, Stack, intrinsic};

const SSM_IMAGE_PARAMETER_TYPE: &str = "AWS::SSM::Parameter::Value<AWS::EC2::Image::Id>";
const SSM_PREFIX: &str = "/aws/service/ami-amazon-linux-latest";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmazonLinuxGeneration {
    AmazonLinux2,
    AmazonLinux2023,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CpuType {
    #[default]
    X86_64,
    Arm64,
}

impl CpuType {
    fn as_str(&self) -> &'static str {
        match self {
            CpuType::X86_64 => "x86_64",
            CpuType::Arm64 => "arm64",
        }
    }
}

/// Image an instance boots from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineImage {
    /// Latest Amazon Linux, resolved by the engine through a public SSM parameter
    LatestAmazonLinux {
        generation: AmazonLinuxGeneration,
        cpu: CpuType,
    },
    /// Fixed AMI ID
    Ami(String),
}

impl MachineImage {
    pub fn latest_amazon_linux_2023() -> Self {
        MachineImage::LatestAmazonLinux {
            generation: AmazonLinuxGeneration::AmazonLinux2023,
            cpu: CpuType::X86_64,
        }
    }

    /// SSM parameter that resolves to the image, if any
    pub fn ssm_parameter_name(&self) -> Option<String> {
        match self {
            MachineImage::LatestAmazonLinux { generation, cpu } => {
                Some(amazon_linux_parameter(*generation, *cpu))
            }
            MachineImage::Ami(_) => None,
        }
    }

    /// Value for an `ImageId` property.
    ///
    /// SSM-backed images declare a template parameter (shared by every
    /// instance using the same image) and return a `Ref` to it.
    pub fn image_id(&self, stack: &mut Stack) -> Result<Value> {
        let name = match self {
            MachineImage::Ami(id) => return Ok(Value::String(id.clone())),
            MachineImage::LatestAmazonLinux { generation, cpu } => {
                amazon_linux_parameter(*generation, *cpu)
            }
        };

        let param_path = format!("SsmParameterValue{}", name);
        let id = LogicalId::from_path(&[param_path.as_str(), "Parameter"]);
        if !stack.parameters().contains_key(&id) {
            stack.add_parameter(
                Parameter::new(id.clone(), SSM_IMAGE_PARAMETER_TYPE).with_default(name),
            )?;
        }
        Ok(intrinsic::reference(&id))
    }
}

fn amazon_linux_parameter(generation: AmazonLinuxGeneration, cpu: CpuType) -> String {
    match generation {
        AmazonLinuxGeneration::AmazonLinux2023 => {
            format!("{}/al2023-ami-kernel-default-{}", SSM_PREFIX, cpu.as_str())
        }
        AmazonLinuxGeneration::AmazonLinux2 => {
            format!("{}/amzn2-ami-hvm-{}-gp2", SSM_PREFIX, cpu.as_str())
        }
    }
}

impl Default for MachineImage {
    fn default() -> Self {
        Self::latest_amazon_linux_2023()
    }
}

impl FromStr for MachineImage {
    type Err = AwsError;

    /// `al2023`, `al2023-arm64`, `al2`, `al2-arm64`, or a literal `ami-...` ID
    fn from_str(s: &str) -> Result<Self> {
        let amazon_linux = |generation, cpu| MachineImage::LatestAmazonLinux { generation, cpu };
        match s {
            "al2023" => Ok(amazon_linux(AmazonLinuxGeneration::AmazonLinux2023, CpuType::X86_64)),
            "al2023-arm64" => Ok(amazon_linux(AmazonLinuxGeneration::AmazonLinux2023, CpuType::Arm64)),
            "al2" => Ok(amazon_linux(AmazonLinuxGeneration::AmazonLinux2, CpuType::X86_64)),
            "al2-arm64" => Ok(amazon_linux(AmazonLinuxGeneration::AmazonLinux2, CpuType::Arm64)),
            ami if ami.starts_with("ami-") && ami.len() > 4 => Ok(MachineImage::Ami(ami.to_string())),
            other => Err(AwsError::InvalidMachineImage(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_al2023_parameter_name() {
        assert_eq!(
            MachineImage::latest_amazon_linux_2023().ssm_parameter_name().unwrap(),
            "/aws/service/ami-amazon-linux-latest/al2023-ami-kernel-default-x86_64"
        );
        let al2_arm = MachineImage::LatestAmazonLinux {
            generation: AmazonLinuxGeneration::AmazonLinux2,
            cpu: CpuType::Arm64,
        };
        assert_eq!(
            al2_arm.ssm_parameter_name().unwrap(),
            "/aws/service/ami-amazon-linux-latest/amzn2-ami-hvm-arm64-gp2"
        );
    }

    #[test]
    fn test_ssm_image_declares_parameter_once() {
        let mut stack = Stack::new("TestStack");
        let image = MachineImage::default();

        let first = image.image_id(&mut stack).unwrap();
        let second = image.image_id(&mut stack).unwrap();
        assert_eq!(first, second);
        assert_eq!(stack.parameters().len(), 1);

        let param = stack.parameters().values().next().unwrap();
        assert_eq!(param.parameter_type, SSM_IMAGE_PARAMETER_TYPE);
        assert_eq!(
            param.default,
            Some(json!("/aws/service/ami-amazon-linux-latest/al2023-ami-kernel-default-x86_64"))
        );
        assert_eq!(first, json!({"Ref": param.logical_id.as_str()}));
    }

    #[test]
    fn test_parse_machine_image() {
        assert_eq!(
            "al2023".parse::<MachineImage>().unwrap(),
            MachineImage::latest_amazon_linux_2023()
        );
        assert_eq!(
            "ami-0abc".parse::<MachineImage>().unwrap(),
            MachineImage::Ami("ami-0abc".into())
        );
        assert!("ubuntu".parse::<MachineImage>().is_err());
        assert!("ami-".parse::<MachineImage>().is_err());
    }

    #[test]
    fn test_fixed_ami_is_literal() {
        let mut stack = Stack::new("TestStack");
        let id = MachineImage::Ami("ami-0123456789abcdef0".into())
            .image_id(&mut stack)
            .unwrap();
        assert_eq!(id, json!("ami-0123456789abcdef0"));
        assert!(stack.parameters().is_empty());
    }
}
