//! EC2 instance size class

use crate::error::{AwsError, Result};
use std::str::FromStr;

/// Instance type such as `t2.micro`
///
/// Only the shape `<family>.<size>` is checked; whether the type exists in a
/// region is left to the provisioning engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceType(String);

impl InstanceType {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let invalid = || AwsError::InvalidInstanceType(value.clone());

        let (family, size) = value.split_once('.').ok_or_else(invalid)?;
        let valid_part = |s: &str| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        };

        if !valid_part(family) || !valid_part(size) {
            return Err(invalid());
        }
        if !family.starts_with(|c: char| c.is_ascii_lowercase()) {
            return Err(invalid());
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn family(&self) -> &str {
        self.0.split_once('.').map(|(f, _)| f).unwrap_or(&self.0)
    }

    pub fn size(&self) -> &str {
        self.0.split_once('.').map(|(_, s)| s).unwrap_or("")
    }
}

impl Default for InstanceType {
    fn default() -> Self {
        Self("t2.micro".to_string())
    }
}

impl FromStr for InstanceType {
    type Err = AwsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl std::fmt::Display for InstanceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
