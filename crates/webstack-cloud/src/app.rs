//! App: the root scope that owns stacks and writes the cloud assembly
//!
//! The cloud assembly is the directory handed to the provisioning engine:
//! one `<stack>.template.json` per stack plus a `manifest.json` listing them.

use crate::error::{CloudError, Result};
use crate::stack::{Stack, validate_stack_name};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";
const MANIFEST_VERSION: &str = "1.0";
const STACK_ARTIFACT_TYPE: &str = "aws:cloudformation:stack";

/// Deployment target of a stack. Unset fields stay environment-agnostic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub account: Option<String>,
    pub region: Option<String>,
}

impl Environment {
    pub fn new(account: Option<String>, region: Option<String>) -> Self {
        Self { account, region }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "aws://{}/{}",
            self.account.as_deref().unwrap_or("unknown-account"),
            self.region.as_deref().unwrap_or("unknown-region")
        )
    }
}

/// Cloud assembly manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub artifacts: BTreeMap<String, Artifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub environment: String,
    pub properties: ArtifactProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactProperties {
    pub template_file: String,
}

/// Root scope holding every stack of the application
#[derive(Debug, Default)]
pub struct App {
    stacks: Vec<Stack>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stack. Stack names are unique within an app.
    pub fn add_stack(&mut self, stack: Stack) -> Result<&mut Stack> {
        validate_stack_name(stack.name())?;
        if self.stack(stack.name()).is_some() {
            return Err(CloudError::DuplicateStack(stack.name().to_string()));
        }
        self.stacks.push(stack);
        let last = self.stacks.len() - 1;
        Ok(&mut self.stacks[last])
    }

    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.name() == name)
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    /// Write the cloud assembly to `outdir`, returning the files written
    pub fn synth(&self, outdir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let outdir = outdir.as_ref();
        if !outdir.exists() {
            fs::create_dir_all(outdir)?;
            tracing::debug!("Created output directory: {}", outdir.display());
        }

        let mut written = Vec::new();
        let mut artifacts = BTreeMap::new();

        for stack in &self.stacks {
            let template = stack.synthesize()?;
            let file_name = format!("{}.template.json", stack.name());
            let path = outdir.join(&file_name);
            fs::write(&path, template.to_json_pretty()?)?;
            tracing::info!("Wrote template for {} to {}", stack.name(), path.display());
            written.push(path);

            artifacts.insert(
                stack.name().to_string(),
                Artifact {
                    artifact_type: STACK_ARTIFACT_TYPE.to_string(),
                    environment: stack.environment().to_string(),
                    properties: ArtifactProperties {
                        template_file: file_name,
                    },
                },
            );
        }

        let manifest = Manifest {
            version: MANIFEST_VERSION.to_string(),
            artifacts,
        };
        let manifest_path = outdir.join(MANIFEST_FILE);
        fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;
        written.push(manifest_path);

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logical_id::LogicalId;
    use crate::resource::Resource;
    use tempfile::tempdir;

    #[test]
    fn test_environment_display() {
        assert_eq!(
            Environment::default().to_string(),
            "aws://unknown-account/unknown-region"
        );
        let env = Environment::new(Some("123456789012".into()), Some("ap-northeast-1".into()));
        assert_eq!(env.to_string(), "aws://123456789012/ap-northeast-1");
    }

    #[test]
    fn test_duplicate_stack_rejected() {
        let mut app = App::new();
        app.add_stack(Stack::new("A")).unwrap();
        assert!(matches!(
            app.add_stack(Stack::new("A")),
            Err(CloudError::DuplicateStack(_))
        ));
        assert_eq!(app.stacks().len(), 1);
    }

    #[test]
    fn test_invalid_stack_name_rejected() {
        let temp_dir = tempdir().unwrap();
        let outdir = temp_dir.path().join("out");
        let mut app = App::new();

        for name in ["../escaped", "", "has space!"] {
            assert!(matches!(
                app.add_stack(Stack::new(name)),
                Err(CloudError::InvalidStackName(_))
            ));
        }
        assert!(app.stacks().is_empty());

        app.synth(&outdir).unwrap();
        assert!(!temp_dir.path().join("escaped.template.json").exists());
    }

    #[test]
    fn test_synth_writes_assembly() {
        let temp_dir = tempdir().unwrap();
        let mut app = App::new();
        let stack = app.add_stack(Stack::new("TestStack")).unwrap();
        stack
            .add_resource(Resource::new(
                LogicalId::new("Vpc").unwrap(),
                "AWS::EC2::VPC",
            ))
            .unwrap();

        let written = app.synth(temp_dir.path().join("out")).unwrap();
        assert_eq!(written.len(), 2);

        let template: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(temp_dir.path().join("out/TestStack.template.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(template["Resources"]["Vpc"]["Type"], "AWS::EC2::VPC");

        let manifest: Manifest = serde_json::from_str(
            &fs::read_to_string(temp_dir.path().join("out").join(MANIFEST_FILE)).unwrap(),
        )
        .unwrap();
        let artifact = &manifest.artifacts["TestStack"];
        assert_eq!(artifact.artifact_type, "aws:cloudformation:stack");
        assert_eq!(artifact.properties.template_file, "TestStack.template.json");
        assert_eq!(artifact.environment, "aws://unknown-account/unknown-region");
    }
}
