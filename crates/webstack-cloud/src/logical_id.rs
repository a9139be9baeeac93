//! Logical ID allocation
//!
//! Resources are identified inside a template by a logical ID derived from
//! their construct path relative to the stack (e.g. `WebServerVpc/PublicSubnet1/Subnet`).
//! The human-readable part keeps the path readable in the console, the hash
//! suffix keeps IDs unique when two paths sanitize to the same string.

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// CloudFormation caps logical IDs at 255 characters.
const MAX_LOGICAL_ID_LEN: usize = 255;
const HASH_LEN: usize = 8;

/// Path components that are dropped from the human part of the ID.
const HIDDEN_COMPONENTS: [&str; 2] = ["Resource", "Default"];

/// Identifier of a resource, parameter or output within one template
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    /// Use `id` verbatim. It must be non-empty ASCII alphanumeric.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || id.len() > MAX_LOGICAL_ID_LEN {
            return Err(CloudError::InvalidProperty(format!(
                "logical ID must be 1-{} characters: {:?}",
                MAX_LOGICAL_ID_LEN, id
            )));
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CloudError::InvalidProperty(format!(
                "logical ID must be alphanumeric: {:?}",
                id
            )));
        }
        Ok(Self(id))
    }

    /// Allocate an ID from a construct path.
    ///
    /// A single-component path maps to the sanitized component itself.
    /// Longer paths concatenate their sanitized components (skipping
    /// `Resource` / `Default`) and append an 8-character hash of the full path.
    pub fn from_path<S: AsRef<str>>(path: &[S]) -> Self {
        let components: Vec<&str> = path.iter().map(|c| c.as_ref()).collect();

        if let [single] = components.as_slice() {
            let human = sanitize(single);
            if !human.is_empty() {
                return Self(truncate(human, MAX_LOGICAL_ID_LEN));
            }
        }

        let human: String = components
            .iter()
            .filter(|c| !HIDDEN_COMPONENTS.contains(c))
            .map(|c| sanitize(c))
            .collect();
        let human = truncate(human, MAX_LOGICAL_ID_LEN - HASH_LEN);

        let id = format!("{}{}", human, path_hash(&components));
        tracing::trace!("Allocated logical ID {} for {}", id, components.join("/"));
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LogicalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LogicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn sanitize(component: &str) -> String {
    component
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn truncate(mut s: String, max: usize) -> String {
    // ASCII only, so byte length == char count
    s.truncate(max);
    s
}

fn path_hash(components: &[&str]) -> String {
    let digest = Sha256::digest(components.join("/").as_bytes());
    let mut hash = hex::encode_upper(digest);
    hash.truncate(HASH_LEN);
    hash
}
