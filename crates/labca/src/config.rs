//! Lab CA configuration.

use std::path::{Path, PathBuf};

use labca_core::{LabCaError, Result, Subject};
use serde::{Deserialize, Serialize};

use crate::issuer::IssueOptions;
use crate::policy::{KindPolicy, DEFAULT_CA_KINDS};
use crate::request::{self, HostPolicy, DEFAULT_LEAF_EXPIRY};
use crate::template::CsrTemplate;

/// Root CA validity written into the built-in root template (30 years).
pub const DEFAULT_ROOT_EXPIRY: &str = "262800h";

/// Settings shared by every lab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabCaConfig {
    /// Subject fields of every certificate
    #[serde(default)]
    pub identity: Subject,

    /// Root CA validity, Go duration syntax
    #[serde(default = "default_ca_expiry")]
    pub ca_expiry: String,

    /// Leaf validity when the node does not set one
    #[serde(default = "default_leaf_expiry")]
    pub leaf_expiry: String,

    /// What to do with leaf requests that carry no hosts
    #[serde(default)]
    pub host_policy: HostPolicy,

    /// Node kinds that get a leaf certificate
    #[serde(default = "default_ca_kinds")]
    pub ca_kinds: Vec<String>,

    /// Root CSR template file replacing the built-in one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_template: Option<PathBuf>,

    /// Node CSR template file replacing the built-in one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_template: Option<PathBuf>,
}

impl Default for LabCaConfig {
    fn default() -> Self {
        Self {
            identity: Subject::default(),
            ca_expiry: default_ca_expiry(),
            leaf_expiry: default_leaf_expiry(),
            host_policy: HostPolicy::default(),
            ca_kinds: default_ca_kinds(),
            root_template: None,
            node_template: None,
        }
    }
}

impl LabCaConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| LabCaError::io(path, e))?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and check a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| LabCaError::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    /// Reject expiry strings that would only fail at signing time.
    pub fn check(&self) -> Result<()> {
        for (field, value) in [("ca_expiry", &self.ca_expiry), ("leaf_expiry", &self.leaf_expiry)] {
            request::parse_expiry(value)
                .map_err(|e| LabCaError::Config(format!("{field}: {e}")))?;
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| LabCaError::Config(e.to_string()))
    }

    pub fn kind_policy(&self) -> KindPolicy {
        KindPolicy::new(self.ca_kinds.iter().cloned())
    }

    pub fn issue_options(&self) -> IssueOptions {
        IssueOptions {
            host_policy: self.host_policy,
            leaf_expiry: self.leaf_expiry.clone(),
        }
    }

    /// Configured root template, or the built-in one.
    pub fn root_template(&self) -> Result<CsrTemplate> {
        self.root_template
            .as_deref()
            .map_or_else(|| Ok(CsrTemplate::default_root()), |p| CsrTemplate::from_file("ca-csr", p))
    }

    /// Configured node template, or the built-in one.
    pub fn node_template(&self) -> Result<CsrTemplate> {
        self.node_template
            .as_deref()
            .map_or_else(|| Ok(CsrTemplate::default_node()), |p| CsrTemplate::from_file("node-csr", p))
    }
}

// Default value functions for serde.
fn default_ca_expiry() -> String {
    String::from(DEFAULT_ROOT_EXPIRY)
}

fn default_leaf_expiry() -> String {
    String::from(DEFAULT_LEAF_EXPIRY)
}

fn default_ca_kinds() -> Vec<String> {
    DEFAULT_CA_KINDS.iter().map(ToString::to_string).collect()
}
