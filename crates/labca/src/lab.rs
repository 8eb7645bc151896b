//! Per-lab entry point tying policy, bootstrap, issuance and retrieval
//! together.

use std::path::{Path, PathBuf};

use labca_core::{
    CaRootInput, CertificateBundle, CertificateInput, LabCaError, NodeInfo, Result, Subject,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::bootstrap::{self, RootCa};
use crate::config::{LabCaConfig, DEFAULT_ROOT_EXPIRY};
use crate::issuer::{self, IssueOptions};
use crate::pki::{Pki, RcgenPki};
use crate::policy::KindPolicy;
use crate::store::{self, CertPaths};
use crate::template::CsrTemplate;

/// Certificate directories of one lab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabDirs {
    /// Holds the root CA triple
    pub ca_root: PathBuf,
    /// Holds one sub-directory per node
    pub ca_dir: PathBuf,
}

impl LabDirs {
    /// `<workdir>/clab-<lab>/ca` with the root CA in `ca/root`.
    pub fn for_lab(workdir: &Path, lab: &str) -> Self {
        let ca_dir = workdir.join(format!("clab-{lab}")).join("ca");
        Self {
            ca_root: ca_dir.join("root"),
            ca_dir,
        }
    }
}

/// What `provision` does when one node fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Return the first error
    #[default]
    Abort,
    /// Record the failure and go on with the next node
    Continue,
}

/// A node whose certificate could not be issued.
#[derive(Debug)]
pub struct NodeFailure {
    pub node: String,
    pub error: LabCaError,
}

/// Outcome of [`LabPki::provision`].
#[derive(Debug, Default)]
pub struct ProvisionReport {
    /// Root CA; `None` when no node required one
    pub root: Option<RootCa>,
    /// Nodes that got a certificate, in input order
    pub issued: Vec<String>,
    pub failed: Vec<NodeFailure>,
}

impl ProvisionReport {
    pub const fn ca_required(&self) -> bool {
        self.root.is_some()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Certificate authority of one lab.
#[derive(Debug)]
pub struct LabPki<P: Pki = RcgenPki> {
    lab: String,
    dirs: LabDirs,
    subject: Subject,
    ca_expiry: String,
    root_template: CsrTemplate,
    node_template: CsrTemplate,
    options: IssueOptions,
    policy: KindPolicy,
    pki: P,
}

impl LabPki<RcgenPki> {
    /// Lab CA with built-in templates and default settings.
    pub fn new(lab: impl Into<String>, dirs: LabDirs) -> Self {
        Self {
            lab: lab.into(),
            dirs,
            subject: Subject::default(),
            ca_expiry: String::from(DEFAULT_ROOT_EXPIRY),
            root_template: CsrTemplate::default_root(),
            node_template: CsrTemplate::default_node(),
            options: IssueOptions::default(),
            policy: KindPolicy::default(),
            pki: RcgenPki,
        }
    }

    /// Lab CA using the settings and templates of `config`.
    pub fn from_config(lab: impl Into<String>, dirs: LabDirs, config: &LabCaConfig) -> Result<Self> {
        Ok(Self {
            subject: config.identity.clone(),
            ca_expiry: config.ca_expiry.clone(),
            root_template: config.root_template()?,
            node_template: config.node_template()?,
            options: config.issue_options(),
            policy: config.kind_policy(),
            ..Self::new(lab, dirs)
        })
    }
}

impl<P: Pki> LabPki<P> {
    /// Swap the crypto backend.
    pub fn with_pki<Q: Pki>(self, pki: Q) -> LabPki<Q> {
        LabPki {
            lab: self.lab,
            dirs: self.dirs,
            subject: self.subject,
            ca_expiry: self.ca_expiry,
            root_template: self.root_template,
            node_template: self.node_template,
            options: self.options,
            policy: self.policy,
            pki,
        }
    }

    #[must_use]
    pub fn with_templates(mut self, root: CsrTemplate, node: CsrTemplate) -> Self {
        self.root_template = root;
        self.node_template = node;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: KindPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: IssueOptions) -> Self {
        self.options = options;
        self
    }

    pub fn lab(&self) -> &str {
        &self.lab
    }

    pub const fn dirs(&self) -> &LabDirs {
        &self.dirs
    }

    pub const fn policy(&self) -> &KindPolicy {
        &self.policy
    }

    pub const fn pki(&self) -> &P {
        &self.pki
    }

    /// Root CA identity of this lab.
    pub fn root_input(&self) -> CaRootInput {
        CaRootInput::for_lab(&self.lab, &self.subject, &self.ca_expiry)
    }

    /// Leaf identity of `node`.
    pub fn node_input(&self, node: &NodeInfo) -> CertificateInput {
        CertificateInput::for_node(node, &self.lab, &self.subject)
    }

    pub fn root_paths(&self) -> CertPaths {
        CertPaths::root(&self.dirs.ca_root)
    }

    /// Create the lab root CA unless it is already on disk.
    pub fn ensure_root_ca(&self, input: &CaRootInput) -> Result<RootCa> {
        bootstrap::ensure_root_ca(&self.dirs.ca_root, &self.root_template, input, &self.pki)
    }

    /// Issue and store the certificate of `node`.
    ///
    /// The root CA must exist.
    pub fn issue_node_certificate(&self, node: &NodeInfo) -> Result<CertificateBundle> {
        self.issue(&self.node_input(node))
    }

    /// Issue from a hand-built input, e.g. one with extra hosts.
    pub fn issue(&self, input: &CertificateInput) -> Result<CertificateBundle> {
        let root = self.root_paths();
        issuer::issue_node_certificate(
            &root.cert,
            &root.key,
            &self.node_template,
            input,
            &store::node_dir(&self.dirs.ca_dir, &input.name),
            &self.options,
            &self.pki,
        )
    }

    /// Previously issued certificate and key of `name`.
    pub fn load(&self, name: &str) -> Result<CertificateBundle> {
        store::load(name, &self.dirs.ca_dir)
    }

    /// Bootstrap the CA if any node needs it, then issue every qualifying
    /// node in order.
    ///
    /// Nothing is written when no node requires the CA.
    pub fn provision(&self, nodes: &[NodeInfo], mode: FailureMode) -> Result<ProvisionReport> {
        let qualifying = self.policy.qualifying(nodes);
        if qualifying.is_empty() {
            info!(lab = %self.lab, nodes = nodes.len(), "no node requires the lab CA");
            return Ok(ProvisionReport::default());
        }

        let mut report = ProvisionReport {
            root: Some(self.ensure_root_ca(&self.root_input())?),
            ..ProvisionReport::default()
        };

        for node in qualifying {
            match self.issue_node_certificate(node) {
                Ok(_) => report.issued.push(node.short_name.clone()),
                Err(e) if mode == FailureMode::Continue => {
                    warn!(node = %node.short_name, error = %e, "certificate issuance failed");
                    report.failed.push(NodeFailure {
                        node: node.short_name.clone(),
                        error: e,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            lab = %self.lab,
            issued = report.issued.len(),
            failed = report.failed.len(),
            "lab certificates provisioned"
        );
        Ok(report)
    }
}
