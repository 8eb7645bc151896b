//! Which nodes need a certificate from the lab CA.

use std::collections::BTreeSet;

use labca_core::NodeInfo;
use serde::{Deserialize, Serialize};

/// Node kinds that get CA-issued certificates by default.
pub const DEFAULT_CA_KINDS: &[&str] = &["srl"];

/// Allow-list of node kinds requiring TLS trust from the lab CA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KindPolicy {
    ca_kinds: BTreeSet<String>,
}

impl Default for KindPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CA_KINDS.iter().copied())
    }
}

impl KindPolicy {
    /// Policy over an explicit set of kinds.
    pub fn new<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ca_kinds: kinds.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether nodes of `kind` get a leaf certificate.
    pub fn requires_ca(&self, kind: &str) -> bool {
        self.ca_kinds.contains(kind)
    }

    /// True iff at least one node needs the lab CA.
    pub fn is_ca_required<'a, I>(&self, nodes: I) -> bool
    where
        I: IntoIterator<Item = &'a NodeInfo>,
    {
        nodes.into_iter().any(|n| self.requires_ca(&n.kind))
    }

    /// Nodes that need a leaf certificate, in input order.
    pub fn qualifying<'a>(&self, nodes: &'a [NodeInfo]) -> Vec<&'a NodeInfo> {
        nodes.iter().filter(|n| self.requires_ca(&n.kind)).collect()
    }

    /// Configured kinds, sorted.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.ca_kinds.iter().map(String::as_str)
    }
}
