use serde::{Deserialize, Serialize};

/// A lab node as seen by the certificate subsystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Node kind (e.g. `srl`, `vr-csr`, `linux`)
    pub kind: String,

    /// Name of the node inside the topology
    pub short_name: String,

    /// Container name, usually `clab-<lab>-<short_name>`
    pub long_name: String,

    /// Fully qualified name
    pub fqdn: String,
}

impl NodeInfo {
    /// Describe a node of `lab` with the standard naming scheme.
    pub fn new(lab: &str, short_name: &str, kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            short_name: short_name.to_string(),
            long_name: format!("clab-{lab}-{short_name}"),
            fqdn: format!("{short_name}.{lab}.io"),
        }
    }
}
