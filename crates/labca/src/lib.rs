//! # labca
//!
//! Per-lab certificate authority for container network labs.
//!
//! ## Flow
//!
//! ```text
//! nodes ──► KindPolicy::is_ca_required ──no──► nothing written
//!                    │ yes
//!                    ▼
//!            ensure_root_ca            <lab>/ca/root/root-ca{.pem,-key.pem,.csr}
//!                    │ (once, before any issuance)
//!                    ▼
//!     issue_node_certificate × N       <lab>/ca/<node>/<node>{.pem,-key.pem,.csr}
//!                    │
//!                    ▼
//!              store::load             cert + key read back on demand
//! ```
//!
//! Bootstrap is idempotent and keyed on file existence. Issuance for
//! distinct nodes can run in parallel once the root exists.
//!
//! ## Example
//!
//! ```rust,ignore
//! use labca::{FailureMode, LabDirs, LabPki};
//! use labca_core::NodeInfo;
//!
//! let lab = LabPki::new("test", LabDirs::for_lab(workdir, "test"));
//! let nodes = vec![
//!     NodeInfo::new("test", "r1", "linux"),
//!     NodeInfo::new("test", "r2", "srl"),
//! ];
//! let report = lab.provision(&nodes, FailureMode::Abort)?;
//! let bundle = lab.load("r2")?;
//! ```

pub mod bootstrap;
pub mod config;
pub mod inspect;
pub mod issuer;
pub mod lab;
pub mod nodes;
pub mod pki;
pub mod policy;
pub mod request;
pub mod store;
pub mod template;

#[cfg(test)]
mod testing;

pub use bootstrap::{ensure_root_ca, RootCa};
pub use config::LabCaConfig;
pub use issuer::{issue_node_certificate, IssueOptions};
pub use lab::{FailureMode, LabDirs, LabPki, NodeFailure, ProvisionReport};
pub use nodes::{MgmtNet, NodeAdapter, NodeConfig, NodeDescriptor, NodeRegistry};
pub use pki::{LocalSigner, Pki, RcgenPki};
pub use policy::KindPolicy;
pub use request::HostPolicy;
pub use store::CertPaths;
pub use template::CsrTemplate;
