//! Core types and errors shared by the labca crates.
//!
//! - **Types**: identity inputs for the root CA and for lab nodes, the
//!   key/CSR/certificate bundle, node descriptions and parsed certificate
//!   metadata
//! - **Errors**: [`LabCaError`] with the kinds callers branch on
//!
//! # Example
//!
//! ```rust,ignore
//! use labca_core::{CertificateInput, NodeInfo, Subject};
//!
//! let node = NodeInfo::new("lab1", "leaf1", "srl");
//! let input = CertificateInput::for_node(&node, "lab1", &Subject::default());
//! assert_eq!(input.fqdn, "leaf1.lab1.io");
//! ```

mod error;
pub mod types;

pub use error::{CryptoStage, LabCaError, Result};
pub use types::*;
