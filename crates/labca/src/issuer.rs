//! Leaf certificate issuance for lab nodes.

use std::path::Path;

use labca_core::{CertificateBundle, CertificateInput, LabCaError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::pki::{LocalSigner, Pki, SignRequest};
use crate::request::{self, CertificateRequest, HostPolicy, DEFAULT_LEAF_EXPIRY};
use crate::store;
use crate::template::CsrTemplate;

/// Knobs for leaf issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueOptions {
    /// Handling of requests without hosts
    #[serde(default)]
    pub host_policy: HostPolicy,

    /// Leaf validity when the input does not set one, Go duration syntax
    #[serde(default = "default_leaf_expiry")]
    pub leaf_expiry: String,
}

fn default_leaf_expiry() -> String {
    String::from(DEFAULT_LEAF_EXPIRY)
}

impl Default for IssueOptions {
    fn default() -> Self {
        Self {
            host_policy: HostPolicy::default(),
            leaf_expiry: default_leaf_expiry(),
        }
    }
}

/// Issue a certificate for `input`, signed by the root CA on disk, and store
/// it as `target_dir/<input.name>*`.
///
/// Failures affect this node only; the CA and other nodes are untouched.
pub fn issue_node_certificate<P: Pki + ?Sized>(
    root_cert_path: &Path,
    root_key_path: &Path,
    template: &CsrTemplate,
    input: &CertificateInput,
    target_dir: &Path,
    options: &IssueOptions,
    pki: &P,
) -> Result<CertificateBundle> {
    if input.name.trim().is_empty() {
        return Err(LabCaError::InvalidRequest(
            "certificate input has no name".into(),
        ));
    }
    store::check_name(&input.name)?;

    let doc = template.render(input)?;
    let req = CertificateRequest::from_document(&doc)?;
    request::validate(&req)?;
    request::check_hosts(&req, options.host_policy)?;

    let expiry = if input.expiry.trim().is_empty() {
        options.leaf_expiry.as_str()
    } else {
        input.expiry.as_str()
    };
    let validity = request::parse_expiry(expiry)?;

    let signer = LocalSigner::from_files(root_cert_path, root_key_path)?;

    let key = pki.generate_key_pair(&req.key)?;
    let csr = pki.build_request(&req, &key)?;
    let cert = pki.sign_with_ca(
        &SignRequest {
            csr_pem: csr.clone(),
            hosts: req.hosts.clone(),
            validity,
        },
        &signer,
    )?;

    let bundle = CertificateBundle::from_pem(key, csr, cert);
    let paths = store::persist(&bundle, &target_dir.join(&input.name))?;

    info!(node = %input.name, path = %paths.cert.display(), "issued node certificate");
    debug!(hosts = ?req.hosts, common_name = %req.common_name, "node certificate subject");
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::ensure_root_ca;
    use crate::inspect;
    use crate::pki::RcgenPki;
    use crate::store::CertPaths;
    use crate::testing::{ecdsa_node_template, ecdsa_root_template, CountingPki};
    use labca_core::{CaRootInput, CryptoStage, NodeInfo, Subject};
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    struct Lab {
        dir: TempDir,
        root: CertPaths,
    }

    impl Lab {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let input = CaRootInput::for_lab("test", &Subject::default(), "262800h");
            let root = ensure_root_ca(
                &dir.path().join("ca").join("root"),
                &ecdsa_root_template(),
                &input,
                &RcgenPki,
            )
            .unwrap()
            .paths;
            Self { dir, root }
        }

        fn ca_dir(&self) -> std::path::PathBuf {
            self.dir.path().join("ca")
        }

        fn issue(&self, input: &CertificateInput, pki: &dyn Pki) -> Result<CertificateBundle> {
            issue_node_certificate(
                &self.root.cert,
                &self.root.key,
                &ecdsa_node_template(),
                input,
                &self.ca_dir().join(&input.name),
                &IssueOptions::default(),
                pki,
            )
        }
    }

    fn input(name: &str) -> CertificateInput {
        CertificateInput::for_node(&NodeInfo::new("test", name, "srl"), "test", &Subject::default())
    }

    #[test]
    fn test_leaf_chains_to_root() {
        let lab = Lab::new();
        let bundle = lab.issue(&input("leaf1"), &RcgenPki).unwrap();

        let root_pem = std::fs::read_to_string(&lab.root.cert).unwrap();
        inspect::verify_issued_by(bundle.cert_pem().unwrap(), &root_pem).unwrap();

        let info = inspect::certificate_info(bundle.cert_pem().unwrap()).unwrap();
        assert!(!info.is_ca);
        assert!(info.subject.contains("leaf1.test.io"));
    }

    #[test]
    fn test_san_list_is_exactly_the_node_names() {
        let lab = Lab::new();
        let bundle = lab.issue(&input("leaf1"), &RcgenPki).unwrap();

        let info = inspect::certificate_info(bundle.cert_pem().unwrap()).unwrap();
        let sans: BTreeSet<_> = info.sans.into_iter().collect();
        let expected: BTreeSet<_> = ["leaf1", "clab-test-leaf1", "leaf1.test.io"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(sans, expected);
    }

    #[test]
    fn test_deterministic_layout() {
        let lab = Lab::new();
        lab.issue(&input("spine1"), &RcgenPki).unwrap();

        let mut names: Vec<_> = std::fs::read_dir(lab.ca_dir().join("spine1"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["spine1-key.pem", "spine1.csr", "spine1.pem"]);
    }

    #[test]
    fn test_persisted_files_match_bundle() {
        let lab = Lab::new();
        let bundle = lab.issue(&input("leaf2"), &RcgenPki).unwrap();

        let paths = CertPaths::node(&lab.ca_dir(), "leaf2");
        assert_eq!(std::fs::read(&paths.cert).unwrap(), bundle.cert);
        assert_eq!(std::fs::read(&paths.key).unwrap(), bundle.key);
        assert_eq!(std::fs::read(&paths.csr).unwrap(), bundle.csr);
    }

    #[test]
    fn test_expiry_override() {
        let lab = Lab::new();
        let mut leaf = input("leaf3");
        leaf.expiry = "48h".into();
        let bundle = lab.issue(&leaf, &RcgenPki).unwrap();

        let info = inspect::certificate_info(bundle.cert_pem().unwrap()).unwrap();
        let lifetime = info.not_after - info.not_before;
        assert!(lifetime <= chrono::Duration::hours(49));
        assert!(lifetime >= chrono::Duration::hours(48));
    }

    #[test]
    fn test_empty_hosts_warn_or_reject() {
        let lab = Lab::new();
        let template = CsrTemplate::new(
            "bare",
            r#"{"CN": "{{ name }}", "key": {"algo": "ecdsa", "size": 256}}"#,
        )
        .unwrap();
        let leaf = input("bare1");

        let issue = |policy: HostPolicy| {
            issue_node_certificate(
                &lab.root.cert,
                &lab.root.key,
                &template,
                &leaf,
                &lab.ca_dir().join("bare1"),
                &IssueOptions {
                    host_policy: policy,
                    ..IssueOptions::default()
                },
                &RcgenPki,
            )
        };

        assert!(matches!(
            issue(HostPolicy::Reject),
            Err(LabCaError::InvalidRequest(_))
        ));
        assert!(!lab.ca_dir().join("bare1").exists());
        assert!(issue(HostPolicy::Warn).is_ok());
    }

    #[test]
    fn test_missing_root_is_signer_error() {
        let dir = TempDir::new().unwrap();
        let root = CertPaths::root(dir.path());

        let err = issue_node_certificate(
            &root.cert,
            &root.key,
            &ecdsa_node_template(),
            &input("leaf1"),
            &dir.path().join("leaf1"),
            &IssueOptions::default(),
            &RcgenPki,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            LabCaError::Crypto {
                stage: CryptoStage::SignerConstruction,
                ..
            }
        ));
    }

    #[test]
    fn test_signing_failure_leaves_no_files() {
        let lab = Lab::new();
        let pki = CountingPki::failing(CryptoStage::Signing);

        let err = lab.issue(&input("leaf4"), &pki).unwrap_err();

        assert!(err.is_crypto());
        assert!(!lab.ca_dir().join("leaf4").exists());
    }

    #[test]
    fn test_unnamed_input_rejected() {
        let lab = Lab::new();
        let err = lab.issue(&CertificateInput::default(), &RcgenPki).unwrap_err();
        assert!(matches!(err, LabCaError::InvalidRequest(_)));
    }

    #[test]
    fn test_path_like_names_rejected() {
        let lab = Lab::new();
        for name in ["../escape", "a/b"] {
            let err = lab.issue(&input(name), &RcgenPki).unwrap_err();
            assert!(matches!(err, LabCaError::InvalidRequest(_)));
        }
        assert!(!lab.ca_dir().join("a").exists());
        assert!(!lab.ca_dir().parent().unwrap().join("escape").exists());
    }
}
