//! Root CA bootstrap.
//!
//! Creation is keyed on file existence alone: if both the root certificate
//! and key are on disk the CA counts as bootstrapped, whatever they contain.
//! Nothing is rolled back when a write fails half way, and a later call will
//! happily accept a cert/key pair left over from an unrelated run.
//!
//! Not safe to call concurrently for the same `lab_ca_root`; the
//! check-then-write sequence races. Callers bootstrap once and wait for it
//! before issuing node certificates in parallel.

use std::path::Path;

use labca_core::{CaRootInput, CertificateBundle, LabCaError, Result};
use tracing::{debug, info};

use crate::pki::Pki;
use crate::request::{self, CertificateRequest};
use crate::store::{self, CertPaths};
use crate::template::CsrTemplate;

/// Root CA of a lab.
#[derive(Debug, Clone)]
pub struct RootCa {
    /// Location of the root triple
    pub paths: CertPaths,
    /// Material generated by this call; `None` when the CA already existed
    pub generated: Option<CertificateBundle>,
}

impl RootCa {
    /// Whether this call created the CA
    pub const fn was_created(&self) -> bool {
        self.generated.is_some()
    }
}

/// Make sure `lab_ca_root` holds a root CA, creating it if needed.
pub fn ensure_root_ca<P: Pki + ?Sized>(
    lab_ca_root: &Path,
    template: &CsrTemplate,
    input: &CaRootInput,
    pki: &P,
) -> Result<RootCa> {
    let prefix = lab_ca_root.join(&input.name_prefix);
    let paths = CertPaths::from_prefix(&prefix);

    if paths.cert_and_key_exist() {
        debug!(path = %lab_ca_root.display(), "root CA already present, skipping creation");
        return Ok(RootCa {
            paths,
            generated: None,
        });
    }

    info!(path = %lab_ca_root.display(), lab = %input.prefix, "creating root CA");
    std::fs::create_dir_all(lab_ca_root).map_err(|e| LabCaError::io(lab_ca_root, e))?;

    let doc = template.render(input)?;
    let req = CertificateRequest::from_document(&doc)?;
    request::validate(&req)?;
    // fail on a bad expiry before spending time on key generation
    req.ca_expiry()?;

    let key = pki.generate_key_pair(&req.key)?;
    let csr = pki.build_request(&req, &key)?;
    let cert = pki.self_sign(&req, &key)?;

    debug!(csr = %csr, "root CSR");
    debug!(cert = %cert, "root certificate");

    let bundle = CertificateBundle::from_pem(key, csr, cert);
    let paths = store::persist(&bundle, &prefix)?;

    Ok(RootCa {
        paths,
        generated: Some(bundle),
    })
}
