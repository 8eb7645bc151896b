//! Test helpers: fast templates and an instrumented PKI backend.

use std::sync::atomic::{AtomicUsize, Ordering};

use labca_core::{CryptoStage, LabCaError, Result};

use crate::pki::{LocalSigner, Pki, RcgenPki, SignRequest};
use crate::request::{CertificateRequest, KeySpec};
use crate::template::{CsrTemplate, DEFAULT_NODE_TEMPLATE, DEFAULT_ROOT_TEMPLATE};

/// Built-in root template with an ECDSA key, so tests skip RSA key generation.
pub fn ecdsa_root_template() -> CsrTemplate {
    CsrTemplate::new("ca-csr", ecdsa(DEFAULT_ROOT_TEMPLATE)).unwrap()
}

/// Built-in node template with an ECDSA key.
pub fn ecdsa_node_template() -> CsrTemplate {
    CsrTemplate::new("node-csr", ecdsa(DEFAULT_NODE_TEMPLATE)).unwrap()
}

fn ecdsa(template: &str) -> String {
    template
        .replace(r#""algo": "rsa""#, r#""algo": "ecdsa""#)
        .replace(r#""size": 2048"#, r#""size": 256"#)
}

/// Counts calls into [`RcgenPki`] and can fail one stage on demand.
#[derive(Debug, Default)]
pub struct CountingPki {
    fail_at: Option<CryptoStage>,
    pub keys: AtomicUsize,
    pub requests: AtomicUsize,
    pub self_signs: AtomicUsize,
    pub signs: AtomicUsize,
}

impl CountingPki {
    pub fn failing(stage: CryptoStage) -> Self {
        Self {
            fail_at: Some(stage),
            ..Self::default()
        }
    }

    pub fn total_calls(&self) -> usize {
        [&self.keys, &self.requests, &self.self_signs, &self.signs]
            .iter()
            .map(|c| c.load(Ordering::SeqCst))
            .sum()
    }

    fn enter(&self, counter: &AtomicUsize, stage: CryptoStage) -> Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(stage) {
            return Err(LabCaError::crypto(stage, "injected failure"));
        }
        Ok(())
    }
}

impl Pki for CountingPki {
    fn generate_key_pair(&self, spec: &KeySpec) -> Result<String> {
        self.enter(&self.keys, CryptoStage::KeyGeneration)?;
        RcgenPki.generate_key_pair(spec)
    }

    fn build_request(&self, req: &CertificateRequest, key_pem: &str) -> Result<String> {
        self.enter(&self.requests, CryptoStage::RequestBuild)?;
        RcgenPki.build_request(req, key_pem)
    }

    fn self_sign(&self, req: &CertificateRequest, key_pem: &str) -> Result<String> {
        self.enter(&self.self_signs, CryptoStage::SelfSigning)?;
        RcgenPki.self_sign(req, key_pem)
    }

    fn sign_with_ca(&self, req: &SignRequest, signer: &LocalSigner) -> Result<String> {
        self.enter(&self.signs, CryptoStage::Signing)?;
        RcgenPki.sign_with_ca(req, signer)
    }
}
