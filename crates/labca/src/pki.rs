//! Cryptographic primitives behind a narrow capability trait.
//!
//! Everything above this module deals in PEM text only. [`RcgenPki`] is the
//! production backend; tests may substitute their own [`Pki`].

use std::path::Path;

use labca_core::{CryptoStage, LabCaError, Result};
use rcgen::{
    BasicConstraints, CertificateParams, CertificateSigningRequestParams, DistinguishedName,
    DnType, ExtendedKeyUsagePurpose, IsCa, Issuer, KeyPair, KeyUsagePurpose,
};
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use uuid::Uuid;

use crate::request::{CertificateRequest, KeyAlgo, KeySpec};

/// Not-before is moved back by this much to tolerate clock skew between lab hosts.
const BACKDATE: time::Duration = time::Duration::minutes(5);

/// Root CA material used for local signing.
#[derive(Clone)]
pub struct LocalSigner {
    cert_pem: String,
    key_pem: String,
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner").finish_non_exhaustive()
    }
}

impl LocalSigner {
    /// Signer from PEM text.
    pub fn new(cert_pem: impl Into<String>, key_pem: impl Into<String>) -> Self {
        Self {
            cert_pem: cert_pem.into(),
            key_pem: key_pem.into(),
        }
    }

    /// Read the root CA certificate and key from disk.
    pub fn from_files(cert_path: &Path, key_path: &Path) -> Result<Self> {
        let read = |path: &Path| {
            std::fs::read_to_string(path).map_err(|e| {
                LabCaError::crypto(
                    CryptoStage::SignerConstruction,
                    format!("cannot read {}: {e}", path.display()),
                )
            })
        };
        Ok(Self::new(read(cert_path)?, read(key_path)?))
    }

    /// CA certificate PEM
    pub fn cert_pem(&self) -> &str {
        &self.cert_pem
    }

    /// CA private key PEM
    pub fn key_pem(&self) -> &str {
        &self.key_pem
    }
}

/// A CSR to be signed by the lab CA.
#[derive(Debug, Clone)]
pub struct SignRequest {
    /// PEM encoded CSR
    pub csr_pem: String,
    /// SAN entries placed in the certificate; IP literals become IP SANs
    pub hosts: Vec<String>,
    /// Certificate lifetime
    pub validity: time::Duration,
}

/// Key generation, request construction and signing.
pub trait Pki {
    /// Generate a private key, returned as PKCS#8 PEM.
    fn generate_key_pair(&self, spec: &KeySpec) -> Result<String>;

    /// Build a CSR for `req` signed by `key_pem`.
    fn build_request(&self, req: &CertificateRequest, key_pem: &str) -> Result<String>;

    /// Self-sign a CA certificate for `req`.
    fn self_sign(&self, req: &CertificateRequest, key_pem: &str) -> Result<String>;

    /// Sign a leaf certificate with the CA held by `signer`.
    fn sign_with_ca(&self, req: &SignRequest, signer: &LocalSigner) -> Result<String>;
}

/// [`Pki`] backed by rcgen, with RSA keys generated by the `rsa` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RcgenPki;

impl RcgenPki {
    fn load_key(key_pem: &str, stage: CryptoStage) -> Result<KeyPair> {
        KeyPair::from_pem(key_pem)
            .map_err(|e| LabCaError::crypto(stage, format!("failed to load private key: {e}")))
    }

    fn params_for(req: &CertificateRequest, stage: CryptoStage) -> Result<CertificateParams> {
        let mut params = CertificateParams::new(req.hosts.clone())
            .map_err(|e| LabCaError::crypto(stage, format!("invalid host: {e}")))?;
        params.distinguished_name = distinguished_name(req);
        Ok(params)
    }
}

impl Pki for RcgenPki {
    fn generate_key_pair(&self, spec: &KeySpec) -> Result<String> {
        let stage = CryptoStage::KeyGeneration;
        spec.check()?;

        let key_pair = match (spec.algo, spec.size) {
            (KeyAlgo::Ecdsa, 384) => KeyPair::generate_for(&rcgen::PKCS_ECDSA_P384_SHA384),
            (KeyAlgo::Ecdsa, _) => KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256),
            (KeyAlgo::Rsa, bits) => {
                let mut rng = rand::thread_rng();
                let key = rsa::RsaPrivateKey::new(&mut rng, bits as usize)
                    .map_err(|e| LabCaError::crypto(stage, e))?;
                let pem = key
                    .to_pkcs8_pem(LineEnding::LF)
                    .map_err(|e| LabCaError::crypto(stage, e))?;
                // round-trip through rcgen so unusable keys fail here, not at signing
                Self::load_key(pem.as_str(), stage)?;
                return Ok(String::from(pem.as_str()));
            }
        };
        key_pair
            .map(|kp| kp.serialize_pem())
            .map_err(|e| LabCaError::crypto(stage, e))
    }

    fn build_request(&self, req: &CertificateRequest, key_pem: &str) -> Result<String> {
        let stage = CryptoStage::RequestBuild;
        let key = Self::load_key(key_pem, stage)?;
        let params = Self::params_for(req, stage)?;

        params
            .serialize_request(&key)
            .and_then(|csr| csr.pem())
            .map_err(|e| LabCaError::crypto(stage, e))
    }

    fn self_sign(&self, req: &CertificateRequest, key_pem: &str) -> Result<String> {
        let stage = CryptoStage::SelfSigning;
        let key = Self::load_key(key_pem, stage)?;
        let mut params = Self::params_for(req, stage)?;

        let pathlen = req.ca.as_ref().and_then(|ca| ca.pathlen);
        params.is_ca = IsCa::Ca(pathlen.map_or(BasicConstraints::Unconstrained, |n| {
            BasicConstraints::Constrained(n)
        }));
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let (not_before, not_after) = validity_window(req.ca_expiry()?)?;
        params.not_before = not_before;
        params.not_after = not_after;
        params.serial_number = Some(random_serial());

        params
            .self_signed(&key)
            .map(|cert| cert.pem())
            .map_err(|e| LabCaError::crypto(stage, e))
    }

    fn sign_with_ca(&self, req: &SignRequest, signer: &LocalSigner) -> Result<String> {
        let ca_key = Self::load_key(signer.key_pem(), CryptoStage::SignerConstruction)?;
        let issuer = Issuer::from_ca_cert_pem(signer.cert_pem(), ca_key).map_err(|e| {
            LabCaError::crypto(
                CryptoStage::SignerConstruction,
                format!("failed to load CA certificate: {e}"),
            )
        })?;

        let stage = CryptoStage::Signing;
        let mut csr = CertificateSigningRequestParams::from_pem(&req.csr_pem)
            .map_err(|e| LabCaError::crypto(stage, format!("failed to parse CSR: {e}")))?;

        if !req.hosts.is_empty() {
            csr.params.subject_alt_names = CertificateParams::new(req.hosts.clone())
                .map_err(|e| LabCaError::crypto(stage, format!("invalid host: {e}")))?
                .subject_alt_names;
        }
        csr.params.is_ca = IsCa::NoCa;
        csr.params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        csr.params.extended_key_usages = vec![
            ExtendedKeyUsagePurpose::ServerAuth,
            ExtendedKeyUsagePurpose::ClientAuth,
        ];
        csr.params.use_authority_key_identifier_extension = true;
        let (not_before, not_after) = validity_window(req.validity)?;
        csr.params.not_before = not_before;
        csr.params.not_after = not_after;
        csr.params.serial_number = Some(random_serial());

        csr.signed_by(&issuer)
            .map(|cert| cert.pem())
            .map_err(|e| LabCaError::crypto(stage, e))
    }
}

fn distinguished_name(req: &CertificateRequest) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    if !req.common_name.is_empty() {
        dn.push(DnType::CommonName, req.common_name.as_str());
    }
    for name in &req.names {
        let fields = [
            (DnType::CountryName, &name.country),
            (DnType::StateOrProvinceName, &name.state),
            (DnType::LocalityName, &name.locality),
            (DnType::OrganizationName, &name.organization),
            (DnType::OrganizationalUnitName, &name.organization_unit),
        ];
        for (ty, value) in fields {
            if !value.is_empty() {
                dn.push(ty, value.as_str());
            }
        }
    }
    dn
}

fn validity_window(
    lifetime: time::Duration,
) -> Result<(time::OffsetDateTime, time::OffsetDateTime)> {
    let now = time::OffsetDateTime::now_utc();
    let not_after = now
        .checked_add(lifetime)
        .ok_or_else(|| LabCaError::Template(format!(
            "invalid expiry {}h: out of range",
            lifetime.whole_hours()
        )))?;
    Ok((now - BACKDATE, not_after))
}

fn random_serial() -> rcgen::SerialNumber {
    let serial = Uuid::new_v4();
    // clear the top bit so the DER integer stays positive
    (serial.as_u128() as u64 & (u64::MAX >> 1)).into()
}
