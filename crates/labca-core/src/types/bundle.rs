use serde::{Deserialize, Serialize};

/// Key, CSR and certificate produced by one issuance, PEM encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateBundle {
    /// Private key (PKCS#8 PEM)
    pub key: Vec<u8>,

    /// Certificate signing request (PEM); empty when loaded back from disk
    pub csr: Vec<u8>,

    /// Signed certificate (PEM)
    pub cert: Vec<u8>,
}

impl CertificateBundle {
    /// Bundle from PEM strings.
    pub fn from_pem(key: String, csr: String, cert: String) -> Self {
        Self {
            key: key.into_bytes(),
            csr: csr.into_bytes(),
            cert: cert.into_bytes(),
        }
    }

    /// Certificate as text, if it is valid UTF-8
    #[must_use]
    pub fn cert_pem(&self) -> Option<&str> {
        std::str::from_utf8(&self.cert).ok()
    }

    /// Private key as text, if it is valid UTF-8
    #[must_use]
    pub fn key_pem(&self) -> Option<&str> {
        std::str::from_utf8(&self.key).ok()
    }
}
