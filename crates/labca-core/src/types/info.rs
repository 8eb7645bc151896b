use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata parsed out of a PEM certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateInfo {
    /// Subject distinguished name
    pub subject: String,

    /// Issuer distinguished name
    pub issuer: String,

    /// Serial number (hex)
    pub serial: String,

    /// Not valid before
    pub not_before: DateTime<Utc>,

    /// Not valid after
    pub not_after: DateTime<Utc>,

    /// Subject alternative names (DNS names and IP addresses)
    #[serde(default)]
    pub sans: Vec<String>,

    /// Whether the certificate may sign other certificates
    pub is_ca: bool,
}

impl CertificateInfo {
    /// Returns true if `now` is past the end of the validity window
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.not_after
    }

    /// Returns true if the certificate is its own issuer
    #[must_use]
    pub fn is_self_issued(&self) -> bool {
        self.subject == self.issuer
    }
}
