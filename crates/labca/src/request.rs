//! Parsed certificate request documents.
//!
//! The rendered template is a cfssl-shaped JSON document. It is parsed into
//! a [`CertificateRequest`], which carries default key parameters when the
//! document leaves them out, and is checked by [`validate`] before any key
//! is generated.

use std::fmt;

use labca_core::{LabCaError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Validity of the root CA when the request does not set one (5 years).
pub const DEFAULT_CA_EXPIRY: &str = "43800h";

/// Validity of leaf certificates when neither input nor profile set one (1 year).
pub const DEFAULT_LEAF_EXPIRY: &str = "8760h";

/// Key algorithm of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgo {
    /// ECDSA on P-256 or P-384
    #[default]
    Ecdsa,
    /// RSA with 2048, 3072 or 4096 bit modulus
    Rsa,
}

impl fmt::Display for KeyAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ecdsa => f.write_str("ecdsa"),
            Self::Rsa => f.write_str("rsa"),
        }
    }
}

/// Key parameters of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpec {
    /// Algorithm family
    pub algo: KeyAlgo,
    /// Key size in bits (curve size for ECDSA)
    pub size: u32,
}

impl Default for KeySpec {
    fn default() -> Self {
        Self {
            algo: KeyAlgo::Ecdsa,
            size: 256,
        }
    }
}

impl KeySpec {
    /// Check that the algorithm/size pair is one the PKI backend can produce.
    pub fn check(&self) -> Result<()> {
        let supported = match self.algo {
            KeyAlgo::Ecdsa => matches!(self.size, 256 | 384),
            KeyAlgo::Rsa => matches!(self.size, 2048 | 3072 | 4096),
        };
        if supported {
            Ok(())
        } else {
            Err(LabCaError::InvalidRequest(format!(
                "unsupported key: {} {}",
                self.algo, self.size
            )))
        }
    }
}

/// One entry of the subject name block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
    /// Country
    #[serde(rename = "C", default)]
    pub country: String,
    /// State or province
    #[serde(rename = "ST", default)]
    pub state: String,
    /// Locality
    #[serde(rename = "L", default)]
    pub locality: String,
    /// Organization
    #[serde(rename = "O", default)]
    pub organization: String,
    /// Organizational unit
    #[serde(rename = "OU", default)]
    pub organization_unit: String,
}

impl Name {
    /// True when every field is blank
    pub fn is_empty(&self) -> bool {
        [
            &self.country,
            &self.state,
            &self.locality,
            &self.organization,
            &self.organization_unit,
        ]
        .iter()
        .all(|v| v.trim().is_empty())
    }
}

/// CA section of a root request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaSection {
    /// Validity, Go duration syntax
    #[serde(default)]
    pub expiry: String,
    /// Maximum number of intermediates below this CA
    #[serde(default)]
    pub pathlen: Option<u8>,
}

/// A concrete certificate request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRequest {
    /// Common name
    #[serde(rename = "CN", default)]
    pub common_name: String,

    /// Key parameters
    #[serde(default)]
    pub key: KeySpec,

    /// Subject name block
    #[serde(default)]
    pub names: Vec<Name>,

    /// Subject alternative names
    #[serde(default)]
    pub hosts: Vec<String>,

    /// Present on CA requests only
    #[serde(default)]
    pub ca: Option<CaSection>,
}

impl CertificateRequest {
    /// Parse a rendered template.
    pub fn from_document(doc: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(doc)?)
    }

    /// CA validity requested by the document, or the default.
    pub fn ca_expiry(&self) -> Result<time::Duration> {
        let expiry = self
            .ca
            .as_ref()
            .map(|ca| ca.expiry.trim())
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_CA_EXPIRY);
        parse_expiry(expiry)
    }
}

/// What to do with a leaf request that has no hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostPolicy {
    /// Log a warning and issue anyway
    #[default]
    Warn,
    /// Refuse to issue
    Reject,
}

/// Structural checks run before key generation.
///
/// A request needs a common name, or else a non-empty names block in which
/// no entry is blank. Key parameters must be supported.
pub fn validate(req: &CertificateRequest) -> Result<()> {
    req.key.check()?;

    if !req.common_name.trim().is_empty() {
        return Ok(());
    }
    if req.names.is_empty() {
        return Err(LabCaError::InvalidRequest(
            "missing subject information".into(),
        ));
    }
    if req.names.iter().any(Name::is_empty) {
        return Err(LabCaError::InvalidRequest("empty name".into()));
    }
    Ok(())
}

/// Apply the host policy to a leaf request.
pub fn check_hosts(req: &CertificateRequest, policy: HostPolicy) -> Result<()> {
    if !req.hosts.iter().all(|h| h.trim().is_empty()) {
        return Ok(());
    }
    match policy {
        HostPolicy::Warn => {
            warn!(
                common_name = %req.common_name,
                "request has no hosts; the certificate will not be usable for websites"
            );
            Ok(())
        }
        HostPolicy::Reject => Err(LabCaError::InvalidRequest(format!(
            "request for {} has no hosts",
            req.common_name
        ))),
    }
}

/// Longest accepted expiry, the range of a Go duration (about 292 years).
const MAX_EXPIRY_SECS: i64 = i64::MAX / 1_000_000_000;

/// Parse a Go-style duration (`262800h`, `1h30m`, `90s`).
pub fn parse_expiry(s: &str) -> Result<time::Duration> {
    let bad = || LabCaError::Template(format!("invalid expiry {s:?}"));

    let mut total: i64 = 0;
    let mut digits = String::new();
    for ch in s.trim().chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let unit = match ch {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => return Err(bad()),
        };
        let value: i64 = digits.parse().map_err(|_| bad())?;
        total = value
            .checked_mul(unit)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(bad)?;
        digits.clear();
    }
    if !digits.is_empty() || total == 0 || total > MAX_EXPIRY_SECS {
        return Err(bad());
    }
    Ok(time::Duration::seconds(total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_gets_default() {
        let req = CertificateRequest::from_document(br#"{"CN": "leaf1"}"#).unwrap();
        assert_eq!(req.key, KeySpec::default());
        assert!(req.hosts.is_empty());
        assert!(req.ca.is_none());
    }

    #[test]
    fn test_parse_full_document() {
        let doc = br#"{
            "CN": "lab Root CA",
            "key": {"algo": "rsa", "size": 2048},
            "names": [{"C": "BE", "L": "Antwerp", "O": "Nokia", "OU": "Container lab"}],
            "ca": {"expiry": "262800h"}
        }"#;
        let req = CertificateRequest::from_document(doc).unwrap();

        assert_eq!(req.key.algo, KeyAlgo::Rsa);
        assert_eq!(req.names[0].locality, "Antwerp");
        assert_eq!(req.ca_expiry().unwrap(), time::Duration::hours(262_800));
    }

    #[test]
    fn test_garbage_document_is_template_error() {
        let err = CertificateRequest::from_document(b"{\"CN\": ").unwrap_err();
        assert!(matches!(err, LabCaError::Template(_)));
    }

    #[test]
    fn test_ca_expiry_default() {
        let req = CertificateRequest {
            ca: Some(CaSection::default()),
            ..Default::default()
        };
        assert_eq!(req.ca_expiry().unwrap(), time::Duration::hours(43_800));
    }

    #[test]
    fn test_validator() {
        let mut req = CertificateRequest::default();
        assert!(validate(&req).is_err());

        req.names.push(Name::default());
        assert!(validate(&req).is_err());

        req.names[0].country = "BE".into();
        assert!(validate(&req).is_ok());

        let named = CertificateRequest {
            common_name: "leaf1".into(),
            ..Default::default()
        };
        assert!(validate(&named).is_ok());
    }

    #[test]
    fn test_unsupported_key_rejected() {
        let req = CertificateRequest {
            common_name: "leaf1".into(),
            key: KeySpec {
                algo: KeyAlgo::Rsa,
                size: 1024,
            },
            ..Default::default()
        };
        assert!(matches!(
            validate(&req),
            Err(LabCaError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_host_policy() {
        let req = CertificateRequest {
            common_name: "leaf1".into(),
            ..Default::default()
        };
        assert!(check_hosts(&req, HostPolicy::Warn).is_ok());
        assert!(check_hosts(&req, HostPolicy::Reject).is_err());

        let with_hosts = CertificateRequest {
            hosts: vec!["leaf1".into()],
            ..req
        };
        assert!(check_hosts(&with_hosts, HostPolicy::Reject).is_ok());
    }

    #[test]
    fn test_parse_expiry() {
        assert_eq!(parse_expiry("8760h").unwrap(), time::Duration::hours(8760));
        assert_eq!(
            parse_expiry("1h30m").unwrap(),
            time::Duration::minutes(90)
        );
        assert!(parse_expiry("").is_err());
        assert!(parse_expiry("10").is_err());
        assert!(parse_expiry("5d").is_err());
    }

    #[test]
    fn test_parse_expiry_bounded() {
        assert!(parse_expiry("2562047h").is_ok());
        assert!(parse_expiry("2562048h").is_err());
        assert!(parse_expiry("100000000h").is_err());
    }
}
