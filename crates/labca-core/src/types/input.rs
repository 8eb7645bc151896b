use serde::{Deserialize, Serialize};

use super::NodeInfo;

/// File name prefix of the root CA triple.
pub const ROOT_CA_NAME_PREFIX: &str = "root-ca";

/// Subject name block shared by every certificate of a lab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Country code (C)
    #[serde(default)]
    pub country: String,

    /// Locality (L)
    #[serde(default)]
    pub locality: String,

    /// Organization (O)
    #[serde(default)]
    pub organization: String,

    /// Organizational unit (OU)
    #[serde(default)]
    pub organization_unit: String,
}

impl Default for Subject {
    fn default() -> Self {
        Self {
            country: String::from("BE"),
            locality: String::from("Antwerp"),
            organization: String::from("Nokia"),
            organization_unit: String::from("Container lab"),
        }
    }
}

/// Identity fields for one leaf certificate.
///
/// Serialized field names are the placeholders available to CSR templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateInput {
    /// Extra SAN entries, appended after the node names
    #[serde(default)]
    pub hosts: Vec<String>,

    /// Explicit common name; templates usually derive it from `name`
    #[serde(default)]
    pub common_name: String,

    /// Country code (C)
    #[serde(default)]
    pub country: String,

    /// Locality (L)
    #[serde(default)]
    pub locality: String,

    /// Organization (O)
    #[serde(default)]
    pub organization: String,

    /// Organizational unit (OU)
    #[serde(default)]
    pub organization_unit: String,

    /// Validity override, Go duration syntax (`8760h`); empty uses the signing profile
    #[serde(default)]
    pub expiry: String,

    /// Node short name; also the file name prefix
    pub name: String,

    /// Node container name
    #[serde(default)]
    pub long_name: String,

    /// Node fully qualified name
    #[serde(default)]
    pub fqdn: String,

    /// Lab name
    #[serde(default)]
    pub prefix: String,
}

impl CertificateInput {
    /// Identity of a lab node.
    pub fn for_node(node: &NodeInfo, prefix: &str, subject: &Subject) -> Self {
        Self {
            hosts: Vec::new(),
            common_name: String::new(),
            country: subject.country.clone(),
            locality: subject.locality.clone(),
            organization: subject.organization.clone(),
            organization_unit: subject.organization_unit.clone(),
            expiry: String::new(),
            name: node.short_name.clone(),
            long_name: node.long_name.clone(),
            fqdn: node.fqdn.clone(),
            prefix: prefix.to_string(),
        }
    }
}

/// Identity fields for the lab root CA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaRootInput {
    /// Explicit common name; templates usually derive it from `prefix`
    #[serde(default)]
    pub common_name: String,

    /// Country code (C)
    #[serde(default)]
    pub country: String,

    /// Locality (L)
    #[serde(default)]
    pub locality: String,

    /// Organization (O)
    #[serde(default)]
    pub organization: String,

    /// Organizational unit (OU)
    #[serde(default)]
    pub organization_unit: String,

    /// CA validity, Go duration syntax (`262800h`)
    #[serde(default)]
    pub expiry: String,

    /// Lab name
    pub prefix: String,

    /// File name prefix of the root triple
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
}

fn default_name_prefix() -> String {
    String::from(ROOT_CA_NAME_PREFIX)
}

impl CaRootInput {
    /// Root CA identity for a lab.
    pub fn for_lab(prefix: &str, subject: &Subject, expiry: &str) -> Self {
        Self {
            common_name: String::new(),
            country: subject.country.clone(),
            locality: subject.locality.clone(),
            organization: subject.organization.clone(),
            organization_unit: subject.organization_unit.clone(),
            expiry: expiry.to_string(),
            prefix: prefix.to_string(),
            name_prefix: default_name_prefix(),
        }
    }
}
