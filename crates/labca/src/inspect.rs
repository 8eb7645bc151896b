//! Reading issued certificates back.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, TimeZone, Utc};
use labca_core::{CertificateInfo, LabCaError, Result};
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::X509Certificate;

/// Decode the first certificate of a PEM document into DER.
fn certificate_der(pem_text: &str) -> Result<Vec<u8>> {
    let block = pem::parse(pem_text)
        .map_err(|e| LabCaError::InvalidRequest(format!("failed to parse PEM: {e}")))?;
    if block.tag() != "CERTIFICATE" {
        return Err(LabCaError::InvalidRequest(format!(
            "expected CERTIFICATE, found {}",
            block.tag()
        )));
    }
    Ok(block.contents().to_vec())
}

fn parse(der: &[u8]) -> Result<X509Certificate<'_>> {
    x509_parser::parse_x509_certificate(der)
        .map(|(_, cert)| cert)
        .map_err(|e| LabCaError::InvalidRequest(format!("failed to parse certificate: {e}")))
}

/// Summarize a PEM certificate.
pub fn certificate_info(pem_text: &str) -> Result<CertificateInfo> {
    let der = certificate_der(pem_text)?;
    let cert = parse(&der)?;

    let sans = match cert.subject_alternative_name() {
        Ok(Some(ext)) => ext
            .value
            .general_names
            .iter()
            .filter_map(|name| match name {
                GeneralName::DNSName(dns) => Some((*dns).to_string()),
                GeneralName::IPAddress(bytes) => ip_from_bytes(bytes).map(|ip| ip.to_string()),
                GeneralName::RFC822Name(email) => Some((*email).to_string()),
                _ => None,
            })
            .collect(),
        Ok(None) => Vec::new(),
        Err(e) => {
            return Err(LabCaError::InvalidRequest(format!(
                "malformed subject alternative names: {e}"
            )))
        }
    };

    Ok(CertificateInfo {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        serial: cert.raw_serial_as_string(),
        not_before: asn1_to_utc(cert.validity().not_before)?,
        not_after: asn1_to_utc(cert.validity().not_after)?,
        sans,
        is_ca: cert.is_ca(),
    })
}

/// Check that `leaf_pem` carries a valid signature from the CA in `ca_pem`.
pub fn verify_issued_by(leaf_pem: &str, ca_pem: &str) -> Result<()> {
    let leaf_der = certificate_der(leaf_pem)?;
    let ca_der = certificate_der(ca_pem)?;
    let leaf = parse(&leaf_der)?;
    let ca = parse(&ca_der)?;

    if leaf.issuer().to_string() != ca.subject().to_string() {
        return Err(LabCaError::InvalidRequest(format!(
            "issuer {} does not match CA subject {}",
            leaf.issuer(),
            ca.subject()
        )));
    }
    leaf.verify_signature(Some(ca.public_key()))
        .map_err(|e| LabCaError::InvalidRequest(format!("signature check failed: {e}")))
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => <[u8; 4]>::try_from(bytes).ok().map(|b| IpAddr::V4(Ipv4Addr::from(b))),
        16 => <[u8; 16]>::try_from(bytes)
            .ok()
            .map(|b| IpAddr::V6(Ipv6Addr::from(b))),
        _ => None,
    }
}

fn asn1_to_utc(t: x509_parser::time::ASN1Time) -> Result<DateTime<Utc>> {
    timestamp_to_utc(t.timestamp())
}

fn timestamp_to_utc(secs: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single().ok_or_else(|| {
        LabCaError::InvalidRequest(format!("certificate time {secs} is out of range"))
    })
}
