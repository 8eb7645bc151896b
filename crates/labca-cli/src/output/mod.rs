//! Output formatting.

use std::str::FromStr;

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use labca_core::CertificateInfo;
use serde::{Deserialize, Serialize};

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human readable, with colors
    #[default]
    Pretty,
    /// JSON output
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!(
                "Unknown output format: {}\n\
                 Valid formats: pretty, json",
                s
            ),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Print any serializable value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a certificate summary.
pub fn print_certificate(info: &CertificateInfo) {
    let kind = if info.is_ca { "CA" } else { "leaf" };
    println!("  {} {}", "Subject:".bold(), info.subject);
    println!("  {} {}", "Issuer:".bold(), info.issuer);
    println!("  {} {}", "Serial:".bold(), info.serial);
    println!("  {} {}", "Type:".bold(), kind);
    println!("  {} {}", "Not before:".bold(), info.not_before.to_rfc3339());

    let not_after = info.not_after.to_rfc3339();
    if info.is_expired_at(chrono::Utc::now()) {
        println!("  {} {}", "Not after:".bold(), not_after.red());
    } else {
        println!("  {} {}", "Not after:".bold(), not_after.green());
    }

    if !info.sans.is_empty() {
        println!("  {}", "SANs:".bold());
        for san in &info.sans {
            println!("    - {}", san.cyan());
        }
    }
}
