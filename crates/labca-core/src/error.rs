use std::fmt;

use thiserror::Error;

/// Result type alias for labca operations
pub type Result<T> = std::result::Result<T, LabCaError>;

/// Step of a cryptographic operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoStage {
    /// Generating a private key
    KeyGeneration,
    /// Building a certificate signing request
    RequestBuild,
    /// Self-signing the root CA certificate
    SelfSigning,
    /// Loading the root CA certificate and key into a signer
    SignerConstruction,
    /// Signing a leaf certificate with the root CA
    Signing,
}

impl fmt::Display for CryptoStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Self::KeyGeneration => "key generation",
            Self::RequestBuild => "request build",
            Self::SelfSigning => "self-signing",
            Self::SignerConstruction => "signer construction",
            Self::Signing => "signing",
        };
        f.write_str(stage)
    }
}

/// Errors that can occur while bootstrapping a lab CA or issuing certificates
#[derive(Error, Debug)]
pub enum LabCaError {
    /// CSR template could not be rendered, or the rendered document could not be parsed
    #[error("template error: {0}")]
    Template(String),

    /// Certificate request failed structural validation
    #[error("invalid certificate request: {0}")]
    InvalidRequest(String),

    /// Key generation, signer construction or signing failed
    #[error("{stage} failed: {reason}")]
    Crypto {
        /// Which step failed
        stage: CryptoStage,
        /// Underlying library message
        reason: String,
    },

    /// Persisted certificate material is missing
    #[error("not found: {resource}")]
    NotFound {
        /// Description of what was looked up
        resource: String,
    },

    /// Filesystem operation failed
    #[error("io error on {path}: {source}")]
    Io {
        /// Path being read or written
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is invalid
    #[error("configuration error: {0}")]
    Config(String),
}

impl LabCaError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Build a crypto error for the given stage.
    pub fn crypto(stage: CryptoStage, reason: impl fmt::Display) -> Self {
        Self::Crypto {
            stage,
            reason: reason.to_string(),
        }
    }

    /// Build a not-found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Returns true if persisted material was missing
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the error came from a cryptographic primitive
    #[must_use]
    pub const fn is_crypto(&self) -> bool {
        matches!(self, Self::Crypto { .. })
    }
}

impl From<serde_json::Error> for LabCaError {
    fn from(e: serde_json::Error) -> Self {
        Self::Template(format!("rendered request is not valid JSON: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_distinguishable() {
        let missing = LabCaError::not_found("node spine1");
        let io = LabCaError::io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );

        assert!(missing.is_not_found());
        assert!(!io.is_not_found());
        assert_eq!(missing.to_string(), "not found: node spine1");
    }

    #[test]
    fn test_crypto_message_names_stage() {
        let err = LabCaError::crypto(CryptoStage::SignerConstruction, "bad key");
        assert!(err.is_crypto());
        assert_eq!(err.to_string(), "signer construction failed: bad key");
    }
}
