//! On-disk certificate layout.
//!
//! Every entity gets three files next to each other:
//!
//! ```text
//! <prefix>.pem        certificate
//! <prefix>-key.pem    private key
//! <prefix>.csr        signing request
//! ```
//!
//! The root CA lives at `<lab_ca_root>/root-ca*`, node `n` at
//! `<lab_ca_dir>/n/n*`.

use std::ffi::{OsStr, OsString};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use labca_core::{CertificateBundle, LabCaError, Result, ROOT_CA_NAME_PREFIX};
use tracing::debug;

/// Paths of one certificate/key/CSR triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertPaths {
    /// `<prefix>.pem`
    pub cert: PathBuf,
    /// `<prefix>-key.pem`
    pub key: PathBuf,
    /// `<prefix>.csr`
    pub csr: PathBuf,
}

impl CertPaths {
    /// Triple for an arbitrary prefix.
    pub fn from_prefix(prefix: &Path) -> Self {
        let with_suffix = |suffix: &str| {
            let mut s = OsString::from(prefix.as_os_str());
            s.push(suffix);
            PathBuf::from(s)
        };
        Self {
            cert: with_suffix(".pem"),
            key: with_suffix("-key.pem"),
            csr: with_suffix(".csr"),
        }
    }

    /// Root CA triple under `lab_ca_root`.
    pub fn root(lab_ca_root: &Path) -> Self {
        Self::from_prefix(&lab_ca_root.join(ROOT_CA_NAME_PREFIX))
    }

    /// Triple of node `name` under `lab_ca_dir`.
    pub fn node(lab_ca_dir: &Path, name: &str) -> Self {
        Self::from_prefix(&node_dir(lab_ca_dir, name).join(name))
    }

    /// Both the certificate and the key exist.
    ///
    /// Contents are not looked at.
    pub fn cert_and_key_exist(&self) -> bool {
        self.cert.exists() && self.key.exists()
    }
}

/// Reject node names that are not a single plain path component.
///
/// Names become directory and file names, so `..`, `a/b` or an absolute
/// path would escape the lab CA directory.
pub fn check_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(c)), None) if c == OsStr::new(name) => Ok(()),
        _ => Err(LabCaError::InvalidRequest(format!(
            "invalid node name {name:?}"
        ))),
    }
}

/// Directory holding the files of node `name`.
pub fn node_dir(lab_ca_dir: &Path, name: &str) -> PathBuf {
    lab_ca_dir.join(name)
}

/// Write the three files of `bundle` at `prefix`, overwriting existing ones.
///
/// The parent directory is created if missing. Writes are not atomic.
pub fn persist(bundle: &CertificateBundle, prefix: &Path) -> Result<CertPaths> {
    if let Some(parent) = prefix.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LabCaError::io(parent, e))?;
    }

    let paths = CertPaths::from_prefix(prefix);
    for (path, data) in [
        (&paths.cert, &bundle.cert),
        (&paths.key, &bundle.key),
        (&paths.csr, &bundle.csr),
    ] {
        std::fs::write(path, data).map_err(|e| LabCaError::io(path, e))?;
        debug!(path = %path.display(), bytes = data.len(), "wrote certificate file");
    }
    Ok(paths)
}

/// Read back the certificate and key of node `name`.
///
/// Raw bytes only; nothing is parsed or validated. The CSR of the returned
/// bundle is empty.
pub fn load(name: &str, lab_ca_dir: &Path) -> Result<CertificateBundle> {
    check_name(name)?;
    let dir = node_dir(lab_ca_dir, name);
    match std::fs::metadata(&dir) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(LabCaError::not_found(format!(
                "certificate directory {} is not a directory",
                dir.display()
            )))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(LabCaError::not_found(format!(
                "certificate directory {}",
                dir.display()
            )))
        }
        Err(e) => return Err(LabCaError::io(&dir, e)),
    }

    let paths = CertPaths::node(lab_ca_dir, name);
    Ok(CertificateBundle {
        cert: read(&paths.cert)?,
        key: read(&paths.key)?,
        csr: Vec::new(),
    })
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            LabCaError::not_found(path.display().to_string())
        } else {
            LabCaError::io(path, e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bundle() -> CertificateBundle {
        CertificateBundle {
            key: b"key".to_vec(),
            csr: b"csr".to_vec(),
            cert: b"cert".to_vec(),
        }
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_layout() {
        let paths = CertPaths::node(Path::new("/lab/ca"), "spine1");
        assert_eq!(paths.cert, Path::new("/lab/ca/spine1/spine1.pem"));
        assert_eq!(paths.key, Path::new("/lab/ca/spine1/spine1-key.pem"));
        assert_eq!(paths.csr, Path::new("/lab/ca/spine1/spine1.csr"));

        let root = CertPaths::root(Path::new("/lab/ca/root"));
        assert_eq!(root.key, Path::new("/lab/ca/root/root-ca-key.pem"));
    }

    #[test]
    fn test_dotted_names_keep_their_dots() {
        let paths = CertPaths::from_prefix(Path::new("/x/leaf.v2"));
        assert_eq!(paths.cert, Path::new("/x/leaf.v2.pem"));
    }

    #[test]
    fn test_persist_creates_directory_and_three_files() {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("spine1").join("spine1");

        persist(&bundle(), &prefix).unwrap();
        // second write into the existing directory overwrites
        persist(&bundle(), &prefix).unwrap();

        assert_eq!(
            file_names(&dir.path().join("spine1")),
            vec!["spine1-key.pem", "spine1.csr", "spine1.pem"]
        );
    }

    #[test]
    fn test_load_round_trip() {
        let dir = TempDir::new().unwrap();
        persist(&bundle(), &dir.path().join("leaf1").join("leaf1")).unwrap();

        let loaded = load("leaf1", dir.path()).unwrap();
        assert_eq!(loaded.cert, b"cert");
        assert_eq!(loaded.key, b"key");
        assert!(loaded.csr.is_empty());
    }

    #[test]
    fn test_load_missing_directory() {
        let dir = TempDir::new().unwrap();

        let err = load("ghost", dir.path()).unwrap_err();
        assert!(err.is_not_found());
        assert!(file_names(dir.path()).is_empty());
    }

    #[test]
    fn test_load_missing_key() {
        let dir = TempDir::new().unwrap();
        let paths = persist(&bundle(), &dir.path().join("leaf1").join("leaf1")).unwrap();
        std::fs::remove_file(&paths.key).unwrap();

        assert!(load("leaf1", dir.path()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_load_under_a_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let not_a_dir = dir.path().join("ca");
        std::fs::write(&not_a_dir, "").unwrap();

        let err = load("leaf1", &not_a_dir).unwrap_err();
        assert!(!err.is_not_found());
        assert!(matches!(err, LabCaError::Io { .. }));
    }

    #[test]
    fn test_check_name() {
        for good in ["leaf1", "spine.v2", "clab-test-r1"] {
            check_name(good).unwrap();
        }
        for bad in ["", ".", "..", "../x", "a/b", "a/", "/etc"] {
            assert!(
                matches!(check_name(bad), Err(LabCaError::InvalidRequest(_))),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn test_load_rejects_path_names() {
        let dir = TempDir::new().unwrap();
        let err = load("../leaf1", dir.path()).unwrap_err();
        assert!(matches!(err, LabCaError::InvalidRequest(_)));
    }

    #[test]
    fn test_cert_and_key_exist() {
        let dir = TempDir::new().unwrap();
        let paths = CertPaths::root(dir.path());
        assert!(!paths.cert_and_key_exist());

        std::fs::write(&paths.cert, "cert").unwrap();
        assert!(!paths.cert_and_key_exist());

        std::fs::write(&paths.key, "key").unwrap();
        assert!(paths.cert_and_key_exist());
    }
}
