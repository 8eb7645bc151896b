//! Config file location.

use std::path::{Path, PathBuf};

use anyhow::Result;
use directories::ProjectDirs;

/// Default config file path.
pub fn default_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("io", "srl-labs", "labca")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    Ok(dirs.config_dir().join("config.toml"))
}

/// `--config` if given, otherwise the default path.
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
    explicit.map_or_else(default_path, |p| Ok(p.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let path = resolve_path(Some(Path::new("/tmp/labca.toml"))).unwrap();
        assert_eq!(path, Path::new("/tmp/labca.toml"));
    }
}
