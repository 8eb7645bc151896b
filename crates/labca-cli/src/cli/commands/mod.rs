//! Command implementations.

pub mod ca;
pub mod cert;
pub mod config;
pub mod provision;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use labca::{LabCaConfig, LabDirs, LabPki};

use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Effective configuration
    pub config: LabCaConfig,

    /// Where the configuration was (or would be) read from
    pub config_path: PathBuf,

    /// Output format
    pub output_format: OutputFormat,

    /// Verbose output
    pub verbose: bool,
}

impl Context {
    /// CA of `lab` under `workdir`, set up from the config.
    ///
    /// `ca_root` moves the root CA out of its default place under `workdir`.
    pub fn lab(&self, lab: &str, workdir: &Path, ca_root: Option<&Path>) -> Result<LabPki> {
        let mut dirs = LabDirs::for_lab(workdir, lab);
        if let Some(root) = ca_root {
            dirs.ca_root = root.to_path_buf();
        }
        LabPki::from_config(lab, dirs, &self.config)
            .with_context(|| format!("Failed to set up the CA of lab {lab}"))
    }
}

/// Run CPU-bound CA work off the async runtime.
pub async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> labca_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f)
        .await
        .context("CA worker task failed")??)
}
