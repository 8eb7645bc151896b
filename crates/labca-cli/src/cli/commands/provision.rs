//! `labca provision` - CA and certificates for a whole topology.
//!
//! The root CA is created once, before any node is issued; bootstrap is not
//! safe to run concurrently. Node certificates are then issued on blocking
//! worker threads, at most `--jobs` at a time.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use colored::Colorize;
use labca::nodes::{MgmtNet, NodeConfig, NodeRegistry};
use labca_core::NodeInfo;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::{blocking, Context};
use crate::cli::args::ProvisionArgs;
use crate::output::{self, OutputFormat};

/// Topology file.
///
/// ```toml
/// name = "test"
///
/// [mgmt]
/// ipv4_subnet = "172.20.20.0/24"
///
/// [[nodes]]
/// name = "r1"
/// kind = "srl"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Topology {
    pub name: String,

    #[serde(default)]
    pub mgmt: MgmtNet,

    #[serde(default)]
    pub nodes: Vec<TopologyNode>,
}

/// One node of a topology file.
#[derive(Debug, Clone, Deserialize)]
pub struct TopologyNode {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub binds: Vec<String>,
    #[serde(default)]
    pub cmd: String,
}

impl Topology {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read topology {}", path.display()))?;
        let topology: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid topology {}", path.display()))?;
        if topology.name.trim().is_empty() {
            anyhow::bail!("Topology {} has no name", path.display());
        }
        topology
            .check_names()
            .with_context(|| format!("Invalid topology {}", path.display()))?;
        Ok(topology)
    }

    /// Node names are certificate directories, so they must be unique.
    pub fn check_names(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for node in &self.nodes {
            if !seen.insert(node.name.as_str()) {
                anyhow::bail!("Duplicate node name {:?}", node.name);
            }
        }
        Ok(())
    }

    pub fn node_infos(&self) -> Vec<NodeInfo> {
        self.nodes
            .iter()
            .map(|n| NodeInfo::new(&self.name, &n.name, &n.kind))
            .collect()
    }

    /// Container settings of every node with its kind defaults applied.
    ///
    /// Nodes of unknown kinds are kept as written.
    pub fn node_configs(&self, registry: &NodeRegistry) -> Result<Vec<NodeConfig>> {
        self.nodes
            .iter()
            .map(|n| -> Result<NodeConfig> {
                let cfg = NodeConfig {
                    short_name: n.name.clone(),
                    long_name: format!("clab-{}-{}", self.name, n.name),
                    kind: n.kind.clone(),
                    image: n.image.clone(),
                    env: n.env.clone(),
                    binds: n.binds.clone(),
                    cmd: n.cmd.clone(),
                };
                match registry.adapter(&n.kind) {
                    Ok(adapter) => Ok(adapter.init(cfg, &self.mgmt)?),
                    Err(_) => {
                        warn!(node = %n.name, kind = %n.kind, "unknown node kind, no defaults applied");
                        Ok(cfg)
                    }
                }
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
struct Failure {
    node: String,
    error: String,
}

#[derive(Debug, Serialize)]
struct ProvisionOutput {
    lab: String,
    ca_required: bool,
    root_created: bool,
    root_cert: Option<PathBuf>,
    issued: Vec<String>,
    failed: Vec<Failure>,
    nodes: Vec<NodeConfig>,
}

pub async fn execute(ctx: Context, args: ProvisionArgs) -> Result<()> {
    let topology = Topology::load(&args.topology)?;
    let nodes = topology.node_infos();
    let node_configs = topology.node_configs(&NodeRegistry::default())?;
    let lab = Arc::new(ctx.lab(
        &topology.name,
        &args.workdir,
        args.ca_root.as_deref(),
    )?);

    let qualifying: Vec<NodeInfo> = lab
        .policy()
        .qualifying(&nodes)
        .into_iter()
        .cloned()
        .collect();

    let mut out = ProvisionOutput {
        lab: topology.name.clone(),
        ca_required: !qualifying.is_empty(),
        root_created: false,
        root_cert: None,
        issued: Vec::new(),
        failed: Vec::new(),
        nodes: node_configs,
    };

    if out.ca_required {
        let root = {
            let lab = Arc::clone(&lab);
            blocking(move || lab.ensure_root_ca(&lab.root_input()))
                .await
                .with_context(|| format!("Failed to create the root CA of lab {}", topology.name))?
        };
        out.root_created = root.was_created();
        out.root_cert = Some(root.paths.cert);

        issue_all(&lab, qualifying, args.jobs, &mut out).await?;
    } else {
        debug!(lab = %topology.name, "no node requires the lab CA");
    }

    match ctx.output_format {
        OutputFormat::Json => output::print_json(&out)?,
        OutputFormat::Pretty => print_pretty(&out, ctx.verbose),
    }

    if args.strict && !out.failed.is_empty() {
        anyhow::bail!(
            "{} of {} node certificates failed",
            out.failed.len(),
            out.failed.len() + out.issued.len()
        );
    }
    Ok(())
}

async fn issue_all(
    lab: &Arc<labca::LabPki>,
    nodes: Vec<NodeInfo>,
    jobs: usize,
    out: &mut ProvisionOutput,
) -> Result<()> {
    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let mut handles = Vec::with_capacity(nodes.len());

    for node in nodes {
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        let lab = Arc::clone(lab);
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let result = lab.issue_node_certificate(&node);
            (node.short_name, result)
        }));
    }

    // handles are awaited in input order, so the report keeps topology order
    for handle in handles {
        let (name, result) = handle.await.context("CA worker task failed")?;
        match result {
            Ok(_) => out.issued.push(name),
            Err(e) => {
                warn!(node = %name, error = %e, "certificate issuance failed");
                out.failed.push(Failure {
                    node: name,
                    error: e.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn print_pretty(out: &ProvisionOutput, verbose: bool) {
    println!("{} {}", "Lab".bold().underline(), out.lab.cyan());

    if !out.ca_required {
        println!("  No node requires the lab CA, nothing written.");
        return;
    }

    if let Some(cert) = &out.root_cert {
        let state = if out.root_created { "created" } else { "reused" };
        println!("  {} {} ({})", "Root CA:".bold(), cert.display(), state);
    }
    for name in &out.issued {
        println!("  {} {}", "✓".green(), name);
    }
    for failure in &out.failed {
        println!("  {} {}: {}", "✗".red(), failure.node, failure.error);
    }

    if verbose {
        println!();
        println!("{}", "Nodes".bold().underline());
        for node in &out.nodes {
            println!("  {} ({})", node.short_name.cyan(), node.kind);
            if !node.cmd.is_empty() {
                println!("    cmd: {}", node.cmd);
            }
            for bind in &node.binds {
                println!("    bind: {bind}");
            }
        }
    }
}
