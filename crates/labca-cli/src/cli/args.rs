//! Command-line argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

/// Per-lab certificate authority for container network labs
///
/// Creates a root CA per lab and issues TLS certificates for the nodes
/// that need them.
#[derive(Parser, Debug)]
#[command(name = "labca")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: platform config dir)
    #[arg(short, long, env = "LABCA_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Lab root CA
    Ca(CaArgs),

    /// Node certificates
    Cert(CertArgs),

    /// Create the CA and node certificates for a whole topology
    Provision(ProvisionArgs),

    /// Show configuration
    Config(ConfigArgs),
}

/// Lab selection shared by most commands.
#[derive(Args, Debug, Clone)]
pub struct LabArgs {
    /// Lab name
    #[arg(short, long)]
    pub lab: String,

    /// Directory holding the `clab-<lab>` directories
    #[arg(short, long, default_value = ".")]
    pub workdir: PathBuf,

    /// Root CA directory (default: <workdir>/clab-<lab>/ca/root)
    #[arg(long)]
    pub ca_root: Option<PathBuf>,
}

// ============================================================================
// CA command
// ============================================================================

#[derive(Args, Debug)]
pub struct CaArgs {
    #[command(subcommand)]
    pub command: CaCommands,
}

#[derive(Subcommand, Debug)]
pub enum CaCommands {
    /// Create the lab root CA unless it already exists
    Init {
        #[command(flatten)]
        lab: LabArgs,
    },

    /// Show the lab root certificate
    Show {
        #[command(flatten)]
        lab: LabArgs,
    },
}

// ============================================================================
// Cert command
// ============================================================================

#[derive(Args, Debug)]
pub struct CertArgs {
    #[command(subcommand)]
    pub command: CertCommands,
}

#[derive(Subcommand, Debug)]
pub enum CertCommands {
    /// Issue a certificate for one node, creating the CA if needed
    Issue(IssueArgs),

    /// Show a previously issued node certificate
    Show {
        #[command(flatten)]
        lab: LabArgs,

        /// Node name
        #[arg(short, long)]
        node: String,
    },
}

#[derive(Args, Debug)]
pub struct IssueArgs {
    #[command(flatten)]
    pub lab: LabArgs,

    /// Node name
    #[arg(short, long)]
    pub node: String,

    /// Container name (default: clab-<lab>-<node>)
    #[arg(long)]
    pub long_name: Option<String>,

    /// Fully qualified name (default: <node>.<lab>.io)
    #[arg(long)]
    pub fqdn: Option<String>,

    /// Extra SAN entry; repeat for more
    #[arg(long = "host")]
    pub hosts: Vec<String>,

    /// Validity, e.g. 720h (default: leaf_expiry from config)
    #[arg(long)]
    pub expiry: Option<String>,
}

// ============================================================================
// Provision command
// ============================================================================

#[derive(Args, Debug)]
pub struct ProvisionArgs {
    /// Topology file (TOML)
    pub topology: PathBuf,

    /// Directory holding the `clab-<lab>` directories
    #[arg(short, long, default_value = ".")]
    pub workdir: PathBuf,

    /// Root CA directory (default: <workdir>/clab-<lab>/ca/root)
    #[arg(long)]
    pub ca_root: Option<PathBuf>,

    /// Certificates issued in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,

    /// Exit with an error if any node fails
    #[arg(long)]
    pub strict: bool,
}

// ============================================================================
// Config command
// ============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Show the config file path
    Path,
}
