//! `labca cert` - node certificates.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use colored::Colorize;
use labca::{inspect, CertPaths};
use labca_core::{CertificateInfo, NodeInfo};
use serde::Serialize;

use super::{blocking, Context};
use crate::cli::args::{CertArgs, CertCommands, IssueArgs, LabArgs};
use crate::output::{self, OutputFormat};

pub async fn execute(ctx: Context, args: CertArgs) -> Result<()> {
    match args.command {
        CertCommands::Issue(args) => issue(ctx, args).await,
        CertCommands::Show { lab, node } => show(&ctx, &lab, &node),
    }
}

#[derive(Serialize)]
struct CertOutput {
    node: String,
    cert: PathBuf,
    key: PathBuf,
    #[serde(flatten)]
    info: CertificateInfo,
}

impl CertOutput {
    fn print(&self, ctx: &Context) -> Result<()> {
        match ctx.output_format {
            OutputFormat::Json => output::print_json(self)?,
            OutputFormat::Pretty => {
                println!("{} {}", "Node".bold().underline(), self.node.cyan());
                println!("  {} {}", "Certificate:".bold(), self.cert.display());
                println!("  {} {}", "Key:".bold(), self.key.display());
                output::print_certificate(&self.info);
            }
        }
        Ok(())
    }
}

async fn issue(ctx: Context, args: IssueArgs) -> Result<()> {
    let lab = ctx.lab(&args.lab.lab, &args.lab.workdir, args.lab.ca_root.as_deref())?;

    let mut node = NodeInfo::new(&args.lab.lab, &args.node, "");
    if let Some(long_name) = args.long_name {
        node.long_name = long_name;
    }
    if let Some(fqdn) = args.fqdn {
        node.fqdn = fqdn;
    }
    let mut input = lab.node_input(&node);
    input.hosts = args.hosts;
    if let Some(expiry) = args.expiry {
        input.expiry = expiry;
    }

    let paths = CertPaths::node(&lab.dirs().ca_dir, &args.node);
    let bundle = blocking(move || {
        lab.ensure_root_ca(&lab.root_input())?;
        lab.issue(&input)
    })
    .await
    .with_context(|| format!("Failed to issue a certificate for {}", args.node))?;

    let pem = bundle
        .cert_pem()
        .context("Issued certificate is not valid UTF-8")?;
    let out = CertOutput {
        node: args.node,
        cert: paths.cert,
        key: paths.key,
        info: inspect::certificate_info(pem)?,
    };

    if ctx.output_format == OutputFormat::Pretty {
        println!("{} Certificate issued.", "Success:".green().bold());
    }
    out.print(&ctx)
}

fn show(ctx: &Context, args: &LabArgs, node: &str) -> Result<()> {
    let lab = ctx.lab(&args.lab, &args.workdir, args.ca_root.as_deref())?;

    let bundle = lab.load(node).map_err(|e| {
        if e.is_not_found() {
            anyhow::anyhow!(
                "No certificate for node {node} in lab {}: {e}\n\n\
                 Issue one with: labca cert issue --lab {} --node {node}",
                args.lab,
                args.lab
            )
        } else {
            anyhow::Error::new(e)
        }
    })?;

    let pem = bundle
        .cert_pem()
        .context("Stored certificate is not valid UTF-8")?;
    let paths = CertPaths::node(&lab.dirs().ca_dir, node);
    let out = CertOutput {
        node: node.to_string(),
        cert: paths.cert,
        key: paths.key,
        info: inspect::certificate_info(pem)
            .with_context(|| format!("Failed to parse the certificate of {node}"))?,
    };
    out.print(ctx)
}
