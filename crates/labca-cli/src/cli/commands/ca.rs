//! `labca ca` - lab root CA.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use colored::Colorize;
use labca::inspect;
use serde::Serialize;

use super::{blocking, Context};
use crate::cli::args::{CaArgs, CaCommands, LabArgs};
use crate::output::{self, OutputFormat};

pub async fn execute(ctx: Context, args: CaArgs) -> Result<()> {
    match args.command {
        CaCommands::Init { lab } => init(ctx, lab).await,
        CaCommands::Show { lab } => show(&ctx, &lab),
    }
}

#[derive(Serialize)]
struct InitOutput {
    lab: String,
    created: bool,
    cert: PathBuf,
    key: PathBuf,
    csr: PathBuf,
}

async fn init(ctx: Context, args: LabArgs) -> Result<()> {
    let lab = ctx.lab(&args.lab, &args.workdir, args.ca_root.as_deref())?;

    let root = blocking(move || lab.ensure_root_ca(&lab.root_input()))
        .await
        .with_context(|| format!("Failed to create the root CA of lab {}", args.lab))?;

    let out = InitOutput {
        lab: args.lab,
        created: root.was_created(),
        cert: root.paths.cert,
        key: root.paths.key,
        csr: root.paths.csr,
    };

    match ctx.output_format {
        OutputFormat::Json => output::print_json(&out)?,
        OutputFormat::Pretty => {
            if out.created {
                println!("{} Root CA of lab {} created.", "Success:".green().bold(), out.lab.cyan());
            } else {
                println!("Root CA of lab {} already present, nothing to do.", out.lab.cyan());
            }
            println!("  {} {}", "Certificate:".bold(), out.cert.display());
            println!("  {} {}", "Key:".bold(), out.key.display());
        }
    }

    Ok(())
}

fn show(ctx: &Context, args: &LabArgs) -> Result<()> {
    let lab = ctx.lab(&args.lab, &args.workdir, args.ca_root.as_deref())?;
    let path = lab.root_paths().cert;

    let pem = std::fs::read_to_string(&path).with_context(|| {
        format!(
            "No root CA at {}\n\nCreate it with: labca ca init --lab {}",
            path.display(),
            args.lab
        )
    })?;
    let info = inspect::certificate_info(&pem)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    match ctx.output_format {
        OutputFormat::Json => output::print_json(&info)?,
        OutputFormat::Pretty => {
            println!("{} {}", "Root CA".bold().underline(), path.display());
            output::print_certificate(&info);
        }
    }

    Ok(())
}
