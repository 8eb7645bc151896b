//! `labca config` - configuration inspection.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::output::{self, OutputFormat};

pub async fn execute(ctx: Context, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(&ctx),
        ConfigCommands::Path => show_path(&ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = &ctx.config;

    match ctx.output_format {
        OutputFormat::Json => output::print_json(config)?,
        OutputFormat::Pretty => {
            println!("{}", "Current Configuration:".bold());
            if !ctx.config_path.exists() {
                println!("  {}", "(no config file, using defaults)".dimmed());
            }
            println!();
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn show_path(ctx: &Context) -> Result<()> {
    println!("{}", ctx.config_path.display());
    Ok(())
}
