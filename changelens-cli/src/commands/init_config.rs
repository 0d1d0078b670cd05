use std::path::PathBuf;

use anyhow::{Context, bail};
use changelens_core::LensConfig;
use clap::Args;
use tracing::info;

#[derive(Args, Debug)]
pub struct InitConfigArgs {
    /// Where to write the configuration
    #[arg(short, long, default_value = "changelens.toml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitConfigArgs) -> anyhow::Result<()> {
    if args.output.exists() && !args.force {
        bail!(
            "Config file {} already exists (use --force to overwrite)",
            args.output.display()
        );
    }

    let text = toml::to_string_pretty(&LensConfig::default())
        .context("Cannot serialize default config")?;
    std::fs::write(&args.output, text)
        .with_context(|| format!("Cannot write {}", args.output.display()))?;

    info!(path = %args.output.display(), "Wrote default configuration");
    println!("Wrote default configuration to {}", args.output.display());
    Ok(())
}
