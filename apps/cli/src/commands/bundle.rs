use std::path::PathBuf;

use anyhow::{Context, Result};
use bundle_gen::{BundleOptions, SystemRunner};
use clap::Args;
use tracing::info;

use crate::config;

#[derive(Args)]
pub struct BundleArgs {
    #[arg(long, default_value = ".")]
    input: PathBuf,
    /// Config file, relative to --input
    #[arg(long)]
    config: Option<PathBuf>,
    /// Launcher binary to embed instead of the configured one
    #[arg(long)]
    launcher: Option<PathBuf>,
    #[arg(long)]
    skip_sign: bool,
    #[arg(long)]
    skip_dmg: bool,
}

pub fn run(args: BundleArgs) -> Result<()> {
    let root = args.input.canonicalize().context("Failed to resolve input path")?;
    let config = config::load_bundle_config(&root, args.config.as_deref())?;

    let options = BundleOptions {
        launcher: args.launcher,
        skip_sign: args.skip_sign,
        skip_dmg: args.skip_dmg,
    };
    let output = bundle_gen::bundle(&config, &options, &SystemRunner).context("Bundling failed")?;

    info!("App bundle ready at {}", output.app_dir.display());
    println!("app: {}", output.app_dir.display());
    if output.signed {
        println!("signed: yes");
    }
    if let Some(dmg_file) = output.dmg_file {
        println!("dmg: {}", dmg_file.display());
    }
    Ok(())
}
