use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use crate::{config, io};

#[derive(Args)]
pub struct PlistArgs {
    #[arg(long, default_value = ".")]
    input: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write to a file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

pub fn run(args: PlistArgs) -> Result<()> {
    let root = args.input.canonicalize().context("Failed to resolve input path")?;
    let config = config::load_bundle_config(&root, args.config.as_deref())?;

    let mut plist = config.plist.clone();
    plist.apply_defaults(&config.project);
    plist.validate()?;

    let mut additional = Vec::new();
    if let Some(icon_name) = plist
        .icon_file
        .as_deref()
        .and_then(|icon| Path::new(icon).file_name())
    {
        additional.push((
            "CFBundleIconFile".to_string(),
            icon_name.to_string_lossy().to_string(),
        ));
    }
    let xml = plist.to_xml_string(&additional);

    match args.output {
        Some(path) => io::write_output(&path, xml.as_bytes()),
        None => {
            print!("{xml}");
            Ok(())
        }
    }
}
