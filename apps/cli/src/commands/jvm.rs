use std::path::PathBuf;

use anyhow::{Context, Result};
use bundle_model::{Dictionary, read_plist_file};
use clap::Args;
use jvm_resolver::{JvmResolver, detect_home_version, resolve_jvm_dylib_location};
use serde::Serialize;

#[derive(Args)]
pub struct ResolveJvmArgs {
    /// Version requirement such as `17`, `17+` or `1.8`
    #[arg(long, default_value = "")]
    java_version: String,
    /// Resolve the way the launcher inside this .app would
    #[arg(long, conflicts_with = "plist")]
    app: Option<PathBuf>,
    /// Info.plist to read JVM keys from
    #[arg(long)]
    plist: Option<PathBuf>,
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ResolvedJvm {
    home: PathBuf,
    dylib: PathBuf,
    version: Option<String>,
}

pub fn run(args: ResolveJvmArgs) -> Result<()> {
    let mut resolver = JvmResolver::new();
    let dictionary = match (&args.app, &args.plist) {
        (Some(app), _) => {
            let contents = app.join("Contents");
            resolver = resolver.with_contents_dir(&contents);
            read_plist_file(&contents.join("Info.plist"))
                .with_context(|| format!("Failed to read Info.plist of {}", app.display()))?
        }
        (None, Some(plist)) => read_plist_file(plist)
            .with_context(|| format!("Failed to read {}", plist.display()))?,
        (None, None) => Dictionary::new(),
    };

    let home = resolver.resolve_jvm_directory(&args.java_version, &dictionary)?;
    let dylib = resolve_jvm_dylib_location(&home)?;
    let resolved = ResolvedJvm {
        version: detect_home_version(&home).map(|version| version.to_string()),
        home,
        dylib,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
    } else {
        println!("home: {}", resolved.home.display());
        println!("dylib: {}", resolved.dylib.display());
        if let Some(version) = &resolved.version {
            println!("version: {version}");
        }
    }
    Ok(())
}
