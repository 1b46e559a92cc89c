use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use bundle_model::{keys, read_plist_file};
use jvm_resolver::{JvmResolver, LaunchPlan, log_init, resolve_jvm_dylib_location};
use tracing::{debug, error, info};

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            eprintln!("JavaLauncher: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let exe = std::env::current_exe().context("Failed to locate launcher executable")?;
    let contents_dir = locate_contents_dir(&exe)?;
    let plist_path = contents_dir.join("Info.plist");
    let dictionary = read_plist_file(&plist_path)
        .with_context(|| format!("Failed to read {}", plist_path.display()))?;

    let level = log_init(&dictionary);
    debug!("logging at {level:?}, bundle contents at {}", contents_dir.display());

    let java_version = dictionary.string(keys::JVM_VERSION).unwrap_or_default();
    let jvm_home = JvmResolver::new()
        .with_contents_dir(&contents_dir)
        .resolve_jvm_directory(java_version, &dictionary)?;
    let dylib = resolve_jvm_dylib_location(&jvm_home)?;
    debug!("JVM launcher library at {}", dylib.display());

    let plan = LaunchPlan::from_bundle(
        &contents_dir,
        &dictionary,
        &jvm_home,
        std::env::args_os().skip(1),
    )?;
    debug!("launch plan: {} {:?}", plan.program().display(), plan.args());
    info!(
        "starting {}",
        dictionary.string(keys::CF_BUNDLE_NAME).unwrap_or("application")
    );

    let status = plan
        .command()
        .status()
        .with_context(|| format!("Failed to start {}", plan.program().display()))?;
    match status.code() {
        Some(0) => Ok(ExitCode::SUCCESS),
        Some(code) => {
            info!("application exited with status {code}");
            Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
        }
        None => {
            error!("application terminated by a signal");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// `<App>.app/Contents/MacOS/<exe>` → `<App>.app/Contents`.
fn locate_contents_dir(exe: &Path) -> Result<PathBuf> {
    let macos_dir = exe.parent().context("Launcher executable has no parent directory")?;
    let contents_dir = macos_dir
        .parent()
        .context("Launcher is not inside an app bundle")?;
    if macos_dir.file_name().and_then(|name| name.to_str()) != Some("MacOS")
        || contents_dir.file_name().and_then(|name| name.to_str()) != Some("Contents")
    {
        bail!(
            "Launcher must live in <App>.app/Contents/MacOS, found {}",
            exe.display()
        );
    }
    Ok(contents_dir.to_path_buf())
}
