use std::fs;
use std::path::{Path, PathBuf};

use bundle_model::BundleConfig;
use tracing::info;

use crate::app::{AppGenerator, locate_launcher_binary};
use crate::dmg::DmgGenerator;
use crate::errors::BundleError;
use crate::runner::CommandRunner;
use crate::sign::SignatureGenerator;

#[derive(Debug, Clone, Default)]
pub struct BundleOptions {
    pub launcher: Option<PathBuf>,
    pub skip_sign: bool,
    pub skip_dmg: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleOutput {
    pub app_dir: PathBuf,
    pub signed: bool,
    pub dmg_file: Option<PathBuf>,
}

/// Full pipeline: app directory, optional signature, optional disk image.
pub fn bundle(
    config: &BundleConfig,
    options: &BundleOptions,
    runner: &dyn CommandRunner,
) -> Result<BundleOutput, BundleError> {
    let project = &config.project;
    let mut plist = config.plist.clone();
    plist.apply_defaults(project);
    plist.validate()?;

    let final_name = project.final_name();
    let target_dir = project.resolve(&project.target_dir);
    let app_dir = target_dir.join(format!("{final_name}.app"));
    info!("Creating app directory at: {}", app_dir.display());
    clean_dir(&app_dir)?;

    let launcher = locate_launcher_binary(options.launcher.as_deref(), project, &config.app)?;
    AppGenerator::new(&plist, &config.app, launcher).generate_app(project, &app_dir)?;

    let signing = config
        .codesign
        .as_ref()
        .filter(|codesign| codesign.identity.as_deref().is_some_and(|id| !id.trim().is_empty()));
    let signed = match signing {
        Some(codesign) if !options.skip_sign => {
            SignatureGenerator::new(codesign, runner).sign(&app_dir)?;
            true
        }
        _ => false,
    };

    let dmg_file = if config.dmg.generate && !options.skip_dmg {
        let bundle_dir = target_dir.join("bundle");
        clean_dir(&bundle_dir)?;
        fs::create_dir_all(&bundle_dir)
            .map_err(|err| BundleError::io(format!("creating {}", bundle_dir.display()), err))?;
        let dmg_file = target_dir.join(format!("{final_name}.dmg"));
        let volume_name = config
            .dmg
            .volume_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| final_name.clone());
        DmgGenerator::new(&config.dmg, volume_name, runner)
            .generate_dmg(project, &app_dir, &bundle_dir, &dmg_file)?;
        Some(dmg_file)
    } else {
        None
    };

    Ok(BundleOutput {
        app_dir,
        signed,
        dmg_file,
    })
}

fn clean_dir(dir: &Path) -> Result<(), BundleError> {
    if dir.exists() {
        fs::remove_dir_all(dir)
            .map_err(|err| BundleError::io(format!("removing {}", dir.display()), err))?;
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::runner::testing::RecordingRunner;
    use bundle_model::parse_config;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("bundle-gen-pipeline-{prefix}-{nanos}"))
    }

    fn fixture(root: &Path, extra: &str) -> BundleConfig {
        fs::create_dir_all(root.join("target")).expect("create target");
        fs::write(root.join("target/example-app-1.0.jar"), vec![7u8; 10 * 1024]).expect("write jar");
        fs::write(root.join("JavaLauncher"), b"launcher").expect("write launcher");
        parse_config(&format!(
            r#"
[project]
name = "Example"
group_id = "com.example"
artifact_id = "example-app"
version = "1.0"
base_dir = "{}"
artifact = "target/example-app-1.0.jar"

[plist]
JVMMainClassName = "com.example.Main"

[app]
launcher = "JavaLauncher"
{extra}
"#,
            root.display()
        ))
        .expect("parse config")
    }

    #[test]
    fn bundles_signs_and_packs() {
        let root = unique_temp_dir("full");
        let config = fixture(
            &root,
            "[dmg]\ngenerate = true\nvolume_name = \"Example Installer\"\n\n[codesign]\nidentity = \"-\"\n",
        );
        let runner = RecordingRunner::default();

        let output = bundle(&config, &BundleOptions::default(), &runner).expect("bundle");

        assert_eq!(output.app_dir, root.join("target/example-app-1.0.app"));
        assert!(output.signed);
        assert_eq!(output.dmg_file, Some(root.join("target/example-app-1.0.dmg")));
        assert!(root.join("target/bundle/example-app-1.0.app/Contents/Info.plist").is_file());
        assert_eq!(runner.programs(), vec!["codesign", "hdiutil"]);
        let calls = runner.calls.lock().expect("calls");
        assert_eq!(calls[1].args.last().map(String::as_str), Some("Example Installer"));

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn skip_flags_and_missing_identity_only_build_the_app() {
        let root = unique_temp_dir("skip");
        let config = fixture(&root, "[dmg]\ngenerate = true\n\n[codesign]\nidentity = \"\"\n");
        let runner = RecordingRunner::default();

        let options = BundleOptions {
            skip_dmg: true,
            ..BundleOptions::default()
        };
        let output = bundle(&config, &options, &runner).expect("bundle");
        assert!(!output.signed);
        assert_eq!(output.dmg_file, None);
        assert!(runner.programs().is_empty());
        assert!(output.app_dir.join("Contents/MacOS/JavaLauncher").is_file());

        let _ = fs::remove_dir_all(root);
    }
}
