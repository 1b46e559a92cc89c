use std::fs;
use std::path::Path;

use bundle_model::{DmgConfig, ProjectConfig};
use tracing::{info, warn};

use crate::errors::BundleError;
use crate::fileset::{copy_file_sets, copy_tree, replace_symlink};
use crate::runner::{CommandRunner, ToolCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DmgTool {
    HdiUtil,
    GenIsoImage,
}

impl DmgTool {
    fn other(self) -> Self {
        match self {
            DmgTool::HdiUtil => DmgTool::GenIsoImage,
            DmgTool::GenIsoImage => DmgTool::HdiUtil,
        }
    }
}

/// Stages the app plus extra resources and packs them into a disk image.
pub struct DmgGenerator<'a> {
    config: &'a DmgConfig,
    volume_name: String,
    runner: &'a dyn CommandRunner,
}

impl<'a> DmgGenerator<'a> {
    pub fn new(config: &'a DmgConfig, volume_name: impl Into<String>, runner: &'a dyn CommandRunner) -> Self {
        Self {
            config,
            volume_name: volume_name.into(),
            runner,
        }
    }

    pub fn generate_dmg(
        &self,
        project: &ProjectConfig,
        app_dir: &Path,
        bundle_dir: &Path,
        dmg_file: &Path,
    ) -> Result<(), BundleError> {
        let app_name = app_dir
            .file_name()
            .ok_or_else(|| BundleError::Invalid(format!("{} has no file name", app_dir.display())))?;
        let staged_app = bundle_dir.join(app_name);
        if staged_app != app_dir {
            if staged_app.exists() {
                fs::remove_dir_all(&staged_app)
                    .map_err(|err| BundleError::io(format!("removing {}", staged_app.display()), err))?;
            }
            info!("Copy app into DMG staging directory: {}", bundle_dir.display());
            copy_tree(app_dir, &staged_app)?;
        }

        if !self.config.additional_resources.is_empty() {
            info!("Copy additional resources");
            copy_file_sets(&project.base_dir, bundle_dir, &self.config.additional_resources)?;
        }

        if self.config.create_applications_symlink {
            info!("Create Applications symlink");
            replace_symlink(Path::new("/Applications"), &bundle_dir.join("Applications"))?;
        }

        if dmg_file.exists() {
            fs::remove_file(dmg_file)
                .map_err(|err| BundleError::io(format!("removing {}", dmg_file.display()), err))?;
        }

        info!("Generating DMG archive at: {}", dmg_file.display());
        let preferred = if self.config.use_genisoimage {
            DmgTool::GenIsoImage
        } else {
            DmgTool::HdiUtil
        };
        match self.run_tool(preferred, bundle_dir, dmg_file) {
            Err(err) if self.config.auto_fallback => {
                let fallback = preferred.other();
                warn!("{err}; falling back to {fallback:?}");
                self.run_tool(fallback, bundle_dir, dmg_file)
            }
            result => result,
        }
    }

    fn run_tool(&self, tool: DmgTool, bundle_dir: &Path, dmg_file: &Path) -> Result<(), BundleError> {
        let command = match tool {
            DmgTool::HdiUtil => hdiutil_command(bundle_dir, dmg_file, &self.volume_name),
            DmgTool::GenIsoImage => genisoimage_command(bundle_dir, dmg_file, &self.volume_name),
        };
        crate::runner::run_checked(self.runner, &command)
    }
}

fn hdiutil_command(bundle_dir: &Path, dmg_file: &Path, volume_name: &str) -> ToolCommand {
    ToolCommand::new("hdiutil")
        .arg("create")
        .arg("-srcfolder")
        .path_arg(bundle_dir)
        .path_arg(dmg_file)
        .arg("-volname")
        .arg(volume_name)
}

fn genisoimage_command(bundle_dir: &Path, dmg_file: &Path, volume_name: &str) -> ToolCommand {
    ToolCommand::new("genisoimage")
        .arg("-D")
        .arg("-V")
        .arg(volume_name)
        .arg("-no-pad")
        .arg("-r")
        .arg("-apple")
        .arg("-quiet")
        .arg("-o")
        .path_arg(dmg_file)
        .path_arg(bundle_dir)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::runner::testing::RecordingRunner;
    use bundle_model::{FileSet, parse_config};
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("bundle-gen-dmg-{prefix}-{nanos}"))
    }

    fn project(root: &Path) -> ProjectConfig {
        parse_config(&format!(
            r#"
[project]
name = "Example"
group_id = "com.example"
artifact_id = "example-app"
version = "1.0"
base_dir = "{}"

[plist]
JVMMainClassName = "com.example.Main"
"#,
            root.display()
        ))
        .expect("parse config")
        .project
    }

    fn fake_app(root: &Path) -> PathBuf {
        let app_dir = root.join("target/Example.app");
        fs::create_dir_all(app_dir.join("Contents/MacOS")).expect("create app");
        fs::write(app_dir.join("Contents/MacOS/JavaLauncher"), b"bin").expect("write launcher");
        app_dir
    }

    #[test]
    fn stages_app_resources_and_symlink_then_runs_hdiutil() {
        let root = unique_temp_dir("hdiutil");
        let app_dir = fake_app(&root);
        fs::create_dir_all(root.join("src/dmg")).expect("create dmg resources");
        fs::write(root.join("src/dmg/README.txt"), b"readme").expect("write readme");

        let config = DmgConfig {
            generate: true,
            additional_resources: vec![FileSet {
                directory: PathBuf::from("src/dmg"),
                includes: Vec::new(),
                excludes: Vec::new(),
                output_directory: None,
            }],
            ..DmgConfig::default()
        };
        let bundle_dir = root.join("target/bundle");
        let dmg_file = root.join("target/Example.dmg");
        let runner = RecordingRunner::default();

        DmgGenerator::new(&config, "Example", &runner)
            .generate_dmg(&project(&root), &app_dir, &bundle_dir, &dmg_file)
            .expect("generate dmg");

        assert!(bundle_dir.join("Example.app/Contents/MacOS/JavaLauncher").is_file());
        assert!(bundle_dir.join("README.txt").is_file());
        assert_eq!(
            fs::read_link(bundle_dir.join("Applications")).expect("symlink"),
            PathBuf::from("/Applications")
        );

        let calls = runner.calls.lock().expect("calls");
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].args,
            vec![
                "create".to_string(),
                "-srcfolder".to_string(),
                bundle_dir.to_string_lossy().to_string(),
                dmg_file.to_string_lossy().to_string(),
                "-volname".to_string(),
                "Example".to_string(),
            ]
        );
        drop(calls);

        // A second run replaces the staged app and the existing symlink.
        DmgGenerator::new(&config, "Example", &runner)
            .generate_dmg(&project(&root), &app_dir, &bundle_dir, &dmg_file)
            .expect("regenerate dmg");

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn auto_fallback_tries_the_other_tool_once() {
        let root = unique_temp_dir("fallback");
        let app_dir = fake_app(&root);
        let config = DmgConfig {
            generate: true,
            use_genisoimage: true,
            auto_fallback: true,
            create_applications_symlink: false,
            ..DmgConfig::default()
        };
        let runner = RecordingRunner::with_statuses(&[1, 0]);

        DmgGenerator::new(&config, "Example", &runner)
            .generate_dmg(&project(&root), &app_dir, &root.join("target/bundle"), &root.join("target/Example.dmg"))
            .expect("fallback succeeds");
        assert_eq!(runner.programs(), vec!["genisoimage", "hdiutil"]);
        assert!(!root.join("target/bundle/Applications").exists());

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn failure_without_fallback_reports_tool_status() {
        let root = unique_temp_dir("failure");
        let app_dir = fake_app(&root);
        let config = DmgConfig {
            generate: true,
            create_applications_symlink: false,
            ..DmgConfig::default()
        };
        let runner = RecordingRunner::with_statuses(&[2, 0]);

        let err = DmgGenerator::new(&config, "Example", &runner)
            .generate_dmg(&project(&root), &app_dir, &root.join("target/bundle"), &root.join("target/Example.dmg"))
            .expect_err("hdiutil failure");
        assert_eq!(err.to_string(), "command 'hdiutil' exited with status 2");
        assert_eq!(runner.programs(), vec!["hdiutil"]);

        let _ = fs::remove_dir_all(root);
    }
}
