use std::fs;
use std::path::{Path, PathBuf};

use bundle_model::{AppConfig, Artifact, LaunchMode, PlistConfiguration, ProjectConfig};
use tracing::{debug, info};

use crate::errors::BundleError;
use crate::fileset::{copy_file, copy_file_sets};

/// Writes the `<name>.app` directory tree.
pub struct AppGenerator<'a> {
    plist: &'a PlistConfiguration,
    app: &'a AppConfig,
    launcher_binary: PathBuf,
}

impl<'a> AppGenerator<'a> {
    pub fn new(plist: &'a PlistConfiguration, app: &'a AppConfig, launcher_binary: PathBuf) -> Self {
        Self {
            plist,
            app,
            launcher_binary,
        }
    }

    pub fn generate_app(&self, project: &ProjectConfig, app_dir: &Path) -> Result<(), BundleError> {
        let mode = self.plist.validate()?;
        let contents_dir = app_dir.join("Contents");
        fs::create_dir_all(&contents_dir)
            .map_err(|err| BundleError::io(format!("creating {}", contents_dir.display()), err))?;

        self.copy_application_dependencies(project, mode, &contents_dir.join("Java"))?;
        self.copy_native_executable(&contents_dir.join("MacOS"))?;
        self.generate_plist(project, &contents_dir)?;

        if !self.app.additional_resources.is_empty() {
            info!("Copy additional app resources");
            copy_file_sets(&project.base_dir, &contents_dir, &self.app.additional_resources)?;
        }
        Ok(())
    }

    fn copy_application_dependencies(
        &self,
        project: &ProjectConfig,
        mode: LaunchMode,
        java_dir: &Path,
    ) -> Result<(), BundleError> {
        info!("Copy application dependencies to: {}", java_dir.display());
        for artifact in project.runtime_artifacts() {
            let source = project.resolve(&artifact.path);
            if !source.is_file() {
                return Err(BundleError::MissingFile {
                    what: "artifact",
                    path: source,
                });
            }
            let target = artifact_target(java_dir, &artifact, mode);
            debug!("copy {} to {}", source.display(), target.display());
            copy_file(&source, &target)?;
        }
        Ok(())
    }

    fn copy_native_executable(&self, macos_dir: &Path) -> Result<(), BundleError> {
        if !self.launcher_binary.is_file() {
            return Err(BundleError::MissingFile {
                what: "native launcher executable",
                path: self.launcher_binary.clone(),
            });
        }
        let target = macos_dir.join(self.plist.executable_name());
        info!("Copy native executable to: {}", target.display());
        copy_file(&self.launcher_binary, &target)?;
        set_executable(&target)
    }

    fn generate_plist(&self, project: &ProjectConfig, contents_dir: &Path) -> Result<(), BundleError> {
        let mut additional = Vec::new();
        if let Some(icon_name) = self.copy_icon(project, contents_dir)? {
            additional.push(("CFBundleIconFile".to_string(), icon_name));
        }
        let plist_file = contents_dir.join("Info.plist");
        info!("Generating Info.plist");
        fs::write(&plist_file, self.plist.to_xml_string(&additional))
            .map_err(|err| BundleError::io(format!("writing {}", plist_file.display()), err))
    }

    /// Copy the configured icon into `Contents/Resources`, returning its file
    /// name.
    fn copy_icon(&self, project: &ProjectConfig, contents_dir: &Path) -> Result<Option<String>, BundleError> {
        let Some(icon) = self.plist.icon_file.as_deref().filter(|icon| !icon.is_empty()) else {
            return Ok(None);
        };
        let icon_file = project.resolve(Path::new(icon));
        if !icon_file.is_file() {
            return Err(BundleError::MissingFile {
                what: "declared icon file",
                path: icon_file,
            });
        }
        let file_name = icon_file
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| BundleError::Invalid(format!("icon path {icon} has no file name")))?;
        copy_file(&icon_file, &contents_dir.join("Resources").join(&file_name))?;
        Ok(Some(file_name))
    }
}

/// Classpath apps get a Maven repository layout, module apps a flat
/// directory.
pub fn artifact_target(java_dir: &Path, artifact: &Artifact, mode: LaunchMode) -> PathBuf {
    match mode {
        LaunchMode::Classpath => java_dir.join("classpath").join(artifact.repository_path()),
        LaunchMode::Module => java_dir.join("modules").join(artifact.module_file_name()),
    }
}

/// Launcher binary to embed: explicit path, then config, then the
/// architecture-specific name next to the running bundler.
pub fn locate_launcher_binary(
    explicit: Option<&Path>,
    project: &ProjectConfig,
    app: &AppConfig,
) -> Result<PathBuf, BundleError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = app.launcher.as_deref() {
        return Ok(project.resolve(path));
    }
    let exe = std::env::current_exe()
        .map_err(|err| BundleError::io("locating the running executable", err))?;
    let dir = exe
        .parent()
        .ok_or_else(|| BundleError::Invalid("running executable has no parent directory".to_string()))?;
    Ok(dir.join(app.native_binary.file_name()))
}

fn set_executable(path: &Path) -> Result<(), BundleError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = fs::metadata(path)
            .map_err(|err| BundleError::io(format!("reading {}", path.display()), err))?
            .permissions();
        permissions.set_mode(permissions.mode() | 0o755);
        fs::set_permissions(path, permissions)
            .map_err(|err| BundleError::io(format!("marking {} executable", path.display()), err))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
