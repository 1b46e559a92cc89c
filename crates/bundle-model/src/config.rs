use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::PlistError;
use crate::plist::PlistConfiguration;

/// Parsed `bundle.toml`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BundleConfig {
    pub project: ProjectConfig,
    pub plist: PlistConfiguration,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub dmg: DmgConfig,
    pub codesign: Option<CodesignConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectConfig {
    pub name: String,
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub final_name: Option<String>,
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    #[serde(default = "default_target_dir")]
    pub target_dir: PathBuf,
    /// The project's own packaged artifact (usually the application jar).
    pub artifact: Option<PathBuf>,
    #[serde(default)]
    pub dependencies: Vec<Artifact>,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_target_dir() -> PathBuf {
    PathBuf::from("target")
}

impl ProjectConfig {
    /// `<artifactId>-<version>` unless overridden.
    pub fn final_name(&self) -> String {
        self.final_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}-{}", self.artifact_id, self.version))
    }

    pub fn main_artifact(&self) -> Option<Artifact> {
        self.artifact.as_ref().map(|path| Artifact {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version: self.version.clone(),
            classifier: None,
            path: path.clone(),
        })
    }

    /// Main artifact first, then dependencies in declaration order.
    pub fn runtime_artifacts(&self) -> Vec<Artifact> {
        self.main_artifact()
            .into_iter()
            .chain(self.dependencies.iter().cloned())
            .collect()
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Artifact {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    pub path: PathBuf,
}

impl Artifact {
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .filter(|ext| !ext.is_empty())
            .unwrap_or_else(|| "jar".to_string())
    }

    /// Location inside a Maven default-layout repository, e.g.
    /// `org/slf4j/slf4j-api/2.0.9/slf4j-api-2.0.9.jar`.
    pub fn repository_path(&self) -> PathBuf {
        let mut path: PathBuf = self.group_id.split('.').collect();
        path.push(&self.artifact_id);
        path.push(&self.version);
        let mut file_name = format!("{}-{}", self.artifact_id, self.version);
        if let Some(classifier) = self.classifier.as_deref().filter(|c| !c.is_empty()) {
            file_name.push('-');
            file_name.push_str(classifier);
        }
        file_name.push('.');
        file_name.push_str(&self.extension());
        path.push(file_name);
        path
    }

    /// Flat file name used on the module path.
    pub fn module_file_name(&self) -> String {
        format!("{}-{}.{}", self.artifact_id, self.version, self.extension())
    }
}

/// A directory plus include/exclude globs, copied into an output directory.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct FileSet {
    pub directory: PathBuf,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
    pub output_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NativeBinaryType {
    #[default]
    Universal,
    #[serde(rename = "x86_64")]
    X86_64,
    #[serde(rename = "arm64")]
    Arm64,
}

impl NativeBinaryType {
    pub fn file_name(self) -> &'static str {
        match self {
            NativeBinaryType::Universal => "JavaLauncher",
            NativeBinaryType::X86_64 => "JavaLauncher.x86_64",
            NativeBinaryType::Arm64 => "JavaLauncher.arm64",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Explicit launcher binary; otherwise looked up next to the bundler.
    pub launcher: Option<PathBuf>,
    #[serde(default)]
    pub native_binary: NativeBinaryType,
    /// Copied relative to `Contents`.
    #[serde(default)]
    pub additional_resources: Vec<FileSet>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DmgConfig {
    #[serde(default)]
    pub generate: bool,
    #[serde(default)]
    pub additional_resources: Vec<FileSet>,
    #[serde(default = "default_true")]
    pub create_applications_symlink: bool,
    #[serde(default)]
    pub use_genisoimage: bool,
    #[serde(default)]
    pub auto_fallback: bool,
    pub volume_name: Option<String>,
}

impl Default for DmgConfig {
    fn default() -> Self {
        Self {
            generate: false,
            additional_resources: Vec::new(),
            create_applications_symlink: true,
            use_genisoimage: false,
            auto_fallback: false,
            volume_name: None,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CodesignConfig {
    pub identity: Option<String>,
    #[serde(default)]
    pub preserve_metadata: Vec<String>,
    pub entitlements: Option<PathBuf>,
    #[serde(default)]
    pub hardened_runtime: bool,
    #[serde(default)]
    pub deep: bool,
}

pub fn parse_config(contents: &str) -> Result<BundleConfig, PlistError> {
    Ok(toml::from_str(contents)?)
}
