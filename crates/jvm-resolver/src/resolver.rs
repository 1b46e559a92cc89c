use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use bundle_model::{Dictionary, keys, read_plist_file};
use tracing::{debug, info, warn};

use crate::errors::JvmError;
use crate::version::{JavaVersion, JavaVersionRequirement};

const JAVA_HOME_TOOL: &str = "/usr/libexec/java_home";

/// Relative to a JVM home; first hit wins.
const DYLIB_CANDIDATES: &[&str] = &[
    "lib/libjli.dylib",
    "lib/jli/libjli.dylib",
    "jre/lib/jli/libjli.dylib",
    "../MacOS/libjli.dylib",
    "lib/libjli.so",
    "lib/jli/libjli.so",
    "jre/lib/jli/libjli.so",
    "jre/lib/amd64/jli/libjli.so",
];

/// Finds the JVM a bundled application should run on.
///
/// Sources are tried in order: the bundle's embedded runtime
/// (`JVMRuntimePath`), `JAVA_HOME`, the macOS `java_home` tool and finally a
/// scan of the well-known JVM install roots.
#[derive(Debug, Clone)]
pub struct JvmResolver {
    contents_dir: Option<PathBuf>,
    java_home_env: Option<PathBuf>,
    java_home_tool: Option<PathBuf>,
    search_roots: Vec<PathBuf>,
}

impl Default for JvmResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl JvmResolver {
    /// Resolver configured from the running system.
    pub fn new() -> Self {
        let java_home_env = std::env::var_os("JAVA_HOME")
            .map(PathBuf::from)
            .filter(|path| !path.as_os_str().is_empty());
        let tool = PathBuf::from(JAVA_HOME_TOOL);
        Self {
            contents_dir: None,
            java_home_env,
            java_home_tool: tool.is_file().then_some(tool),
            search_roots: default_search_roots(),
        }
    }

    /// Bundle `Contents` directory that relative `JVMRuntimePath` values
    /// resolve against.
    pub fn with_contents_dir(mut self, contents_dir: impl Into<PathBuf>) -> Self {
        self.contents_dir = Some(contents_dir.into());
        self
    }

    pub fn with_java_home(mut self, java_home: Option<PathBuf>) -> Self {
        self.java_home_env = java_home;
        self
    }

    pub fn with_java_home_tool(mut self, tool: Option<PathBuf>) -> Self {
        self.java_home_tool = tool;
        self
    }

    pub fn with_search_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.search_roots = roots;
        self
    }

    /// Look up a JVM home for `java_version`, falling back to the dictionary's
    /// `JVMVersion` when the argument is blank.
    pub fn resolve_jvm_directory(
        &self,
        java_version: &str,
        dictionary: &Dictionary,
    ) -> Result<PathBuf, JvmError> {
        let requested = if java_version.trim().is_empty() {
            dictionary.string(keys::JVM_VERSION).unwrap_or_default()
        } else {
            java_version
        };
        let requirement = JavaVersionRequirement::parse(requested)?;
        debug!("resolving JVM for requirement {requirement}");

        if let Some(runtime_path) = dictionary.string(keys::JVM_RUNTIME_PATH) {
            return self.resolve_embedded_runtime(runtime_path, &requirement);
        }

        if let Some(home) = self.java_home_env.as_deref() {
            match check_candidate(&normalize_home(home), &requirement) {
                Ok(home) => {
                    info!("using JAVA_HOME at {}", home.display());
                    return Ok(home);
                }
                Err(reason) => debug!("skipping JAVA_HOME {}: {reason}", home.display()),
            }
        }

        if let Some(tool) = self.java_home_tool.as_deref() {
            match query_java_home_tool(tool, &requirement) {
                Some(home) => match check_candidate(&home, &requirement) {
                    Ok(home) => {
                        info!("using JVM reported by java_home at {}", home.display());
                        return Ok(home);
                    }
                    Err(reason) => debug!("skipping java_home result {}: {reason}", home.display()),
                },
                None => debug!("java_home found no JVM for {requirement}"),
            }
        }

        let mut best: Option<(JavaVersion, PathBuf)> = None;
        for home in self.scan_search_roots() {
            let Some(version) = detect_home_version(&home) else {
                debug!("skipping {}: version not detectable", home.display());
                continue;
            };
            if !requirement.matches(&version) {
                debug!("skipping {} ({version}): does not match {requirement}", home.display());
                continue;
            }
            if best.as_ref().is_none_or(|(current, _)| version > *current) {
                best = Some((version, home));
            }
        }

        match best {
            Some((version, home)) => {
                info!("using JVM {version} at {}", home.display());
                Ok(home)
            }
            None => Err(JvmError::NotFound(requirement.to_string())),
        }
    }

    fn resolve_embedded_runtime(
        &self,
        runtime_path: &str,
        requirement: &JavaVersionRequirement,
    ) -> Result<PathBuf, JvmError> {
        let configured = Path::new(runtime_path);
        let path = if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            let contents = self.contents_dir.as_deref().ok_or_else(|| {
                JvmError::UnusableRuntime {
                    path: configured.to_path_buf(),
                    reason: "relative runtime path without a bundle contents directory"
                        .to_string(),
                }
            })?;
            contents.join(configured)
        };

        let home = normalize_home(&path);
        if !is_java_binary(&home.join("bin").join("java")) {
            return Err(JvmError::UnusableRuntime {
                path: home,
                reason: "bin/java is missing or not executable".to_string(),
            });
        }
        resolve_jvm_dylib_location(&home).map_err(|err| JvmError::UnusableRuntime {
            path: home.clone(),
            reason: err.to_string(),
        })?;

        match detect_home_version(&home) {
            Some(version) if !requirement.matches(&version) => warn!(
                "embedded runtime {version} does not satisfy {requirement}; using it anyway"
            ),
            _ => {}
        }
        info!("using embedded runtime at {}", home.display());
        Ok(home)
    }

    /// Every JVM home directly below one of the search roots, in a stable
    /// order.
    fn scan_search_roots(&self) -> Vec<PathBuf> {
        let mut homes = Vec::new();
        for root in &self.search_roots {
            let Ok(entries) = fs::read_dir(root) else {
                continue;
            };
            let mut dirs: Vec<PathBuf> = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.is_dir())
                .collect();
            dirs.sort();
            for dir in dirs {
                let home = normalize_home(&dir);
                if is_jvm_home(&home) {
                    homes.push(home);
                }
            }
        }
        homes
    }
}

/// Resolve with a resolver configured from the running system.
pub fn resolve_jvm_directory(java_version: &str, dictionary: &Dictionary) -> Result<PathBuf, JvmError> {
    JvmResolver::new().resolve_jvm_directory(java_version, dictionary)
}

/// Location of the JVM's launcher library (`libjli`) below a JVM home.
pub fn resolve_jvm_dylib_location(jvm_directory: &Path) -> Result<PathBuf, JvmError> {
    DYLIB_CANDIDATES
        .iter()
        .map(|candidate| jvm_directory.join(candidate))
        .find(|path| path.is_file())
        .ok_or_else(|| JvmError::MissingDylib(jvm_directory.to_path_buf()))
}

/// Detect a JVM home's version: `release` file, then the macOS bundle
/// `Info.plist`, then `bin/java -version`.
pub fn detect_home_version(home: &Path) -> Option<JavaVersion> {
    if let Ok(contents) = fs::read_to_string(home.join("release")) {
        if let Some(version) = JavaVersion::from_release_file(&contents) {
            return Some(version);
        }
    }

    if let Some(bundle_contents) = home.parent().filter(|_| home.ends_with("Contents/Home")) {
        if let Ok(dict) = read_plist_file(&bundle_contents.join("Info.plist")) {
            let version = dict
                .get("JavaVM")
                .and_then(|value| value.as_dict())
                .and_then(|java_vm| java_vm.string("JVMVersion"))
                .and_then(JavaVersion::parse);
            if version.is_some() {
                return version;
            }
        }
    }

    let output = Command::new(home.join("bin").join("java"))
        .arg("-version")
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let mut full = String::from_utf8_lossy(&output.stdout).to_string();
    full.push('\n');
    full.push_str(&String::from_utf8_lossy(&output.stderr));
    JavaVersion::from_version_output(&full)
}

pub fn is_jvm_home(home: &Path) -> bool {
    is_java_binary(&home.join("bin").join("java")) && resolve_jvm_dylib_location(home).is_ok()
}

/// macOS JDK bundles keep the actual home in `Contents/Home`.
fn normalize_home(path: &Path) -> PathBuf {
    let bundle_home = path.join("Contents").join("Home");
    if bundle_home.is_dir() {
        return bundle_home;
    }
    if path.ends_with("Contents") && path.join("Home").is_dir() {
        return path.join("Home");
    }
    path.to_path_buf()
}

fn check_candidate(home: &Path, requirement: &JavaVersionRequirement) -> Result<PathBuf, String> {
    if !is_jvm_home(home) {
        return Err("not a JVM home".to_string());
    }
    if *requirement == JavaVersionRequirement::Any {
        return Ok(home.to_path_buf());
    }
    match detect_home_version(home) {
        Some(version) if requirement.matches(&version) => Ok(home.to_path_buf()),
        Some(version) => Err(format!("version {version} does not match {requirement}")),
        None => Err("version not detectable".to_string()),
    }
}

fn query_java_home_tool(tool: &Path, requirement: &JavaVersionRequirement) -> Option<PathBuf> {
    let mut command = Command::new(tool);
    if let Some(arg) = requirement.java_home_arg() {
        command.arg("-v").arg(arg);
    }
    let output = match command.output() {
        Ok(output) => output,
        Err(err) => {
            warn!("failed to run {}: {err}", tool.display());
            return None;
        }
    };
    if !output.status.success() {
        return None;
    }
    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!path.is_empty()).then(|| PathBuf::from(path))
}

fn is_java_binary(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        fs::metadata(path)
            .map(|metadata| metadata.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        true
    }
}

fn default_search_roots() -> Vec<PathBuf> {
    let mut roots = vec![PathBuf::from("/Library/Java/JavaVirtualMachines")];
    if let Some(home) = dirs::home_dir() {
        roots.push(home.join("Library").join("Java").join("JavaVirtualMachines"));
    }
    roots.push(PathBuf::from("/System/Library/Java/JavaVirtualMachines"));

    if cfg!(target_os = "linux") {
        roots.push(PathBuf::from("/usr/lib/jvm"));
        roots.push(PathBuf::from("/usr/java"));
        roots.push(PathBuf::from("/opt/java"));
    }
    roots
}
