use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use bundle_model::{BundleConfig, CodesignConfig};

use crate::io;

pub const CONFIG_FILE: &str = "bundle.toml";

/// Load `bundle.toml` (or an explicit config path) below `root`.
///
/// A relative `project.base_dir` is anchored at `root`; environment
/// overrides are applied last.
pub fn load_bundle_config(root: &Path, config_path: Option<&Path>) -> Result<BundleConfig> {
    let path = match config_path {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => root.join(path),
        None => root.join(CONFIG_FILE),
    };
    if !path.exists() {
        bail!("{CONFIG_FILE} not found at {}", path.display());
    }

    let text = io::read_to_string(&path)?;
    let mut config = bundle_model::parse_config(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    if config.project.base_dir.is_relative() {
        config.project.base_dir = root.join(&config.project.base_dir);
    }

    apply_overrides(
        &mut config,
        std::env::var("APPBUNDLER_TARGET_DIR").ok(),
        std::env::var("APPBUNDLER_CODESIGN_IDENTITY").ok(),
    );
    Ok(config)
}

pub fn apply_overrides(
    config: &mut BundleConfig,
    target_dir: Option<String>,
    codesign_identity: Option<String>,
) {
    if let Some(target_dir) = normalize_optional(target_dir) {
        config.project.target_dir = PathBuf::from(target_dir);
    }
    if let Some(identity) = normalize_optional(codesign_identity) {
        config
            .codesign
            .get_or_insert_with(CodesignConfig::default)
            .identity = Some(identity);
    }
}

pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|val| {
        let trimmed = val.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}
