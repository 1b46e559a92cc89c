use std::path::Path;

use bundle_model::CodesignConfig;
use tracing::{error, info};

use crate::errors::BundleError;
use crate::runner::{CommandRunner, ToolCommand, run_checked};

pub struct SignatureGenerator<'a> {
    config: &'a CodesignConfig,
    runner: &'a dyn CommandRunner,
}

impl<'a> SignatureGenerator<'a> {
    pub fn new(config: &'a CodesignConfig, runner: &'a dyn CommandRunner) -> Self {
        Self { config, runner }
    }

    pub fn sign(&self, app_dir: &Path) -> Result<(), BundleError> {
        let identity = self
            .config
            .identity
            .as_deref()
            .map(str::trim)
            .filter(|identity| !identity.is_empty())
            .ok_or_else(|| BundleError::Invalid("codesign identity is not configured".to_string()))?;

        let app_name = app_dir
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        info!("Signing application '{app_name}' using identity: '{identity}'");

        let command = codesign_command(self.config, identity, app_dir);
        run_checked(self.runner, &command).inspect_err(|err| error!("Cannot sign app: {err}"))
    }
}

fn codesign_command(config: &CodesignConfig, identity: &str, app_dir: &Path) -> ToolCommand {
    let mut command = ToolCommand::new("codesign")
        .arg("--force")
        .arg("--timestamp")
        .arg("--sign")
        .arg(identity);

    let preserve: Vec<&str> = config
        .preserve_metadata
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .collect();
    if !preserve.is_empty() {
        command = command.arg(format!("--preserve-metadata={}", preserve.join(",")));
    }
    if let Some(entitlements) = config.entitlements.as_deref() {
        command = command.arg("--entitlements").path_arg(entitlements);
    }
    if config.hardened_runtime {
        command = command.arg("--options").arg("runtime");
    }
    if config.deep {
        command = command.arg("--deep");
    }
    command.path_arg(app_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::RecordingRunner;
    use std::path::PathBuf;

    #[test]
    fn builds_codesign_invocation() {
        let config = CodesignConfig {
            identity: Some("Developer ID Application: Example".to_string()),
            preserve_metadata: vec!["entitlements".to_string(), " ".to_string(), "requirements".to_string()],
            entitlements: Some(PathBuf::from("/work/app.entitlements")),
            hardened_runtime: true,
            deep: false,
        };
        let runner = RecordingRunner::default();

        SignatureGenerator::new(&config, &runner)
            .sign(Path::new("/work/target/Example.app"))
            .expect("sign");

        let calls = runner.calls.lock().expect("calls");
        assert_eq!(calls[0].program, "codesign");
        assert_eq!(
            calls[0].args,
            vec![
                "--force",
                "--timestamp",
                "--sign",
                "Developer ID Application: Example",
                "--preserve-metadata=entitlements,requirements",
                "--entitlements",
                "/work/app.entitlements",
                "--options",
                "runtime",
                "/work/target/Example.app",
            ]
        );
    }

    #[test]
    fn failures_and_missing_identity_are_errors() {
        let runner = RecordingRunner::with_statuses(&[1]);
        let config = CodesignConfig {
            identity: Some("-".to_string()),
            ..CodesignConfig::default()
        };
        let err = SignatureGenerator::new(&config, &runner)
            .sign(Path::new("/tmp/Example.app"))
            .expect_err("codesign failure");
        assert_eq!(err.to_string(), "command 'codesign' exited with status 1");

        let unsigned = CodesignConfig::default();
        assert!(SignatureGenerator::new(&unsigned, &runner)
            .sign(Path::new("/tmp/Example.app"))
            .is_err());
    }
}
