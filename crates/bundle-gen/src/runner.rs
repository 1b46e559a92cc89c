use std::fmt;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::errors::BundleError;

/// An external tool invocation (`hdiutil`, `genisoimage`, `codesign`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().to_string())
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

pub trait CommandRunner: Send + Sync {
    /// Run to completion and return the exit status.
    fn run(&self, command: &ToolCommand) -> Result<i32, BundleError>;
}

/// Runs tools as child processes with inherited stdio.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> Result<i32, BundleError> {
        debug!("running {command}");
        let status = Command::new(&command.program)
            .args(&command.args)
            .status()
            .map_err(|err| BundleError::io(format!("running '{}'", command.program), err))?;
        Ok(status.code().unwrap_or(-1))
    }
}

pub(crate) fn run_checked(runner: &dyn CommandRunner, command: &ToolCommand) -> Result<(), BundleError> {
    match runner.run(command)? {
        0 => Ok(()),
        status => Err(BundleError::Tool {
            tool: command.program.clone(),
            status,
        }),
    }
}
