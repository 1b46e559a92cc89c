use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory};
use clap_complete::{Shell, generate};

use crate::io;

#[derive(Args)]
pub struct CompletionArgs {
    #[arg(value_enum)]
    shell: Shell,
    /// Write the script here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

pub fn run(args: CompletionArgs) -> Result<()> {
    let script = completion_script(args.shell)?;
    match args.output {
        Some(path) => io::write_output(&path, script.as_bytes()),
        None => {
            print!("{script}");
            Ok(())
        }
    }
}

fn completion_script(shell: Shell) -> Result<String> {
    let mut cli = crate::Cli::command();
    let bin_name = cli.get_name().to_owned();
    let mut script = Vec::new();
    generate(shell, &mut cli, bin_name, &mut script);
    String::from_utf8(script).context("Completion script is not UTF-8")
}
