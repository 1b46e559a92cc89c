use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod io;

use commands::{bundle, completion, jvm, plist};

#[derive(Parser)]
#[command(name = "appbundler", version, about = "macOS app bundler for JVM applications")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the .app (and optionally sign it and pack a .dmg)
    Bundle(bundle::BundleArgs),
    /// Print or write the Info.plist the bundle would get
    Plist(plist::PlistArgs),
    /// Show which JVM a bundle would run on
    ResolveJvm(jvm::ResolveJvmArgs),
    /// Print a shell completion script
    Completion(completion::CompletionArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match cli.command {
        Commands::Bundle(args) => bundle::run(args),
        Commands::Plist(args) => plist::run(args),
        Commands::ResolveJvm(args) => jvm::run(args),
        Commands::Completion(args) => completion::run(args),
    }
}
