pub mod app;
pub mod dmg;
pub mod errors;
pub mod fileset;
pub mod pipeline;
pub mod runner;
pub mod sign;

pub use app::{AppGenerator, locate_launcher_binary};
pub use dmg::DmgGenerator;
pub use errors::BundleError;
pub use fileset::copy_file_sets;
pub use pipeline::{BundleOptions, BundleOutput, bundle};
pub use runner::{CommandRunner, SystemRunner, ToolCommand};
pub use sign::SignatureGenerator;
