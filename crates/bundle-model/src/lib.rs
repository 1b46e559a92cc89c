pub mod config;
pub mod errors;
pub mod plist;
pub mod value;
pub mod xml;

pub use config::{
    AppConfig, Artifact, BundleConfig, CodesignConfig, DmgConfig, FileSet, NativeBinaryType, ProjectConfig,
    parse_config,
};
pub use errors::PlistError;
pub use plist::{DocumentType, LaunchMode, PlistConfiguration, keys};
pub use value::{Dictionary, PlistValue};
pub use xml::{read_plist, read_plist_file, write_plist};
