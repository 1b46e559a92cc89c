pub mod errors;
pub mod launch;
pub mod logging;
pub mod resolver;
pub mod version;

pub use errors::JvmError;
pub use launch::LaunchPlan;
pub use logging::{LogLevel, log_init};
pub use resolver::{
    JvmResolver, detect_home_version, is_jvm_home, resolve_jvm_directory,
    resolve_jvm_dylib_location,
};
pub use version::{JavaVersion, JavaVersionRequirement};
