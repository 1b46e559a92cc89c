use bundle_model::{Dictionary, keys};
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Launcher log severities, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Some(Self::Trace),
            "DEBUG" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARN" | "WARNING" => Some(Self::Warn),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }

    /// `JVMLogLevel` from the bundle dictionary; `INFO` when absent or unknown.
    pub fn from_dictionary(dictionary: &Dictionary) -> Self {
        dictionary
            .string(keys::JVM_LOG_LEVEL)
            .and_then(Self::parse)
            .unwrap_or(Self::Info)
    }

    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Emit an already formatted message at this severity.
    pub fn log(self, message: &str) {
        match self {
            Self::Trace => trace!("{message}"),
            Self::Debug => debug!("{message}"),
            Self::Info => info!("{message}"),
            Self::Warn => warn!("{message}"),
            Self::Error => error!("{message}"),
        }
    }
}

/// Install the launcher's subscriber at the level the bundle asks for.
///
/// `RUST_LOG` takes precedence over `JVMLogLevel`. Calling this twice keeps
/// the first subscriber.
pub fn log_init(dictionary: &Dictionary) -> LogLevel {
    let level = LogLevel::from_dictionary(dictionary);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    let installed = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .is_ok();

    if installed {
        if let Some(raw) = dictionary.string(keys::JVM_LOG_LEVEL) {
            if LogLevel::parse(raw).is_none() {
                warn!("unknown JVMLogLevel '{raw}', using INFO");
            }
        }
    }
    level
}
