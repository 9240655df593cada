//! Global configuration consumed by the lifecycle hooks

use clap::Args;
use std::time::Duration;

/// Environment variable holding the trace collector address (`host:port`)
pub const TRACE_COLLECTOR_ENV: &str = "LABCTL_TRACE_ADDR";

/// Default `--log-level`
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default `--log-writer`
pub const DEFAULT_LOG_WRITER: &str = "console";

/// Default `--output`
pub const DEFAULT_OUTPUT: &str = "unix";

/// Flags shared by every command
///
/// The enumerated values are kept as raw strings here; the hooks that
/// consume them are responsible for validating them.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct GlobalArgs {
    /// Log level (trace, debug, info, warn, error, disabled)
    #[arg(long = "log-level", global = true, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// Log writer (console, json)
    #[arg(long = "log-writer", global = true, default_value = DEFAULT_LOG_WRITER)]
    pub log_writer: String,

    /// Output format (unix, json)
    #[arg(long, global = true, default_value = DEFAULT_OUTPUT)]
    pub output: String,

    /// Abort remote calls still running after this many seconds
    #[arg(long, global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

impl GlobalArgs {
    /// Deadline for remote calls, if configured
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

impl Default for GlobalArgs {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_writer: DEFAULT_LOG_WRITER.to_string(),
            output: DEFAULT_OUTPUT.to_string(),
            timeout: None,
        }
    }
}
