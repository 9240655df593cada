//! labctl error types

use lab_remote::RemoteError;

/// Failure of a labctl invocation
#[derive(Debug, thiserror::Error)]
pub enum LabctlError {
    /// Bad flag or environment value
    #[error("Configuration error: {message}")]
    Configuration {
        /// What was wrong
        message: String,
    },

    /// A capability was read before the hook producing it ran
    #[error("Internal error: capability {capability:?} not available")]
    CapabilityNotFound {
        /// Capability name
        capability: &'static str,
    },

    /// A capability was published twice for one invocation
    #[error("Internal error: capability {capability:?} already set")]
    DuplicateCapability {
        /// Capability name
        capability: &'static str,
    },

    /// Malformed command-line input
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong
        message: String,
    },

    /// The HTTP client could not be constructed
    #[error("HTTP client initialization failed: {message}")]
    ClientInit {
        /// Builder error
        message: String,
    },

    /// Transport or decoding failure talking to a lab service
    #[error("Remote error: {0}")]
    Remote(RemoteError),

    /// The labapp refused the task
    #[error("Task rejected: {detail}")]
    TaskRejected {
        /// Rejection reason reported by the labapp
        detail: String,
    },

    /// The update went through but the labapp is not healthy afterwards
    #[error("labapp at {app_addr} unhealthy after labagent update")]
    PostUpdateUnhealthy {
        /// Address of the labapp that failed its healthcheck
        app_addr: String,
    },

    /// Interrupted or out of time
    #[error("Cancelled: {0}")]
    Cancelled(RemoteError),

    /// Spans could not be shipped to the trace collector
    #[error("Trace reporter error: {message}")]
    TraceReporter {
        /// Reporter failure
        message: String,
    },

    /// Rendering or writing command output failed
    #[error("Output error: {message}")]
    Output {
        /// What failed
        message: String,
    },

    /// Command-line parsing failed (or help/version was requested)
    #[error(transparent)]
    Usage(#[from] clap::Error),
}

impl LabctlError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Whether this is a hook wiring bug rather than a user-facing failure
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::CapabilityNotFound { .. } | Self::DuplicateCapability { .. }
        )
    }

    /// Process exit code for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(err) => u8::try_from(err.exit_code()).unwrap_or(2),
            _ => 1,
        }
    }
}

impl From<RemoteError> for LabctlError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::InvalidAddress { .. } => Self::invalid_argument(err.to_string()),
            RemoteError::TaskRejected { detail } => Self::TaskRejected { detail },
            RemoteError::Cancelled { .. } => Self::Cancelled(err),
            other => Self::Remote(other),
        }
    }
}

impl From<std::io::Error> for LabctlError {
    fn from(err: std::io::Error) -> Self {
        Self::output(err.to_string())
    }
}

/// Result type for labctl operations
pub type Result<T> = std::result::Result<T, LabctlError>;
