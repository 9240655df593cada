//! Errors raised while talking to remote lab services

/// Remote service failure
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The address is not a usable endpoint reference
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress {
        /// Address as given
        address: String,
        /// Why it was rejected
        reason: String,
    },

    /// The request could not be delivered or the response not received
    #[error("{service} {operation} failed: {message}")]
    Transport {
        /// Remote service name
        service: &'static str,
        /// Operation being performed
        operation: &'static str,
        /// Underlying transport failure
        message: String,
    },

    /// The remote answered with a non-success status
    #[error("{service} {operation} returned {status}: {body}")]
    Status {
        /// Remote service name
        service: &'static str,
        /// Operation being performed
        operation: &'static str,
        /// HTTP status code
        status: u16,
        /// Response body, trimmed
        body: String,
    },

    /// The response body could not be decoded
    #[error("{service} {operation} returned an undecodable response: {message}")]
    Decode {
        /// Remote service name
        service: &'static str,
        /// Operation being performed
        operation: &'static str,
        /// Decoder error
        message: String,
    },

    /// The labapp refused the task type or subject
    #[error("task rejected: {detail}")]
    TaskRejected {
        /// Rejection reason reported by the labapp
        detail: String,
    },

    /// The call was abandoned because the invocation was cancelled or timed out
    #[error("{service} {operation} cancelled")]
    Cancelled {
        /// Remote service name
        service: &'static str,
        /// Operation being performed
        operation: &'static str,
    },
}

impl RemoteError {
    /// Create an invalid address error
    pub fn invalid_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure came from cancellation rather than the remote side
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Result type for remote operations
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;
