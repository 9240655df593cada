//! Execution context for a single command invocation
//!
//! The context travels with every remote call. It carries:
//! - the process cancellation token (interrupts)
//! - an optional deadline (`--timeout`)
//! - the command's tracing span and the logger (`Dispatch`) bound to it
//!
//! Remote calls race their I/O against [`ExecutionContext::cancelled`] so an
//! interrupt or an expired deadline aborts them instead of hanging.

use crate::cancel::CancellationToken;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{Dispatch, Span};

/// A timeout too large to turn into a deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("timeout of {}s is out of range", .0.as_secs())]
pub struct TimeoutOutOfRange(pub Duration);

/// Per-invocation execution context
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    span: Span,
    logger: Dispatch,
}

impl ExecutionContext {
    /// Create a context bound to a cancellation token, with no span and no logger
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
            span: Span::none(),
            logger: Dispatch::none(),
        }
    }

    /// Context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self::new(CancellationToken::new())
    }

    /// Attach the command span
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Bind a structured logger
    pub fn with_logger(mut self, logger: Dispatch) -> Self {
        self.logger = logger;
        self
    }

    /// Abort work still pending after `timeout` has elapsed.
    ///
    /// Fails when the deadline cannot be represented.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, TimeoutOutOfRange> {
        let deadline = Instant::now()
            .checked_add(timeout)
            .ok_or(TimeoutOutOfRange(timeout))?;
        self.deadline = Some(deadline);
        Ok(self)
    }

    /// Command span
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Logger bound to this invocation
    pub fn logger(&self) -> &Dispatch {
        &self.logger
    }

    /// Cancellation token shared with the rest of the process
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Deadline, if one was configured
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Non-blocking check covering both cancellation and deadline expiry
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves when the token is cancelled or the deadline passes
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.cancel.cancelled().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_counts_as_cancellation() {
        let ctx = ExecutionContext::background()
            .with_timeout(Duration::from_millis(10))
            .unwrap();
        assert!(ctx.deadline().is_some());

        tokio::time::timeout(Duration::from_secs(1), ctx.cancelled())
            .await
            .expect("deadline should fire");
        assert!(ctx.is_cancelled());
        assert!(!ctx.cancellation().is_cancelled());
    }

    #[tokio::test]
    async fn test_unrepresentable_timeout_is_rejected() {
        let timeout = Duration::from_secs(u64::MAX);
        let err = ExecutionContext::background().with_timeout(timeout).unwrap_err();
        assert_eq!(err, TimeoutOutOfRange(timeout));
        assert!(err.to_string().contains("out of range"));
    }

    #[tokio::test]
    async fn test_token_cancellation_propagates_to_clones() {
        let token = CancellationToken::new();
        let ctx = ExecutionContext::new(token.clone());
        let cloned = ctx.clone();

        token.cancel();
        cloned.cancelled().await;
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_background_context_is_live() {
        let ctx = ExecutionContext::background();
        assert!(!ctx.is_cancelled());
        assert!(ctx.span().is_none());
        assert!(ctx.deadline().is_none());
    }
}
