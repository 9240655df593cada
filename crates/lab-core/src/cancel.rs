//! Cooperative cancellation.

use std::sync::Arc;
use tokio::sync::watch;

/// Clonable cancellation token.
///
/// All clones observe the same state. Cancelling is idempotent and wakes
/// every task currently waiting in [`CancellationToken::cancelled`].
#[derive(Debug, Clone)]
pub struct CancellationToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl CancellationToken {
    /// Create a token that has not been cancelled.
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Non-blocking cancellation check.
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as any clone of this token, so the only
        // way out of `wait_for` is an observed `true`.
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_waiters() {
        let token = CancellationToken::new();
        let waiter = token.clone();

        let handle = tokio::spawn(async move { waiter.cancelled().await });
        tokio::task::yield_now().await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake")
            .expect("task should not panic");
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_already_cancelled_resolves_immediately() {
        let token = CancellationToken::new();
        token.cancel();
        token.cancel();

        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .expect("cancelled token resolves at once");
    }

    #[test]
    fn test_fresh_token_is_not_cancelled() {
        let token = CancellationToken::default();
        assert!(!token.is_cancelled());
        assert!(!token.clone().is_cancelled());
    }
}
