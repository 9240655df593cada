//! Lifecycle hooks
//!
//! A [`HookChain`] is an ordered list of stages run around a command body.
//! `before` chains stop at the first failure; `after` chains run every
//! stage and report the first failure.

mod client;
mod printer;
mod trace;

pub use self::client::ClientHook;
pub use self::printer::PrinterHook;
pub use self::trace::{TeardownHook, TracingHook};

use crate::error::Result;
use crate::store::Invocation;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// One stage of a lifecycle chain
#[async_trait]
pub trait Hook: Send + Sync {
    /// Run against the current invocation
    async fn run(&self, inv: &mut Invocation) -> Result<()>;

    /// Hook name for debugging
    fn name(&self) -> &str;
}

/// Ordered sequence of hooks
#[derive(Clone, Default)]
pub struct HookChain {
    stages: Vec<Arc<dyn Hook>>,
}

impl fmt::Debug for HookChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl HookChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain holding a single hook
    pub fn single(hook: Arc<dyn Hook>) -> Self {
        Self { stages: vec![hook] }
    }

    /// Append a hook; `None` is skipped
    pub fn then(mut self, hook: Option<Arc<dyn Hook>>) -> Self {
        self.stages.extend(hook);
        self
    }

    /// Concatenate chains in order
    pub fn join(chains: impl IntoIterator<Item = HookChain>) -> Self {
        Self {
            stages: chains.into_iter().flat_map(|chain| chain.stages).collect(),
        }
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain has no stages
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in run order
    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|hook| hook.name()).collect()
    }

    /// Run stages in order, stopping at the first failure
    pub async fn run(&self, inv: &mut Invocation) -> Result<()> {
        for hook in &self.stages {
            hook.run(inv).await?;
        }
        Ok(())
    }

    /// Run every stage; the first failure is returned
    pub async fn run_all(&self, inv: &mut Invocation) -> Result<()> {
        let mut outcome = Ok(());
        for hook in &self.stages {
            if let Err(err) = hook.run(inv).await {
                if outcome.is_ok() {
                    outcome = Err(err);
                } else {
                    inv.in_logger(|| {
                        tracing::warn!(hook = hook.name(), error = %err, "superseded hook failure");
                    });
                }
            }
        }
        outcome
    }
}
