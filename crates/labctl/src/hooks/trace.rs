//! Tracing and logging setup and teardown

use super::Hook;
use crate::error::{LabctlError, Result};
use crate::logging::{self, LogSink, LogWriter};
use crate::store::Invocation;
use crate::tracer::Tracer;
use async_trait::async_trait;
use lab_core::ExecutionContext;

/// Starts the invocation span and binds the invocation logger.
///
/// Publishes the execution context and the log sink. When the invocation
/// already carries a context its span is reused and nothing is published.
#[derive(Debug, Clone)]
pub struct TracingHook {
    tracer: Tracer,
}

impl TracingHook {
    /// Hook starting spans on `tracer`
    pub fn new(tracer: Tracer) -> Self {
        Self { tracer }
    }
}

#[async_trait]
impl Hook for TracingHook {
    async fn run(&self, inv: &mut Invocation) -> Result<()> {
        if inv.contains::<ExecutionContext>() {
            return Ok(());
        }

        let globals = inv.globals();
        let level = logging::parse_level(&globals.log_level)?;
        let writer: LogWriter = globals.log_writer.parse()?;
        let mut context = ExecutionContext::new(inv.cancellation().clone());
        if let Some(timeout) = globals.timeout() {
            context = context
                .with_timeout(timeout)
                .map_err(|e| LabctlError::configuration(format!("--timeout: {e}")))?;
        }

        let logger = logging::logger(level, writer);
        let span = self
            .tracer
            .start_span(inv.command_name(), inv.command_line(), &logger);
        let context = context.with_span(span.span().clone()).with_logger(logger);

        inv.start_span(span)?;
        inv.set(context)?;
        inv.set(LogSink::new(writer))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

/// Finishes the invocation span and closes the tracer
#[derive(Debug, Clone)]
pub struct TeardownHook {
    tracer: Tracer,
}

impl TeardownHook {
    /// Teardown for `tracer`
    pub fn new(tracer: Tracer) -> Self {
        Self { tracer }
    }
}

#[async_trait]
impl Hook for TeardownHook {
    async fn run(&self, inv: &mut Invocation) -> Result<()> {
        if let Some(span) = inv.take_span() {
            span.finish();
        }
        self.tracer.close().await
    }

    fn name(&self) -> &str {
        "teardown"
    }
}
