//! Command tracing and span reporting
//!
//! The [`Tracer`] is constructed once in `main` and handed to the
//! instrumenter; it is not a process-global. When `LABCTL_TRACE_ADDR` is
//! unset the tracer is a no-op: spans are still created for logging, but
//! nothing is recorded and closing it touches no sockets. Otherwise finished
//! spans are buffered and shipped to the collector as JSON datagrams when the
//! tracer is closed during teardown.

use crate::config::TRACE_COLLECTOR_ENV;
use crate::error::{LabctlError, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tracing::{Dispatch, Span};
use uuid::Uuid;

/// Service name reported for every span
pub const SERVICE_NAME: &str = "labctl";

/// A finished span as shipped to the collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpanRecord {
    /// Reporting service
    pub service: &'static str,
    /// Trace identifier
    pub trace_id: String,
    /// Span identifier
    pub span_id: String,
    /// Operation (command) name
    pub operation: String,
    /// Wall-clock start
    pub start_unix_micros: u64,
    /// Time between start and finish
    pub duration_micros: u64,
    /// Span attributes
    pub tags: BTreeMap<String, String>,
}

enum Reporter {
    Noop,
    Udp {
        collector: SocketAddr,
        finished: Mutex<Vec<SpanRecord>>,
    },
}

struct TracerInner {
    reporter: Reporter,
    closed: AtomicBool,
}

/// Tracer/reporter pair for one process run
#[derive(Clone)]
pub struct Tracer {
    inner: Arc<TracerInner>,
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer")
            .field("collector", &self.collector())
            .field("closed", &self.inner.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl Tracer {
    fn with_reporter(reporter: Reporter) -> Self {
        Self {
            inner: Arc::new(TracerInner {
                reporter,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Tracer that records nothing and never touches the network
    pub fn noop() -> Self {
        Self::with_reporter(Reporter::Noop)
    }

    /// Tracer configured from [`TRACE_COLLECTOR_ENV`]
    pub fn from_env() -> Result<Self> {
        match std::env::var(TRACE_COLLECTOR_ENV) {
            Ok(addr) if !addr.trim().is_empty() => Self::udp(addr.trim()),
            _ => Ok(Self::noop()),
        }
    }

    /// Tracer shipping spans to a UDP collector at `collector` (`host:port`)
    pub fn udp(collector: &str) -> Result<Self> {
        let addr = collector
            .to_socket_addrs()
            .map_err(|e| {
                LabctlError::configuration(format!(
                    "{TRACE_COLLECTOR_ENV}={collector:?} is not a usable collector address: {e}"
                ))
            })?
            .next()
            .ok_or_else(|| {
                LabctlError::configuration(format!(
                    "{TRACE_COLLECTOR_ENV}={collector:?} did not resolve"
                ))
            })?;

        Ok(Self::with_reporter(Reporter::Udp {
            collector: addr,
            finished: Mutex::new(Vec::new()),
        }))
    }

    /// Whether spans are discarded
    pub fn is_noop(&self) -> bool {
        matches!(self.inner.reporter, Reporter::Noop)
    }

    /// Collector address, when reporting is enabled
    pub fn collector(&self) -> Option<SocketAddr> {
        match &self.inner.reporter {
            Reporter::Noop => None,
            Reporter::Udp { collector, .. } => Some(*collector),
        }
    }

    /// Finished spans waiting to be shipped
    pub fn pending(&self) -> usize {
        match &self.inner.reporter {
            Reporter::Noop => 0,
            Reporter::Udp { finished, .. } => finished.lock().len(),
        }
    }

    /// Start the span for a command invocation.
    ///
    /// The tracing span is created under `logger` so events emitted inside
    /// it reach the invocation's log stream.
    pub fn start_span(&self, operation: &str, command_line: &str, logger: &Dispatch) -> CommandSpan {
        let span = tracing::dispatcher::with_default(logger, || {
            tracing::info_span!("command", operation = %operation, command = %command_line)
        });

        let (trace_id, span_id) = if self.is_noop() {
            (String::new(), String::new())
        } else {
            let id = Uuid::new_v4().simple().to_string();
            (id.clone(), id[..16].to_string())
        };
        let start_unix_micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_micros() as u64)
            .unwrap_or_default();

        let mut tags = BTreeMap::new();
        tags.insert("command".to_string(), command_line.to_string());

        CommandSpan {
            tracer: self.clone(),
            span,
            started: Instant::now(),
            record: SpanRecord {
                service: SERVICE_NAME,
                trace_id,
                span_id,
                operation: operation.to_string(),
                start_unix_micros,
                duration_micros: 0,
                tags,
            },
        }
    }

    fn report(&self, record: SpanRecord) {
        if let Reporter::Udp { finished, .. } = &self.inner.reporter {
            if self.inner.closed.load(Ordering::SeqCst) {
                tracing::debug!(operation = %record.operation, "span finished after tracer close, dropped");
                return;
            }
            finished.lock().push(record);
        }
    }

    /// Ship buffered spans and close the reporter.
    ///
    /// Only the first call does any work; later calls return `Ok(())`.
    pub async fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        match &self.inner.reporter {
            Reporter::Noop => Ok(()),
            Reporter::Udp {
                collector,
                finished,
            } => {
                let records = std::mem::take(&mut *finished.lock());
                ship(*collector, &records).await.map_err(|e| LabctlError::TraceReporter {
                    message: format!(
                        "shipping {} span(s) to {collector} failed: {e}",
                        records.len()
                    ),
                })
            }
        }
    }
}

async fn ship(collector: SocketAddr, records: &[SpanRecord]) -> std::io::Result<()> {
    if records.is_empty() {
        return Ok(());
    }

    let local: SocketAddr = if collector.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(local).await?;
    for record in records {
        let payload = serde_json::to_vec(record).map_err(std::io::Error::other)?;
        socket.send_to(&payload, collector).await?;
    }
    Ok(())
}

/// Span covering one command invocation
///
/// Finishing consumes the span, so it can be finished at most once.
#[derive(Debug)]
pub struct CommandSpan {
    tracer: Tracer,
    span: Span,
    started: Instant,
    record: SpanRecord,
}

impl CommandSpan {
    /// Underlying tracing span
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Operation name
    pub fn operation(&self) -> &str {
        &self.record.operation
    }

    /// Attach an attribute
    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.record.tags.insert(key.into(), value.into());
    }

    /// Attribute value, if set
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.record.tags.get(key).map(String::as_str)
    }

    /// Finish the span and hand it to the reporter
    pub fn finish(self) {
        let mut record = self.record;
        record.duration_micros = self.started.elapsed().as_micros() as u64;
        self.tracer.report(record);
    }
}
