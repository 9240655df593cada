//! Structured logging for a labctl invocation
//!
//! Each invocation gets its own `tracing::Dispatch` rather than a global
//! subscriber; it is bound to the execution context and installed around
//! the command body only.

use crate::error::{LabctlError, Result};
use std::io::{IsTerminal, Write};
use std::str::FromStr;
use tracing::level_filters::LevelFilter;
use tracing::Dispatch;
use tracing_subscriber::fmt::MakeWriter;

/// Log output format selected by `--log-writer`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogWriter {
    /// Human-readable lines on stderr
    Console,
    /// One JSON object per line on stderr
    Json,
}

impl FromStr for LogWriter {
    type Err = LabctlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "console" => Ok(Self::Console),
            "json" => Ok(Self::Json),
            other => Err(LabctlError::configuration(format!(
                "unknown log writer {other:?}"
            ))),
        }
    }
}

/// Parse a `--log-level` value.
///
/// Besides the tracing level names this accepts `disabled` (same as `off`)
/// and `fatal`/`panic` (same as `error`).
pub fn parse_level(level: &str) -> Result<LevelFilter> {
    let normalized = level.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "" => Err(LabctlError::configuration("log level is empty")),
        "disabled" => Ok(LevelFilter::OFF),
        "fatal" | "panic" => Ok(LevelFilter::ERROR),
        other => other
            .parse::<LevelFilter>()
            .map_err(|_| LabctlError::configuration(format!("unknown log level {level:?}"))),
    }
}

/// Whether `level` enables debug output
pub fn is_debug(level: LevelFilter) -> bool {
    level >= LevelFilter::DEBUG
}

/// Build the invocation logger writing to stderr
pub fn logger(level: LevelFilter, writer: LogWriter) -> Dispatch {
    logger_with(level, writer, std::io::stderr)
}

/// Build the invocation logger over an arbitrary writer
pub fn logger_with<W>(level: LevelFilter, writer: LogWriter, make_writer: W) -> Dispatch
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(make_writer);

    match writer {
        LogWriter::Console => Dispatch::new(
            builder
                .with_ansi(std::io::stderr().is_terminal())
                .with_target(false)
                .finish(),
        ),
        LogWriter::Json => Dispatch::new(builder.json().with_current_span(true).finish()),
    }
}

/// Writable log sink published to command bodies
///
/// Relays text produced by remote services (e.g. a labagent's update log)
/// into the invocation's log stream, honouring the selected writer.
#[derive(Debug, Clone)]
pub struct LogSink {
    writer: LogWriter,
}

impl LogSink {
    /// Sink for the given writer format
    pub fn new(writer: LogWriter) -> Self {
        Self { writer }
    }

    /// Selected writer format
    pub fn writer(&self) -> LogWriter {
        self.writer
    }

    /// Relay `text` from `source` to stderr
    pub fn relay(&self, source: &str, text: &str) -> Result<()> {
        let stderr = std::io::stderr();
        let mut out = stderr.lock();
        self.relay_to(&mut out, source, text)
    }

    /// Relay `text` from `source` to `out`, one record per non-blank line
    pub fn relay_to(&self, out: &mut dyn Write, source: &str, text: &str) -> Result<()> {
        for line in text.lines().filter(|line| !line.trim().is_empty()) {
            match self.writer {
                LogWriter::Console => writeln!(out, "{source} | {line}")?,
                LogWriter::Json => {
                    let record = serde_json::json!({ "source": source, "message": line });
                    writeln!(out, "{record}")?;
                }
            }
        }
        Ok(())
    }
}
