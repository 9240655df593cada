//! Output formatters selected by `--output`

use crate::error::{LabctlError, Result};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Tab-separated `key value` lines, friendly to `grep`/`cut`
    Unix,
    /// Indented JSON
    Json,
}

impl FromStr for OutputFormat {
    type Err = LabctlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "unix" => Ok(Self::Unix),
            "json" => Ok(Self::Json),
            other => Err(LabctlError::invalid_argument(format!(
                "output {other:?} is not valid"
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix => f.write_str("unix"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Renders command results
#[derive(Debug, Clone)]
pub struct Printer {
    format: OutputFormat,
}

impl Printer {
    /// Printer for `format`
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Selected format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render `value` to a string, newline-terminated
    pub fn render<T: Serialize>(&self, value: &T) -> Result<String> {
        let value = serde_json::to_value(value)
            .map_err(|e| LabctlError::output(format!("cannot serialize output: {e}")))?;

        let mut rendered = match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&value)
                .map_err(|e| LabctlError::output(format!("cannot encode output: {e}")))?,
            OutputFormat::Unix => {
                let mut lines = Vec::new();
                flatten("", &value, &mut lines);
                lines.join("\n")
            }
        };
        if !rendered.is_empty() {
            rendered.push('\n');
        }
        Ok(rendered)
    }

    /// Render `value` into `out`
    pub fn print<T: Serialize>(&self, out: &mut dyn Write, value: &T) -> Result<()> {
        out.write_all(self.render(value)?.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

fn flatten(key: &str, value: &Value, lines: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (name, child) in map {
                let nested = if key.is_empty() {
                    name.clone()
                } else {
                    format!("{key}.{name}")
                };
                flatten(&nested, child, lines);
            }
        }
        // One line per element keeps arrays pipeable.
        Value::Array(items) => {
            for item in items {
                flatten(key, item, lines);
            }
        }
        Value::Null => {}
        scalar => {
            let text = match scalar {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if key.is_empty() {
                lines.push(text);
            } else {
                lines.push(format!("{key}\t{text}"));
            }
        }
    }
}
