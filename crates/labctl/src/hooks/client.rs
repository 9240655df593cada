//! HTTP client construction

use super::Hook;
use crate::error::{LabctlError, Result};
use crate::logging;
use crate::store::Invocation;
use async_trait::async_trait;
use lab_remote::HttpClient;

/// Publishes the shared [`HttpClient`]
///
/// Request logging is switched on at `debug` and `trace` levels. An
/// unparseable level is left to the tracing hook to report.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientHook;

#[async_trait]
impl Hook for ClientHook {
    async fn run(&self, inv: &mut Invocation) -> Result<()> {
        let log_requests = logging::parse_level(&inv.globals().log_level)
            .map(logging::is_debug)
            .unwrap_or(false);

        let client = HttpClient::builder()
            .log_requests(log_requests)
            .build()
            .map_err(|e| LabctlError::ClientInit {
                message: e.to_string(),
            })?;
        inv.set(client)
    }

    fn name(&self) -> &str {
        "client"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GlobalArgs;
    use clap::ArgMatches;
    use lab_core::CancellationToken;

    fn invocation(level: &str) -> Invocation {
        let globals = GlobalArgs {
            log_level: level.to_string(),
            ..GlobalArgs::default()
        };
        Invocation::new(
            "labctl debug update",
            vec!["debug".to_string(), "update".to_string()],
            globals,
            ArgMatches::default(),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_debug_level_enables_request_logging() {
        for (level, expected) in [("debug", true), ("trace", true), ("info", false), ("bogus", false)] {
            let mut inv = invocation(level);
            ClientHook.run(&mut inv).await.unwrap();
            assert_eq!(inv.get::<HttpClient>().unwrap().logs_requests(), expected, "{level}");
        }
    }
}
