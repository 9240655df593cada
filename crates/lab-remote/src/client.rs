//! Cancellation-aware HTTP client shared by every remote handle

use crate::error::{RemoteError, RemoteResult};
use lab_core::ExecutionContext;
use reqwest::{RequestBuilder, StatusCode};
use std::time::{Duration, Instant};

/// Service and operation names attached to errors and request logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Call {
    /// Remote service name (`labagent`, `labapp`)
    pub service: &'static str,
    /// Operation name (`update`, `peer-info`, ...)
    pub operation: &'static str,
}

impl Call {
    /// Describe a call
    pub const fn new(service: &'static str, operation: &'static str) -> Self {
        Self { service, operation }
    }

    fn transport(self, err: impl std::fmt::Display) -> RemoteError {
        RemoteError::Transport {
            service: self.service,
            operation: self.operation,
            message: err.to_string(),
        }
    }

    fn cancelled(self) -> RemoteError {
        RemoteError::Cancelled {
            service: self.service,
            operation: self.operation,
        }
    }
}

/// Fully received response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code
    pub status: StatusCode,
    /// Raw body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Body decoded as UTF-8, lossily
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).trim().to_string()
    }

    /// Turn a non-success status into [`RemoteError::Status`]
    pub fn error_for_status(self, call: Call) -> RemoteResult<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(RemoteError::Status {
                service: call.service,
                operation: call.operation,
                status: self.status.as_u16(),
                body: self.text(),
            })
        }
    }

    /// Decode a JSON body
    pub fn json<T: serde::de::DeserializeOwned>(&self, call: Call) -> RemoteResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| RemoteError::Decode {
            service: call.service,
            operation: call.operation,
            message: e.to_string(),
        })
    }
}

/// Builder for [`HttpClient`]
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    log_requests: bool,
    connect_timeout: Option<Duration>,
}

impl HttpClientBuilder {
    /// Log every request at debug level
    pub fn log_requests(mut self, enabled: bool) -> Self {
        self.log_requests = enabled;
        self
    }

    /// Bound the TCP connect phase
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<HttpClient, reqwest::Error> {
        // Lab services are always reached directly, never through env proxies.
        let mut builder = reqwest::Client::builder()
            .no_proxy()
            .user_agent(concat!("labctl/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        Ok(HttpClient {
            inner: builder.build()?,
            log_requests: self.log_requests,
        })
    }
}

/// HTTP client used by `Agent` and `App` handles
///
/// Cheap to clone; clones share the connection pool. Every exchange is
/// raced against the execution context so cancellation and deadlines abort
/// in-flight requests.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    log_requests: bool,
}

impl HttpClient {
    /// Start building a client
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Whether request logging is enabled
    pub fn logs_requests(&self) -> bool {
        self.log_requests
    }

    /// Request builder bound to this client's pool
    pub fn request(&self, method: reqwest::Method, url: reqwest::Url) -> RequestBuilder {
        self.inner.request(method, url)
    }

    /// Send a request and read its full body
    pub async fn send(
        &self,
        ctx: &ExecutionContext,
        call: Call,
        request: RequestBuilder,
    ) -> RemoteResult<HttpResponse> {
        if ctx.is_cancelled() {
            return Err(call.cancelled());
        }

        let request = request.build().map_err(|e| call.transport(e))?;
        let method = request.method().clone();
        let url = request.url().clone();
        let started = Instant::now();

        let exchange = async {
            let response = self.inner.execute(request).await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(HttpResponse {
                status,
                body: body.to_vec(),
            })
        };

        let result = tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(call.cancelled()),
            result = exchange => result.map_err(|e| call.transport(e)),
        };

        if self.log_requests {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(response) => tracing::debug!(
                    service = call.service,
                    operation = call.operation,
                    %method,
                    %url,
                    status = response.status.as_u16(),
                    elapsed_ms,
                    "http request"
                ),
                Err(err) => tracing::debug!(
                    service = call.service,
                    operation = call.operation,
                    %method,
                    %url,
                    elapsed_ms,
                    error = %err,
                    "http request failed"
                ),
            }
        }

        result
    }
}
