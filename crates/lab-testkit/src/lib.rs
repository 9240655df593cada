//! Lab Testing Infrastructure
//!
//! Stub labagent/labapp servers for integration tests. A [`StubServer`] is
//! an axum router on a loopback port that records every request it receives
//! and answers through a route closure, so tests exercise the real HTTP
//! client instead of mocks.
//!
//! ```rust,no_run
//! use lab_testkit::{StubResponse, StubServer};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let server = StubServer::start(|request| match request.path() {
//!     "/healthcheck" => Some(StubResponse::ok("")),
//!     _ => Some(StubResponse::status(404, "not found")),
//! })
//! .await?;
//! let base = server.url();
//! # Ok(())
//! # }
//! ```

use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A request as seen by the stub server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// HTTP method
    pub method: String,
    /// Request target, including any query string
    pub target: String,
    /// Request body
    pub body: String,
}

impl RecordedRequest {
    /// Target without its query string
    pub fn path(&self) -> &str {
        self.target
            .split_once('?')
            .map_or(self.target.as_str(), |(path, _)| path)
    }

    /// Query string, if any
    pub fn query(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, query)| query)
    }
}

/// Canned response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubResponse {
    /// Status code
    pub status: u16,
    /// Content type header value
    pub content_type: &'static str,
    /// Body
    pub body: String,
}

impl StubResponse {
    /// `200 OK` with a text body
    pub fn ok(body: impl Into<String>) -> Self {
        Self::status(200, body)
    }

    /// `200 OK` with a JSON body
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: body.into(),
        }
    }

    /// Arbitrary status with a text body
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.into(),
        }
    }
}

impl IntoResponse for StubResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

type Route = Arc<dyn Fn(&RecordedRequest) -> Option<StubResponse> + Send + Sync>;

/// Shared state for the fallback handler
#[derive(Clone)]
struct StubState {
    route: Route,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Loopback HTTP server answering through a route closure
///
/// A route returning `None` never answers, which simulates a hung remote.
/// Serving stops when the server is dropped.
pub struct StubServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    serve_task: JoinHandle<()>,
}

impl StubServer {
    /// Bind a loopback port and start serving
    pub async fn start<F>(route: F) -> anyhow::Result<Self>
    where
        F: Fn(&RecordedRequest) -> Option<StubResponse> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let requests = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new().fallback(handle).with_state(StubState {
            route: Arc::new(route),
            requests: requests.clone(),
        });

        let serve_task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::debug!(error = %err, "stub server stopped");
            }
        });

        Ok(Self {
            addr,
            requests,
            serve_task,
        })
    }

    /// Base URL of the server, e.g. `http://127.0.0.1:41234`
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Every request received so far, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received for `path`
    pub fn hits(&self, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.path() == path)
            .count()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.serve_task.abort();
    }
}

/// Base URL of a loopback port nothing listens on
pub async fn closed_address() -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}"))
}

async fn handle(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    body: String,
) -> Response {
    let request = RecordedRequest {
        method: method.to_string(),
        target: uri.to_string(),
        body,
    };
    state.requests.lock().push(request.clone());

    match (state.route)(&request) {
        Some(response) => response.into_response(),
        // The client has to give up on its own.
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    #[tokio::test]
    async fn test_records_request_and_answers_through_route() {
        let server = StubServer::start(|request| match request.path() {
            "/run" => Some(StubResponse::status(422, "unknown task type teleport")),
            _ => Some(StubResponse::json("{}")),
        })
        .await
        .unwrap();

        let response = client()
            .post(format!("{}/run?verbose=1", server.url()))
            .body(r#"{"type":"teleport"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 422);
        assert_eq!(response.headers()[reqwest::header::CONTENT_TYPE], "text/plain");
        assert_eq!(response.text().await.unwrap(), "unknown task type teleport");

        let recorded = server.requests();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].method, "POST");
        assert_eq!(recorded[0].path(), "/run");
        assert_eq!(recorded[0].query(), Some("verbose=1"));
        assert_eq!(recorded[0].body, r#"{"type":"teleport"}"#);
        assert_eq!(server.hits("/run"), 1);
    }

    #[tokio::test]
    async fn test_chunked_body_is_recorded_whole() {
        let server = StubServer::start(|_| Some(StubResponse::ok("done"))).await.unwrap();

        let mut stream = TcpStream::connect(server.url().trim_start_matches("http://"))
            .await
            .unwrap();
        stream
            .write_all(
                b"POST /run HTTP/1.1\r\nHost: localhost\r\nTransfer-Encoding: chunked\r\n\
                  Connection: close\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n",
            )
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("done"));
        assert_eq!(server.requests()[0].body, "hello world");
    }

    #[tokio::test]
    async fn test_unanswered_route_holds_the_call() {
        let server = StubServer::start(|_| None).await.unwrap();

        let err = client()
            .get(format!("{}/healthcheck", server.url()))
            .timeout(Duration::from_millis(200))
            .send()
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(server.hits("/healthcheck"), 1);
    }

    #[tokio::test]
    async fn test_closed_address_refuses_connections() {
        let url = closed_address().await.unwrap();
        let err = client().get(url).send().await.unwrap_err();
        assert!(err.is_connect());
    }
}
