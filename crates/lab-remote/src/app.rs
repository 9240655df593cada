//! Handle for a labapp's HTTP server

use crate::address::{endpoint, parse_address};
use crate::agent::healthcheck;
use crate::client::{Call, HttpClient};
use crate::error::{RemoteError, RemoteResult};
use crate::AppApi;
use async_trait::async_trait;
use lab_core::{ExecutionContext, PeerInfo, Task};
use reqwest::{Method, StatusCode, Url};

const SERVICE: &str = "labapp";

/// Stateless handle to a labapp
#[derive(Debug, Clone)]
pub struct App {
    base: Url,
    client: HttpClient,
}

impl App {
    /// Validate `address` and bind it to `client`. Performs no I/O.
    pub fn resolve(client: &HttpClient, address: &str) -> RemoteResult<Self> {
        Ok(Self {
            base: parse_address(address)?,
            client: client.clone(),
        })
    }

    /// Base address of the app
    pub fn address(&self) -> &Url {
        &self.base
    }
}

#[async_trait]
impl AppApi for App {
    async fn healthcheck(&self, ctx: &ExecutionContext) -> bool {
        healthcheck(&self.client, ctx, Call::new(SERVICE, "healthcheck"), &self.base).await
    }

    async fn peer_info(&self, ctx: &ExecutionContext) -> RemoteResult<PeerInfo> {
        let call = Call::new(SERVICE, "peer-info");
        let request = self
            .client
            .request(Method::GET, endpoint(&self.base, "peerInfo"));
        self.client
            .send(ctx, call, request)
            .await?
            .error_for_status(call)?
            .json(call)
    }

    async fn run(&self, ctx: &ExecutionContext, task: &Task) -> RemoteResult<()> {
        let call = Call::new(SERVICE, "run");
        let request = self
            .client
            .request(Method::POST, endpoint(&self.base, "run"))
            .json(task);
        let response = self.client.send(ctx, call, request).await?;

        match response.status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let detail = response.text();
                Err(RemoteError::TaskRejected {
                    detail: if detail.is_empty() {
                        format!("labapp refused task {} {}", task.task_type, task.subject)
                    } else {
                        detail
                    },
                })
            }
            _ => response.error_for_status(call).map(|_| ()),
        }
    }
}
