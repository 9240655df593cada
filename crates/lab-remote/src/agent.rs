//! Handle for a labagent's HTTP server

use crate::address::{endpoint, parse_address};
use crate::client::{Call, HttpClient};
use crate::error::RemoteResult;
use crate::AgentApi;
use async_trait::async_trait;
use lab_core::ExecutionContext;
use reqwest::{Method, Url};

const SERVICE: &str = "labagent";

/// Stateless handle to a labagent
#[derive(Debug, Clone)]
pub struct Agent {
    base: Url,
    client: HttpClient,
}

impl Agent {
    /// Validate `address` and bind it to `client`. Performs no I/O.
    pub fn resolve(client: &HttpClient, address: &str) -> RemoteResult<Self> {
        Ok(Self {
            base: parse_address(address)?,
            client: client.clone(),
        })
    }

    /// Base address of the agent
    pub fn address(&self) -> &Url {
        &self.base
    }
}

#[async_trait]
impl AgentApi for Agent {
    async fn update(&self, ctx: &ExecutionContext, url: &str) -> RemoteResult<String> {
        let call = Call::new(SERVICE, "update");
        let mut request = self
            .client
            .request(Method::PUT, endpoint(&self.base, "update"));
        if !url.is_empty() {
            request = request.query(&[("url", url)]);
        }

        let response = self
            .client
            .send(ctx, call, request)
            .await?
            .error_for_status(call)?;
        Ok(response.text())
    }

    async fn healthcheck(&self, ctx: &ExecutionContext) -> bool {
        healthcheck(&self.client, ctx, Call::new(SERVICE, "healthcheck"), &self.base).await
    }
}

/// Shared liveness probe: any failure is reported as `false`
pub(crate) async fn healthcheck(
    client: &HttpClient,
    ctx: &ExecutionContext,
    call: Call,
    base: &Url,
) -> bool {
    let request = client.request(Method::GET, endpoint(base, "healthcheck"));
    match client.send(ctx, call, request).await {
        Ok(response) if response.status.is_success() => true,
        Ok(response) => {
            tracing::debug!(
                service = call.service,
                status = response.status.as_u16(),
                "healthcheck returned non-success status"
            );
            false
        }
        Err(err) => {
            tracing::debug!(service = call.service, error = %err, "healthcheck failed");
            false
        }
    }
}
