//! Lab Remote
//!
//! Thin typed handles over the remote lab services:
//! - [`Agent`]: a labagent, which can replace its running binary
//! - [`App`]: a labapp, which reports peer info and runs tasks
//!
//! Handles are resolved from a base address without any I/O; unreachable
//! services surface as errors from the operation calls. The
//! [`AgentApi`]/[`AppApi`] traits and [`ServiceResolver`] are the seams
//! command handlers are written against.

pub mod address;
pub mod agent;
pub mod app;
pub mod client;
pub mod error;

pub use address::parse_address;
pub use agent::Agent;
pub use app::App;
pub use client::{Call, HttpClient, HttpClientBuilder, HttpResponse};
pub use error::{RemoteError, RemoteResult};

use async_trait::async_trait;
use lab_core::{ExecutionContext, PeerInfo, Task};

/// Operations offered by a labagent
#[async_trait]
pub trait AgentApi: Send + Sync {
    /// Replace the agent's binary with the one fetched from `url`.
    ///
    /// An empty `url` asks the agent to use its default source. Returns the
    /// update log produced by the agent.
    async fn update(&self, ctx: &ExecutionContext, url: &str) -> RemoteResult<String>;

    /// Best-effort liveness probe; never fails
    async fn healthcheck(&self, ctx: &ExecutionContext) -> bool;
}

/// Operations offered by a labapp
#[async_trait]
pub trait AppApi: Send + Sync {
    /// Best-effort liveness probe; never fails
    async fn healthcheck(&self, ctx: &ExecutionContext) -> bool;

    /// Fetch the app's peer metadata
    async fn peer_info(&self, ctx: &ExecutionContext) -> RemoteResult<PeerInfo>;

    /// Dispatch a task to the app
    async fn run(&self, ctx: &ExecutionContext, task: &Task) -> RemoteResult<()>;
}

/// Resolves service addresses into handles
pub trait ServiceResolver: Send + Sync {
    /// Resolve a labagent address
    fn agent(&self, address: &str) -> RemoteResult<Box<dyn AgentApi>>;

    /// Resolve a labapp address
    fn app(&self, address: &str) -> RemoteResult<Box<dyn AppApi>>;
}

/// Resolver producing HTTP-backed handles sharing one client
#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: HttpClient,
}

impl HttpResolver {
    /// Create a resolver over `client`
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

impl ServiceResolver for HttpResolver {
    fn agent(&self, address: &str) -> RemoteResult<Box<dyn AgentApi>> {
        Ok(Box::new(resolve_agent(&self.client, address)?))
    }

    fn app(&self, address: &str) -> RemoteResult<Box<dyn AppApi>> {
        Ok(Box::new(resolve_app(&self.client, address)?))
    }
}

/// Resolve a labagent handle
pub fn resolve_agent(client: &HttpClient, address: &str) -> RemoteResult<Agent> {
    Agent::resolve(client, address)
}

/// Resolve a labapp handle
pub fn resolve_app(client: &HttpClient, address: &str) -> RemoteResult<App> {
    App::resolve(client, address)
}
