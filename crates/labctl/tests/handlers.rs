#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used)]
//! Action handlers driven through an in-memory resolver.

use assert_matches::assert_matches;
use async_trait::async_trait;
use lab_core::{CancellationToken, ExecutionContext, PeerInfo, Task};
use lab_remote::{AgentApi, AppApi, RemoteError, RemoteResult, ServiceResolver};
use labctl::commands::debug::{peer_info, run_task, update_agent};
use labctl::logging::{LogSink, LogWriter};
use labctl::printer::{OutputFormat, Printer};
use labctl::LabctlError;
use parking_lot::Mutex;
use std::sync::Arc;

/// Scripted behaviour and a call log shared by every handle it resolves
#[derive(Clone, Default)]
struct Lab {
    calls: Arc<Mutex<Vec<String>>>,
    update_fails: bool,
    unhealthy: bool,
    interrupt_healthcheck: bool,
    reject_tasks: bool,
}

impl Lab {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl ServiceResolver for Lab {
    fn agent(&self, address: &str) -> RemoteResult<Box<dyn AgentApi>> {
        self.record(format!("resolve agent {address}"));
        Ok(Box::new(self.clone()))
    }

    fn app(&self, address: &str) -> RemoteResult<Box<dyn AppApi>> {
        if !address.starts_with("http") {
            return Err(RemoteError::invalid_address(address, "relative URL without base"));
        }
        self.record(format!("resolve app {address}"));
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl AgentApi for Lab {
    async fn update(&self, _ctx: &ExecutionContext, url: &str) -> RemoteResult<String> {
        self.record(format!("update {url}"));
        if self.update_fails {
            return Err(RemoteError::Transport {
                service: "labagent",
                operation: "update",
                message: "connection refused".to_string(),
            });
        }
        Ok("swapped binary".to_string())
    }

    async fn healthcheck(&self, _ctx: &ExecutionContext) -> bool {
        self.record("agent healthcheck");
        true
    }
}

#[async_trait]
impl AppApi for Lab {
    async fn healthcheck(&self, ctx: &ExecutionContext) -> bool {
        self.record("app healthcheck");
        if self.interrupt_healthcheck {
            ctx.cancellation().cancel();
            return false;
        }
        !self.unhealthy
    }

    async fn peer_info(&self, _ctx: &ExecutionContext) -> RemoteResult<PeerInfo> {
        self.record("peer info");
        Ok(PeerInfo {
            id: "QmPeer".to_string(),
            addrs: vec!["/ip4/127.0.0.1/tcp/4001".to_string()],
        })
    }

    async fn run(&self, _ctx: &ExecutionContext, task: &Task) -> RemoteResult<()> {
        self.record(format!("run {} {}", task.task_type, task.subject));
        if self.reject_tasks {
            return Err(RemoteError::TaskRejected {
                detail: format!("unknown task type {}", task.task_type),
            });
        }
        Ok(())
    }
}

fn sink() -> LogSink {
    LogSink::new(LogWriter::Console)
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn test_update_then_healthy_app_succeeds() {
    let lab = Lab::default();
    let ctx = ExecutionContext::background();

    update_agent(&ctx, &lab, &sink(), "http://a", "http://b", "").await.unwrap();

    assert_eq!(
        lab.calls(),
        ["resolve agent http://a", "update ", "resolve app http://b", "app healthcheck"]
    );
}

#[tokio::test]
async fn test_update_then_unhealthy_app_is_distinct_failure() {
    let lab = Lab {
        unhealthy: true,
        ..Lab::default()
    };
    let ctx = ExecutionContext::background();

    let err = update_agent(&ctx, &lab, &sink(), "http://a", "http://b", "http://builds/agent")
        .await
        .unwrap_err();

    assert_matches!(err, LabctlError::PostUpdateUnhealthy { ref app_addr } if app_addr == "http://b");
    assert_eq!(err.exit_code(), 1);
    assert!(lab.calls().contains(&"update http://builds/agent".to_string()));
}

#[tokio::test]
async fn test_interrupted_healthcheck_is_cancellation() {
    let lab = Lab {
        interrupt_healthcheck: true,
        ..Lab::default()
    };
    let ctx = ExecutionContext::new(CancellationToken::new());

    let err = update_agent(&ctx, &lab, &sink(), "http://a", "http://b", "").await.unwrap_err();

    assert_matches!(
        err,
        LabctlError::Cancelled(RemoteError::Cancelled { operation: "healthcheck", .. })
    );
    assert!(lab.calls().contains(&"app healthcheck".to_string()));
}

#[tokio::test]
async fn test_failed_update_skips_healthcheck() {
    let lab = Lab {
        update_fails: true,
        ..Lab::default()
    };
    let ctx = ExecutionContext::background();

    let err = update_agent(&ctx, &lab, &sink(), "http://a", "http://b", "").await.unwrap_err();

    assert_matches!(err, LabctlError::Remote(RemoteError::Transport { .. }));
    assert_eq!(lab.calls(), ["resolve agent http://a", "update "]);
}

#[tokio::test]
async fn test_run_requires_exactly_two_args() {
    let lab = Lab::default();
    let ctx = ExecutionContext::background();

    for given in [args(&[]), args(&["get"]), args(&["get", "QmA", "extra"])] {
        let err = run_task(&ctx, &lab, "http://b", &given).await.unwrap_err();
        assert_matches!(err, LabctlError::InvalidArgument { .. });
    }
    assert!(lab.calls().is_empty());
}

#[tokio::test]
async fn test_rejected_task_is_reported_without_retry() {
    let lab = Lab {
        reject_tasks: true,
        ..Lab::default()
    };
    let ctx = ExecutionContext::background();

    let err = run_task(&ctx, &lab, "http://b", &args(&["teleport", "QmA"]))
        .await
        .unwrap_err();

    assert_matches!(err, LabctlError::TaskRejected { .. });
    assert!(err.to_string().contains("unknown task type teleport"));
    assert_eq!(
        lab.calls().iter().filter(|c| c.starts_with("run ")).count(),
        1
    );
}

#[tokio::test]
async fn test_run_dispatches_task() {
    let lab = Lab::default();
    let ctx = ExecutionContext::background();

    run_task(&ctx, &lab, "http://b", &args(&["get", "QmA"])).await.unwrap();
    assert_eq!(lab.calls(), ["resolve app http://b", "run get QmA"]);
}

#[tokio::test]
async fn test_bad_app_address_is_invalid_argument() {
    let lab = Lab::default();
    let ctx = ExecutionContext::background();

    let err = run_task(&ctx, &lab, "localhost:7003", &args(&["get", "QmA"]))
        .await
        .unwrap_err();
    assert_matches!(err, LabctlError::InvalidArgument { .. });
}

#[tokio::test]
async fn test_peer_info_is_printed() {
    let lab = Lab::default();
    let ctx = ExecutionContext::background();
    let mut out = Vec::new();

    peer_info(&ctx, &lab, &Printer::new(OutputFormat::Json), &mut out, "http://b")
        .await
        .unwrap();

    let printed: PeerInfo = serde_json::from_slice(&out).unwrap();
    assert_eq!(printed.id, "QmPeer");
    assert_eq!(lab.calls(), ["resolve app http://b", "peer info"]);
}
