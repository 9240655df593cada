//! `labctl debug`: direct calls against a labagent and a labapp
//!
//! Each subcommand has a handler written against [`ServiceResolver`] so it
//! can be driven without a network, plus a thin [`Action`] binding it to the
//! invocation session.

use crate::error::{LabctlError, Result};
use crate::logging::LogSink;
use crate::printer::Printer;
use crate::store::Session;
use crate::tree::{Action, Command};
use async_trait::async_trait;
use clap::{Arg, ArgAction};
use lab_core::{ExecutionContext, Task, TaskType};
use lab_remote::{HttpResolver, RemoteError, ServiceResolver};
use std::io::Write;

/// Default labagent address
pub const DEFAULT_AGENT_ADDR: &str = "http://localhost:7002";

/// Default labapp address
pub const DEFAULT_APP_ADDR: &str = "http://localhost:7003";

/// Source name used when relaying the agent's update log
const AGENT_LOG_SOURCE: &str = "labagent";

fn agent_addr_arg() -> Arg {
    Arg::new("agent-addr")
        .long("agent-addr")
        .value_name("URL")
        .default_value(DEFAULT_AGENT_ADDR)
        .help("Address of the labagent")
}

fn app_addr_arg() -> Arg {
    Arg::new("app-addr")
        .long("app-addr")
        .value_name("URL")
        .default_value(DEFAULT_APP_ADDR)
        .help("Address of the labapp")
}

/// The `debug` command group
pub fn command() -> Command {
    Command::new("debug")
        .about("Debug a running lab")
        .alias("d")
        .hidden()
        .subcommand(
            Command::new("update")
                .about("Update the labagent binary and check the labapp afterwards")
                .alias("u")
                .arg(agent_addr_arg())
                .arg(app_addr_arg())
                .arg(
                    Arg::new("url")
                        .value_name("URL")
                        .help("Where the agent fetches the new binary (agent default when omitted)"),
                )
                .action(UpdateAction),
        )
        .subcommand(
            Command::new("peer")
                .about("Show peer info of a labapp")
                .alias("p")
                .arg(app_addr_arg())
                .action(PeerAction),
        )
        .subcommand(
            Command::new("run")
                .about("Run a task on a labapp")
                .alias("r")
                .arg(app_addr_arg())
                .arg(
                    Arg::new("args")
                        .value_name("TYPE SUBJECT")
                        .num_args(0..)
                        .action(ArgAction::Append)
                        .help("Task type and subject"),
                )
                .action(RunAction),
        )
}

/// Update a labagent, then verify the labapp is healthy.
///
/// A successful update followed by a failed healthcheck is
/// [`LabctlError::PostUpdateUnhealthy`]; nothing is rolled back. A
/// healthcheck cut short by cancellation or the deadline is
/// [`LabctlError::Cancelled`] instead.
pub async fn update_agent(
    ctx: &ExecutionContext,
    resolver: &dyn ServiceResolver,
    log_sink: &LogSink,
    agent_addr: &str,
    app_addr: &str,
    url: &str,
) -> Result<()> {
    let agent = resolver.agent(agent_addr)?;
    let log = agent.update(ctx, url).await?;
    log_sink.relay(AGENT_LOG_SOURCE, &log)?;

    let app = resolver.app(app_addr)?;
    if !app.healthcheck(ctx).await {
        if ctx.is_cancelled() {
            return Err(LabctlError::Cancelled(RemoteError::Cancelled {
                service: "labapp",
                operation: "healthcheck",
            }));
        }
        return Err(LabctlError::PostUpdateUnhealthy {
            app_addr: app_addr.to_string(),
        });
    }

    tracing::info!(app_addr, "Labapp healthy");
    Ok(())
}

/// Fetch a labapp's peer info and print it
pub async fn peer_info(
    ctx: &ExecutionContext,
    resolver: &dyn ServiceResolver,
    printer: &Printer,
    out: &mut (dyn Write + Send),
    app_addr: &str,
) -> Result<()> {
    let app = resolver.app(app_addr)?;
    let info = app.peer_info(ctx).await?;
    printer.print(out, &info)
}

/// Dispatch a task to a labapp. `args` must be exactly `[type, subject]`.
pub async fn run_task(
    ctx: &ExecutionContext,
    resolver: &dyn ServiceResolver,
    app_addr: &str,
    args: &[String],
) -> Result<()> {
    let [task_type, subject] = args else {
        return Err(LabctlError::invalid_argument(
            "task type and subject must be provided",
        ));
    };
    let task = Task::new(TaskType::new(task_type.as_str()), subject.as_str());

    let app = resolver.app(app_addr)?;
    app.run(ctx, &task).await?;
    tracing::info!(task_type = %task.task_type, subject = %task.subject, "task dispatched");
    Ok(())
}

struct UpdateAction;

#[async_trait]
impl Action for UpdateAction {
    async fn execute(&self, session: Session<'_>) -> Result<()> {
        let resolver = HttpResolver::new(session.client.clone());
        let url = session.optional("url").unwrap_or_default();
        update_agent(
            session.context,
            &resolver,
            session.log_sink,
            session.flag("agent-addr")?,
            session.flag("app-addr")?,
            url,
        )
        .await
    }
}

struct PeerAction;

#[async_trait]
impl Action for PeerAction {
    async fn execute(&self, session: Session<'_>) -> Result<()> {
        let resolver = HttpResolver::new(session.client.clone());
        let mut stdout = std::io::stdout();
        peer_info(
            session.context,
            &resolver,
            session.printer,
            &mut stdout,
            session.flag("app-addr")?,
        )
        .await
    }
}

struct RunAction;

#[async_trait]
impl Action for RunAction {
    async fn execute(&self, session: Session<'_>) -> Result<()> {
        let resolver = HttpResolver::new(session.client.clone());
        run_task(
            session.context,
            &resolver,
            session.flag("app-addr")?,
            &session.args("args"),
        )
        .await
    }
}
