//! Command tree and invocation runner
//!
//! The tree describes the CLI surface (built into a `clap::Command`) along
//! with the lifecycle chains attached to each node. Running the tree parses
//! the arguments, resolves the invoked node path and executes:
//!
//! 1. the tree `before` chain
//! 2. each node's `before` chain from the top-level command down to the leaf
//! 3. the leaf action, inside the invocation span and logger
//! 4. the tree `after` chain, always, whatever happened above

use crate::config::GlobalArgs;
use crate::error::{LabctlError, Result};
use crate::hooks::HookChain;
use crate::store::{Invocation, Session};
use async_trait::async_trait;
use clap::{Arg, ArgMatches, Args, FromArgMatches};
use lab_core::CancellationToken;
use std::ffi::OsString;
use std::fmt;
use std::sync::Arc;
use tracing::instrument::WithSubscriber;
use tracing::Instrument;

/// Body of a leaf command
#[async_trait]
pub trait Action: Send + Sync {
    /// Execute with every capability available
    async fn execute(&self, session: Session<'_>) -> Result<()>;
}

/// A command or command group
pub struct Command {
    pub(crate) name: &'static str,
    about: &'static str,
    aliases: Vec<&'static str>,
    hidden: bool,
    args: Vec<Arg>,
    pub(crate) before: HookChain,
    action: Option<Arc<dyn Action>>,
    pub(crate) subcommands: Vec<Command>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("before", &self.before)
            .field("has_action", &self.action.is_some())
            .field("subcommands", &self.subcommands)
            .finish()
    }
}

impl Command {
    /// New command named `name`
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            about: "",
            aliases: Vec::new(),
            hidden: false,
            args: Vec::new(),
            before: HookChain::new(),
            action: None,
            subcommands: Vec::new(),
        }
    }

    /// One-line help text
    pub fn about(mut self, about: &'static str) -> Self {
        self.about = about;
        self
    }

    /// Add an alias
    pub fn alias(mut self, alias: &'static str) -> Self {
        self.aliases.push(alias);
        self
    }

    /// Hide from help output
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Add a flag or positional argument
    pub fn arg(mut self, arg: Arg) -> Self {
        self.args.push(arg);
        self
    }

    /// Set the `before` chain
    pub fn before(mut self, chain: HookChain) -> Self {
        self.before = chain;
        self
    }

    /// Set the body
    pub fn action(mut self, action: impl Action + 'static) -> Self {
        self.action = Some(Arc::new(action));
        self
    }

    /// Add a subcommand
    pub fn subcommand(mut self, command: Command) -> Self {
        self.subcommands.push(command);
        self
    }

    /// Command name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current `before` chain
    pub fn before_chain(&self) -> &HookChain {
        &self.before
    }

    /// Subcommands
    pub fn subcommands(&self) -> &[Command] {
        &self.subcommands
    }

    /// Find a subcommand by name
    pub fn find(&self, name: &str) -> Option<&Command> {
        self.subcommands.iter().find(|c| c.name == name)
    }

    fn clap_command(&self) -> clap::Command {
        let mut cmd = clap::Command::new(self.name)
            .about(self.about)
            .visible_aliases(self.aliases.clone())
            .hide(self.hidden)
            .args(self.args.iter().cloned());
        if !self.subcommands.is_empty() {
            cmd = cmd.subcommand_required(true).arg_required_else_help(true);
        }
        cmd.subcommands(self.subcommands.iter().map(Command::clap_command))
    }
}

/// Root of the CLI
#[derive(Debug)]
pub struct CommandTree {
    name: &'static str,
    about: &'static str,
    version: &'static str,
    pub(crate) before: HookChain,
    pub(crate) after: HookChain,
    pub(crate) commands: Vec<Command>,
}

impl CommandTree {
    /// Empty tree for binary `name`
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            about: "",
            version: env!("CARGO_PKG_VERSION"),
            before: HookChain::new(),
            after: HookChain::new(),
            commands: Vec::new(),
        }
    }

    /// One-line help text
    pub fn about(mut self, about: &'static str) -> Self {
        self.about = about;
        self
    }

    /// Set the chain run before every command
    pub fn before(mut self, chain: HookChain) -> Self {
        self.before = chain;
        self
    }

    /// Set the chain run after every command
    pub fn after(mut self, chain: HookChain) -> Self {
        self.after = chain;
        self
    }

    /// Add a top-level command
    pub fn command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    /// Top-level commands
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Current `after` chain
    pub fn after_chain(&self) -> &HookChain {
        &self.after
    }

    /// Find a node by its path of names
    pub fn find(&self, path: &[&str]) -> Option<&Command> {
        let (first, rest) = path.split_first()?;
        let mut node = self.commands.iter().find(|c| c.name == *first)?;
        for name in rest {
            node = node.find(name)?;
        }
        Some(node)
    }

    /// Build the clap parser for this tree
    pub fn clap_command(&self) -> clap::Command {
        let root = clap::Command::new(self.name)
            .about(self.about)
            .version(self.version)
            .subcommand_required(true)
            .arg_required_else_help(true)
            .subcommands(self.commands.iter().map(Command::clap_command));
        GlobalArgs::augment_args(root)
    }

    /// Parse `args` (program name first) and run the invoked command
    pub async fn run<I, T>(&self, args: I, cancel: CancellationToken) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let command_line = args
            .iter()
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");

        let matches = self.clap_command().try_get_matches_from(&args)?;
        let (nodes, leaf_matches) = self.resolve(&matches)?;
        let globals = GlobalArgs::from_arg_matches(leaf_matches)?;
        let path = nodes.iter().map(|node| node.name.to_string()).collect();

        let mut inv = Invocation::new(command_line, path, globals, leaf_matches.clone(), cancel);
        let outcome = self.execute(&nodes, &mut inv).await;

        if let Err(err) = &outcome {
            if let Some(span) = inv.span_mut() {
                span.set_tag("error", err.to_string());
            }
        }

        let teardown = self.after.run_all(&mut inv).await;
        match (outcome, teardown) {
            (Err(err), Err(superseded)) => {
                inv.in_logger(|| {
                    tracing::warn!(error = %superseded, "teardown failed after command failure");
                });
                Err(err)
            }
            (Err(err), Ok(())) => Err(err),
            (Ok(()), teardown) => teardown,
        }
    }

    fn resolve<'a>(&'a self, matches: &'a ArgMatches) -> Result<(Vec<&'a Command>, &'a ArgMatches)> {
        let mut nodes = Vec::new();
        let mut children = &self.commands;
        let mut current = matches;
        while let Some((name, sub)) = current.subcommand() {
            let node = children
                .iter()
                .find(|c| c.name == name)
                .ok_or_else(|| LabctlError::invalid_argument(format!("unknown command {name:?}")))?;
            nodes.push(node);
            children = &node.subcommands;
            current = sub;
        }
        if nodes.is_empty() {
            return Err(LabctlError::invalid_argument("no command given"));
        }
        Ok((nodes, current))
    }

    async fn execute(&self, nodes: &[&Command], inv: &mut Invocation) -> Result<()> {
        self.before.run(inv).await?;
        for node in nodes {
            node.before.run(inv).await?;
        }

        let action = nodes
            .last()
            .and_then(|leaf| leaf.action.as_ref())
            .ok_or_else(|| {
                LabctlError::invalid_argument(format!("{} is not runnable", inv.path().join(" ")))
            })?;

        let session = inv.session()?;
        let span = session.context.span().clone();
        let logger = session.context.logger().clone();
        action
            .execute(session)
            .instrument(span)
            .with_subscriber(logger)
            .await
    }
}
