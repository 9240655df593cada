//! labctl
//!
//! Command-line control plane for a lab of agents and apps. The crate is
//! organised around one invocation of one leaf command:
//!
//! - [`tree`]: the command tree and the runner that parses arguments and
//!   drives the lifecycle
//! - [`hooks`]: `before`/`after` chains publishing capabilities
//! - [`store`]: the per-invocation capability store and [`store::Session`]
//! - [`instrument`]: installs tracing and teardown on every leaf
//! - [`tracer`], [`logging`], [`printer`]: the capabilities themselves
//! - [`commands`]: the user-facing commands and their handlers

pub mod commands;
pub mod config;
pub mod error;
pub mod hooks;
pub mod instrument;
pub mod logging;
pub mod printer;
pub mod store;
pub mod tracer;
pub mod tree;

pub use commands::command_tree;
pub use config::GlobalArgs;
pub use error::{LabctlError, Result};
pub use instrument::{instrument, Instrumentation};
pub use store::{Invocation, Session};
pub use tracer::Tracer;
pub use tree::{Action, Command, CommandTree};
