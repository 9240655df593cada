//! Execution context store
//!
//! Every running command owns one [`Invocation`]. Lifecycle hooks publish
//! capabilities into it (write-once per capability); the action body then
//! receives a [`Session`], a strongly-typed view holding every capability,
//! so handlers never look anything up by name.

use crate::config::GlobalArgs;
use crate::error::{LabctlError, Result};
use crate::logging::LogSink;
use crate::printer::Printer;
use crate::tracer::CommandSpan;
use clap::ArgMatches;
use lab_core::{CancellationToken, ExecutionContext};
use lab_remote::HttpClient;

/// A value hooks can publish into an invocation
pub trait Capability: Sized + Send + Sync + 'static {
    /// Name used in error reports
    const NAME: &'static str;

    /// Storage slot for this capability
    fn slot(store: &Capabilities) -> &Option<Self>;

    /// Mutable storage slot for this capability
    fn slot_mut(store: &mut Capabilities) -> &mut Option<Self>;
}

macro_rules! capability {
    ($ty:ty, $name:literal, $field:ident) => {
        impl Capability for $ty {
            const NAME: &'static str = $name;

            fn slot(store: &Capabilities) -> &Option<Self> {
                &store.$field
            }

            fn slot_mut(store: &mut Capabilities) -> &mut Option<Self> {
                &mut store.$field
            }
        }
    };
}

/// Capabilities published for one invocation
#[derive(Debug, Default)]
pub struct Capabilities {
    context: Option<ExecutionContext>,
    log_sink: Option<LogSink>,
    printer: Option<Printer>,
    client: Option<HttpClient>,
}

capability!(ExecutionContext, "context", context);
capability!(LogSink, "log-sink", log_sink);
capability!(Printer, "printer", printer);
capability!(HttpClient, "client", client);

impl Capabilities {
    /// Publish a capability; each one may be set only once
    pub fn set<C: Capability>(&mut self, value: C) -> Result<()> {
        let slot = C::slot_mut(self);
        if slot.is_some() {
            return Err(LabctlError::DuplicateCapability { capability: C::NAME });
        }
        *slot = Some(value);
        Ok(())
    }

    /// Read a capability
    pub fn get<C: Capability>(&self) -> Result<&C> {
        C::slot(self)
            .as_ref()
            .ok_or(LabctlError::CapabilityNotFound { capability: C::NAME })
    }

    /// Whether a capability has been published
    pub fn contains<C: Capability>(&self) -> bool {
        C::slot(self).is_some()
    }
}

/// One running command execution
#[derive(Debug)]
pub struct Invocation {
    command_line: String,
    path: Vec<String>,
    globals: GlobalArgs,
    matches: ArgMatches,
    cancel: CancellationToken,
    capabilities: Capabilities,
    span: Option<CommandSpan>,
}

impl Invocation {
    /// Create the invocation for the command at `path`
    pub fn new(
        command_line: impl Into<String>,
        path: Vec<String>,
        globals: GlobalArgs,
        matches: ArgMatches,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            command_line: command_line.into(),
            path,
            globals,
            matches,
            cancel,
            capabilities: Capabilities::default(),
            span: None,
        }
    }

    /// Raw command line as invoked
    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    /// Names of the commands from the root down to the invoked leaf
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Name of the invoked leaf command
    pub fn command_name(&self) -> &str {
        self.path.last().map_or("", String::as_str)
    }

    /// Global flags
    pub fn globals(&self) -> &GlobalArgs {
        &self.globals
    }

    /// Flags and arguments of the invoked leaf command
    pub fn matches(&self) -> &ArgMatches {
        &self.matches
    }

    /// Process cancellation token
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Publish a capability
    pub fn set<C: Capability>(&mut self, value: C) -> Result<()> {
        self.capabilities.set(value)
    }

    /// Read a capability
    pub fn get<C: Capability>(&self) -> Result<&C> {
        self.capabilities.get()
    }

    /// Whether a capability has been published
    pub fn contains<C: Capability>(&self) -> bool {
        self.capabilities.contains::<C>()
    }

    /// Span started for this invocation, if any
    pub fn span(&self) -> Option<&CommandSpan> {
        self.span.as_ref()
    }

    /// Mutable access to the started span
    pub fn span_mut(&mut self) -> Option<&mut CommandSpan> {
        self.span.as_mut()
    }

    /// Record the started span; a second span is refused
    pub fn start_span(&mut self, span: CommandSpan) -> Result<()> {
        if self.span.is_some() {
            return Err(LabctlError::DuplicateCapability { capability: "span" });
        }
        self.span = Some(span);
        Ok(())
    }

    /// Take the span for finishing
    pub fn take_span(&mut self) -> Option<CommandSpan> {
        self.span.take()
    }

    /// Run `f` with the invocation logger as the default subscriber.
    ///
    /// Falls back to the process default before a logger is bound.
    pub fn in_logger<R>(&self, f: impl FnOnce() -> R) -> R {
        match self.get::<ExecutionContext>() {
            Ok(context) => tracing::dispatcher::with_default(context.logger(), f),
            Err(_) => f(),
        }
    }

    /// Strongly-typed view handed to the command body
    pub fn session(&self) -> Result<Session<'_>> {
        Ok(Session {
            context: self.get()?,
            log_sink: self.get()?,
            printer: self.get()?,
            client: self.get()?,
            matches: &self.matches,
            globals: &self.globals,
        })
    }
}

/// Everything a command body may use
#[derive(Debug, Clone, Copy)]
pub struct Session<'a> {
    /// Execution context for remote calls
    pub context: &'a ExecutionContext,
    /// Sink for remote log output
    pub log_sink: &'a LogSink,
    /// Output formatter
    pub printer: &'a Printer,
    /// HTTP client for remote handles
    pub client: &'a HttpClient,
    /// Leaf command flags and arguments
    pub matches: &'a ArgMatches,
    /// Global flags
    pub globals: &'a GlobalArgs,
}

impl<'a> Session<'a> {
    /// String flag value of the leaf command
    pub fn flag(&self, name: &str) -> Result<&'a str> {
        self.optional(name)
            .ok_or_else(|| LabctlError::invalid_argument(format!("missing --{name}")))
    }

    /// Optional string argument of the leaf command
    pub fn optional(&self, name: &str) -> Option<&'a str> {
        self.matches
            .try_get_one::<String>(name)
            .ok()
            .flatten()
            .map(String::as_str)
    }

    /// Positional arguments of the leaf command
    pub fn args(&self, name: &str) -> Vec<String> {
        self.matches
            .try_get_many::<String>(name)
            .ok()
            .flatten()
            .map(|values| values.cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogWriter;
    use crate::printer::OutputFormat;

    fn invocation() -> Invocation {
        Invocation::new(
            "labctl debug peer",
            vec!["debug".to_string(), "peer".to_string()],
            GlobalArgs::default(),
            ArgMatches::default(),
            CancellationToken::new(),
        )
    }

    #[test]
    fn test_capabilities_are_write_once() {
        let mut inv = invocation();
        inv.set(Printer::new(OutputFormat::Unix)).unwrap();

        let err = inv.set(Printer::new(OutputFormat::Json)).unwrap_err();
        assert!(matches!(err, LabctlError::DuplicateCapability { capability: "printer" }));
        assert_eq!(inv.get::<Printer>().unwrap().format(), OutputFormat::Unix);
    }

    #[test]
    fn test_missing_capability_is_reported_by_name() {
        let inv = invocation();
        assert!(!inv.contains::<HttpClient>());
        let err = inv.get::<HttpClient>().unwrap_err();
        assert!(matches!(err, LabctlError::CapabilityNotFound { capability: "client" }));
    }

    #[test]
    fn test_session_requires_every_capability() {
        let mut inv = invocation();
        inv.set(ExecutionContext::background()).unwrap();
        inv.set(LogSink::new(LogWriter::Console)).unwrap();
        inv.set(Printer::new(OutputFormat::Json)).unwrap();
        assert!(matches!(
            inv.session(),
            Err(LabctlError::CapabilityNotFound { capability: "client" })
        ));

        inv.set(HttpClient::builder().build().unwrap()).unwrap();
        let session = inv.session().unwrap();
        assert_eq!(session.printer.format(), OutputFormat::Json);
        assert!(session.args("args").is_empty());
        assert!(session.flag("app-addr").is_err());
    }

    #[test]
    fn test_leaf_name_comes_from_path() {
        assert_eq!(invocation().command_name(), "peer");
        assert_eq!(invocation().path(), ["debug", "peer"]);
    }
}
