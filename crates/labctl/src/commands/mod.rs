//! labctl command surface

pub mod debug;

use crate::hooks::{ClientHook, HookChain, PrinterHook};
use crate::tree::CommandTree;
use std::sync::Arc;

/// Binary name
pub const BINARY_NAME: &str = "labctl";

/// The full, uninstrumented labctl command tree
pub fn command_tree() -> CommandTree {
    CommandTree::new(BINARY_NAME)
        .about("Control plane for lab agents and apps")
        .before(
            HookChain::new()
                .then(Some(Arc::new(PrinterHook)))
                .then(Some(Arc::new(ClientHook))),
        )
        .command(debug::command())
}
