//! Command tree instrumentation
//!
//! Applied once at startup, before any command runs. Not idempotent.

use crate::hooks::{Hook, HookChain, TeardownHook, TracingHook};
use crate::tracer::Tracer;
use crate::tree::{Command, CommandTree};
use std::sync::Arc;

/// What an instrumentation pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Instrumentation {
    /// Leaf `before` chains extended with the tracing hook
    pub wrapped_before: usize,
    /// Tree `after` chains extended with teardown (0 or 1)
    pub wrapped_after: usize,
}

/// Install tracing on every leaf below the top-level commands and teardown
/// on the tree.
///
/// Leaves keep their existing `before` hooks, which run first. The tree's
/// existing `after` chain also runs before teardown. A tree without any leaf
/// is left untouched.
pub fn instrument(tree: &mut CommandTree, tracer: &Tracer) -> Instrumentation {
    let hook: Arc<dyn Hook> = Arc::new(TracingHook::new(tracer.clone()));

    let wrapped_before: usize = tree
        .commands
        .iter_mut()
        .flat_map(|command| command.subcommands.iter_mut())
        .map(|command| wrap_leaves(command, &hook))
        .sum();
    if wrapped_before == 0 {
        return Instrumentation::default();
    }

    let after = std::mem::take(&mut tree.after);
    tree.after = HookChain::join([
        after,
        HookChain::single(Arc::new(TeardownHook::new(tracer.clone()))),
    ]);

    tracing::debug!(wrapped_before, "command tree instrumented");
    Instrumentation {
        wrapped_before,
        wrapped_after: 1,
    }
}

fn wrap_leaves(command: &mut Command, hook: &Arc<dyn Hook>) -> usize {
    if command.subcommands.is_empty() {
        let before = std::mem::take(&mut command.before);
        command.before = before.then(Some(hook.clone()));
        return 1;
    }
    command
        .subcommands
        .iter_mut()
        .map(|child| wrap_leaves(child, hook))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::testing::{Journal, Recording};

    #[test]
    fn test_every_leaf_is_wrapped_once() {
        let journal = Journal::default();
        let mut tree = CommandTree::new("labctl")
            .after(HookChain::single(Recording::ok("after", &journal)))
            .command(
                Command::new("debug")
                    .subcommand(Command::new("update"))
                    .subcommand(Command::new("peer"))
                    .subcommand(
                        Command::new("nested")
                            .subcommand(Command::new("deep"))
                            .subcommand(Command::new("deeper")),
                    ),
            )
            .command(Command::new("group").subcommand(Command::new("run")));

        let report = instrument(&mut tree, &Tracer::noop());
        assert_eq!(
            report,
            Instrumentation {
                wrapped_before: 5,
                wrapped_after: 1
            }
        );
        assert_eq!(tree.after_chain().names(), ["after", "teardown"]);

        let peer = tree.find(&["debug", "peer"]).unwrap();
        assert_eq!(peer.before_chain().names(), ["tracing"]);
        let deep = tree.find(&["debug", "nested", "deep"]).unwrap();
        assert_eq!(deep.before_chain().names(), ["tracing"]);
        // Groups themselves are not wrapped.
        assert!(tree.find(&["debug", "nested"]).unwrap().before_chain().is_empty());
    }

    #[test]
    fn test_existing_leaf_hook_runs_first() {
        let journal = Journal::default();
        let mut tree = CommandTree::new("labctl").command(
            Command::new("debug").subcommand(
                Command::new("run").before(HookChain::single(Recording::ok("existing", &journal))),
            ),
        );

        instrument(&mut tree, &Tracer::noop());
        let run = tree.find(&["debug", "run"]).unwrap();
        assert_eq!(run.before_chain().names(), ["existing", "tracing"]);
    }

    #[test]
    fn test_tree_without_subcommands_is_untouched() {
        let journal = Journal::default();
        let mut tree = CommandTree::new("labctl")
            .after(HookChain::single(Recording::ok("after", &journal)))
            .command(Command::new("version"));

        let report = instrument(&mut tree, &Tracer::noop());
        assert_eq!(report, Instrumentation::default());
        assert_eq!(tree.after_chain().names(), ["after"]);
        assert!(tree.commands()[0].before_chain().is_empty());

        let mut empty = CommandTree::new("labctl");
        assert_eq!(instrument(&mut empty, &Tracer::noop()), Instrumentation::default());
        assert!(empty.after_chain().is_empty());
    }
}
