//! Output formatter selection

use super::Hook;
use crate::error::Result;
use crate::printer::{OutputFormat, Printer};
use crate::store::Invocation;
use async_trait::async_trait;

/// Publishes the [`Printer`] selected by `--output`
#[derive(Debug, Clone, Copy, Default)]
pub struct PrinterHook;

#[async_trait]
impl Hook for PrinterHook {
    async fn run(&self, inv: &mut Invocation) -> Result<()> {
        let format: OutputFormat = inv.globals().output.parse()?;
        inv.set(Printer::new(format))
    }

    fn name(&self) -> &str {
        "printer"
    }
}
