//! labctl binary

use lab_core::CancellationToken;
use labctl::{command_tree, instrument, LabctlError, Tracer};
use std::process::ExitCode;
use tokio::signal;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let tracer = match Tracer::from_env() {
        Ok(tracer) => tracer,
        Err(err) => return report(err),
    };

    let mut tree = command_tree();
    instrument(&mut tree, &tracer);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    match tree.run(std::env::args_os(), cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(err),
    }
}

fn report(err: LabctlError) -> ExitCode {
    match err {
        // Help and version output go through clap with its own exit codes.
        LabctlError::Usage(usage) => usage.exit(),
        other => {
            eprintln!("labctl: {other}");
            ExitCode::from(other.exit_code())
        }
    }
}
