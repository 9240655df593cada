//! Lab Core
//!
//! Shared foundation for the lab control plane:
//! - `ExecutionContext`: the per-invocation carrier of cancellation, deadline,
//!   tracing span and logger binding, passed to every remote call
//! - `CancellationToken`: cooperative, clonable cancellation
//! - Metadata types exchanged with remote lab services (`PeerInfo`, `Task`)

pub mod cancel;
pub mod context;
pub mod metadata;

pub use cancel::CancellationToken;
pub use context::{ExecutionContext, TimeoutOutOfRange};
pub use metadata::{PeerInfo, Task, TaskType};
