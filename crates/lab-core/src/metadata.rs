//! Metadata exchanged with remote lab services

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of work a labapp can perform
///
/// Kept open-ended: the labapp decides which types it accepts and rejects
/// unknown ones itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskType(String);

impl TaskType {
    /// Create a task type from its wire name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Wire name of the task type
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Work dispatched to a labapp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// What to do
    #[serde(rename = "type")]
    pub task_type: TaskType,
    /// What to do it to (a CID, a peer address, ...)
    pub subject: String,
}

impl Task {
    /// Build a task from its type and subject
    pub fn new(task_type: TaskType, subject: impl Into<String>) -> Self {
        Self {
            task_type,
            subject: subject.into(),
        }
    }
}

/// Peer metadata reported by a labapp
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    /// Peer identity
    #[serde(rename = "ID")]
    pub id: String,
    /// Multiaddrs the peer listens on
    #[serde(rename = "Addrs", default)]
    pub addrs: Vec<String>,
}
