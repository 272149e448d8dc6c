use std::fmt;

use crate::graph::NodeId;

/// Lifecycle events of one node trigger.
#[derive(Debug, Clone)]
pub enum NodeEvent {
    /// Local parameter validation started (timestamp).
    Validating(i64),
    /// The node is waiting on its distinct parents.
    WaitingOnParents(Vec<NodeId>),
    /// The parameter map was handed to the remote backend (timestamp).
    Dispatching(i64),
    /// The node's output is available.
    Completed(CompletionEvent),
    /// The trigger ended without producing output.
    Failed(FailureReason),
    /// The node's output directory was set or resolved.
    OutputDirectoryChanged(String),
}

impl NodeEvent {
    pub fn str(&self) -> &str {
        match self {
            NodeEvent::Validating(_) => "Validating",
            NodeEvent::WaitingOnParents(_) => "WaitingOnParents",
            NodeEvent::Dispatching(_) => "Dispatching",
            NodeEvent::Completed(_) => "Completed",
            NodeEvent::Failed(_) => "Failed",
            NodeEvent::OutputDirectoryChanged(_) => "OutputDirectoryChanged",
        }
    }
}

/// Payload of a completion event, also the value returned to waiting callers.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionEvent {
    /// Resolved output directory of the run, when the action produced one.
    pub output_directory: Option<String>,
    /// Backend-reported status string, or `"cached"` for cache hits.
    pub status: String,
    /// Whether the run short-circuited on an existing descriptor.
    pub cached: bool,
    /// Completion time in milliseconds.
    pub timestamp: i64,
}

/// Why a trigger failed.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// Aggregated local parameter validation messages.
    Validation(Vec<String>),
    /// The named parent did not complete.
    Parent(NodeId),
    /// The declared output subdirectory could not be created.
    Subdirectory(String),
    /// The backend rejected or failed the launch.
    Dispatch(String),
    /// The run was cancelled.
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            FailureReason::Validation(messages) => write!(f, "Validation: {}", messages.join("; ")),
            FailureReason::Parent(nid) => write!(f, "Parent: {}", nid),
            FailureReason::Subdirectory(path) => write!(f, "Subdirectory: {}", path),
            FailureReason::Dispatch(status) => write!(f, "Dispatch: {}", status),
            FailureReason::Cancelled => write!(f, "Cancelled"),
        }
    }
}
