//! Event types for action graph execution.
//!
//! Events are emitted while a node moves through its trigger state machine,
//! notifying subscribers about validation, parent waits, dispatch, completion
//! and failure.

mod node;

pub use node::*;

use crate::graph::NodeId;

/// Generic event wrapper.
#[derive(Debug, Clone)]
pub struct Event<T> {
    inner: T,
}

/// Event message containing node context.
#[derive(Debug, Clone)]
pub struct Message {
    /// Node the event belongs to.
    pub nid: NodeId,
    /// The actual event data.
    pub event: NodeEvent,
}

/// Log entry emitted during node execution.
#[derive(Debug, Clone)]
pub struct Log {
    /// Node ID that generated this log.
    pub nid: NodeId,
    /// Log message content.
    pub content: String,
    /// Timestamp in milliseconds of the log entry.
    pub timestamp: i64,
}

impl<T> std::ops::Deref for Event<T>
where
    T: std::fmt::Debug + Clone,
{
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Event<T>
where
    T: std::fmt::Debug + Clone,
{
    pub fn new(inner: &T) -> Self {
        Self {
            inner: inner.clone(),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl Message {
    pub fn is_completion(&self) -> bool {
        matches!(self.event, NodeEvent::Completed(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.event, NodeEvent::Failed(_))
    }
}
