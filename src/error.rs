//! Error types for actiongraph.
//!
//! All errors are represented by the `Error` enum, with specific variants for
//! each failure category of the trigger state machine and its boundaries.

use std::io::ErrorKind;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all actiongraph operations.
///
/// Trigger failures map onto the variants the caller needs to tell apart:
/// `Validation` (node stays re-triggerable, no dispatch attempted), `Parent`
/// (a required parent failed, the dependent never dispatched), `Subdirectory`
/// (the output namespace could not be prepared) and `Dispatch` (the backend
/// rejected or failed the launch).
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Engine-level errors (startup, shutdown, configuration).
    #[error("{0}")]
    Engine(String),

    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, TOML).
    #[error("{0}")]
    Convert(String),

    /// Action catalog lookup or parsing errors.
    #[error("{0}")]
    Catalog(String),

    /// Graph construction errors (duplicate ids, unknown nodes or parameters).
    #[error("{0}")]
    Graph(String),

    /// Node definition errors.
    #[error("{0}")]
    Node(String),

    /// Aggregated parameter validation failures for one trigger.
    #[error("validation failed: {}", .messages.join("; "))]
    Validation {
        messages: Vec<String>,
    },

    /// A parent the node depends on failed, blocking the dispatch.
    #[error("parent action '{0}' failed")]
    Parent(String),

    /// The declared output subdirectory could not be created.
    #[error("failed to create output subdirectory '{0}'")]
    Subdirectory(String),

    /// The remote backend reported a failed launch.
    #[error("{0}")]
    Dispatch(String),

    /// Filesystem primitive errors.
    #[error("{0}")]
    Filesystem(String),

    /// Message queue errors.
    #[error("{0}")]
    Queue(String),

    /// The run was cancelled before reaching a terminal state.
    #[error("cancelled")]
    Cancelled,
}

impl From<Error> for String {
    fn from(val: Error) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Filesystem(error.to_string())
    }
}

impl From<Error> for std::io::Error {
    fn from(val: Error) -> Self {
        std::io::Error::new(ErrorKind::Other, val.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Convert(error.to_string())
    }
}
