//! # Actiongraph
//!
//! Actiongraph is a lightweight, event-driven action dependency graph executor
//! written in Rust. It models a remote server-side computation ("action") as a
//! node with typed parameters, lets nodes consume the output files of other
//! nodes, and executes the transitive dependency set exactly once each before
//! dispatching the dependent action.
//!
//! ## Core Features
//!
//! - **Event-Driven Architecture**: node lifecycle events flow over a broadcast
//!   channel with replay for late completion subscribers
//! - **Async Execution**: powered by `tokio`; parents execute concurrently and
//!   a dependent dispatches only once all of them have completed
//! - **Directory Cache**: a descriptor file inside a node's output directory
//!   memoizes completed work and short-circuits re-triggers
//! - **Pluggable Boundaries**: remote dispatch and filesystem access are traits,
//!   with HTTP and local-disk implementations provided
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use actiongraph::{ActionCatalog, EngineBuilder};
//!
//! let catalog = ActionCatalog::from_json(catalog_json)?;
//! let engine = EngineBuilder::new().catalog(catalog).build()?;
//! engine.launch();
//!
//! engine.add_action("segment", "volume_segmentation")?;
//! engine.add_action("mesh", "mesh_extraction")?;
//! engine.connect("mesh", "input_volume", "segment", "output.mhd")?;
//!
//! engine.trigger("mesh", false)?;
//! let completion = engine.wait("mesh")?;
//! println!("output: {:?}", completion.output_directory);
//! ```

mod backend;
mod builder;
mod cache;
mod catalog;
mod common;
mod config;
mod engine;
mod error;
mod events;
mod fs;
mod graph;
mod runtime;
mod utils;

use std::sync::{Arc, RwLock};

pub use backend::{Dispatch, HttpBackend, LaunchResponse};
pub use builder::EngineBuilder;
pub use cache::{CacheDescriptor, CacheProbe};
pub use catalog::{ActionAttributes, ActionCatalog, ActionTemplate, ParameterKind, ParameterSpec, ValidationError, ValidationFailure};
pub use common::Vars;
pub use config::{BackendConfig, Config, FilesystemConfig};
pub use engine::Engine;
pub use error::Error;
pub use events::{CompletionEvent, Event, FailureReason, Log, Message, NodeEvent};
pub use fs::{FileSystem, LocalFileSystem};
pub use graph::{ActionNode, DependencyEdge, NodeId, NodeState};
pub use runtime::{Channel, ChannelEvent, ChannelOptions};

/// Result type alias for actiongraph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;
