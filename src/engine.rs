//! Action graph engine - the main entry point for actiongraph.
//!
//! The engine manages the graph and its execution, including:
//! - Deploying the action catalog
//! - Creating nodes and wiring dependency edges
//! - Triggering nodes and observing their completion
//! - Managing the event channel and graceful shutdown

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::runtime::Runtime;
use tracing::debug;

use crate::{
    Error, Result, ShareLock,
    backend::Dispatch,
    cache::CacheProbe,
    catalog::ActionCatalog,
    common::{Queue, Shutdown, Vars},
    events::{CompletionEvent, NodeEvent},
    fs::FileSystem,
    graph::{ActionGraph, ActionNode, NodeId, NodeState},
    runtime::{Channel, Context, Executor, NodeOutcome, failure_error},
};

/// Size of the queue buffering trigger commands.
const TRIGGER_QUEUE_SIZE: usize = 256;

#[derive(Debug, Clone)]
struct TriggerCommand {
    nid: NodeId,
    force_update: bool,
}

/// The action graph engine.
///
/// Engine is the central coordinator, responsible for:
/// - Owning the tokio runtime for async execution
/// - Coordinating the event channel for pub/sub messaging
/// - Holding the action catalog and the dependency graph
/// - Draining trigger commands into executor runs
///
/// # Example
///
/// ```rust,ignore
/// let engine = EngineBuilder::new().catalog(catalog).config(config).build()?;
/// engine.launch();
///
/// engine.add_action("segment", "volume_segmentation")?;
/// engine.trigger("segment", false)?;
/// let completion = engine.wait("segment")?;
///
/// engine.shutdown();
/// ```
pub struct Engine {
    /// Event channel broadcasting node lifecycle events.
    channel: Arc<Channel>,
    /// The dependency graph of action nodes.
    graph: Arc<ActionGraph>,
    /// Deployed action catalog.
    catalog: ShareLock<Arc<ActionCatalog>>,
    /// Shared run state (outcome cells, in-flight set, cancellation).
    ctx: Arc<Context>,
    /// The trigger state machine.
    executor: Arc<Executor>,
    /// Probe for descriptor read-back on output-directory changes.
    probe: CacheProbe,
    /// Queue of pending trigger commands.
    trigger_queue: Arc<Queue<TriggerCommand>>,

    /// Flag indicating if the engine is running.
    running: Arc<AtomicBool>,
    /// Tokio runtime for async task execution.
    runtime: Arc<Runtime>,
    /// Shutdown coordinator for the command loop.
    shutdown: Arc<Shutdown>,
}

impl Engine {
    pub(crate) fn new(
        runtime: Arc<Runtime>,
        catalog: ActionCatalog,
        backend: Arc<dyn Dispatch>,
        fs: Arc<dyn FileSystem>,
        descriptor_file: &str,
    ) -> Self {
        let channel = Arc::new(Channel::new(runtime.clone()));
        let graph = Arc::new(ActionGraph::new());
        let ctx = Arc::new(Context::new(channel.clone()));
        let probe = CacheProbe::new(fs.clone(), descriptor_file);
        let executor = Executor::new(graph.clone(), ctx.clone(), probe.clone(), backend, fs, runtime.clone());

        Self {
            channel,
            graph,
            catalog: Arc::new(std::sync::RwLock::new(Arc::new(catalog))),
            ctx,
            executor,
            probe,
            trigger_queue: Queue::new(TRIGGER_QUEUE_SIZE),
            running: Arc::new(AtomicBool::new(false)),
            runtime,
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    /// Starts the engine and begins draining trigger commands.
    pub fn launch(&self) {
        if self.running.swap(true, Ordering::Relaxed) {
            return;
        }

        // Register handlers first, then start listening
        // This ensures no events are missed
        self.channel.listen();

        let trigger_queue = self.trigger_queue.clone();
        let executor = self.executor.clone();
        let shutdown = self.shutdown.clone();
        self.runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    Some(command) = trigger_queue.next_async() => {
                        let run = executor.trigger(&command.nid, command.force_update);
                        tokio::spawn(async move {
                            if let Err(error) = run.await {
                                debug!(node = %command.nid, %error, "trigger ended with failure");
                            }
                        });
                    }
                }
            }
        });
    }

    /// Gracefully shuts down the engine.
    ///
    /// Cancels every in-flight run at its next suspension point, stops the
    /// command loop and the event channel.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::Relaxed) {
            return;
        }

        self.ctx.cancel_all();
        self.shutdown.shutdown();
        self.channel.shutdown();
    }

    /// Cancels every in-flight run without stopping the engine.
    ///
    /// Pending continuations observe a cancelled outcome; later triggers run
    /// normally.
    pub fn abort(&self) {
        self.ctx.cancel_all();
    }

    /// Replaces the deployed action catalog.
    pub fn deploy(
        &self,
        catalog: ActionCatalog,
    ) {
        *self.catalog.write().unwrap() = Arc::new(catalog);
    }

    /// Creates a node of the named action type from the catalog.
    pub fn add_action(
        &self,
        nid: &str,
        action_name: &str,
    ) -> Result<NodeId> {
        let catalog = self.catalog.read().unwrap().clone();
        let template = catalog.get(action_name).ok_or(Error::Catalog(format!("action '{}' not found in catalog", action_name)))?;
        self.graph.add_node(ActionNode::from_template(nid, template))
    }

    /// Connects a parameter of `child` to an output file of `parent`.
    pub fn connect(
        &self,
        child: &str,
        parameter: &str,
        parent: &str,
        file: &str,
    ) -> Result<()> {
        self.graph.connect(child, parameter, parent, file)
    }

    /// Sets a locally entered parameter value.
    pub fn set_parameter(
        &self,
        nid: &str,
        parameter: &str,
        value: &str,
    ) -> Result<()> {
        self.graph.set_value(nid, parameter, value)
    }

    /// Supplies externally provided parameters for the node.
    ///
    /// Provided values take precedence over locally entered ones and are
    /// suppressed from presentation; an `output_directory` entry also sets
    /// the node's base directory.
    pub fn set_action_parameters(
        &self,
        nid: &str,
        parameters: Vars,
    ) -> Result<()> {
        self.graph.set_provided(nid, parameters)
    }

    /// Declares the fixed output subdirectory of the node.
    pub fn set_output_subdirectory(
        &self,
        nid: &str,
        subdirectory: &str,
    ) -> Result<()> {
        self.graph.set_output_subdirectory(nid, subdirectory)
    }

    /// Defines the output directory for the node.
    ///
    /// Unless `avoid_cache_read` is set, the directory is probed for a prior
    /// run's descriptor and a hit pre-populates the node's blank parameters.
    /// `OutputDirectoryChanged` fires once the probe settled.
    pub fn set_output_directory(
        &self,
        nid: &str,
        directory: &str,
        avoid_cache_read: bool,
    ) -> Result<()> {
        self.graph.set_output_base_directory(nid, directory)?;

        if avoid_cache_read {
            self.ctx.emit_event(&nid.to_string(), NodeEvent::OutputDirectoryChanged(directory.to_string()));
            return Ok(());
        }

        let graph = self.graph.clone();
        let ctx = self.ctx.clone();
        let probe = self.probe.clone();
        let nid = nid.to_string();
        let directory = directory.to_string();
        self.runtime.spawn(async move {
            let sub = graph.get(&nid).and_then(|n| n.output_subdirectory);
            if let Some(descriptor) = probe.probe(&directory, sub.as_deref()).await {
                let _ = graph.set_loaded(&nid, descriptor.into_parameters());
            }
            ctx.emit_event(&nid, NodeEvent::OutputDirectoryChanged(directory));
        });
        Ok(())
    }

    /// The node's resolved output directory, with trailing separator.
    pub fn output_directory(
        &self,
        nid: &str,
    ) -> Option<String> {
        self.graph.output_directory(nid)
    }

    /// Current state of a node.
    pub fn state(
        &self,
        nid: &str,
    ) -> Option<NodeState> {
        self.graph.state(nid)
    }

    /// A snapshot of a node.
    pub fn node(
        &self,
        nid: &str,
    ) -> Option<ActionNode> {
        self.graph.get(nid)
    }

    /// Triggers execution of a node.
    ///
    /// Returns once the command is queued; completion and failure surface
    /// over the event channel and through [`Engine::wait`].
    pub fn trigger(
        &self,
        nid: &str,
        force_update: bool,
    ) -> Result<()> {
        if !self.running.load(Ordering::Relaxed) {
            return Err(Error::Engine("Engine is not running".to_string()));
        }
        if !self.graph.contains(nid) {
            return Err(Error::Graph(format!("node '{}' not found", nid)));
        }
        self.trigger_queue.send(TriggerCommand {
            nid: nid.to_string(),
            force_update,
        })
    }

    /// Blocks until the node's latest run reaches a terminal state.
    ///
    /// Returns the recorded outcome immediately when one exists; a node that
    /// was never triggered blocks until it is. Must be called from outside
    /// the engine runtime.
    pub fn wait(
        &self,
        nid: &str,
    ) -> Result<CompletionEvent> {
        let nid = nid.to_string();
        let ctx = self.ctx.clone();
        match self.runtime.block_on(async move { ctx.wait_outcome(&nid).await }) {
            NodeOutcome::Completed(completion) => Ok(completion),
            NodeOutcome::Failed(reason) => Err(failure_error(reason)),
        }
    }

    /// Returns a reference to the event channel.
    pub fn channel(&self) -> Arc<Channel> {
        self.channel.clone()
    }
}
