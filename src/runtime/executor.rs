//! Trigger execution: the per-node state machine.
//!
//! A trigger validates local parameters, triggers every distinct parent
//! exactly once, joins on all of them, substitutes resolved output paths into
//! the parameter map, makes sure the declared output subdirectory exists and
//! dispatches the action to the remote backend. Completion is published once
//! per run; failures reach both the triggering caller and the event channel,
//! and never fire the completion record.

use std::{collections::HashSet, sync::Arc};

use futures::future::BoxFuture;
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use crate::{
    Error, Result,
    backend::Dispatch,
    cache::CacheProbe,
    catalog::validate_all,
    common::Vars,
    events::{CompletionEvent, FailureReason, NodeEvent},
    fs::FileSystem,
    graph::{ActionGraph, NodeId, NodeState},
    runtime::{Context, NodeOutcome},
    utils::{self, time::time_millis},
};

pub struct Executor {
    graph: Arc<ActionGraph>,
    ctx: Arc<Context>,
    probe: CacheProbe,
    backend: Arc<dyn Dispatch>,
    fs: Arc<dyn FileSystem>,
    runtime: Arc<Runtime>,
}

impl Executor {
    pub fn new(
        graph: Arc<ActionGraph>,
        ctx: Arc<Context>,
        probe: CacheProbe,
        backend: Arc<dyn Dispatch>,
        fs: Arc<dyn FileSystem>,
        runtime: Arc<Runtime>,
    ) -> Arc<Self> {
        Arc::new(Self {
            graph,
            ctx,
            probe,
            backend,
            fs,
            runtime,
        })
    }

    /// Trigger a node run.
    ///
    /// Boxed so parent triggers can recurse through the dependency chain.
    pub fn trigger(
        self: &Arc<Self>,
        nid: &str,
        force_update: bool,
    ) -> BoxFuture<'static, Result<CompletionEvent>> {
        let this = self.clone();
        let nid = nid.to_string();
        Box::pin(async move { this.run(nid, force_update).await })
    }

    async fn run(
        self: Arc<Self>,
        nid: NodeId,
        force_update: bool,
    ) -> Result<CompletionEvent> {
        if !self.graph.contains(&nid) {
            return Err(Error::Graph(format!("node '{}' not found", nid)));
        }

        // at-most-one concurrent run per node: later triggers queue behind
        // the in-flight one and share its outcome
        if !self.ctx.begin_run(&nid) {
            debug!("node '{}' already running, joining the in-flight run", nid);
            return match self.ctx.wait_outcome(&nid).await {
                NodeOutcome::Completed(completion) => Ok(completion),
                NodeOutcome::Failed(reason) => Err(failure_error(reason)),
            };
        }
        let result = self.execute(&nid, force_update).await;
        self.ctx.end_run(&nid);
        result
    }

    async fn execute(
        self: &Arc<Self>,
        nid: &NodeId,
        force_update: bool,
    ) -> Result<CompletionEvent> {
        let rid = utils::longid();
        debug!(run = %rid, node = %nid, force_update, "trigger");
        let cancel = self.ctx.cancel_token();

        if !force_update {
            if let Some(completion) = self.short_circuit(nid).await? {
                return Ok(completion);
            }
        }

        // Validating
        self.graph.set_state(nid, NodeState::Validating)?;
        self.ctx.emit_event(nid, NodeEvent::Validating(time_millis()));

        let node = self.graph.get(nid).ok_or(Error::Graph(format!("node '{}' not found", nid)))?;
        let dependencies = self.graph.dependencies(nid);
        let dependent_parameters: HashSet<&str> = dependencies.iter().map(|(edge, _)| edge.parameter.as_str()).collect();

        // parameters filled by a dependency edge are exempt: their value
        // arrives once the parent completes
        let local_specs = node.parameters.iter().filter(|spec| !dependent_parameters.contains(spec.name.as_str()));
        if let Err(messages) = validate_all(local_specs.clone().map(|spec| (spec, node.effective_value(&spec.name)))) {
            self.graph.set_state(nid, NodeState::Idle)?;
            self.ctx.record_outcome(nid, NodeOutcome::Failed(FailureReason::Validation(messages.clone())));
            return Err(Error::Validation {
                messages,
            });
        }

        let mut parameters = Vars::new();
        parameters.set("action", &node.name);
        for spec in local_specs {
            if let Some(value) = node.effective_value(&spec.name) {
                if !value.is_empty() {
                    parameters.set(&spec.name, value);
                }
            }
        }

        // WaitingOnParents
        let parents = self.graph.distinct_parents(nid);
        self.graph.set_state(nid, NodeState::WaitingOnParents)?;
        self.ctx.emit_event(nid, NodeEvent::WaitingOnParents(parents.clone()));

        for parent in &parents {
            // a parent completed by a prior run is reused as-is
            if self.graph.state(parent) == Some(NodeState::Completed) {
                continue;
            }
            let executor = self.clone();
            let parent_nid = parent.clone();
            self.runtime.spawn(async move {
                // outcome is shared through the parent's cell; errors also
                // surface there
                let _ = executor.trigger(&parent_nid, false).await;
            });
        }

        for parent in &parents {
            if self.graph.state(parent) == Some(NodeState::Completed) {
                continue;
            }
            let outcome = tokio::select! {
                _ = cancel.wait() => return self.cancelled(nid),
                outcome = self.ctx.wait_outcome(parent) => outcome,
            };
            if let NodeOutcome::Failed(reason) = outcome {
                debug!(run = %rid, node = %nid, parent = %parent, %reason, "parent failed");
                self.graph.set_state(nid, NodeState::Failed)?;
                self.ctx.record_outcome(nid, NodeOutcome::Failed(FailureReason::Parent(parent.clone())));
                return Err(Error::Parent(parent.clone()));
            }
        }

        // dependency-resolved values always win over local entries
        for (edge, parent) in &dependencies {
            let Some(directory) = self.graph.output_directory(parent) else {
                warn!("parent '{}' completed without an output directory", parent);
                self.graph.set_state(nid, NodeState::Failed)?;
                self.ctx.record_outcome(nid, NodeOutcome::Failed(FailureReason::Parent(parent.clone())));
                return Err(Error::Parent(parent.clone()));
            };
            parameters.set(&edge.parameter, format!("{}{}", directory, utils::file_name(&edge.file)));
        }

        // make sure the declared output subdirectory exists
        let node = self.graph.get(nid).ok_or(Error::Graph(format!("node '{}' not found", nid)))?;
        if let (Some(base), Some(sub)) = (&node.output_base_directory, &node.output_subdirectory) {
            let path = format!("{}/{}", base.trim_end_matches('/'), sub);
            if !self.fs.exists(&path).await {
                if let Err(error) = self.fs.create_subdirectory(base, sub).await {
                    warn!(run = %rid, node = %nid, %error, "subdirectory creation failed");
                    self.graph.set_state(nid, NodeState::Idle)?;
                    self.ctx.record_outcome(nid, NodeOutcome::Failed(FailureReason::Subdirectory(path.clone())));
                    return Err(Error::Subdirectory(path));
                }
            }
        }
        if let Some(directory) = node.output_directory() {
            parameters.set("output_directory", directory);
        }
        parameters.set("force_update", force_update);

        // Dispatching
        self.graph.set_state(nid, NodeState::Dispatching)?;
        self.ctx.emit_event(nid, NodeEvent::Dispatching(time_millis()));
        self.ctx.emit_log(nid, format!("dispatching action '{}'", node.name));

        let answer = tokio::select! {
            _ = cancel.wait() => return self.cancelled(nid),
            answer = self.backend.launch(parameters) => answer,
        };

        match answer {
            Ok(answer) => {
                if node.output_base_directory.is_none() {
                    if let Some(directory) = &answer.output_directory {
                        self.graph.set_output_base_directory(nid, directory)?;
                        self.ctx.emit_event(nid, NodeEvent::OutputDirectoryChanged(directory.clone()));
                    }
                }
                self.graph.set_state(nid, NodeState::Completed)?;
                let completion = CompletionEvent {
                    output_directory: self.graph.output_directory(nid),
                    status: answer.status,
                    cached: false,
                    timestamp: time_millis(),
                };
                self.ctx.record_outcome(nid, NodeOutcome::Completed(completion.clone()));
                Ok(completion)
            }
            Err(error) => {
                let status = error.to_string();
                debug!(run = %rid, node = %nid, %status, "dispatch failed");
                self.graph.set_state(nid, NodeState::Failed)?;
                self.ctx.record_outcome(nid, NodeOutcome::Failed(FailureReason::Dispatch(status.clone())));
                Err(Error::Dispatch(status))
            }
        }
    }

    /// Completed work is never redone without `force_update`: an outcome
    /// recorded in this process, or a matching descriptor on disk, resolves
    /// the trigger without dispatching.
    async fn short_circuit(
        &self,
        nid: &NodeId,
    ) -> Result<Option<CompletionEvent>> {
        if self.graph.state(nid) == Some(NodeState::Completed) {
            if let Some(NodeOutcome::Completed(completion)) = self.ctx.outcome(nid) {
                debug!("node '{}' already completed, reusing its output", nid);
                return Ok(Some(completion));
            }
        }

        let node = self.graph.get(nid).ok_or(Error::Graph(format!("node '{}' not found", nid)))?;
        let Some(base) = &node.output_base_directory else {
            return Ok(None);
        };
        let Some(descriptor) = self.probe.probe(base, node.output_subdirectory.as_deref()).await else {
            return Ok(None);
        };

        if descriptor.action().as_deref() != Some(node.name.as_str()) {
            // a foreign descriptor still pre-populates blank fields but
            // cannot stand in for this action's run
            self.graph.set_loaded(nid, descriptor.into_parameters())?;
            return Ok(None);
        }

        debug!("cache hit for node '{}' under {:?}", nid, node.output_directory());
        self.graph.set_loaded(nid, descriptor.into_parameters())?;
        self.graph.set_state(nid, NodeState::Completed)?;
        let completion = CompletionEvent {
            output_directory: node.output_directory(),
            status: "cached".to_string(),
            cached: true,
            timestamp: time_millis(),
        };
        self.ctx.record_outcome(nid, NodeOutcome::Completed(completion.clone()));
        Ok(Some(completion))
    }

    fn cancelled(
        &self,
        nid: &NodeId,
    ) -> Result<CompletionEvent> {
        self.graph.set_state(nid, NodeState::Idle)?;
        self.ctx.record_outcome(nid, NodeOutcome::Failed(FailureReason::Cancelled));
        Err(Error::Cancelled)
    }
}

pub(crate) fn failure_error(reason: FailureReason) -> Error {
    match reason {
        FailureReason::Validation(messages) => Error::Validation {
            messages,
        },
        FailureReason::Parent(parent) => Error::Parent(parent),
        FailureReason::Subdirectory(path) => Error::Subdirectory(path),
        FailureReason::Dispatch(status) => Error::Dispatch(status),
        FailureReason::Cancelled => Error::Cancelled,
    }
}
