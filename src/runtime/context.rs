//! Shared execution context.
//!
//! The context owns what every trigger run needs to coordinate with the
//! others: one outcome cell per node (join semantics for dependents, replay
//! for late waiters), the in-flight set enforcing at-most-one concurrent run
//! per node, the event channel and the cancellation token.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, RwLock},
};

use tokio::sync::watch;

use crate::{
    ShareLock,
    common::Shutdown,
    events::{CompletionEvent, Event, FailureReason, Log, Message, NodeEvent},
    graph::NodeId,
    runtime::Channel,
    utils,
};

/// Terminal result of one trigger run, shared through the node's outcome cell.
#[derive(Debug, Clone)]
pub enum NodeOutcome {
    Completed(CompletionEvent),
    Failed(FailureReason),
}

#[derive(Clone)]
pub struct Context {
    channel: Arc<Channel>,
    cells: ShareLock<HashMap<NodeId, watch::Sender<Option<NodeOutcome>>>>,
    in_flight: ShareLock<HashSet<NodeId>>,
    cancel: ShareLock<Arc<Shutdown>>,
}

impl Context {
    pub fn new(channel: Arc<Channel>) -> Self {
        Self {
            channel,
            cells: Arc::new(RwLock::new(HashMap::new())),
            in_flight: Arc::new(RwLock::new(HashSet::new())),
            cancel: Arc::new(RwLock::new(Arc::new(Shutdown::new()))),
        }
    }

    pub fn channel(&self) -> Arc<Channel> {
        self.channel.clone()
    }

    /// Claim the node for a run.
    ///
    /// Returns false when a run is already in flight; the caller should wait
    /// on the outcome cell instead of starting a second chain. A successful
    /// claim resets the cell so waiters observe this run's outcome.
    pub fn begin_run(
        &self,
        nid: &NodeId,
    ) -> bool {
        let mut in_flight = self.in_flight.write().unwrap();
        if !in_flight.insert(nid.clone()) {
            return false;
        }
        self.cell(nid).send_replace(None);
        true
    }

    /// Release the node after a run reached a terminal state.
    pub fn end_run(
        &self,
        nid: &NodeId,
    ) {
        self.in_flight.write().unwrap().remove(nid);
    }

    /// The current outcome of a node, if its last run finished.
    pub fn outcome(
        &self,
        nid: &NodeId,
    ) -> Option<NodeOutcome> {
        self.cell(nid).borrow().clone()
    }

    /// Wait until the node's current run reaches a terminal state.
    ///
    /// Resolves immediately when an outcome is already recorded.
    pub async fn wait_outcome(
        &self,
        nid: &NodeId,
    ) -> NodeOutcome {
        let mut receiver = self.cell(nid).subscribe();
        let outcome = receiver.wait_for(|value| value.is_some()).await.expect("outcome cell sender lives in the context");
        outcome.clone().unwrap()
    }

    /// Publish a run's terminal outcome: completion records are written
    /// before the event goes out, then the cell unblocks every waiter.
    pub fn record_outcome(
        &self,
        nid: &NodeId,
        outcome: NodeOutcome,
    ) {
        let event = match &outcome {
            NodeOutcome::Completed(completion) => {
                self.channel.record_completion(nid.clone(), completion.clone());
                NodeEvent::Completed(completion.clone())
            }
            NodeOutcome::Failed(reason) => NodeEvent::Failed(reason.clone()),
        };
        self.cell(nid).send_replace(Some(outcome));
        self.emit_event(nid, event);
    }

    pub fn emit_event(
        &self,
        nid: &NodeId,
        event: NodeEvent,
    ) {
        let _ = self.channel.event_queue().send(Event::new(&Message {
            nid: nid.clone(),
            event,
        }));
    }

    pub fn emit_log(
        &self,
        nid: &NodeId,
        content: String,
    ) {
        let log = Log {
            nid: nid.clone(),
            content,
            timestamp: utils::time::time_millis(),
        };
        let _ = self.channel.log_queue().send(Event::new(&log));
    }

    /// The cancellation token runs capture at their start.
    pub fn cancel_token(&self) -> Arc<Shutdown> {
        self.cancel.read().unwrap().clone()
    }

    /// Cancel every in-flight run and arm a fresh token for later triggers.
    pub fn cancel_all(&self) {
        let mut cancel = self.cancel.write().unwrap();
        cancel.shutdown();
        *cancel = Arc::new(Shutdown::new());
    }

    fn cell(
        &self,
        nid: &NodeId,
    ) -> watch::Sender<Option<NodeOutcome>> {
        let mut cells = self.cells.write().unwrap();
        cells.entry(nid.clone()).or_insert_with(|| watch::channel(None).0).clone()
    }
}
