//! Completion event bus.
//!
//! Node lifecycle events and logs flow over broadcast queues; subscribers
//! register handlers filtered by a node-id glob. Completions are additionally
//! recorded per node so that a listener registered after a node finished is
//! still delivered the completion (replay-on-late-subscribe).

use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;
use tokio::runtime::Runtime;

use crate::{
    ShareLock,
    common::{BroadcastQueue, MemCache, Shutdown},
    events::{CompletionEvent, Event, Log, Message},
    graph::NodeId,
};

macro_rules! dispatch_event {
    ($handles:expr, $(&$item:ident), +) => {
        let handlers = $handles.read().unwrap();
        for handle in handlers.iter() {
            (handle)($(&$item),+);
        }
    };
}

macro_rules! dispatch_event_async {
    ($handles:expr, $(&$item:ident), +) => {
        let handles = $handles.clone();

        tokio::spawn(async move {
            let handlers = handles.read().unwrap().clone();
            for handle in handlers.iter() {
                (handle)($(&$item),+).await;
            }
        });
    };
}

const EVENT_QUEUE_SIZE: usize = 2048;
const LOG_QUEUE_SIZE: usize = 4096;
const COMPLETION_RECORDS_SIZE: usize = 2048;

pub type NodeEventHandle = Arc<dyn Fn(&Event<Message>) + Send + Sync>;
pub type NodeLogHandle = Arc<dyn Fn(&Event<Log>) + Send + Sync>;
pub type NodeEventHandleAsync = Arc<dyn Fn(&Event<Message>) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// use the glob pattern to match the node id
    /// eg. mesh*
    pub nid: String,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            nid: "*".to_string(),
        }
    }
}

impl ChannelOptions {
    pub fn with_nid(nid: String) -> Self {
        Self {
            nid,
        }
    }
}

#[derive(Clone)]
pub struct Channel {
    event_queue: Arc<BroadcastQueue<Event<Message>>>,
    log_queue: Arc<BroadcastQueue<Event<Log>>>,

    events: ShareLock<Vec<NodeEventHandle>>,
    logs: ShareLock<Vec<NodeLogHandle>>,
    events_async: ShareLock<Vec<NodeEventHandleAsync>>,

    completions: MemCache<NodeId, CompletionEvent>,

    runtime: Arc<Runtime>,
    shutdown: Arc<Shutdown>,
}

impl Channel {
    pub(crate) fn new(runtime: Arc<Runtime>) -> Self {
        Self {
            event_queue: BroadcastQueue::new(EVENT_QUEUE_SIZE),
            log_queue: BroadcastQueue::new(LOG_QUEUE_SIZE),
            events: Arc::new(RwLock::new(Vec::new())),
            logs: Arc::new(RwLock::new(Vec::new())),
            events_async: Arc::new(RwLock::new(Vec::new())),
            completions: MemCache::new(COMPLETION_RECORDS_SIZE),
            runtime,
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    pub(crate) fn event_queue(&self) -> Arc<BroadcastQueue<Event<Message>>> {
        self.event_queue.clone()
    }

    pub(crate) fn log_queue(&self) -> Arc<BroadcastQueue<Event<Log>>> {
        self.log_queue.clone()
    }

    /// Record a completion for late subscribers; called before the matching
    /// event is broadcast.
    pub(crate) fn record_completion(
        &self,
        nid: NodeId,
        completion: CompletionEvent,
    ) {
        self.completions.set(nid, completion);
    }

    /// The recorded completion of a node, if it has one.
    pub fn completion(
        &self,
        nid: &NodeId,
    ) -> Option<CompletionEvent> {
        self.completions.get(nid)
    }

    pub(crate) fn listen(&self) {
        let mut event_queue = self.event_queue.subscribe();
        let mut log_queue = self.log_queue.subscribe();
        let events = self.events.clone();
        let logs = self.logs.clone();
        let events_async = self.events_async.clone();

        let shutdown = self.shutdown.clone();
        self.runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    Ok(e) = event_queue.recv() => {
                        let evt = e.clone();
                        dispatch_event!(events, &evt);
                        dispatch_event_async!(events_async, &e);
                    }
                    Ok(log) = log_queue.recv() => {
                        dispatch_event!(logs, &log);
                    }
                }
            }
        });
    }

    pub(crate) fn shutdown(&self) {
        self.shutdown.shutdown();
    }
}

#[derive(Clone)]
pub struct ChannelEvent {
    channel: Arc<Channel>,

    glob: globset::GlobMatcher,
}

#[allow(unused)]
impl ChannelEvent {
    pub fn channel(
        channel: Arc<Channel>,
        options: ChannelOptions,
    ) -> Self {
        Self {
            channel,
            glob: globset::Glob::new(&options.nid).unwrap().compile_matcher(),
        }
    }

    /// Subscribe to node completions.
    ///
    /// Already-recorded completions of matching nodes are replayed to the
    /// listener immediately; a completion landing between registration and
    /// replay may be delivered twice.
    pub fn on_completion(
        &self,
        f: impl Fn(NodeId, CompletionEvent) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();
        let f = Arc::new(f);

        let handler = f.clone();
        self.channel.events.write().unwrap().push(Arc::new(move |e| {
            if let crate::events::NodeEvent::Completed(completion) = &e.event {
                if glob.is_match(&e.nid) {
                    handler(e.nid.clone(), completion.clone());
                }
            }
        }));

        for (nid, completion) in self.channel.completions.iter() {
            if self.glob.is_match(nid.as_str()) {
                f(nid.as_ref().clone(), completion);
            }
        }
    }

    /// Subscribe to node failures.
    pub fn on_failure(
        &self,
        f: impl Fn(&Event<Message>) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.events.write().unwrap().push(Arc::new(move |e| {
            if e.is_failure() && glob.is_match(&e.nid) {
                f(e);
            }
        }));
    }

    /// Subscribe to every node event.
    pub fn on_event(
        &self,
        f: impl Fn(&Event<Message>) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.events.write().unwrap().push(Arc::new(move |e| {
            if glob.is_match(&e.nid) {
                f(e);
            }
        }));
    }

    /// Subscribe to execution logs.
    pub fn on_log(
        &self,
        f: impl Fn(&Event<Log>) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.logs.write().unwrap().push(Arc::new(move |e| {
            if glob.is_match(&e.nid) {
                f(e);
            }
        }));
    }

    pub fn on_event_async<F>(
        &self,
        f: F,
    ) where
        F: Fn(&Event<Message>) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let glob = self.glob.clone();

        self.channel.events_async.write().unwrap().push(Arc::new(move |e| {
            if glob.is_match(&e.nid) {
                f(e)
            } else {
                Box::pin(async {})
            }
        }));
    }
}
