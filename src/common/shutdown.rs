//! Shutdown coordination for graceful termination.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::Notify;

/// One-shot termination token shared between tasks.
///
/// Waiters registered before and after `shutdown()` both resolve; once
/// terminated the token stays terminated.
pub struct Shutdown {
    notify: Notify,
    terminated: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            notify: Notify::new(),
            terminated: AtomicBool::new(false),
        }
    }

    /// Signal termination and wake every waiter.
    pub fn shutdown(&self) {
        self.terminated.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Whether `shutdown()` has been called.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Wait until termination is signalled.
    pub fn wait(self: &Arc<Self>) -> impl Future<Output = ()> + Send + 'static {
        let this = self.clone();
        async move {
            loop {
                if this.terminated.load(Ordering::SeqCst) {
                    return;
                }
                let notified = this.notify.notified();
                if this.terminated.load(Ordering::SeqCst) {
                    return;
                }
                notified.await;
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
