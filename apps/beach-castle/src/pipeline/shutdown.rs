use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::Mutex;
use tracing::debug;

/// Cooperative stop signal shared by every worker.
///
/// The flag answers "should I stop" for loops that poll. The signal channel
/// is closed on trigger, so it can sit in a `select!` next to a data
/// channel and wake a blocked receive immediately.
#[derive(Clone, Debug)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    flag: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (trigger, signal) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                flag: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                signal,
            }),
        }
    }

    /// Idempotent.
    pub fn trigger(&self) {
        if !self.inner.flag.swap(true, Ordering::SeqCst) {
            debug!(target: "castle::pipeline", "shutdown triggered");
        }
        self.inner.trigger.lock().take();
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Becomes ready, with a disconnect error, once the token is triggered.
    pub fn signal(&self) -> &Receiver<()> {
        &self.inner.signal
    }

    /// Blocks until triggered or the timeout elapses; returns whether the
    /// token is triggered.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let _ = self.inner.signal.recv_timeout(timeout);
        self.is_triggered()
    }
}
