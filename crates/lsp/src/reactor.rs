//! The reactor: a single consumer serializing all handler work.
//!
//! Every request and notification handler wraps its real work into an
//! action and enqueues it here. One consumer task executes actions
//! strictly in enqueue order, one at a time, which serializes every state
//! mutation (VFS, hover index, diagnostics publication) without
//! per-structure locking discipline. A failing action is isolated; the
//! consumer itself never dies.

use std::future::Future;
use std::pin::Pin;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

/// A unit of handler work, run to completion before the next one starts.
pub type ReactorAction = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Handle for enqueueing actions. Clones share the same queue and the
/// same single consumer.
#[derive(Clone)]
pub struct Reactor {
    tx: mpsc::UnboundedSender<ReactorAction>,
}

impl Reactor {
    /// Spawn the consumer task and return the enqueue handle. Must be
    /// called within a tokio runtime.
    pub fn start() -> Reactor {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(consume(rx));
        Reactor { tx }
    }

    /// Enqueue fire-and-forget work (notification handlers).
    pub fn enqueue<F>(&self, label: &'static str, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        debug!("reactor enqueue: {}", label);
        if self.tx.send(Box::pin(action)).is_err() {
            // Only reachable after the consumer stopped, i.e. at shutdown
            error!("reactor queue closed; dropped action {}", label);
        }
    }

    /// Enqueue work that produces a reply (request handlers). Resolves to
    /// `None` if the action was dropped at shutdown.
    pub async fn request<T, F>(&self, label: &'static str, work: F) -> Option<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.enqueue(label, async move {
            let _ = reply_tx.send(work.await);
        });
        reply_rx.await.ok()
    }
}

async fn consume(mut rx: mpsc::UnboundedReceiver<ReactorAction>) {
    while let Some(action) = rx.recv().await {
        // Run each action on its own task and await it: completion order
        // stays strictly sequential, and a panicking action surfaces as a
        // JoinError here instead of killing the consumer.
        if let Err(join_err) = tokio::spawn(action).await {
            if join_err.is_panic() {
                error!("reactor action panicked: {}", join_err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[tokio::test]
    async fn test_actions_run_in_enqueue_order() {
        let reactor = Reactor::start();
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..100 {
            let log = log.clone();
            reactor.enqueue("test", async move {
                // Stagger early actions; ordering must still hold
                if i < 10 {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                }
                log.lock().unwrap().push(i);
            });
        }
        // A request naturally barriers behind everything enqueued above
        let done: Option<()> = reactor.request("barrier", async {}).await;
        assert!(done.is_some());

        let seen = log.lock().unwrap().clone();
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_a_panicking_action_does_not_kill_the_consumer() {
        let reactor = Reactor::start();
        reactor.enqueue("boom", async {
            panic!("handler bug");
        });
        let answer = reactor.request("after", async { 42 }).await;
        assert_eq!(answer, Some(42));
    }

    #[tokio::test]
    async fn test_request_returns_the_work_result() {
        let reactor = Reactor::start();
        let n = reactor.request("compute", async { 2 + 2 }).await;
        assert_eq!(n, Some(4));
    }
}
