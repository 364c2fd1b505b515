//! Live view of the cached article list for the display layer.
//!
//! Each subscription owns a delivery task. The task re-queries the store
//! after every change notification and hands the result to the callback,
//! one delivery at a time and in notification order.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::app::StoreError;
use crate::domain::{ArticleList, ArticleRecord, SyncEvent};
use crate::store::Store;
use crate::sync::SyncCoordinator;

thread_local! {
    /// Gate whose callback is running on this thread, if any.
    static DELIVERING: Cell<usize> = const { Cell::new(0) };
}

pub struct QueryBridge<S: Store + Send + Sync + 'static> {
    store: Arc<S>,
    events: broadcast::Sender<SyncEvent>,
}

impl<S: Store + Send + Sync + 'static> Clone for QueryBridge<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            events: self.events.clone(),
        }
    }
}

impl<S: Store + Send + Sync + 'static> QueryBridge<S> {
    pub fn new(store: Arc<S>, coordinator: &SyncCoordinator<S>) -> Self {
        Self {
            store,
            events: coordinator.event_sender(),
        }
    }

    pub fn list_all(&self) -> Result<ArticleList, StoreError> {
        self.store.query_all()
    }

    pub fn get_by_id(&self, server_id: &str) -> Result<Option<ArticleRecord>, StoreError> {
        self.store.query_by_id(server_id)
    }

    /// Deliver the current list now, then again after every store change.
    ///
    /// Changes that land while a delivery is running are coalesced into a
    /// single delivery of the latest snapshot. Must be called from within a
    /// tokio runtime.
    pub fn subscribe<F>(&self, mut callback: F) -> Subscription
    where
        F: FnMut(ArticleList) + Send + 'static,
    {
        let gate = Arc::new(DeliveryGate::new());
        let store = self.store.clone();
        // Subscribe before the first query so no change can slip between them
        let mut changes = store.changes();
        changes.borrow_and_update();

        let task_gate = gate.clone();
        let task = tokio::spawn(async move {
            loop {
                if let Some(list) = query_off_thread(store.clone()).await {
                    if !task_gate.deliver(|| callback(list)) {
                        break;
                    }
                }

                if changes.changed().await.is_err() {
                    debug!("Store dropped, ending list subscription");
                    break;
                }
            }
        });

        Subscription::new(gate, task)
    }

    /// Deliver refresh lifecycle events, for a refresh indicator.
    ///
    /// Must be called from within a tokio runtime.
    pub fn watch_refresh<F>(&self, mut callback: F) -> Subscription
    where
        F: FnMut(&SyncEvent) + Send + 'static,
    {
        let gate = Arc::new(DeliveryGate::new());
        let mut events = self.events.subscribe();

        let task_gate = gate.clone();
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if !task_gate.deliver(|| callback(&event)) {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Refresh watcher lagged, {} events dropped", missed);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Subscription::new(gate, task)
    }
}

async fn query_off_thread<S: Store + Send + Sync + 'static>(store: Arc<S>) -> Option<ArticleList> {
    match tokio::task::spawn_blocking(move || store.query_all()).await {
        Ok(Ok(list)) => Some(list),
        Ok(Err(e)) => {
            warn!("Re-query after store change failed: {}", e);
            None
        }
        Err(e) => {
            error!("Re-query task failed: {}", e);
            None
        }
    }
}

struct DeliveryGate {
    active: AtomicBool,
    delivering: Mutex<()>,
}

impl DeliveryGate {
    fn new() -> Self {
        Self {
            active: AtomicBool::new(true),
            delivering: Mutex::new(()),
        }
    }

    fn key(&self) -> usize {
        self as *const Self as usize
    }

    /// Run `f` unless the subscription was cancelled. Returns whether the
    /// subscription is still active.
    fn deliver(&self, f: impl FnOnce()) -> bool {
        let _guard = self
            .delivering
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !self.active.load(Ordering::SeqCst) {
            return false;
        }

        let _marker = DeliveringMarker::enter(self.key());
        f();

        self.active.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.active.store(false, Ordering::SeqCst);

        // Called from our own callback: the guard is already held by this
        // thread and the delivery loop stops once the callback returns.
        if DELIVERING.with(|d| d.get()) == self.key() {
            return;
        }

        // Wait out a callback that is running right now
        drop(
            self.delivering
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
    }
}

/// Marks the current thread as running a gate's callback until dropped.
struct DeliveringMarker {
    previous: usize,
}

impl DeliveringMarker {
    fn enter(key: usize) -> Self {
        Self {
            previous: DELIVERING.with(|d| d.replace(key)),
        }
    }
}

impl Drop for DeliveringMarker {
    fn drop(&mut self) {
        DELIVERING.with(|d| d.set(self.previous));
    }
}

/// Handle for a live subscription. Dropping it unsubscribes.
pub struct Subscription {
    gate: Arc<DeliveryGate>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    fn new(gate: Arc<DeliveryGate>, task: JoinHandle<()>) -> Self {
        Self {
            gate,
            task: Some(task),
        }
    }

    /// Once this returns the callback is never invoked again.
    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    pub fn is_active(&self) -> bool {
        self.gate.active.load(Ordering::SeqCst)
    }

    fn cancel(&mut self) {
        self.gate.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
