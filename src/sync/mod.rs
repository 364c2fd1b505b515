//! Refresh cycle orchestration.
//!
//! One cycle is Fetch → Normalize → Store-replace. At most one cycle runs at a
//! time; callers arriving while it runs wait for its outcome instead of
//! starting their own.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

use crate::app::SyncError;
use crate::domain::{RefreshReport, SyncEvent, SyncState};
use crate::fetcher::Fetcher;
use crate::normalizer::Normalizer;
use crate::store::Store;

pub const EVENT_CAPACITY: usize = 64;

pub type RefreshOutcome = std::result::Result<RefreshReport, SyncError>;

type OutcomeReceiver = watch::Receiver<Option<RefreshOutcome>>;

pub struct SyncCoordinator<S: Store + Send + Sync + 'static> {
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    feed_url: String,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    normalizer: Normalizer,
    store: Arc<S>,
    in_flight: Mutex<Option<OutcomeReceiver>>,
    events: broadcast::Sender<SyncEvent>,
}

impl<S: Store + Send + Sync + 'static> Clone for SyncCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Store + Send + Sync + 'static> SyncCoordinator<S> {
    pub fn new(
        feed_url: impl Into<String>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        normalizer: Normalizer,
        store: Arc<S>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                feed_url: feed_url.into(),
                fetcher,
                normalizer,
                store,
                in_flight: Mutex::new(None),
                events,
            }),
        }
    }

    pub fn feed_url(&self) -> &str {
        &self.inner.feed_url
    }

    /// Lifecycle events: `Refreshing`, then `Succeeded` or `Failed`.
    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<SyncEvent> {
        self.inner.events.clone()
    }

    pub fn state(&self) -> SyncState {
        if self.inner.lock_in_flight().is_some() {
            SyncState::Refreshing
        } else {
            SyncState::Idle
        }
    }

    /// Start a refresh, or join the one already running, and wait for its
    /// outcome.
    ///
    /// The cycle runs on its own task: dropping this future does not cancel
    /// it.
    pub async fn request_refresh(&self) -> RefreshOutcome {
        let mut outcome = self.begin_or_join();

        let published = outcome
            .wait_for(Option::is_some)
            .await
            .map(|value| (*value).clone());

        match published {
            Ok(Some(outcome)) => outcome,
            Ok(None) => Err(SyncError::Interrupted("no outcome published".into())),
            Err(_) => Err(SyncError::Interrupted(
                "refresh task ended without an outcome".into(),
            )),
        }
    }

    fn begin_or_join(&self) -> OutcomeReceiver {
        let mut in_flight = self.inner.lock_in_flight();
        if let Some(outcome) = in_flight.as_ref() {
            debug!("Refresh already in flight, joining it");
            return outcome.clone();
        }

        let (tx, rx) = watch::channel(None);
        *in_flight = Some(rx.clone());
        drop(in_flight);

        let _ = self.inner.events.send(SyncEvent::Refreshing);

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let cycle = inner.clone();
            // A panicking cycle must still clear the slot and publish
            let outcome = match tokio::spawn(async move { cycle.run_cycle().await }).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Refresh cycle task failed: {}", e);
                    Err(SyncError::Interrupted(format!("refresh cycle failed: {}", e)))
                }
            };
            inner.finish(tx, outcome);
        });

        rx
    }
}

impl<S: Store + Send + Sync + 'static> Inner<S> {
    fn lock_in_flight(&self) -> MutexGuard<'_, Option<OutcomeReceiver>> {
        // The slot holds no invariant a panicking holder could break
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_cycle(&self) -> RefreshOutcome {
        info!("Refreshing feed {}", self.feed_url);

        let body = self.fetcher.fetch(&self.feed_url).await?;

        let normalizer = self.normalizer.clone();
        let normalized = tokio::task::spawn_blocking(move || normalizer.normalize(&body))
            .await
            .map_err(|e| {
                error!("Parse worker failed: {}", e);
                SyncError::Interrupted(format!("parse worker failed: {}", e))
            })??;

        if normalized.skipped > 0 {
            info!(
                "Skipped {} feed entries with a missing or duplicate id",
                normalized.skipped
            );
        }

        let store = self.store.clone();
        let records = normalized.records;
        let stored = records.len();
        let snapshot = tokio::task::spawn_blocking(move || store.replace_all(&records))
            .await
            .map_err(|e| {
                error!("Store worker failed: {}", e);
                SyncError::Interrupted(format!("store worker failed: {}", e))
            })??;

        Ok(RefreshReport {
            stored,
            skipped: normalized.skipped,
            snapshot,
        })
    }

    fn finish(&self, tx: watch::Sender<Option<RefreshOutcome>>, outcome: RefreshOutcome) {
        let event = match &outcome {
            Ok(report) => {
                info!(
                    "Refresh succeeded: {} articles stored, {} skipped (digest {})",
                    report.stored,
                    report.skipped,
                    report.snapshot.short_digest()
                );
                SyncEvent::Succeeded(report.clone())
            }
            Err(e) => {
                warn!("Refresh failed ({}): {}", e.cause(), e);
                SyncEvent::Failed(e.clone())
            }
        };

        {
            let mut in_flight = self.lock_in_flight();
            *in_flight = None;
            let _ = self.events.send(event);
        }

        if tx.send(Some(outcome)).is_err() {
            // Every caller went away; the cycle still counted
            debug!("Refresh finished with no waiting callers");
        }
    }
}
