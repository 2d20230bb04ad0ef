//! Hierarchy refresh
//!
//! Refresh is non-reentrant: a request made while a fetch is outstanding is dropped,
//! not queued, so snapshots are always applied in the order they were taken.

use super::backend::DeviceBackend;
use crate::error::Result;
use crate::hierarchy::{flatten, Element, UiNode};
use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// One fetched hierarchy, flattened once
#[derive(Debug, Clone)]
pub struct HierarchySnapshot {
    pub root: UiNode,
    pub elements: Vec<Element>,
    pub fetched_at: DateTime<Local>,
}

impl HierarchySnapshot {
    pub fn new(root: UiNode) -> Self {
        let elements = flatten(&root);
        Self {
            root,
            elements,
            fetched_at: Local::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum RefreshResult {
    Applied(Arc<HierarchySnapshot>),
    /// Another fetch was outstanding
    Skipped,
}

pub struct HierarchyRefresher {
    backend: Arc<dyn DeviceBackend>,
    in_flight: AtomicBool,
    latest: watch::Sender<Option<Arc<HierarchySnapshot>>>,
}

/// Clears the in-flight flag however the fetch ends
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl HierarchyRefresher {
    pub fn new(backend: Arc<dyn DeviceBackend>) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            backend,
            in_flight: AtomicBool::new(false),
            latest,
        }
    }

    /// Latest applied snapshot; `None` until the first fetch succeeds
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<HierarchySnapshot>>> {
        self.latest.subscribe()
    }

    pub fn latest(&self) -> Option<Arc<HierarchySnapshot>> {
        self.latest.borrow().clone()
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn refresh(&self) -> Result<RefreshResult> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("Hierarchy fetch already in flight, skipping refresh");
            return Ok(RefreshResult::Skipped);
        }
        let _guard = InFlight(&self.in_flight);

        let root = self.backend.fetch_hierarchy().await?;
        let snapshot = Arc::new(HierarchySnapshot::new(root));
        log::debug!("Applied hierarchy with {} elements", snapshot.elements.len());
        self.latest.send_replace(Some(Arc::clone(&snapshot)));

        Ok(RefreshResult::Applied(snapshot))
    }

    /// Refresh every `period` until the handle is aborted. Failed fetches are logged
    /// and retried on the next tick.
    pub fn spawn_periodic(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if this.is_fetching() {
                    continue;
                }
                if let Err(e) = this.refresh().await {
                    log::warn!("Hierarchy refresh failed: {}", e);
                }
            }
        })
    }
}
