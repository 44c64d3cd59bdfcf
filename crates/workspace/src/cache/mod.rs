//! Predictive attachment cache.
//!
//! The render path reads the cache through [`PredictiveCache::poll`], a plain
//! map lookup that never waits. Warming passes run as tasks on the tokio
//! runtime and hand finished entries back over a channel; [`PredictiveCache::pump`]
//! moves them into the map at a point of the owner's choosing, so the map has
//! exactly one writer and every entry appears whole.
//!
//! At most one warming pass runs at a time. A trigger that arrives while a
//! pass is in flight is remembered and replayed by the session on its next
//! frame with a fresh snapshot.

mod compute;
mod predict;
mod sync;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use shared::{AttachmentData, ReferenceSet, RegisterChainRequest, RegisterChainResponse, Result};

use crate::catalog::Catalog;
use crate::settings::CacheSettings;
use crate::state::WorkspaceSnapshot;

pub use predict::predict_candidates;

/// Events handled per [`PredictiveCache::pump`] call
pub const DRAIN_LIMIT: usize = 256;

/// Messages from background tasks to the cache owner
#[derive(Debug)]
pub enum CacheEvent {
    Published(Arc<AttachmentData>),
    Registered {
        symbol: String,
        result: Result<RegisterChainResponse>,
    },
}

/// Diagnostic counters, read-only for callers
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries published by warming passes
    pub warmed: u64,
    pub entries: usize,
    pub warm_passes: u64,
    /// Triggers coalesced because a pass was already running
    pub skipped_warms: u64,
    pub evictions: u64,
    pub registered: u64,
    pub registration_failures: u64,
}

impl CacheStats {
    /// `hits / (hits + misses)`, zero before the first poll
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Outcome of one warming pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmReport {
    pub candidates: usize,
    pub published: usize,
    pub reference_hits: usize,
    pub fallbacks: usize,
    pub failed: usize,
}

/// Clears the single-flight flag when the pass ends, however it ends
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct PredictiveCache<C: Catalog> {
    entries: HashMap<String, Arc<AttachmentData>>,
    /// Insertion order for eviction
    order: VecDeque<String>,
    settings: CacheSettings,
    timeout: Duration,
    reference: Arc<ReferenceSet>,
    catalog: Arc<C>,
    runtime: Handle,
    events_tx: UnboundedSender<CacheEvent>,
    events_rx: UnboundedReceiver<CacheEvent>,
    in_flight: Arc<AtomicBool>,
    pending: bool,
    /// Chains handed to the catalog and not known to have failed, bounded
    /// like the entries
    registered: HashSet<String>,
    registered_order: VecDeque<String>,
    source: String,
    stats: CacheStats,
}

impl<C: Catalog> std::fmt::Debug for PredictiveCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictiveCache")
            .field("entries", &self.entries.len())
            .field("in_flight", &self.is_in_flight())
            .field("pending", &self.pending)
            .field("stats", &self.stats)
            .finish()
    }
}

impl<C: Catalog> PredictiveCache<C> {
    pub fn new(
        catalog: C,
        reference: ReferenceSet,
        settings: CacheSettings,
        timeout: Duration,
        runtime: Handle,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            settings,
            timeout,
            reference: Arc::new(reference),
            catalog: Arc::new(catalog),
            runtime,
            events_tx,
            events_rx,
            in_flight: Arc::new(AtomicBool::new(false)),
            pending: false,
            registered: HashSet::new(),
            registered_order: VecDeque::new(),
            source: "workspace".to_string(),
            stats: CacheStats::default(),
        }
    }

    /// Tag sent with chain registrations
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn reference(&self) -> &ReferenceSet {
        &self.reference
    }

    /// Cached data for `symbol`, counting a hit or a miss. Never waits.
    pub fn poll(&mut self, symbol: &str) -> Option<Arc<AttachmentData>> {
        match self.entries.get(symbol) {
            Some(entry) => {
                self.stats.hits += 1;
                Some(Arc::clone(entry))
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Lookup without touching the statistics
    pub fn peek(&self, symbol: &str) -> Option<&Arc<AttachmentData>> {
        self.entries.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// A warm trigger was skipped and should be replayed
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            ..self.stats
        }
    }

    /// Apply up to [`DRAIN_LIMIT`] queued events; returns how many were handled
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while handled < DRAIN_LIMIT {
            let Ok(event) = self.events_rx.try_recv() else {
                break;
            };
            handled += 1;
            match event {
                CacheEvent::Published(entry) => self.publish(entry),
                CacheEvent::Registered { symbol, result } => match result {
                    Ok(response) => {
                        self.stats.registered += 1;
                        tracing::debug!(%symbol, id = %response.id, created = response.created, "chain registered");
                    }
                    Err(e) => {
                        self.stats.registration_failures += 1;
                        if self.registered.remove(&symbol) {
                            self.registered_order.retain(|s| *s != symbol);
                        }
                        tracing::warn!(%symbol, "chain registration failed: {e}");
                    }
                },
            }
        }
        handled
    }

    fn publish(&mut self, entry: Arc<AttachmentData>) {
        let symbol = entry.symbol.clone();
        if self.entries.insert(symbol.clone(), entry).is_none() {
            self.order.push_back(symbol);
        }
        self.stats.warmed += 1;

        let capacity = self.settings.capacity.max(1);
        while self.entries.len() > capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            self.stats.evictions += 1;
            tracing::trace!(symbol = %oldest, "evicted");
        }
    }

    /// Settled entries are never recomputed; fallback entries are while the
    /// catalog may still answer
    fn is_settled(&self, symbol: &str, online: bool) -> bool {
        self.entries
            .get(symbol)
            .is_some_and(|entry| !(online && entry.fold_source.is_refreshable()))
    }

    /// Start a warming pass for `snapshot` unless one is already running.
    ///
    /// Also hands newly formed chains to the catalog. Returns the pass's task
    /// handle, or `None` when nothing was started.
    pub fn warm(&mut self, snapshot: &WorkspaceSnapshot) -> Option<JoinHandle<WarmReport>> {
        self.pump();
        self.pass_back(snapshot);

        if self.is_in_flight() {
            self.pending = true;
            self.stats.skipped_warms += 1;
            tracing::trace!(version = snapshot.version, "warm skipped, pass in flight");
            return None;
        }
        self.pending = false;

        let online = self.catalog.is_online();
        let candidates = predict_candidates(
            snapshot,
            &self.reference,
            self.settings.max_candidates,
            |symbol| self.is_settled(symbol, online),
        );
        if candidates.is_empty() {
            tracing::trace!(version = snapshot.version, "nothing to warm");
            return None;
        }

        self.in_flight.store(true, Ordering::Release);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        self.stats.warm_passes += 1;
        tracing::debug!(
            candidates = candidates.len(),
            version = snapshot.version,
            "warming pass started"
        );

        let reference = Arc::clone(&self.reference);
        let catalog = Arc::clone(&self.catalog);
        let events = self.events_tx.clone();
        let timeout = self.timeout;
        Some(self.runtime.spawn(async move {
            let _guard = guard;
            compute::run_pass(candidates, &reference, catalog.as_ref(), timeout, &events).await
        }))
    }

    fn pass_back(&mut self, snapshot: &WorkspaceSnapshot) {
        if !self.catalog.is_online() {
            return;
        }
        for chain in snapshot.chains.iter().filter(|c| c.len() >= 2) {
            if !self.registered.insert(chain.symbol.clone()) {
                continue;
            }
            self.registered_order.push_back(chain.symbol.clone());
            while self.registered.len() > self.settings.capacity.max(1) {
                let Some(oldest) = self.registered_order.pop_front() else {
                    break;
                };
                self.registered.remove(&oldest);
            }
            let request =
                RegisterChainRequest::new(chain.symbol.clone(), chain.sides.clone(), self.source.clone());
            tracing::debug!(symbol = %chain.symbol, "registering chain");
            sync::spawn_registration(
                &self.runtime,
                Arc::clone(&self.catalog),
                request,
                self.events_tx.clone(),
            );
        }
    }
}
