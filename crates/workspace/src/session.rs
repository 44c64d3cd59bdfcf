//! One editing session: a workspace, its predictive cache and frame counter.
//!
//! The cache is owned by the session and reached through it; nothing else in
//! the process holds it.

use std::path::Path;

use glam::DVec3;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use uuid::Uuid;

use shared::{symbol, AttachmentData, FoldSource, PolygonId, ReferenceSet, Result};

use crate::attach::{AttachmentResolver, Candidate};
use crate::cache::{CacheStats, PredictiveCache, WarmReport};
use crate::catalog::Catalog;
use crate::render::{self, RenderFrame};
use crate::settings::AppSettings;
use crate::state::{AttachReport, Placement, Polygon, WorkspaceSnapshot, WorkspaceState};

/// Reference set from `path`, or the built-in one when absent or unreadable
pub fn load_reference(path: Option<&Path>) -> ReferenceSet {
    let Some(path) = path else {
        return ReferenceSet::builtin();
    };
    match std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|json| ReferenceSet::from_json(&json))
    {
        Ok(set) => {
            tracing::info!(path = %path.display(), entries = set.len(), "reference set loaded");
            set
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "using built-in reference set: {e}");
            ReferenceSet::builtin()
        }
    }
}

pub struct Session<C: Catalog> {
    id: Uuid,
    workspace: WorkspaceState,
    cache: PredictiveCache<C>,
    /// Chain version the last warm was triggered for
    warmed_chain_version: Option<u64>,
    last_warm: Option<JoinHandle<WarmReport>>,
    frame_index: u64,
}

impl<C: Catalog> Session<C> {
    pub fn new(catalog: C, settings: &AppSettings, runtime: Handle) -> Self {
        let reference = load_reference(settings.reference_path.as_deref());
        let workspace = WorkspaceState::new(AttachmentResolver::new(settings.snap.threshold));
        Self::with_workspace(catalog, reference, workspace, settings, runtime)
    }

    pub fn with_workspace(
        catalog: C,
        reference: ReferenceSet,
        workspace: WorkspaceState,
        settings: &AppSettings,
        runtime: Handle,
    ) -> Self {
        let id = Uuid::new_v4();
        let cache = PredictiveCache::new(
            catalog,
            reference,
            settings.cache.clone(),
            settings.catalog.timeout(),
            runtime,
        )
        .with_source(format!("workspace:{id}"));
        tracing::info!(%id, "session started");
        Self {
            id,
            workspace,
            cache,
            warmed_chain_version: None,
            last_warm: None,
            frame_index: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn workspace(&self) -> &WorkspaceState {
        &self.workspace
    }

    pub fn workspace_mut(&mut self) -> &mut WorkspaceState {
        &mut self.workspace
    }

    pub fn cache(&self) -> &PredictiveCache<C> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut PredictiveCache<C> {
        &mut self.cache
    }

    pub fn snapshot(&self) -> WorkspaceSnapshot {
        self.workspace.snapshot()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn poll(&mut self, symbol: &str) -> Option<std::sync::Arc<AttachmentData>> {
        self.cache.poll(symbol)
    }

    pub fn add_polygon(&mut self, sides: u32, placement: Placement) -> Result<PolygonId> {
        self.workspace.add_polygon(sides, placement)
    }

    /// Attach two edges. Without an explicit fold, a non-fallback cache entry
    /// for the pair supplies it; otherwise the workspace's reference fold does.
    pub fn attach(
        &mut self,
        a: PolygonId,
        edge_a: usize,
        b: PolygonId,
        edge_b: usize,
        fold_angle: Option<f64>,
    ) -> Result<AttachReport> {
        let fold_angle = fold_angle.or_else(|| self.cached_fold(a, b));
        let report = self.workspace.attach(a, edge_a, b, edge_b, fold_angle)?;
        self.warm_if_changed();
        Ok(report)
    }

    fn cached_fold(&self, a: PolygonId, b: PolygonId) -> Option<f64> {
        let (sa, sb) = (self.workspace.polygon(a)?.sides, self.workspace.polygon(b)?.sides);
        let entry = self.cache.peek(&symbol::pair_symbol(sa, sb).ok()?)?;
        if entry.fold_source == FoldSource::Fallback {
            return None;
        }
        entry.fold_angles.first().copied()
    }

    pub fn move_polygon(&mut self, id: PolygonId, delta: DVec3) -> Result<Vec<PolygonId>> {
        self.workspace.move_polygon(id, delta)
    }

    pub fn remove_polygon(&mut self, id: PolygonId) -> Result<Polygon> {
        let removed = self.workspace.remove_polygon(id)?;
        self.warm_if_changed();
        Ok(removed)
    }

    pub fn candidates(&self, point: DVec3, exclude: Option<PolygonId>) -> Vec<Candidate> {
        self.workspace.find_candidates(point, exclude)
    }

    fn warm_if_changed(&mut self) {
        if self.warmed_chain_version != Some(self.workspace.chain_version()) {
            self.warm();
        }
    }

    /// Trigger a warming pass for the current workspace. Returns whether a
    /// pass was started; a skipped trigger is replayed by [`Session::frame`].
    pub fn warm(&mut self) -> bool {
        let snapshot = self.workspace.snapshot();
        self.warmed_chain_version = Some(snapshot.chain_version);
        match self.cache.warm(&snapshot) {
            Some(handle) => {
                self.last_warm = Some(handle);
                true
            }
            None => false,
        }
    }

    /// Handle of the most recently started pass, if not taken yet
    pub fn take_warm_handle(&mut self) -> Option<JoinHandle<WarmReport>> {
        self.last_warm.take()
    }

    /// Produce the next frame without waiting on any background work
    pub fn frame(&mut self) -> RenderFrame {
        self.cache.pump();
        if self.cache.is_pending() && !self.cache.is_in_flight() {
            self.warm();
        } else {
            // also catches chain edits made through `workspace_mut`
            self.warm_if_changed();
        }
        self.frame_index += 1;
        render::build_frame(self.frame_index, &self.workspace, &mut self.cache)
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }
}
