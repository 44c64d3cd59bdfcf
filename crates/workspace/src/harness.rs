//! Headless test harness driving a session without a renderer.
//!
//! The harness owns its tokio runtime, so tests stay synchronous and decide
//! themselves when background work is waited for.

use std::time::{Duration, Instant};

use glam::DVec3;
use tokio::runtime::Runtime;

use shared::{PolygonId, Result};

use crate::cache::{CacheStats, WarmReport};
use crate::catalog::{Catalog, OfflineCatalog};
use crate::render::RenderFrame;
use crate::session::Session;
use crate::settings::AppSettings;
use crate::state::{AttachReport, Placement};
use crate::validation::WorkspaceValidator;

/// Headless test harness: a session plus the runtime its tasks run on
pub struct TestHarness<C: Catalog = OfflineCatalog> {
    pub session: Session<C>,
    // dropped after the session
    runtime: Runtime,
}

impl TestHarness<OfflineCatalog> {
    /// Create a new harness with no catalog.
    pub fn new() -> Self {
        Self::with_catalog(OfflineCatalog)
    }
}

impl Default for TestHarness<OfflineCatalog> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Catalog> TestHarness<C> {
    pub fn with_catalog(catalog: C) -> Self {
        Self::with_settings(catalog, AppSettings::default())
    }

    pub fn with_settings(catalog: C, settings: AppSettings) -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("tokio runtime");
        let session = Session::new(catalog, &settings, runtime.handle().clone());
        Self { session, runtime }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    // ── Workspace manipulation ────────────────────────────────

    /// Add a polygon at the origin
    pub fn add(&mut self, sides: u32) -> PolygonId {
        self.add_at(sides, DVec3::ZERO)
    }

    pub fn add_at(&mut self, sides: u32, position: DVec3) -> PolygonId {
        self.session
            .add_polygon(sides, Placement::at(position))
            .expect("valid side count")
    }

    pub fn attach(
        &mut self,
        a: PolygonId,
        edge_a: usize,
        b: PolygonId,
        edge_b: usize,
        fold_angle: Option<f64>,
    ) -> Result<AttachReport> {
        self.session.attach(a, edge_a, b, edge_b, fold_angle)
    }

    pub fn move_by(&mut self, id: PolygonId, delta: DVec3) -> Result<Vec<PolygonId>> {
        self.session.move_polygon(id, delta)
    }

    // ── Background work ───────────────────────────────────────

    /// Block until the latest warming pass has finished and its entries are
    /// in the cache. Returns `None` when no pass was running.
    pub fn wait_for_warm(&mut self) -> Option<WarmReport> {
        let handle = self.session.take_warm_handle()?;
        let report = self.runtime.block_on(handle).ok();
        self.session.cache_mut().pump();
        report
    }

    /// Trigger a pass for the current workspace and wait for it
    pub fn warm_and_wait(&mut self) -> Option<WarmReport> {
        if !self.session.warm() {
            self.session.cache_mut().pump();
            return None;
        }
        self.wait_for_warm()
    }

    /// Pump the cache until `condition` holds or `timeout` passes
    pub fn wait_until(
        &mut self,
        timeout: Duration,
        mut condition: impl FnMut(&Session<C>) -> bool,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.session.cache_mut().pump();
            if condition(&self.session) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    pub fn frame(&mut self) -> RenderFrame {
        self.session.frame()
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn stats(&self) -> CacheStats {
        self.session.stats()
    }

    pub fn symbol_of(&self, id: PolygonId) -> Option<String> {
        self.session
            .workspace()
            .chain_of(id)
            .map(|c| c.symbol.clone())
    }

    /// Structural problems of the workspace; empty when valid
    pub fn validate(&self) -> Vec<String> {
        WorkspaceValidator::new(self.session.workspace()).validate_all()
    }
}
