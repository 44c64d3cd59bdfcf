//! Factory functions and stand-in catalogs for tests and demos.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use glam::DVec3;

use shared::{
    PolyformError, PolygonId, PrimitiveGeometry, RegisterChainRequest, RegisterChainResponse,
    Result,
};

use crate::catalog::Catalog;
use crate::state::{Placement, WorkspaceState};

// ── Workspace factories ─────────────────────────────────────────

/// `count` triangles joined edge 1 → edge 0 in a strip, folded by `fold`.
pub fn triangle_fan(ws: &mut WorkspaceState, count: usize, fold: f64) -> Result<Vec<PolygonId>> {
    strip(ws, 3, count, 1, 0, fold)
}

/// `count` squares joined right edge → left edge, lying flat.
pub fn square_strip(ws: &mut WorkspaceState, count: usize) -> Result<Vec<PolygonId>> {
    strip(ws, 4, count, 1, 3, 0.0)
}

fn strip(
    ws: &mut WorkspaceState,
    sides: u32,
    count: usize,
    out_edge: usize,
    in_edge: usize,
    fold: f64,
) -> Result<Vec<PolygonId>> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let placement = Placement::at(DVec3::new(3.0 * i as f64, 0.0, 0.0));
        let id = ws.add_polygon(sides, placement)?;
        if let Some(&prev) = ids.last() {
            ws.attach(prev, out_edge, id, in_edge, Some(fold))?;
        }
        ids.push(id);
    }
    Ok(ids)
}

/// Edge list of an arbitrary attachment graph over `n` triangles, built with
/// a deterministic generator. Each `(a, ea, b, eb)` uses distinct free edges.
pub fn random_links(n: usize, attempts: usize, seed: u64) -> Vec<(PolygonId, usize, PolygonId, usize)> {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 33) as usize
    };
    let mut free: Vec<Vec<bool>> = vec![vec![true; 3]; n];
    let mut links = Vec::new();
    for _ in 0..attempts {
        let (a, b) = (next() % n, next() % n);
        let (ea, eb) = (next() % 3, next() % 3);
        if a == b || !free[a][ea] || !free[b][eb] {
            continue;
        }
        free[a][ea] = false;
        free[b][eb] = false;
        links.push((a as PolygonId, ea, b as PolygonId, eb));
    }
    links
}

// ── Catalog stand-ins ───────────────────────────────────────────

/// In-memory catalog answering instantly and recording registrations
#[derive(Debug, Default)]
pub struct StaticCatalog {
    registrations: Mutex<Vec<RegisterChainRequest>>,
    broken_rings: bool,
}

impl StaticCatalog {
    /// Deterministic, obviously non-local fold for a pair
    pub fn fold_for(a: u32, b: u32) -> f64 {
        PI / (a + b) as f64
    }

    /// Serve rings whose edges are not unit length
    pub fn with_broken_rings(mut self) -> Self {
        self.broken_rings = true;
        self
    }

    pub fn registrations(&self) -> Vec<RegisterChainRequest> {
        self.registrations
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Catalog for StaticCatalog {
    fn fold_angle(&self, a: u32, b: u32) -> impl Future<Output = Result<f64>> + Send {
        std::future::ready(Ok(Self::fold_for(a, b)))
    }

    fn primitive_geometry(
        &self,
        sides: u32,
    ) -> impl Future<Output = Result<PrimitiveGeometry>> + Send {
        let geometry = PrimitiveGeometry::from_kernel(sides).map(|mut g| {
            if self.broken_rings {
                for v in &mut g.vertices {
                    v[0] *= 2.0;
                    v[1] *= 2.0;
                }
            }
            g
        });
        std::future::ready(geometry)
    }

    fn register_chain(
        &self,
        request: RegisterChainRequest,
    ) -> impl Future<Output = Result<RegisterChainResponse>> + Send {
        let result = match self.registrations.lock() {
            Ok(mut seen) => {
                let created = !seen.iter().any(|r| r.symbol == request.symbol);
                let response = RegisterChainResponse {
                    id: format!("chain-{}", seen.len()),
                    symbol: request.symbol.clone(),
                    created,
                };
                seen.push(request);
                Ok(response)
            }
            Err(_) => Err(PolyformError::CollaboratorUnavailable("poisoned".to_string())),
        };
        std::future::ready(result)
    }
}

/// Catalog that answers only after `delay`
#[derive(Debug)]
pub struct SlowCatalog {
    delay: Duration,
    inner: StaticCatalog,
}

impl SlowCatalog {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: StaticCatalog::default(),
        }
    }
}

impl Catalog for SlowCatalog {
    async fn fold_angle(&self, a: u32, b: u32) -> Result<f64> {
        tokio::time::sleep(self.delay).await;
        self.inner.fold_angle(a, b).await
    }

    async fn primitive_geometry(&self, sides: u32) -> Result<PrimitiveGeometry> {
        tokio::time::sleep(self.delay).await;
        self.inner.primitive_geometry(sides).await
    }

    async fn register_chain(&self, request: RegisterChainRequest) -> Result<RegisterChainResponse> {
        tokio::time::sleep(self.delay).await;
        self.inner.register_chain(request).await
    }
}

/// Online catalog whose every call fails
#[derive(Debug, Default)]
pub struct FailingCatalog;

impl Catalog for FailingCatalog {
    fn fold_angle(&self, _a: u32, _b: u32) -> impl Future<Output = Result<f64>> + Send {
        std::future::ready(Err(PolyformError::CollaboratorUnavailable("refused".to_string())))
    }

    fn primitive_geometry(
        &self,
        _sides: u32,
    ) -> impl Future<Output = Result<PrimitiveGeometry>> + Send {
        std::future::ready(Err(PolyformError::CollaboratorUnavailable("refused".to_string())))
    }

    fn register_chain(
        &self,
        _request: RegisterChainRequest,
    ) -> impl Future<Output = Result<RegisterChainResponse>> + Send {
        std::future::ready(Err(PolyformError::CollaboratorUnavailable("refused".to_string())))
    }
}

/// Registration counts per symbol, for assertions
pub fn registration_counts(catalog: &StaticCatalog) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for request in catalog.registrations() {
        *counts.entry(request.symbol).or_insert(0) += 1;
    }
    counts
}
