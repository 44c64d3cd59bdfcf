//! Per-frame data handed to the renderer.
//!
//! Frames are assembled from the workspace and cache lookups only. Missing
//! attachment data is normal: the chain is drawn as a placeholder and picked
//! up again on a later frame.

use std::sync::Arc;

use shared::{geometry, symbol, AttachmentData, PolygonId};

use crate::cache::PredictiveCache;
use crate::catalog::Catalog;
use crate::state::WorkspaceState;

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonView {
    pub id: PolygonId,
    pub sides: u32,
    pub vertices: Vec<[f64; 3]>,
    /// Open flag per edge
    pub open: Vec<bool>,
    pub chain: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainView {
    pub symbol: String,
    pub members: Vec<PolygonId>,
    /// `None` until a warming pass has published the symbol
    pub data: Option<Arc<AttachmentData>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderFrame {
    pub index: u64,
    pub version: u64,
    pub polygons: Vec<PolygonView>,
    pub chains: Vec<ChainView>,
    /// Lookups that missed and were drawn as placeholders
    pub placeholders: usize,
}

impl RenderFrame {
    pub fn is_complete(&self) -> bool {
        self.placeholders == 0
    }

    pub fn chain(&self, symbol: &str) -> Option<&ChainView> {
        self.chains.iter().find(|c| c.symbol == symbol)
    }

    pub fn polygon(&self, id: PolygonId) -> Option<&PolygonView> {
        self.polygons.iter().find(|p| p.id == id)
    }
}

/// Rendering collaborator
pub trait RenderSink {
    fn submit(&mut self, frame: &RenderFrame);
}

/// Sink that only logs frame summaries
#[derive(Debug, Default)]
pub struct LogSink {
    pub frames: u64,
}

impl RenderSink for LogSink {
    fn submit(&mut self, frame: &RenderFrame) {
        self.frames += 1;
        tracing::trace!(
            index = frame.index,
            polygons = frame.polygons.len(),
            chains = frame.chains.len(),
            placeholders = frame.placeholders,
            "frame"
        );
    }
}

/// Assemble one frame, polling the cache for every chain and lone polygon
pub fn build_frame<C: Catalog>(
    index: u64,
    workspace: &WorkspaceState,
    cache: &mut PredictiveCache<C>,
) -> RenderFrame {
    let mut placeholders = 0;

    let chains: Vec<ChainView> = workspace
        .chains()
        .iter()
        .map(|chain| {
            let data = cache.poll(&chain.symbol);
            if data.is_none() {
                placeholders += 1;
            }
            ChainView {
                symbol: chain.symbol.clone(),
                members: chain.members.clone(),
                data,
            }
        })
        .collect();

    let polygons = workspace
        .polygons()
        .map(|poly| {
            let chain = workspace.chain_of(poly.id).map(|c| c.symbol.clone());
            let mut vertices = None;
            if chain.is_none() {
                let data = symbol::primitive_symbol(poly.sides)
                    .ok()
                    .and_then(|sym| cache.poll(&sym));
                match data {
                    Some(data) => {
                        vertices = data.primitive_ring.as_ref().map(|ring| {
                            geometry::ring_from_arrays(ring)
                                .into_iter()
                                .map(|p| poly.pose.apply_point(p).to_array())
                                .collect()
                        });
                    }
                    None => placeholders += 1,
                }
            }
            PolygonView {
                id: poly.id,
                sides: poly.sides,
                vertices: vertices
                    .unwrap_or_else(|| geometry::ring_to_arrays(&poly.vertices())),
                open: poly.open_flags(),
                chain,
            }
        })
        .collect();

    RenderFrame {
        index,
        version: workspace.version(),
        polygons,
        chains,
        placeholders,
    }
}
